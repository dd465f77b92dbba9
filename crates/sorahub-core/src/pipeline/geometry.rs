//! Geometric transform: resize, then flip/rotation composition.
//!
//! The stage order is fixed and observable in the output pixels:
//! the source is resized first, the flip scale is the innermost term
//! of the composition so it applies to the resized raster, and the
//! clockwise rotation applies last, swapping the output surface's
//! dimensions for 90/270.

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};

use crate::settings::{ConversionSettings, Rotation};

/// Dimensions after the resize step, before rotation.
///
/// With `maintain_aspect_ratio` both axes use the identical scale
/// factor `min(target_w / src_w, target_h / src_h)` and round
/// independently; otherwise the target dimensions are used verbatim,
/// distorting the aspect ratio. Each rounded axis keeps at least one
/// pixel, so an extreme aspect ratio never yields an empty surface.
pub fn resized_dimensions(src_w: u32, src_h: u32, settings: &ConversionSettings) -> (u32, u32) {
    if !settings.resize {
        return (src_w, src_h);
    }
    if settings.maintain_aspect_ratio {
        let scale = (f64::from(settings.resize_width) / f64::from(src_w))
            .min(f64::from(settings.resize_height) / f64::from(src_h));
        (
            ((f64::from(src_w) * scale).round() as u32).max(1),
            ((f64::from(src_h) * scale).round() as u32).max(1),
        )
    } else {
        (settings.resize_width, settings.resize_height)
    }
}

/// Final output surface dimensions: the resized dimensions, swapped
/// when the rotation is 90 or 270.
pub fn output_dimensions(src_w: u32, src_h: u32, settings: &ConversionSettings) -> (u32, u32) {
    let (w, h) = resized_dimensions(src_w, src_h, settings);
    if settings.rotate.swaps_dimensions() {
        (h, w)
    } else {
        (w, h)
    }
}

/// Run the geometric pipeline over a decoded raster.
pub fn apply(image: &DynamicImage, settings: &ConversionSettings) -> RgbaImage {
    let mut surface = image.to_rgba8();
    let (src_w, src_h) = surface.dimensions();

    let (w, h) = resized_dimensions(src_w, src_h, settings);
    if (w, h) != (src_w, src_h) {
        surface = imageops::resize(&surface, w, h, FilterType::Lanczos3);
    }

    if settings.flip_horizontal {
        imageops::flip_horizontal_in_place(&mut surface);
    }
    if settings.flip_vertical {
        imageops::flip_vertical_in_place(&mut surface);
    }

    match settings.rotate {
        Rotation::None => surface,
        Rotation::Cw90 => imageops::rotate90(&surface),
        Rotation::Cw180 => imageops::rotate180(&surface),
        Rotation::Cw270 => imageops::rotate270(&surface),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn settings() -> ConversionSettings {
        ConversionSettings::default()
    }

    /// 2x1 raster: red on the left, blue on the right.
    fn two_pixel_image() -> DynamicImage {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([0, 0, 255, 255]));
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn test_aspect_preserving_resize_uses_one_scale() {
        let mut s = settings();
        s.resize = true;
        s.resize_width = 100;
        s.resize_height = 100;
        // scale = min(100/400, 100/200) = 0.25 on both axes
        assert_eq!(resized_dimensions(400, 200, &s), (100, 50));
        // Rounding happens per axis
        assert_eq!(resized_dimensions(333, 100, &s), (100, 30));
    }

    #[test]
    fn test_free_resize_distorts() {
        let mut s = settings();
        s.resize = true;
        s.resize_width = 100;
        s.resize_height = 100;
        s.maintain_aspect_ratio = false;
        assert_eq!(resized_dimensions(400, 200, &s), (100, 100));
    }

    #[test]
    fn test_extreme_aspect_keeps_one_pixel_minimum() {
        let mut s = settings();
        s.resize = true;
        s.resize_width = 100;
        s.resize_height = 100;
        // scale = 0.01 rounds the short axis to zero; it is held at 1
        assert_eq!(resized_dimensions(10_000, 1, &s), (100, 1));
        assert_eq!(resized_dimensions(1, 10_000, &s), (1, 100));
    }

    #[test]
    fn test_resize_disabled_keeps_source_dimensions() {
        let s = settings();
        assert_eq!(resized_dimensions(640, 480, &s), (640, 480));
    }

    #[test]
    fn test_quarter_turns_swap_output_dimensions() {
        for degrees in [90u32, 270] {
            let mut s = settings();
            s.rotate = degrees.try_into().unwrap();
            assert_eq!(output_dimensions(640, 480, &s), (480, 640));
        }
        for degrees in [0u32, 180] {
            let mut s = settings();
            s.rotate = degrees.try_into().unwrap();
            assert_eq!(output_dimensions(640, 480, &s), (640, 480));
        }
    }

    #[test]
    fn test_rotate_90_pixel_mapping() {
        let mut s = settings();
        s.rotate = Rotation::Cw90;
        let out = apply(&two_pixel_image(), &s);
        assert_eq!(out.dimensions(), (1, 2));
        // Clockwise: the left (red) pixel ends up at the top
        assert_eq!(out.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
        assert_eq!(out.get_pixel(0, 1), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_rotate_180_pixel_mapping() {
        let mut s = settings();
        s.rotate = Rotation::Cw180;
        let out = apply(&two_pixel_image(), &s);
        assert_eq!(out.dimensions(), (2, 1));
        assert_eq!(out.get_pixel(0, 0), &Rgba([0, 0, 255, 255]));
        assert_eq!(out.get_pixel(1, 0), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_horizontal_flip() {
        let mut s = settings();
        s.flip_horizontal = true;
        let out = apply(&two_pixel_image(), &s);
        assert_eq!(out.get_pixel(0, 0), &Rgba([0, 0, 255, 255]));
        assert_eq!(out.get_pixel(1, 0), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_flips_compose_with_rotation() {
        // Flip applies to the resized raster before the rotation:
        // hflip makes [blue, red], then 90cw puts blue on top.
        let mut s = settings();
        s.flip_horizontal = true;
        s.rotate = Rotation::Cw90;
        let out = apply(&two_pixel_image(), &s);
        assert_eq!(out.dimensions(), (1, 2));
        assert_eq!(out.get_pixel(0, 0), &Rgba([0, 0, 255, 255]));
        assert_eq!(out.get_pixel(0, 1), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_both_flips_equal_half_turn() {
        let mut flips = settings();
        flips.flip_horizontal = true;
        flips.flip_vertical = true;
        let mut half_turn = settings();
        half_turn.rotate = Rotation::Cw180;

        let a = apply(&two_pixel_image(), &flips);
        let b = apply(&two_pixel_image(), &half_turn);
        assert_eq!(a.as_raw(), b.as_raw());
    }
}
