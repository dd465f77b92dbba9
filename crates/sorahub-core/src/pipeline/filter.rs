//! Color filter pass: brightness, then contrast, then grayscale.
//!
//! Operates in place on the post-geometry raster. The alpha channel is
//! never touched. Each stage stores its result back as a clamped byte
//! before the next stage reads it, so intermediate values are
//! quantized exactly like a canvas pixel buffer.

use image::RgbaImage;

use crate::settings::ConversionSettings;

/// Apply the color filters to every pixel. Skipped entirely when
/// grayscale is off and brightness/contrast are neutral.
pub fn apply(image: &mut RgbaImage, settings: &ConversionSettings) {
    if !settings.wants_color_filters() {
        return;
    }

    let brightness = f32::from(settings.brightness) / 100.0;
    let contrast_shift = (f32::from(settings.contrast) / 100.0 - 1.0) * 255.0;

    for pixel in image.pixels_mut() {
        let channels = &mut pixel.0;

        // Brightness: c' = clamp(c * brightness/100)
        for c in channels[..3].iter_mut() {
            *c = clamp_byte(f32::from(*c) * brightness);
        }

        // Contrast: c' = clamp(c + (contrast/100 - 1) * 255)
        for c in channels[..3].iter_mut() {
            *c = clamp_byte(f32::from(*c) + contrast_shift);
        }

        // Grayscale: BT.601 luma splatted to all three channels
        if settings.grayscale {
            let luma = clamp_byte(
                0.299 * f32::from(channels[0])
                    + 0.587 * f32::from(channels[1])
                    + 0.114 * f32::from(channels[2]),
            );
            channels[0] = luma;
            channels[1] = luma;
            channels[2] = luma;
        }
    }
}

#[inline]
fn clamp_byte(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn one_pixel(r: u8, g: u8, b: u8, a: u8) -> RgbaImage {
        let mut img = RgbaImage::new(1, 1);
        img.put_pixel(0, 0, Rgba([r, g, b, a]));
        img
    }

    #[test]
    fn test_reference_pixel_byte_for_byte() {
        // brightness 120: (240, 120, 60)
        // contrast 110 (+25.5): (255 clamped, 146, 86)
        // luma = .299*255 + .587*146 + .114*86 = 171.751 -> 172
        let mut img = one_pixel(200, 100, 50, 255);
        let settings = ConversionSettings {
            brightness: 120,
            contrast: 110,
            grayscale: true,
            ..Default::default()
        };
        apply(&mut img, &settings);
        assert_eq!(img.get_pixel(0, 0), &Rgba([172, 172, 172, 255]));
    }

    #[test]
    fn test_alpha_untouched() {
        let mut img = one_pixel(10, 20, 30, 77);
        let settings = ConversionSettings {
            brightness: 150,
            contrast: 150,
            grayscale: true,
            ..Default::default()
        };
        apply(&mut img, &settings);
        assert_eq!(img.get_pixel(0, 0).0[3], 77);
    }

    #[test]
    fn test_neutral_settings_are_a_noop() {
        let mut img = one_pixel(200, 100, 50, 255);
        apply(&mut img, &ConversionSettings::default());
        assert_eq!(img.get_pixel(0, 0), &Rgba([200, 100, 50, 255]));
    }

    #[test]
    fn test_brightness_clamps_at_white() {
        let mut img = one_pixel(250, 250, 250, 255);
        let settings = ConversionSettings {
            brightness: 150,
            ..Default::default()
        };
        apply(&mut img, &settings);
        assert_eq!(img.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_low_contrast_darkens() {
        // contrast 50 shifts every channel by -127.5
        let mut img = one_pixel(100, 150, 200, 255);
        let settings = ConversionSettings {
            contrast: 50,
            ..Default::default()
        };
        apply(&mut img, &settings);
        assert_eq!(img.get_pixel(0, 0), &Rgba([0, 23, 73, 255]));
    }

    #[test]
    fn test_grayscale_alone() {
        // luma = .299*200 + .587*100 + .114*50 = 124.2 -> 124
        let mut img = one_pixel(200, 100, 50, 255);
        let settings = ConversionSettings {
            grayscale: true,
            ..Default::default()
        };
        apply(&mut img, &settings);
        assert_eq!(img.get_pixel(0, 0), &Rgba([124, 124, 124, 255]));
    }
}
