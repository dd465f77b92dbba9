//! Encoding the final raster into the target format.
//!
//! Quality only reaches the codecs that take one. jpeg and webp map
//! the effective quality onto their 0-100 scales (webp goes through
//! libwebp, since the `image` crate only ships a lossless webp
//! encoder); png/gif/bmp/ico/tiff ignore quality entirely. avif has
//! no compiled encoder and fails explicitly rather than substituting
//! a different format.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::error::{ConvertError, Result};
use crate::registry::Artifact;
use crate::settings::{ConversionSettings, TargetFormat};

/// Encode a raster on the blocking pool.
pub async fn encode(image: RgbaImage, settings: &ConversionSettings) -> Result<Artifact> {
    let format = settings.format;
    let quality = settings.effective_quality();

    tokio::task::spawn_blocking(move || encode_sync(image, format, quality))
        .await
        .map_err(|e| ConvertError::Encode {
            format,
            message: format!("task join error: {e}"),
        })?
}

/// Synchronous encode (runs in spawn_blocking).
fn encode_sync(image: RgbaImage, format: TargetFormat, quality: f32) -> Result<Artifact> {
    let mut buffer = Cursor::new(Vec::new());

    match format {
        TargetFormat::Jpeg => {
            // jpeg has no alpha channel
            let rgb = DynamicImage::ImageRgba8(image).to_rgb8();
            let jpeg_quality = (quality * 100.0).round() as u8;
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, jpeg_quality))
                .map_err(|e| encode_error(format, e))?;
        }
        TargetFormat::Webp => {
            let (width, height) = image.dimensions();
            let encoded =
                webp::Encoder::from_rgba(image.as_raw(), width, height).encode(quality * 100.0);
            buffer.get_mut().extend_from_slice(&encoded);
        }
        TargetFormat::Png => write_plain(&image, format, ImageFormat::Png, &mut buffer)?,
        TargetFormat::Gif => write_plain(&image, format, ImageFormat::Gif, &mut buffer)?,
        TargetFormat::Bmp => write_plain(&image, format, ImageFormat::Bmp, &mut buffer)?,
        TargetFormat::Ico => write_plain(&image, format, ImageFormat::Ico, &mut buffer)?,
        TargetFormat::Tiff => write_plain(&image, format, ImageFormat::Tiff, &mut buffer)?,
        TargetFormat::Avif => return Err(ConvertError::UnsupportedFormat(format)),
    }

    let bytes = buffer.into_inner();
    tracing::trace!("encoded {} bytes as {}", bytes.len(), format);
    Ok(Artifact::new(format, bytes))
}

fn write_plain(
    image: &RgbaImage,
    format: TargetFormat,
    image_format: ImageFormat,
    buffer: &mut Cursor<Vec<u8>>,
) -> Result<()> {
    image
        .write_to(buffer, image_format)
        .map_err(|e| encode_error(format, e))
}

fn encode_error(format: TargetFormat, error: image::ImageError) -> ConvertError {
    ConvertError::Encode {
        format,
        message: error.to_string(),
    }
}
