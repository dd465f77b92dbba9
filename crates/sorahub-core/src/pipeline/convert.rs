//! Per-item conversion: decode, geometric transform, color filters,
//! encode. Emits the progress checkpoints the scheduler records.

use std::time::Instant;

use crate::error::Result;
use crate::registry::{Artifact, SourceImage};
use crate::settings::ConversionSettings;

use super::{decode, encode, filter, geometry};

/// Convert one source image through the full pipeline.
///
/// `on_progress` receives the checkpoints 20 (after decode), 40 (after
/// the geometric transform), 60 (before filtering), 80 (before encode)
/// and 100 (on success). On error no further checkpoints are emitted.
pub async fn convert_image(
    source: &SourceImage,
    settings: &ConversionSettings,
    mut on_progress: impl FnMut(u8),
) -> Result<Artifact> {
    let start = Instant::now();
    tracing::debug!("converting {:?} to {}", source.name(), settings.format);

    let decoded = decode::decode(source).await?;
    on_progress(20);
    tracing::trace!(
        "  decode: {:?} ({}x{})",
        start.elapsed(),
        decoded.width(),
        decoded.height()
    );

    let geometry_start = Instant::now();
    let mut surface = geometry::apply(&decoded, settings);
    on_progress(40);
    tracing::trace!("  geometry: {:?}", geometry_start.elapsed());

    on_progress(60);
    let filter_start = Instant::now();
    filter::apply(&mut surface, settings);
    tracing::trace!("  filter: {:?}", filter_start.elapsed());

    on_progress(80);
    let artifact = encode::encode(surface, settings).await?;
    on_progress(100);

    tracing::debug!(
        "converted {:?} in {:?} ({} bytes)",
        source.name(),
        start.elapsed(),
        artifact.len()
    );
    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{InputFile, Registry};
    use crate::settings::{Rotation, TargetFormat};
    use std::io::Cursor;

    fn png_source(width: u32, height: u32) -> SourceImage {
        let img = image::DynamicImage::new_rgba8(width, height);
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();

        let mut registry = Registry::new();
        let ids = registry.add_items(vec![InputFile::new(
            "t.png",
            "image/png",
            buf.into_inner(),
        )]);
        registry.get(ids[0]).unwrap().source().clone()
    }

    #[tokio::test]
    async fn test_checkpoints_in_order() {
        let mut checkpoints = Vec::new();
        let artifact = convert_image(
            &png_source(8, 6),
            &ConversionSettings::default(),
            |p| checkpoints.push(p),
        )
        .await
        .unwrap();

        assert_eq!(checkpoints, vec![20, 40, 60, 80, 100]);
        assert_eq!(artifact.format(), TargetFormat::Png);
    }

    #[tokio::test]
    async fn test_rotation_reaches_the_artifact() {
        let settings = ConversionSettings {
            rotate: Rotation::Cw90,
            ..Default::default()
        };
        let artifact = convert_image(&png_source(8, 6), &settings, |_| {})
            .await
            .unwrap();

        let out = image::load_from_memory(artifact.bytes()).unwrap();
        assert_eq!((out.width(), out.height()), (6, 8));
    }

    #[tokio::test]
    async fn test_decode_failure_stops_checkpoints() {
        let mut registry = Registry::new();
        let ids = registry.add_items(vec![InputFile::new(
            "broken.png",
            "image/png",
            vec![1, 2, 3, 4],
        )]);
        let source = registry.get(ids[0]).unwrap().source().clone();

        let mut checkpoints = Vec::new();
        let result = convert_image(&source, &ConversionSettings::default(), |p| {
            checkpoints.push(p)
        })
        .await;

        assert!(result.is_err());
        assert!(checkpoints.is_empty());
    }
}
