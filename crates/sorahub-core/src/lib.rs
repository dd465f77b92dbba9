//! SoraHub Core - Embeddable batch image conversion library.
//!
//! SoraHub converts batches of raster images: each image is decoded,
//! resized, flipped, rotated, color-adjusted, and re-encoded into a
//! target format, with per-image progress reporting. Completed
//! artifacts can additionally be assembled into a multi-page PDF.
//!
//! # Architecture
//!
//! The core is a pure pipeline over an in-memory item registry:
//!
//! ```text
//! Bytes → Decode → Geometry (resize/flip/rotate) → Color filters → Encode → Artifact
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use sorahub_core::{BatchConverter, ConversionSettings, InputFile, TargetFormat};
//!
//! #[tokio::main]
//! async fn main() -> sorahub_core::Result<()> {
//!     let mut settings = ConversionSettings::default();
//!     settings.format = TargetFormat::Jpeg;
//!
//!     let mut converter = BatchConverter::with_settings(settings)?;
//!     converter.add_items(vec![InputFile::new("photo.png", "image/png", bytes)]);
//!
//!     let stats = converter.convert_all().await;
//!     println!("converted {} image(s)", stats.succeeded);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod batch;
pub mod error;
pub mod pdf;
pub mod pipeline;
pub mod registry;
pub mod settings;

// Re-exports for convenient access
pub use batch::{download_file_name, BatchConverter, BatchRunStats, PDF_DOWNLOAD_NAME};
pub use error::{ConvertError, Result};
pub use pipeline::convert_image;
pub use registry::{Artifact, ImageItem, InputFile, ItemId, ItemState, Registry, SourceImage};
pub use settings::{ConversionSettings, Rotation, SettingsPatch, TargetFormat};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_default_settings_are_valid() {
        ConversionSettings::default().validate().unwrap();
    }
}
