//! Image decoding from in-memory bytes with format detection.

use std::io::Cursor;
use std::sync::Arc;

use image::DynamicImage;

use crate::error::{ConvertError, Result};
use crate::registry::SourceImage;

/// Decode a source image on the blocking pool.
///
/// The byte buffer is shared with the registry's preview handle, so
/// moving it onto the pool is a refcount bump, not a copy.
pub async fn decode(source: &SourceImage) -> Result<DynamicImage> {
    let bytes = source.bytes();
    let name = source.name().to_string();
    let task_name = name.clone();

    tokio::task::spawn_blocking(move || decode_sync(&bytes, &task_name))
        .await
        .map_err(|e| ConvertError::Decode {
            name,
            message: format!("task join error: {e}"),
        })?
}

/// Synchronous decode (runs in spawn_blocking).
fn decode_sync(bytes: &Arc<[u8]>, name: &str) -> Result<DynamicImage> {
    let reader = image::ImageReader::new(Cursor::new(&bytes[..]))
        .with_guessed_format()
        .map_err(|e| ConvertError::Decode {
            name: name.to_string(),
            message: format!("cannot detect image format: {e}"),
        })?;

    reader.decode().map_err(|e| ConvertError::Decode {
        name: name.to_string(),
        message: e.to_string(),
    })
}
