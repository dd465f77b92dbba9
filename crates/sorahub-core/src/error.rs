//! Error types for the conversion pipeline.
//!
//! Errors carry the context a caller needs to report them (item names,
//! target formats, offending ids). Per-item decode/transform/encode
//! failures during a batch run are caught by the scheduler and recorded
//! on the item; everything else propagates to the caller. No variant is
//! process-fatal.

use thiserror::Error;

use crate::registry::ItemId;
use crate::settings::TargetFormat;

/// Top-level error type for conversion operations.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Source bytes could not be rasterized
    #[error("decode error for {name}: {message}")]
    Decode { name: String, message: String },

    /// The encoder could not produce the requested format/quality combination
    #[error("encode error for {format}: {message}")]
    Encode {
        format: TargetFormat,
        message: String,
    },

    /// No codec is compiled in for the requested target format
    #[error("no encoder available for format {0}")]
    UnsupportedFormat(TargetFormat),

    /// A registry operation referenced an id that is not present
    #[error("no item with id {0} in the registry")]
    ReferenceNotFound(ItemId),

    /// PDF assembly was requested with zero completed items
    #[error("cannot assemble a document from zero completed items")]
    EmptyAssembly,

    /// PDF assembly failed while building or serializing the document
    #[error("pdf assembly failed: {0}")]
    PdfAssembly(String),

    /// Settings values are out of range
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// A settings document could not be parsed
    #[error("failed to parse settings: {0}")]
    SettingsParse(#[from] toml::de::Error),
}

/// Convenience type alias for conversion results.
pub type Result<T> = std::result::Result<T, ConvertError>;
