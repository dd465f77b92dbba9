//! Image conversion pipeline stages.
//!
//! - **decode**: rasterize source bytes with format detection
//! - **geometry**: resize, then flip/rotation composition
//! - **filter**: brightness, contrast, grayscale pass
//! - **encode**: produce the target-format artifact
//! - **convert**: orchestrate the stages for one item

pub mod convert;
pub mod decode;
pub mod encode;
pub mod filter;
pub mod geometry;

pub use convert::convert_image;
