//! Command implementations for the SoraHub CLI.

pub mod convert;
pub mod formats;
