//! The `sorahub formats` command: list the supported output formats.

use clap::Args;
use serde::Serialize;

use sorahub_core::TargetFormat;

/// Arguments for the `formats` command.
#[derive(Args, Debug)]
pub struct FormatsArgs {
    /// Output the catalog as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct FormatEntry {
    name: &'static str,
    extension: &'static str,
    media_type: &'static str,
    supports_quality: bool,
}

impl From<TargetFormat> for FormatEntry {
    fn from(format: TargetFormat) -> Self {
        Self {
            name: format.as_str(),
            extension: format.file_extension(),
            media_type: format.media_type(),
            supports_quality: format.supports_quality(),
        }
    }
}

/// Execute the `formats` command.
pub fn execute(args: FormatsArgs) -> anyhow::Result<()> {
    let entries: Vec<FormatEntry> = TargetFormat::ALL.iter().copied().map(Into::into).collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("{:<8} {:<6} {:<16} {}", "format", "ext", "media type", "quality");
    for entry in &entries {
        println!(
            "{:<8} {:<6} {:<16} {}",
            entry.name,
            entry.extension,
            entry.media_type,
            if entry.supports_quality { "yes" } else { "-" }
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_covers_every_format() {
        let entries: Vec<FormatEntry> =
            TargetFormat::ALL.iter().copied().map(Into::into).collect();
        assert_eq!(entries.len(), 8);
        assert!(entries.iter().any(|e| e.name == "jpeg" && e.extension == "jpg"));
        assert!(entries.iter().any(|e| e.name == "tiff" && e.extension == "tif"));
    }
}
