//! Conversion settings: target format, quality policy, geometry and
//! color-adjustment parameters.
//!
//! Settings are a plain value object. The scheduler snapshots them at
//! the start of a batch run, so mutating them mid-run never affects
//! items already completed. Partial updates merge field-by-field via
//! [`SettingsPatch`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConvertError, Result};

/// The eight supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    Png,
    Jpeg,
    Webp,
    Gif,
    Bmp,
    Ico,
    Tiff,
    Avif,
}

impl TargetFormat {
    /// Every supported format, in display order.
    pub const ALL: [TargetFormat; 8] = [
        TargetFormat::Png,
        TargetFormat::Jpeg,
        TargetFormat::Webp,
        TargetFormat::Gif,
        TargetFormat::Bmp,
        TargetFormat::Ico,
        TargetFormat::Tiff,
        TargetFormat::Avif,
    ];

    /// Canonical lowercase format id.
    pub fn as_str(self) -> &'static str {
        match self {
            TargetFormat::Png => "png",
            TargetFormat::Jpeg => "jpeg",
            TargetFormat::Webp => "webp",
            TargetFormat::Gif => "gif",
            TargetFormat::Bmp => "bmp",
            TargetFormat::Ico => "ico",
            TargetFormat::Tiff => "tiff",
            TargetFormat::Avif => "avif",
        }
    }

    /// File extension used for download names. Differs from the format
    /// id for jpeg and tiff.
    pub fn file_extension(self) -> &'static str {
        match self {
            TargetFormat::Jpeg => "jpg",
            TargetFormat::Tiff => "tif",
            other => other.as_str(),
        }
    }

    /// MIME type of the encoded artifact.
    pub fn media_type(self) -> &'static str {
        match self {
            TargetFormat::Png => "image/png",
            TargetFormat::Jpeg => "image/jpeg",
            TargetFormat::Webp => "image/webp",
            TargetFormat::Gif => "image/gif",
            TargetFormat::Bmp => "image/bmp",
            TargetFormat::Ico => "image/x-icon",
            TargetFormat::Tiff => "image/tiff",
            TargetFormat::Avif => "image/avif",
        }
    }

    /// Whether the format's encoder takes a quality parameter.
    /// png/bmp/gif/ico/tiff ignore the quality field entirely.
    pub fn supports_quality(self) -> bool {
        matches!(
            self,
            TargetFormat::Jpeg | TargetFormat::Webp | TargetFormat::Avif
        )
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(TargetFormat::Png),
            "jpeg" | "jpg" => Ok(TargetFormat::Jpeg),
            "webp" => Ok(TargetFormat::Webp),
            "gif" => Ok(TargetFormat::Gif),
            "bmp" => Ok(TargetFormat::Bmp),
            "ico" => Ok(TargetFormat::Ico),
            "tiff" | "tif" => Ok(TargetFormat::Tiff),
            "avif" => Ok(TargetFormat::Avif),
            other => Err(ConvertError::InvalidSettings(format!(
                "unknown format id: {other}"
            ))),
        }
    }
}

/// Rotation angle. Only the four right-angle values exist; arbitrary
/// angles are not representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Rotation {
    #[default]
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    /// Clockwise degrees.
    pub fn degrees(self) -> u32 {
        match self {
            Rotation::None => 0,
            Rotation::Cw90 => 90,
            Rotation::Cw180 => 180,
            Rotation::Cw270 => 270,
        }
    }

    /// Whether this rotation swaps the output surface's width/height.
    pub fn swaps_dimensions(self) -> bool {
        matches!(self, Rotation::Cw90 | Rotation::Cw270)
    }
}

impl TryFrom<u32> for Rotation {
    type Error = String;

    fn try_from(degrees: u32) -> std::result::Result<Self, String> {
        match degrees {
            0 => Ok(Rotation::None),
            90 => Ok(Rotation::Cw90),
            180 => Ok(Rotation::Cw180),
            270 => Ok(Rotation::Cw270),
            other => Err(format!("rotation must be 0, 90, 180 or 270, got {other}")),
        }
    }
}

impl From<Rotation> for u32 {
    fn from(rotation: Rotation) -> u32 {
        rotation.degrees()
    }
}

impl FromStr for Rotation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        let degrees: u32 = s
            .parse()
            .map_err(|_| format!("rotation must be a number, got {s:?}"))?;
        Rotation::try_from(degrees)
    }
}

/// Settings shared by every item in a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionSettings {
    /// Target output format
    pub format: TargetFormat,

    /// Quality 10-100, applied only to quality-bearing formats
    pub quality: u8,

    /// Extra compression: scales quality by 0.7 with a floor of 0.3
    pub compression: bool,

    /// Whether to resize at all
    pub resize: bool,

    /// Resize target width in pixels
    pub resize_width: u32,

    /// Resize target height in pixels
    pub resize_height: u32,

    /// Fit within the target box using one uniform scale factor
    pub maintain_aspect_ratio: bool,

    /// Clockwise rotation
    pub rotate: Rotation,

    /// Mirror across the vertical axis
    pub flip_horizontal: bool,

    /// Mirror across the horizontal axis
    pub flip_vertical: bool,

    /// Collapse channels to BT.601 luma
    pub grayscale: bool,

    /// Brightness 50-150, 100 is neutral
    pub brightness: u8,

    /// Contrast 50-150, 100 is neutral
    pub contrast: u8,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            format: TargetFormat::Png,
            quality: 90,
            compression: false,
            resize: false,
            resize_width: 1920,
            resize_height: 1080,
            maintain_aspect_ratio: true,
            rotate: Rotation::None,
            flip_horizontal: false,
            flip_vertical: false,
            grayscale: false,
            brightness: 100,
            contrast: 100,
        }
    }
}

impl ConversionSettings {
    /// Validate settings values are within acceptable ranges.
    pub fn validate(&self) -> Result<()> {
        if !(10..=100).contains(&self.quality) {
            return Err(ConvertError::InvalidSettings(
                "quality must be between 10 and 100".into(),
            ));
        }
        if !(50..=150).contains(&self.brightness) {
            return Err(ConvertError::InvalidSettings(
                "brightness must be between 50 and 150".into(),
            ));
        }
        if !(50..=150).contains(&self.contrast) {
            return Err(ConvertError::InvalidSettings(
                "contrast must be between 50 and 150".into(),
            ));
        }
        if self.resize_width == 0 || self.resize_height == 0 {
            return Err(ConvertError::InvalidSettings(
                "resize_width and resize_height must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// The quality value actually handed to the encoder, in 0.0..=1.0.
    ///
    /// Compression scales the requested quality by 0.7 with a floor of
    /// 0.3, and only for quality-bearing formats.
    pub fn effective_quality(&self) -> f32 {
        let quality = f32::from(self.quality) / 100.0;
        if self.compression && self.format.supports_quality() {
            (quality * 0.7).max(0.3)
        } else {
            quality
        }
    }

    /// Whether any color-filter pass is needed at all.
    pub fn wants_color_filters(&self) -> bool {
        self.grayscale || self.brightness != 100 || self.contrast != 100
    }

    /// Apply a partial update field-by-field, validate the result, and
    /// commit it. On validation failure the settings are unchanged.
    pub fn apply(&mut self, patch: SettingsPatch) -> Result<()> {
        let mut updated = self.clone();
        patch.merge_into(&mut updated);
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

/// A partial settings update. Absent fields leave the existing value
/// untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SettingsPatch {
    pub format: Option<TargetFormat>,
    pub quality: Option<u8>,
    pub compression: Option<bool>,
    pub resize: Option<bool>,
    pub resize_width: Option<u32>,
    pub resize_height: Option<u32>,
    pub maintain_aspect_ratio: Option<bool>,
    pub rotate: Option<Rotation>,
    pub flip_horizontal: Option<bool>,
    pub flip_vertical: Option<bool>,
    pub grayscale: Option<bool>,
    pub brightness: Option<u8>,
    pub contrast: Option<u8>,
}

impl SettingsPatch {
    /// Parse a patch from a TOML document. Absent keys stay `None`;
    /// unrecognized keys are ignored.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn merge_into(self, settings: &mut ConversionSettings) {
        if let Some(format) = self.format {
            settings.format = format;
        }
        if let Some(quality) = self.quality {
            settings.quality = quality;
        }
        if let Some(compression) = self.compression {
            settings.compression = compression;
        }
        if let Some(resize) = self.resize {
            settings.resize = resize;
        }
        if let Some(width) = self.resize_width {
            settings.resize_width = width;
        }
        if let Some(height) = self.resize_height {
            settings.resize_height = height;
        }
        if let Some(maintain) = self.maintain_aspect_ratio {
            settings.maintain_aspect_ratio = maintain;
        }
        if let Some(rotate) = self.rotate {
            settings.rotate = rotate;
        }
        if let Some(flip) = self.flip_horizontal {
            settings.flip_horizontal = flip;
        }
        if let Some(flip) = self.flip_vertical {
            settings.flip_vertical = flip;
        }
        if let Some(grayscale) = self.grayscale {
            settings.grayscale = grayscale;
        }
        if let Some(brightness) = self.brightness {
            settings.brightness = brightness;
        }
        if let Some(contrast) = self.contrast {
            settings.contrast = contrast;
        }
    }
}
