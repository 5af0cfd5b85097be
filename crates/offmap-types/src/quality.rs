//! Raster image quality levels.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::QualityParseError;

/// Raster image quality requested for tiles.
///
/// The integer code is persisted verbatim in store metadata, so existing
/// discriminants must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageQuality {
    /// Full quality tiles as served by the map.
    #[default]
    Full = 0,
    /// 32 color indexed PNG.
    Png32 = 1,
    /// 64 color indexed PNG.
    Png64 = 2,
    /// 128 color indexed PNG.
    Png128 = 3,
    /// 256 color indexed PNG.
    Png256 = 4,
    /// 70% quality JPEG.
    Jpeg70 = 5,
    /// 80% quality JPEG.
    Jpeg80 = 6,
    /// 90% quality JPEG.
    Jpeg90 = 7,
}

impl ImageQuality {
    /// Returns the stable integer code of this level.
    #[must_use]
    pub const fn code(&self) -> u8 {
        *self as u8
    }

    /// Decodes a level from its integer code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Full),
            1 => Some(Self::Png32),
            2 => Some(Self::Png64),
            3 => Some(Self::Png128),
            4 => Some(Self::Png256),
            5 => Some(Self::Jpeg70),
            6 => Some(Self::Jpeg80),
            7 => Some(Self::Jpeg90),
            _ => None,
        }
    }

    /// Returns the file suffix used in tile URLs for this level.
    #[must_use]
    pub const fn tile_suffix(&self) -> &'static str {
        match self {
            Self::Full => "png",
            Self::Png32 => "png32",
            Self::Png64 => "png64",
            Self::Png128 => "png128",
            Self::Png256 => "png256",
            Self::Jpeg70 => "jpg70",
            Self::Jpeg80 => "jpg80",
            Self::Jpeg90 => "jpg90",
        }
    }

    /// Returns the level as a string identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Png32 => "png32",
            Self::Png64 => "png64",
            Self::Png128 => "png128",
            Self::Png256 => "png256",
            Self::Jpeg70 => "jpeg70",
            Self::Jpeg80 => "jpeg80",
            Self::Jpeg90 => "jpeg90",
        }
    }

    /// Returns all available levels.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Full,
            Self::Png32,
            Self::Png64,
            Self::Png128,
            Self::Png256,
            Self::Jpeg70,
            Self::Jpeg80,
            Self::Jpeg90,
        ]
    }
}

impl std::fmt::Display for ImageQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ImageQuality {
    type Err = QualityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" | "png" => Ok(Self::Full),
            "png32" => Ok(Self::Png32),
            "png64" => Ok(Self::Png64),
            "png128" => Ok(Self::Png128),
            "png256" => Ok(Self::Png256),
            "jpeg70" | "jpg70" => Ok(Self::Jpeg70),
            "jpeg80" | "jpg80" => Ok(Self::Jpeg80),
            "jpeg90" | "jpg90" => Ok(Self::Jpeg90),
            _ => Err(QualityParseError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ImageQuality::Full.code(), 0);
        assert_eq!(ImageQuality::Png256.code(), 4);
        assert_eq!(ImageQuality::Jpeg90.code(), 7);
    }

    #[test]
    fn test_from_code() {
        for quality in ImageQuality::all() {
            assert_eq!(ImageQuality::from_code(quality.code()), Some(*quality));
        }
        assert_eq!(ImageQuality::from_code(8), None);
    }

    #[test]
    fn test_parse() {
        assert_eq!("full".parse::<ImageQuality>().unwrap(), ImageQuality::Full);
        assert_eq!("JPG80".parse::<ImageQuality>().unwrap(), ImageQuality::Jpeg80);
        assert!("webp".parse::<ImageQuality>().is_err());
    }

    #[test]
    fn test_tile_suffix() {
        assert_eq!(ImageQuality::Full.tile_suffix(), "png");
        assert_eq!(ImageQuality::Jpeg70.tile_suffix(), "jpg70");
    }
}
