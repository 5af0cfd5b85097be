//! Error types for offmap value types.

use thiserror::Error;

/// Errors raised while validating geographic inputs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeoError {
    /// A coordinate was NaN or infinite.
    #[error("Coordinate is not a finite number: {0}")]
    NotFinite(f64),

    /// Southern edge is north of the northern edge.
    #[error("Invalid latitude range: {min_lat} > {max_lat}")]
    InvertedLatitude {
        /// The southern edge.
        min_lat: f64,
        /// The northern edge.
        max_lat: f64,
    },

    /// Western edge is east of the eastern edge.
    #[error("Invalid longitude range: {min_lon} > {max_lon}")]
    InvertedLongitude {
        /// The western edge.
        min_lon: f64,
        /// The eastern edge.
        max_lon: f64,
    },

    /// Zoom level above the supported maximum.
    #[error("Zoom level {0} exceeds the maximum of {max}", max = crate::MAX_ZOOM)]
    InvalidZoom(u8),

    /// Minimum zoom is above the maximum zoom.
    #[error("Invalid zoom range: {min} > {max}")]
    InvertedZoom {
        /// The lowest zoom.
        min: u8,
        /// The highest zoom.
        max: u8,
    },
}

/// Error returned when parsing an invalid image quality string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "invalid image quality '{0}', expected one of: full, png32, png64, png128, png256, jpeg70, jpeg80, jpeg90"
)]
pub struct QualityParseError(pub(crate) String);
