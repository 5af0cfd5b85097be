//! Geographic bounds, zoom ranges and Web Mercator tile math.

use std::f64::consts::PI;

use crate::GeoError;

/// Northern limit of the Web Mercator projection.
pub const MAX_LAT: f64 = 85.051_128_78;
/// Southern limit of the Web Mercator projection.
pub const MIN_LAT: f64 = -MAX_LAT;
/// Highest zoom level accepted for downloads.
pub const MAX_ZOOM: u8 = 22;

/// A latitude/longitude bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    /// Southern edge.
    pub min_lat: f64,
    /// Northern edge.
    pub max_lat: f64,
    /// Western edge.
    pub min_lon: f64,
    /// Eastern edge.
    pub max_lon: f64,
}

impl GeoBounds {
    /// Creates a bounding box, validating that every edge is finite and
    /// that min <= max on both axes.
    ///
    /// # Errors
    ///
    /// Returns an error if an edge is not finite or the box is inverted.
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Result<Self, GeoError> {
        for value in [min_lat, max_lat, min_lon, max_lon] {
            if !value.is_finite() {
                return Err(GeoError::NotFinite(value));
            }
        }
        if min_lat > max_lat {
            return Err(GeoError::InvertedLatitude { min_lat, max_lat });
        }
        if min_lon > max_lon {
            return Err(GeoError::InvertedLongitude { min_lon, max_lon });
        }
        Ok(Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        })
    }

    /// Creates a bounding box from a center point and a span in degrees.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting box is invalid (negative span or
    /// non-finite values).
    pub fn from_center_span(
        center_lat: f64,
        center_lon: f64,
        lat_span: f64,
        lon_span: f64,
    ) -> Result<Self, GeoError> {
        let min_lat = center_lat - lat_span / 2.0;
        let min_lon = center_lon - lon_span / 2.0;
        Self::new(min_lat, min_lat + lat_span, min_lon, min_lon + lon_span)
    }

    /// Returns the box covering the whole projected world.
    #[must_use]
    pub const fn world() -> Self {
        Self {
            min_lat: MIN_LAT,
            max_lat: MAX_LAT,
            min_lon: -180.0,
            max_lon: 180.0,
        }
    }
}

impl std::fmt::Display for GeoBounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{:.5}, {:.5}] x [{:.5}, {:.5}]",
            self.min_lat, self.max_lat, self.min_lon, self.max_lon
        )
    }
}

/// An inclusive range of zoom levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ZoomRange {
    /// Lowest zoom level (inclusive).
    pub min: u8,
    /// Highest zoom level (inclusive).
    pub max: u8,
}

impl ZoomRange {
    /// Creates a zoom range, validating that min <= max <= [`MAX_ZOOM`].
    ///
    /// # Errors
    ///
    /// Returns an error if the range is inverted or exceeds the maximum zoom.
    pub const fn new(min: u8, max: u8) -> Result<Self, GeoError> {
        if max > MAX_ZOOM {
            return Err(GeoError::InvalidZoom(max));
        }
        if min > max {
            return Err(GeoError::InvertedZoom { min, max });
        }
        Ok(Self { min, max })
    }

    /// Creates a range containing a single zoom level.
    ///
    /// # Errors
    ///
    /// Returns an error if the level exceeds the maximum zoom.
    pub const fn single(zoom: u8) -> Result<Self, GeoError> {
        Self::new(zoom, zoom)
    }

    /// Returns an iterator over every level in the range.
    #[must_use]
    pub const fn levels(&self) -> std::ops::RangeInclusive<u8> {
        self.min..=self.max
    }
}

impl std::fmt::Display for ZoomRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "z{}-z{}", self.min, self.max)
    }
}

/// A Web Mercator tile address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    /// Zoom level.
    pub z: u8,
    /// Column, counted from the antimeridian eastwards.
    pub x: u32,
    /// Row, counted from the north edge southwards.
    pub y: u32,
}

impl TileCoord {
    /// Creates a tile coordinate.
    #[must_use]
    pub const fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Returns the latitude/longitude of the tile's northwest corner.
    #[must_use]
    pub fn northwest_corner(&self) -> (f64, f64) {
        let n = tiles_per_axis(self.z) as f64;
        let lon = self.x as f64 / n * 360.0 - 180.0;
        let lat_rad = (PI * (1.0 - 2.0 * self.y as f64 / n)).sinh().atan();
        (lat_rad.to_degrees(), lon)
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Returns the number of tiles along each axis at the given zoom.
#[must_use]
pub const fn tiles_per_axis(zoom: u8) -> u64 {
    1u64 << zoom
}

/// Converts a longitude to its tile column at the given zoom.
///
/// Longitudes are clamped to [-180, 180] and the result to the last column.
#[must_use]
pub fn lon_to_tile_x(lon: f64, zoom: u8) -> u32 {
    let n = tiles_per_axis(zoom) as f64;
    let lon = lon.clamp(-180.0, 180.0);
    let x = ((lon + 180.0) / 360.0 * n).floor();
    clamp_index(x, zoom)
}

/// Converts a latitude to its tile row at the given zoom.
///
/// Latitudes are clamped to the Web Mercator limits and the result to the
/// last row.
#[must_use]
pub fn lat_to_tile_y(lat: f64, zoom: u8) -> u32 {
    let n = tiles_per_axis(zoom) as f64;
    let lat_rad = lat.clamp(MIN_LAT, MAX_LAT).to_radians();
    let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n).floor();
    clamp_index(y, zoom)
}

fn clamp_index(value: f64, zoom: u8) -> u32 {
    let last = (tiles_per_axis(zoom) - 1) as f64;
    value.clamp(0.0, last) as u32
}
