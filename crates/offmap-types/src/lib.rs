//! Core types for the offmap offline map downloader.
//!
//! This crate provides the value types shared across offmap:
//!
//! - [`ImageQuality`] - Raster quality level with a stable integer code
//! - [`GeoBounds`] - Latitude/longitude bounding box
//! - [`ZoomRange`] - Inclusive range of zoom levels
//! - [`TileCoord`] - Web Mercator tile address
//! - [`MapId`] - Identifier of a hosted map and its offline store

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod geo;
mod map_id;
mod quality;

pub use error::{GeoError, QualityParseError};
pub use geo::{
    GeoBounds, MAX_LAT, MAX_ZOOM, MIN_LAT, TileCoord, ZoomRange, lat_to_tile_y, lon_to_tile_x,
    tiles_per_axis,
};
pub use map_id::MapId;
pub use quality::ImageQuality;
