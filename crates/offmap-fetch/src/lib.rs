//! Network side of the offmap offline map downloader.
//!
//! This crate provides everything that talks to, or names things on, the map
//! server:
//!
//! - [`Transport`] - Async fetch abstraction, with [`HttpTransport`] on reqwest
//! - [`url::Endpoints`] - Tile, metadata, marker and icon URL construction
//! - [`TileUrlGenerator`] - Lazily indexed tile URLs for a region
//! - [`prefetch_marker_icons`] - Marker icon discovery from GeoJSON

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod generator;
mod markers;
pub mod url;

pub use client::{ClientConfig, FetchResponse, HttpTransport, Transport, TransportError};
pub use generator::TileUrlGenerator;
pub use markers::{MarkerPrefetch, parse_marker_icon_urls, prefetch_marker_icons};
