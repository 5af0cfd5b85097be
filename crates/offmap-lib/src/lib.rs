//! Download map regions for offline use and read them back without the
//! network.
//!
//! This is a facade crate that re-exports functionality from the offmap
//! workspace crates for convenient access.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use offmap_lib::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = DownloadManager::with_http(DownloaderConfig::default())?;
//!
//!     let bounds = GeoBounds::from_center_span(48.85, 2.35, 0.1, 0.1)?;
//!     let request = DownloadRequest::new("acme.paris", bounds, ZoomRange::new(10, 14)?);
//!     manager.begin_downloading(request).await?;
//!
//!     // Listen for completion through a DownloadListener, then:
//!     let reader = manager.tile_reader(&[MapId::from("acme.paris")]);
//!     let tile = reader.tile(TileCoord::new(10, 518, 352));
//!     Ok(())
//! }
//! ```

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use offmap_types::*;

// Re-export storage
pub use offmap_store::{
    ResourceStore, StoreDirectory, StoreError, StoreIdentity, StoreRegistry,
};

// Re-export fetch functionality
#[cfg(feature = "fetch")]
pub use offmap_fetch::{
    ClientConfig, FetchResponse, HttpTransport, MarkerPrefetch, TileUrlGenerator, Transport,
    TransportError, parse_marker_icon_urls, prefetch_marker_icons, url::Endpoints,
};

// Re-export download orchestration
#[cfg(feature = "download")]
pub use offmap_download::{
    DEFAULT_CONCURRENCY, DownloadError, DownloadListener, DownloadManager, DownloadRequest,
    DownloaderConfig, JobId, JobSnapshot, JobState, OfflineTileReader,
};

/// Prelude module for convenient imports.
///
/// ```
/// use offmap_lib::prelude::*;
/// ```
pub mod prelude {
    pub use offmap_types::{GeoBounds, ImageQuality, MapId, TileCoord, ZoomRange};

    pub use offmap_store::{ResourceStore, StoreError};

    #[cfg(feature = "fetch")]
    pub use offmap_fetch::{ClientConfig, Transport, TransportError, url::Endpoints};

    #[cfg(feature = "download")]
    pub use offmap_download::{
        DownloadError, DownloadListener, DownloadManager, DownloadRequest, DownloaderConfig,
        JobState, OfflineTileReader,
    };
}
