//! Offline resource storage for the offmap downloader.
//!
//! - [`ResourceStore`] - One map's resources and metadata in a SQLite file
//! - [`StoreIdentity`] - Identity fields cached from store metadata
//! - [`StoreDirectory`] - Store file layout and startup discovery
//! - [`StoreRegistry`] - Initialized stores keyed by map id

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod directory;
mod error;
mod registry;
mod store;

pub use directory::{STORE_EXTENSION, StoreDirectory, remove_store_files};
pub use error::{Result, StoreError};
pub use registry::StoreRegistry;
pub use store::{
    META_IMAGE_QUALITY, META_INCLUDES_MARKERS, META_INCLUDES_METADATA, META_MAP_ID,
    META_UNIQUE_ID, ResourceStore, StoreIdentity, flag_value,
};
