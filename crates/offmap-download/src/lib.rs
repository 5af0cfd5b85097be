//! Download orchestration for the offmap offline map downloader.
//!
//! - [`DownloadManager`] - Admits one download at a time and owns the stores
//! - [`DownloadRequest`] - Map, region, zoom range and extras to fetch
//! - [`JobState`] - State machine of the download slot
//! - [`DownloadListener`] - Observer of state, progress and errors
//! - [`OfflineTileReader`] - Network-free tile lookup across stores

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod cursor;
mod error;
mod job;
mod listener;
mod manager;
mod progress;
mod reader;
mod state;

pub use config::{DEFAULT_CONCURRENCY, DownloaderConfig};
pub use error::DownloadError;
pub use job::{DownloadRequest, JobId, JobSnapshot};
pub use listener::DownloadListener;
pub use manager::DownloadManager;
pub use reader::OfflineTileReader;
pub use state::JobState;
