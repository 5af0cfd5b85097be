//! CLI command implementations.

use std::path::PathBuf;

use anyhow::{Context, Result};
use offmap_lib::{DownloadManager, DownloaderConfig};

pub(crate) mod download;
pub(crate) mod info;
pub(crate) mod list;
pub(crate) mod remove;
pub(crate) mod tile;

/// Builds the configuration shared by every command.
pub(crate) fn config(data_dir: Option<PathBuf>) -> DownloaderConfig {
    data_dir.map_or_else(DownloaderConfig::default, DownloaderConfig::new)
}

/// Opens the download manager over the configured data directory.
pub(crate) fn open_manager(config: DownloaderConfig) -> Result<DownloadManager> {
    let data_dir = config.data_dir.clone();
    DownloadManager::with_http(config)
        .with_context(|| format!("Failed to open offline stores in {}", data_dir.display()))
}
