//! Download manager configuration.

use std::path::PathBuf;

use offmap_fetch::{ClientConfig, url::Endpoints};
use offmap_store::StoreDirectory;

/// Default number of concurrent fetch workers.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Configuration for [`DownloadManager`](crate::DownloadManager).
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Directory holding the store files.
    pub data_dir: PathBuf,
    /// Number of concurrent fetch workers per job.
    pub concurrency: usize,
    /// Server endpoints for every URL the job fetches.
    pub endpoints: Endpoints,
    /// HTTP client settings, used when the manager builds its own transport.
    pub client: ClientConfig,
}

impl DownloaderConfig {
    /// Creates a configuration storing maps under `data_dir`.
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Sets the worker count (at least one).
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Sets the server endpoints.
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            data_dir: StoreDirectory::default_path(),
            concurrency: DEFAULT_CONCURRENCY,
            endpoints: Endpoints::default(),
            client: ClientConfig::default(),
        }
    }
}
