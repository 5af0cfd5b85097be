//! Download error types.

use offmap_fetch::TransportError;
use offmap_store::StoreError;
use offmap_types::{ImageQuality, MapId};
use thiserror::Error;

use crate::JobState;

/// Errors reported by the download manager.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// A download is already in progress.
    #[error("a download is already {0}")]
    Busy(JobState),

    /// Another download's store is still being resolved.
    #[error("a download of '{0}' is still starting")]
    Starting(MapId),

    /// The operation does not apply in the current state.
    #[error("cannot {action} while {state}")]
    InvalidState {
        /// Operation that was attempted.
        action: &'static str,
        /// State the manager was in.
        state: JobState,
    },

    /// The map already has a store at a different image quality.
    #[error("store for '{map_id}' uses {existing} tiles but {requested} was requested")]
    QualityMismatch {
        /// Map the store belongs to.
        map_id: MapId,
        /// Quality recorded in the existing store.
        existing: ImageQuality,
        /// Quality that was requested.
        requested: ImageQuality,
    },

    /// The store could not be created, read or written.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The network failed while resolving marker icons.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The download was canceled.
    #[error("download canceled")]
    Canceled,

    /// No store is registered for the map.
    #[error("no offline store for '{0}'")]
    NotFound(MapId),

    /// The store belongs to the active download.
    #[error("store for '{0}' is in use by the active download")]
    StoreInUse(MapId),

    /// A blocking store task failed to run.
    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl DownloadError {
    /// Returns true if the download ended because it was canceled.
    #[must_use]
    pub const fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}
