//! Download event listeners.

use std::sync::Arc;

use offmap_fetch::TransportError;
use offmap_store::{ResourceStore, StoreError};
use parking_lot::RwLock;

use crate::{DownloadError, JobState};

/// Observer of download events.
///
/// Every method has a no-op default. Callbacks run on the task that produced
/// the event, never while the manager holds a lock, so they may call back
/// into the manager. Progress events from different workers may interleave.
pub trait DownloadListener: Send + Sync {
    /// The manager moved to `state`.
    fn on_state_changed(&self, _state: JobState) {}

    /// The job's URL set was resolved to `expected` resources.
    fn on_initial_count(&self, _expected: u64) {}

    /// `completed` of `expected` resources have been processed.
    fn on_progress(&self, _completed: u64, _expected: u64) {}

    /// Fetching `url` failed before a response arrived.
    fn on_network_error(&self, _url: &str, _error: &TransportError) {}

    /// `url` was answered with a non-2xx `status`.
    fn on_http_status_error(&self, _url: &str, _status: u16) {}

    /// Reading or writing `url` in the store failed.
    fn on_storage_error(&self, _url: &str, _error: &StoreError) {}

    /// The job finished with a registered store, or failed.
    fn on_complete(&self, _result: Result<&Arc<ResourceStore>, &DownloadError>) {}
}

/// Registered listeners.
///
/// Notification copies the current list and calls it outside the lock.
#[derive(Default)]
pub(crate) struct ListenerSet {
    listeners: RwLock<Vec<Arc<dyn DownloadListener>>>,
}

impl ListenerSet {
    pub(crate) fn add(&self, listener: Arc<dyn DownloadListener>) {
        self.listeners.write().push(listener);
    }

    pub(crate) fn remove(&self, listener: &Arc<dyn DownloadListener>) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|l| !Arc::ptr_eq(l, listener));
        listeners.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub(crate) fn notify(&self, event: impl Fn(&dyn DownloadListener)) {
        let snapshot = self.listeners.read().clone();
        for listener in &snapshot {
            event(listener.as_ref());
        }
    }
}

impl std::fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("listeners", &self.len())
            .finish()
    }
}
