//! Progress tracking shared by a job's workers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use offmap_store::ResourceStore;
use parking_lot::RwLock;

use crate::JobId;
use crate::cursor::UrlCursor;

/// Thread-safe progress of one job.
///
/// Holds the job's cursor and target store, the completion counter every
/// worker increments, and the flag that lets exactly one caller finalize.
#[derive(Debug)]
pub(crate) struct JobProgress {
    job_id: JobId,
    store: Arc<ResourceStore>,
    cursor: UrlCursor,
    completed: AtomicU64,
    finalized: AtomicBool,
    writes: WriteGate,
}

/// Admits store writes until closed.
///
/// Closing waits for writes already admitted, so none lands afterwards.
#[derive(Debug)]
pub(crate) struct WriteGate {
    open: RwLock<bool>,
}

impl WriteGate {
    pub(crate) const fn new() -> Self {
        Self {
            open: RwLock::new(true),
        }
    }

    /// Runs `write` unless the gate is closed.
    pub(crate) fn admit<T>(&self, write: impl FnOnce() -> T) -> Option<T> {
        let open = self.open.read();
        if !*open {
            return None;
        }
        Some(write())
    }

    /// Shuts the gate, blocking until admitted writes finish.
    pub(crate) fn close(&self) {
        *self.open.write() = false;
    }
}

impl JobProgress {
    pub(crate) const fn new(job_id: JobId, store: Arc<ResourceStore>, cursor: UrlCursor) -> Self {
        Self {
            job_id,
            store,
            cursor,
            completed: AtomicU64::new(0),
            finalized: AtomicBool::new(false),
            writes: WriteGate::new(),
        }
    }

    pub(crate) const fn job_id(&self) -> JobId {
        self.job_id
    }

    pub(crate) const fn store(&self) -> &Arc<ResourceStore> {
        &self.store
    }

    pub(crate) const fn writes(&self) -> &WriteGate {
        &self.writes
    }

    pub(crate) const fn cursor(&self) -> &UrlCursor {
        &self.cursor
    }

    pub(crate) const fn expected(&self) -> u64 {
        self.cursor.total()
    }

    pub(crate) fn completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    /// Counts one processed URL and returns the new total.
    pub(crate) fn record_processed(&self) -> u64 {
        self.completed.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Returns true if every URL has been processed.
    pub(crate) fn is_complete(&self) -> bool {
        self.completed() >= self.expected()
    }

    /// Claims the right to finalize; returns true for exactly one caller.
    pub(crate) fn try_finalize(&self) -> bool {
        self.finalized
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}
