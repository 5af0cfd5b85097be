//! Shared claim-once cursor over a job's URL set.

use std::sync::atomic::{AtomicU64, Ordering};

use offmap_fetch::TileUrlGenerator;
use offmap_types::{ImageQuality, MapId};
use parking_lot::Mutex;

/// A URL handed to exactly one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ClaimedUrl {
    pub(crate) index: u64,
    pub(crate) url: String,
}

/// The job's URLs: static URLs first, then generated tile URLs.
///
/// Workers claim indices atomically. A worker interrupted by suspension
/// hands its index back with [`release`](Self::release) and the next claim
/// picks it up before advancing.
#[derive(Debug)]
pub(crate) struct UrlCursor {
    static_urls: Vec<String>,
    tiles: TileUrlGenerator,
    map_id: MapId,
    quality: ImageQuality,
    total: u64,
    next: AtomicU64,
    released: Mutex<Vec<u64>>,
}

impl UrlCursor {
    pub(crate) fn new(
        static_urls: Vec<String>,
        tiles: TileUrlGenerator,
        map_id: MapId,
        quality: ImageQuality,
    ) -> Self {
        let total = static_urls.len() as u64 + tiles.count();
        Self {
            static_urls,
            tiles,
            map_id,
            quality,
            total,
            next: AtomicU64::new(0),
            released: Mutex::new(Vec::new()),
        }
    }

    /// Total number of URLs.
    pub(crate) const fn total(&self) -> u64 {
        self.total
    }

    pub(crate) fn url_at(&self, index: u64) -> Option<String> {
        let static_len = self.static_urls.len() as u64;
        if index < static_len {
            self.static_urls.get(usize::try_from(index).ok()?).cloned()
        } else {
            self.tiles
                .url_at(&self.map_id, self.quality, index - static_len)
        }
    }

    /// Claims the next unprocessed URL, or `None` once every URL is taken.
    pub(crate) fn claim(&self) -> Option<ClaimedUrl> {
        let index = match self.released.lock().pop() {
            Some(index) => index,
            None => {
                let index = self.next.fetch_add(1, Ordering::SeqCst);
                if index >= self.total {
                    // Keep the counter pinned so repeated claims cannot wrap.
                    self.next.store(self.total, Ordering::SeqCst);
                    return None;
                }
                index
            }
        };
        let url = self.url_at(index)?;
        Some(ClaimedUrl { index, url })
    }

    /// Returns an unprocessed claim to the cursor.
    pub(crate) fn release(&self, index: u64) {
        self.released.lock().push(index);
    }
}
