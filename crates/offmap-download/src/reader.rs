//! Renderer-side tile lookup across finished stores.

use std::sync::Arc;

use offmap_fetch::url::Endpoints;
use offmap_store::ResourceStore;
use offmap_types::TileCoord;

/// Serves tiles from one or more offline stores without the network.
///
/// Each store is asked for the tile URL of its own map id and image quality;
/// the first non-empty payload wins. Missing records and unavailable stores
/// are skipped.
#[derive(Debug, Clone)]
pub struct OfflineTileReader {
    endpoints: Endpoints,
    stores: Vec<Arc<ResourceStore>>,
}

impl OfflineTileReader {
    /// Creates a reader over `stores`, searched in order.
    #[must_use]
    pub const fn new(endpoints: Endpoints, stores: Vec<Arc<ResourceStore>>) -> Self {
        Self { endpoints, stores }
    }

    /// Returns the stores searched by this reader.
    #[must_use]
    pub fn stores(&self) -> &[Arc<ResourceStore>] {
        &self.stores
    }

    /// Returns the payload of `tile`, or `None` if no store has it.
    #[must_use]
    pub fn tile(&self, tile: TileCoord) -> Option<Vec<u8>> {
        self.stores.iter().find_map(|store| {
            let identity = store.identity()?;
            let url = self
                .endpoints
                .tile_url(&identity.map_id, identity.image_quality, tile);
            lookup(store, &url)
        })
    }

    /// Returns the payload stored for an arbitrary resource URL.
    #[must_use]
    pub fn resource(&self, url: &str) -> Option<Vec<u8>> {
        self.stores.iter().find_map(|store| lookup(store, url))
    }
}

fn lookup(store: &ResourceStore, url: &str) -> Option<Vec<u8>> {
    match store.get(url) {
        Ok(data) => data.filter(|data| !data.is_empty()),
        Err(e) => {
            tracing::debug!(url, path = %store.path().display(), error = %e, "offline lookup failed");
            None
        }
    }
}
