//! Process-wide set of initialized stores.

use std::collections::BTreeMap;
use std::sync::Arc;

use offmap_types::MapId;
use parking_lot::RwLock;

use crate::directory::StoreDirectory;
use crate::error::{Result, StoreError};
use crate::store::ResourceStore;

/// Initialized stores keyed by map id, at most one per map.
///
/// Populated once from disk, then changed only by [`insert`](Self::insert)
/// when a download completes and [`remove`](Self::remove) when a store is
/// deleted.
#[derive(Debug, Default)]
pub struct StoreRegistry {
    stores: RwLock<BTreeMap<MapId, Arc<ResourceStore>>>,
}

impl StoreRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry from every initialized store in `directory`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub fn discover(directory: &StoreDirectory) -> Result<Self> {
        let registry = Self::new();
        for store in directory.discover()? {
            if let Some(previous) = registry.insert(Arc::new(store))? {
                tracing::warn!(
                    path = %previous.path().display(),
                    "duplicate store for map, keeping the later file"
                );
            }
        }
        tracing::debug!(stores = registry.len(), root = %directory.root().display(), "discovered stores");
        Ok(registry)
    }

    /// Adds `store`, returning the store it replaced for the same map.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotInitialized`] if the store has no identity.
    pub fn insert(&self, store: Arc<ResourceStore>) -> Result<Option<Arc<ResourceStore>>> {
        let map_id = store
            .map_id()
            .ok_or_else(|| StoreError::NotInitialized(store.path().to_path_buf()))?;
        Ok(self.stores.write().insert(map_id, store))
    }

    /// Returns the store for `map_id`.
    #[must_use]
    pub fn get(&self, map_id: &MapId) -> Option<Arc<ResourceStore>> {
        self.stores.read().get(map_id).cloned()
    }

    /// Returns true if a store is registered for `map_id`.
    #[must_use]
    pub fn contains(&self, map_id: &MapId) -> bool {
        self.stores.read().contains_key(map_id)
    }

    /// Removes and returns the store for `map_id`.
    pub fn remove(&self, map_id: &MapId) -> Option<Arc<ResourceStore>> {
        self.stores.write().remove(map_id)
    }

    /// Returns every registered store ordered by map id.
    #[must_use]
    pub fn list(&self) -> Vec<Arc<ResourceStore>> {
        self.stores.read().values().cloned().collect()
    }

    /// Returns the number of registered stores.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stores.read().len()
    }

    /// Returns true if no store is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stores.read().is_empty()
    }
}
