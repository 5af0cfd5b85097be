//! Remove command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use offmap_lib::MapId;

/// Delete the offline store for a map.
pub(crate) fn remove_store(data_dir: Option<PathBuf>, map_id: &str, quiet: bool) -> Result<()> {
    let manager = super::open_manager(super::config(data_dir))?;
    let map_id = MapId::from(map_id);
    manager
        .remove_database(&map_id)
        .with_context(|| format!("Failed to remove offline store for {map_id}"))?;

    if !quiet {
        println!("Removed offline store for {map_id}");
    }
    Ok(())
}
