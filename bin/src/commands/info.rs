//! Info command implementation.
//!
//! This module shows the identity, location and contents of one offline
//! store.

use std::path::PathBuf;

use anyhow::{Context, Result};
use offmap_lib::MapId;

use crate::display::{format_bytes, yes_no};

/// Show details of the offline store for a map.
pub(crate) fn show_info(data_dir: Option<PathBuf>, map_id: &str) -> Result<()> {
    let manager = super::open_manager(super::config(data_dir))?;
    let map_id = MapId::from(map_id);
    let store = manager
        .get_database(&map_id)
        .with_context(|| format!("No offline store for map: {map_id}"))?;
    let identity = store
        .identity()
        .with_context(|| format!("Store for {map_id} has no identity"))?;

    let resources = store.resource_count().context("Failed to count resources")?;
    let size = std::fs::metadata(store.path()).map_or(0, |meta| meta.len());

    println!("Map:        {}", identity.map_id);
    println!("Store ID:   {}", identity.unique_id);
    println!("Path:       {}", store.path().display());
    println!("Quality:    {}", identity.image_quality);
    println!("Metadata:   {}", yes_no(identity.includes_metadata));
    println!("Markers:    {}", yes_no(identity.includes_markers));
    println!("Resources:  {resources}");
    println!("Size:       {}", format_bytes(size));

    Ok(())
}
