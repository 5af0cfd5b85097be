//! Tile command implementation.
//!
//! This module reads one tile back through the offline tile reader, without
//! touching the network.

use std::path::PathBuf;

use anyhow::{Context, Result};
use offmap_lib::{MapId, TileCoord};

/// Export one tile of a map's offline store to a file.
pub(crate) fn export_tile(
    data_dir: Option<PathBuf>,
    map_id: &str,
    z: u8,
    x: u32,
    y: u32,
    output: Option<PathBuf>,
) -> Result<()> {
    let manager = super::open_manager(super::config(data_dir))?;
    let map_id = MapId::from(map_id);
    let store = manager
        .get_database(&map_id)
        .with_context(|| format!("No offline store for map: {map_id}"))?;
    let suffix = store
        .identity()
        .map_or("png", |identity| identity.image_quality.tile_suffix());

    let tile = TileCoord::new(z, x, y);
    let data = manager
        .tile_reader(&[map_id.clone()])
        .tile(tile)
        .with_context(|| format!("Tile {tile} is not stored for {map_id}"))?;

    let output = output.unwrap_or_else(|| PathBuf::from(format!("{z}-{x}-{y}.{suffix}")));
    std::fs::write(&output, &data)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("Wrote {} bytes to {}", data.len(), output.display());
    Ok(())
}
