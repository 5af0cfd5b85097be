//! List command implementation.
//!
//! This module lists the offline stores found in the data directory.

use std::path::PathBuf;

use anyhow::Result;

use crate::display::yes_no;

/// List offline stores with their identity and size.
pub(crate) fn list_stores(data_dir: Option<PathBuf>) -> Result<()> {
    let manager = super::open_manager(super::config(data_dir))?;
    let stores = manager.list_databases();

    if stores.is_empty() {
        println!("No offline stores found.");
        return Ok(());
    }

    println!(
        "{:<30} {:<8} {:<9} {:<8} {:>10}",
        "MAP ID", "QUALITY", "METADATA", "MARKERS", "RESOURCES"
    );
    println!("{}", "-".repeat(69));

    for store in &stores {
        let Some(identity) = store.identity() else {
            continue;
        };
        let resources = store
            .resource_count()
            .map_or_else(|_| "?".to_string(), |count| count.to_string());
        println!(
            "{:<30} {:<8} {:<9} {:<8} {:>10}",
            identity.map_id.as_str(),
            identity.image_quality.as_str(),
            yes_no(identity.includes_metadata),
            yes_no(identity.includes_markers),
            resources
        );
    }

    println!("\nTotal: {} stores", stores.len());
    Ok(())
}
