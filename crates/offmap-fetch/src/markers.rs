//! Marker icon discovery from a map's GeoJSON marker document.

use std::collections::BTreeSet;

use offmap_types::MapId;
use serde_json::Value;

use crate::{Transport, TransportError, url::Endpoints};

/// Outcome of fetching and parsing the marker document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerPrefetch {
    /// Unique icon URLs referenced by point features.
    pub icon_urls: BTreeSet<String>,
    /// HTTP status of the marker document response.
    pub status: u16,
    /// URL the marker document was fetched from.
    pub source_url: String,
}

impl MarkerPrefetch {
    /// Returns true if the marker document was served with a 2xx status.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Extracts marker icon URLs from a GeoJSON feature collection.
///
/// Only `Point` features whose `marker-size`, `marker-color` and
/// `marker-symbol` properties are all non-empty strings contribute an icon.
/// Features missing any of those are skipped.
///
/// # Errors
///
/// Returns an error only if `body` is not valid JSON.
pub fn parse_marker_icon_urls(
    endpoints: &Endpoints,
    body: &[u8],
) -> Result<BTreeSet<String>, serde_json::Error> {
    let document: Value = serde_json::from_slice(body)?;

    let Some(features) = document.get("features").and_then(Value::as_array) else {
        return Ok(BTreeSet::new());
    };

    let urls = features
        .iter()
        .filter(|feature| {
            feature
                .pointer("/geometry/type")
                .and_then(Value::as_str)
                .is_some_and(|kind| kind == "Point")
        })
        .filter_map(|feature| {
            let properties = feature.get("properties")?;
            let prop = |name: &str| properties.get(name).and_then(Value::as_str);
            endpoints.marker_icon_url(
                prop("marker-size")?,
                prop("marker-symbol")?,
                prop("marker-color")?,
            )
        })
        .collect();

    Ok(urls)
}

/// Fetches the marker document for `map_id` and resolves its icon URLs.
///
/// A non-2xx response or an unparseable body yields an empty icon set; the
/// caller decides how to report the status.
///
/// # Errors
///
/// Returns an error if the transport could not obtain a response.
pub async fn prefetch_marker_icons(
    transport: &dyn Transport,
    endpoints: &Endpoints,
    map_id: &MapId,
) -> Result<MarkerPrefetch, TransportError> {
    let source_url = endpoints.markers_geojson_url(map_id);
    let response = transport.fetch(&source_url).await?;

    let icon_urls = if response.is_success() {
        parse_marker_icon_urls(endpoints, &response.body).unwrap_or_else(|e| {
            tracing::warn!(url = %source_url, error = %e, "malformed marker document");
            BTreeSet::new()
        })
    } else {
        BTreeSet::new()
    };

    tracing::debug!(
        url = %source_url,
        status = response.status,
        icons = icon_urls.len(),
        "resolved marker icons"
    );

    Ok(MarkerPrefetch {
        icon_urls,
        status: response.status,
        source_url,
    })
}
