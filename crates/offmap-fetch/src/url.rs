//! Map resource URL construction.

use offmap_types::{ImageQuality, MapId, TileCoord};

/// Default base URL of the map API.
pub const DEFAULT_BASE_URL: &str = "https://api.mapbox.com/v4";

/// Renders every URL the downloader and the offline reader need.
///
/// Tile URLs double as store keys, so the same `Endpoints` must be used to
/// download a map and to read it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base_url: String,
}

impl Endpoints {
    /// Creates endpoints rooted at `base_url` (a trailing `/` is ignored).
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds the URL of one tile.
    ///
    /// URL format: `{base}/{map_id}/{z}/{x}/{y}.{suffix}`
    ///
    /// # Example
    ///
    /// ```
    /// use offmap_fetch::url::Endpoints;
    /// use offmap_types::{ImageQuality, MapId, TileCoord};
    ///
    /// let endpoints = Endpoints::default();
    /// let url = endpoints.tile_url(&MapId::from("acme.map"), ImageQuality::Jpeg80, TileCoord::new(3, 2, 5));
    /// assert_eq!(url, "https://api.mapbox.com/v4/acme.map/3/2/5.jpg80");
    /// ```
    #[must_use]
    pub fn tile_url(&self, map_id: &MapId, quality: ImageQuality, tile: TileCoord) -> String {
        format!(
            "{}/{}/{}/{}/{}.{}",
            self.base_url,
            map_id,
            tile.z,
            tile.x,
            tile.y,
            quality.tile_suffix()
        )
    }

    /// Builds the URL of the map's TileJSON metadata document.
    #[must_use]
    pub fn metadata_url(&self, map_id: &MapId) -> String {
        format!("{}/{}.json?secure", self.base_url, map_id)
    }

    /// Builds the URL of the map's marker feature collection, stored offline.
    #[must_use]
    pub fn features_url(&self, map_id: &MapId) -> String {
        format!("{}/{}/features.json", self.base_url, map_id)
    }

    /// Builds the URL of the GeoJSON document parsed for marker icons.
    #[must_use]
    pub fn markers_geojson_url(&self, map_id: &MapId) -> String {
        format!("{}/{}/markers.geojson", self.base_url, map_id)
    }

    /// Builds the URL of a marker icon.
    ///
    /// Only the first letter of `size` is used (`s`, `m` or `l`), and a
    /// leading `#` is stripped from `color`. Returns `None` if any part is
    /// empty.
    #[must_use]
    pub fn marker_icon_url(&self, size: &str, symbol: &str, color: &str) -> Option<String> {
        let size = size.trim().chars().next()?.to_ascii_lowercase();
        let symbol = symbol.trim();
        let color = color.trim().trim_start_matches('#');
        if symbol.is_empty() || color.is_empty() {
            return None;
        }
        Some(format!(
            "{}/marker/pin-{}-{}+{}.png",
            self.base_url, size, symbol, color
        ))
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
