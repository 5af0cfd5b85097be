//! Indexed tile URL sequence for a bounding box and zoom range.

use offmap_types::{
    GeoBounds, ImageQuality, MapId, TileCoord, ZoomRange, lat_to_tile_y, lon_to_tile_x,
};

use crate::url::Endpoints;

/// Tile rectangle covering the bounds at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LevelSpan {
    zoom: u8,
    min_x: u32,
    min_y: u32,
    cols: u64,
    rows: u64,
    /// Flattened index of this level's first tile.
    offset: u64,
}

impl LevelSpan {
    const fn len(&self) -> u64 {
        self.cols * self.rows
    }
}

/// A finite, restartable sequence of tile URLs.
///
/// Nothing is materialized: [`count`](Self::count) is computed from the
/// tile grid, and [`url_at`](Self::url_at) maps a flattened index straight
/// back to its tile. Order is zoom outermost, then row, then column.
#[derive(Debug, Clone)]
pub struct TileUrlGenerator {
    endpoints: Endpoints,
    levels: Vec<LevelSpan>,
    count: u64,
}

impl TileUrlGenerator {
    /// Creates a generator covering `bounds` at every level of `zooms`.
    #[must_use]
    pub fn new(endpoints: Endpoints, bounds: &GeoBounds, zooms: ZoomRange) -> Self {
        let mut levels = Vec::with_capacity(usize::from(zooms.max - zooms.min) + 1);
        let mut offset = 0u64;

        for zoom in zooms.levels() {
            let min_x = lon_to_tile_x(bounds.min_lon, zoom);
            let max_x = lon_to_tile_x(bounds.max_lon, zoom);
            // Rows grow southwards, so the northern edge gives the first row.
            let min_y = lat_to_tile_y(bounds.max_lat, zoom);
            let max_y = lat_to_tile_y(bounds.min_lat, zoom);

            let span = LevelSpan {
                zoom,
                min_x,
                min_y,
                cols: u64::from(max_x - min_x) + 1,
                rows: u64::from(max_y - min_y) + 1,
                offset,
            };
            offset += span.len();
            levels.push(span);
        }

        Self {
            endpoints,
            levels,
            count: offset,
        }
    }

    /// Returns the total number of tiles across all zoom levels.
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Returns true if the sequence is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the endpoints used to render URLs.
    #[must_use]
    pub const fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Maps a flattened index to its tile, or `None` past the end.
    #[must_use]
    pub fn tile_at(&self, index: u64) -> Option<TileCoord> {
        if index >= self.count {
            return None;
        }
        let level_idx = self
            .levels
            .partition_point(|level| level.offset + level.len() <= index);
        let level = self.levels.get(level_idx)?;

        let local = index - level.offset;
        let row = local / level.cols;
        let col = local % level.cols;

        Some(TileCoord::new(
            level.zoom,
            level.min_x + col as u32,
            level.min_y + row as u32,
        ))
    }

    /// Renders the URL of the tile at `index`, or `None` past the end.
    #[must_use]
    pub fn url_at(&self, map_id: &MapId, quality: ImageQuality, index: u64) -> Option<String> {
        self.tile_at(index)
            .map(|tile| self.endpoints.tile_url(map_id, quality, tile))
    }

    /// Returns an iterator over every tile in sequence order.
    pub fn tiles(&self) -> impl Iterator<Item = TileCoord> + '_ {
        (0..self.count).filter_map(|index| self.tile_at(index))
    }
}
