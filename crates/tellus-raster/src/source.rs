//! The raster source contract and pyramid construction.

use std::sync::Arc;

use dashmap::DashMap;
use tellus_math::GeodeticExtent;

use crate::error::RasterError;
use crate::level::RasterLevel;
use crate::payload::TilePayload;
use crate::tile::{RasterTile, RasterTileIdentifier};

/// Geometry of a raster pyramid: extent, level count, tile size, and the
/// post spacing of the coarsest level.
#[derive(Clone, Debug)]
pub struct RasterSourceSpec {
    pub extent: GeodeticExtent,
    pub level_count: usize,
    pub tile_longitude_posts: i64,
    pub tile_latitude_posts: i64,
    /// Degrees of longitude per tile at level zero.
    pub level_zero_delta_longitude: f64,
    /// Degrees of latitude per tile at level zero.
    pub level_zero_delta_latitude: f64,
}

impl RasterSourceSpec {
    /// Build the level pyramid. Post spacing at level L is the level-zero
    /// spacing divided by 2^L.
    ///
    /// # Panics
    ///
    /// Panics if the spec is degenerate (no levels, non-positive deltas or
    /// tile sizes).
    pub fn build(&self) -> RasterPyramid {
        assert!(self.level_count > 0, "a pyramid needs at least one level");
        assert!(
            self.level_zero_delta_longitude > 0.0 && self.level_zero_delta_latitude > 0.0,
            "level-zero deltas must be positive"
        );
        assert!(
            self.tile_longitude_posts > 0 && self.tile_latitude_posts > 0,
            "tile size must be at least one post"
        );

        let mut levels = Vec::with_capacity(self.level_count);
        let mut delta_longitude = self.level_zero_delta_longitude;
        let mut delta_latitude = self.level_zero_delta_latitude;

        for i in 0..self.level_count {
            let longitude_posts = (self.extent.width() / delta_longitude).round() as i64
                * self.tile_longitude_posts
                + 1;
            let latitude_posts = (self.extent.height() / delta_latitude).round() as i64
                * self.tile_latitude_posts
                + 1;
            levels.push(RasterLevel::new(
                i,
                self.extent,
                longitude_posts,
                latitude_posts,
                self.tile_longitude_posts,
                self.tile_latitude_posts,
            ));
            delta_longitude /= 2.0;
            delta_latitude /= 2.0;
        }

        RasterPyramid {
            extent: self.extent,
            levels,
            tiles: DashMap::new(),
        }
    }
}

/// The level stack of a source plus its tile-metadata registry.
///
/// Tile metadata is created lazily on first request and cached by
/// identifier; entries are immutable once created and the registry only
/// grows (metadata is a few dozen bytes per tile — payload residency is
/// bounded separately by [`TileCache`](crate::TileCache)).
pub struct RasterPyramid {
    extent: GeodeticExtent,
    levels: Vec<RasterLevel>,
    tiles: DashMap<RasterTileIdentifier, Arc<RasterTile>>,
}

impl RasterPyramid {
    pub fn extent(&self) -> GeodeticExtent {
        self.extent
    }

    pub fn levels(&self) -> &[RasterLevel] {
        &self.levels
    }

    /// The cached tile for an identifier, created and registered if absent.
    ///
    /// # Panics
    ///
    /// Panics if the identifier names a level outside the pyramid — a
    /// contract violation by the caller.
    pub fn get_tile(&self, identifier: RasterTileIdentifier) -> Arc<RasterTile> {
        let level = self
            .levels
            .get(identifier.level)
            .unwrap_or_else(|| panic!("no level {} in pyramid", identifier.level));
        Arc::clone(
            &self
                .tiles
                .entry(identifier)
                .or_insert_with(|| Arc::new(level.tile(identifier))),
        )
    }

    /// Number of registered tile metadata entries.
    pub fn registered_tiles(&self) -> usize {
        self.tiles.len()
    }
}

/// A multi-resolution raster pyramid with on-demand tile payload loading.
///
/// `load_tile_payload` performs the (possibly I/O-bound) fetch and decode
/// for one tile without touching the GPU, and fails visibly on fetch
/// errors: callers decide whether to retry or render coarser data. It is
/// synchronous; the render path goes through
/// [`AsyncTileLoader`](crate::AsyncTileLoader) instead.
pub trait RasterSource: Send + Sync {
    /// Short name, also the source's directory in the disk cache.
    fn name(&self) -> &str;

    /// The level stack and tile registry.
    fn pyramid(&self) -> &RasterPyramid;

    /// Fetch and decode one tile's payload.
    fn load_tile_payload(
        &self,
        identifier: RasterTileIdentifier,
    ) -> Result<TilePayload, RasterError>;

    /// The geographic bounds covered by this source, in degrees.
    fn extent(&self) -> GeodeticExtent {
        self.pyramid().extent()
    }

    /// Ordered levels, coarsest first.
    fn levels(&self) -> &[RasterLevel] {
        self.pyramid().levels()
    }

    /// The cached tile for an identifier, created if absent.
    fn get_tile(&self, identifier: RasterTileIdentifier) -> Arc<RasterTile> {
        self.pyramid().get_tile(identifier)
    }
}
