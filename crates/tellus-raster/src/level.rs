//! One resolution level of a raster pyramid.

use tellus_math::GeodeticExtent;

use crate::tile::{RasterTile, RasterTileIdentifier};

/// A tile together with the sub-rectangle of it that overlaps a query.
///
/// The bounds are local post indices within the tile, already clamped to
/// `[0, posts_per_tile - 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RasterTileRegion {
    pub tile: RasterTile,
    pub west: i64,
    pub south: i64,
    pub east: i64,
    pub north: i64,
}

impl RasterTileRegion {
    /// Width of the overlapping region in posts.
    pub fn width(&self) -> i64 {
        self.east - self.west + 1
    }

    /// Height of the overlapping region in posts.
    pub fn height(&self) -> i64 {
        self.north - self.south + 1
    }
}

/// One resolution level of a raster pyramid.
///
/// Level 0 is the coarsest; post spacing halves with each finer level. Posts
/// are indexed west-to-east and south-to-north, with index 0 at the extent's
/// southwest corner.
#[derive(Clone, Debug)]
pub struct RasterLevel {
    level: usize,
    extent: GeodeticExtent,
    longitude_posts: i64,
    latitude_posts: i64,
    longitude_posts_per_tile: i64,
    latitude_posts_per_tile: i64,
    post_delta_longitude: f64,
    post_delta_latitude: f64,
}

impl RasterLevel {
    /// Create a level covering `extent` with the given post counts.
    ///
    /// # Panics
    ///
    /// Panics if any post count is less than two posts total or less than
    /// one post per tile.
    pub fn new(
        level: usize,
        extent: GeodeticExtent,
        longitude_posts: i64,
        latitude_posts: i64,
        longitude_posts_per_tile: i64,
        latitude_posts_per_tile: i64,
    ) -> Self {
        assert!(
            longitude_posts > 1 && latitude_posts > 1,
            "a raster level needs at least two posts per axis"
        );
        assert!(
            longitude_posts_per_tile > 0 && latitude_posts_per_tile > 0,
            "tile size must be at least one post"
        );
        Self {
            level,
            extent,
            longitude_posts,
            latitude_posts,
            longitude_posts_per_tile,
            latitude_posts_per_tile,
            post_delta_longitude: extent.width() / (longitude_posts - 1) as f64,
            post_delta_latitude: extent.height() / (latitude_posts - 1) as f64,
        }
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn extent(&self) -> GeodeticExtent {
        self.extent
    }

    pub fn longitude_posts(&self) -> i64 {
        self.longitude_posts
    }

    pub fn latitude_posts(&self) -> i64 {
        self.latitude_posts
    }

    pub fn longitude_posts_per_tile(&self) -> i64 {
        self.longitude_posts_per_tile
    }

    pub fn latitude_posts_per_tile(&self) -> i64 {
        self.latitude_posts_per_tile
    }

    /// Post spacing in degrees of longitude.
    pub fn post_delta_longitude(&self) -> f64 {
        self.post_delta_longitude
    }

    /// Post spacing in degrees of latitude.
    pub fn post_delta_latitude(&self) -> f64 {
        self.post_delta_latitude
    }

    /// Fractional post index of a longitude in degrees.
    pub fn longitude_to_index(&self, longitude: f64) -> f64 {
        (longitude - self.extent.west()) / self.post_delta_longitude
    }

    /// Fractional post index of a latitude in degrees.
    pub fn latitude_to_index(&self, latitude: f64) -> f64 {
        (latitude - self.extent.south()) / self.post_delta_latitude
    }

    /// Longitude in degrees of a post index.
    pub fn index_to_longitude(&self, longitude_index: i64) -> f64 {
        self.extent.west() + longitude_index as f64 * self.post_delta_longitude
    }

    /// Latitude in degrees of a post index.
    pub fn index_to_latitude(&self, latitude_index: i64) -> f64 {
        self.extent.south() + latitude_index as f64 * self.post_delta_latitude
    }

    /// Tile metadata for an identifier at this level.
    pub fn tile(&self, identifier: RasterTileIdentifier) -> RasterTile {
        debug_assert_eq!(identifier.level, self.level);
        RasterTile::new(
            identifier,
            self.longitude_posts_per_tile,
            self.latitude_posts_per_tile,
            self.longitude_posts,
            self.latitude_posts,
        )
    }

    /// Enumerate the tiles covering a post-index rectangle, with the
    /// sub-region of each tile that overlaps the query.
    ///
    /// Bounds are inclusive and may be negative; tile indices use floor
    /// division so the grid stays continuous across the origin. The returned
    /// regions tile the query exactly: no gaps, no overlaps, ordered
    /// south-to-north then west-to-east.
    ///
    /// # Panics
    ///
    /// Panics if `west > east` or `south > north`.
    pub fn tiles_in_extent(
        &self,
        west: i64,
        south: i64,
        east: i64,
        north: i64,
    ) -> Vec<RasterTileRegion> {
        assert!(
            west <= east && south <= north,
            "degenerate query extent ({west}, {south})..({east}, {north})"
        );

        let tile_x_start = west.div_euclid(self.longitude_posts_per_tile);
        let tile_x_stop = east.div_euclid(self.longitude_posts_per_tile);
        let tile_y_start = south.div_euclid(self.latitude_posts_per_tile);
        let tile_y_stop = north.div_euclid(self.latitude_posts_per_tile);

        let tile_width = (tile_x_stop - tile_x_start + 1) as usize;
        let tile_height = (tile_y_stop - tile_y_start + 1) as usize;
        let mut result = Vec::with_capacity(tile_width * tile_height);

        for tile_y in tile_y_start..=tile_y_stop {
            let tile_y_origin = tile_y * self.latitude_posts_per_tile;
            let current_south = (south - tile_y_origin).max(0);
            let current_north = (north - tile_y_origin).min(self.latitude_posts_per_tile - 1);

            for tile_x in tile_x_start..=tile_x_stop {
                let tile_x_origin = tile_x * self.longitude_posts_per_tile;
                let current_west = (west - tile_x_origin).max(0);
                let current_east = (east - tile_x_origin).min(self.longitude_posts_per_tile - 1);

                let tile = self.tile(RasterTileIdentifier::new(self.level, tile_x, tile_y));
                result.push(RasterTileRegion {
                    tile,
                    west: current_west,
                    south: current_south,
                    east: current_east,
                    north: current_north,
                });
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn test_level() -> RasterLevel {
        // Two-degree posts: 18x9 tiles of 10x10 posts plus the closing post.
        RasterLevel::new(0, GeodeticExtent::whole_globe(), 181, 91, 10, 10)
    }

    #[test]
    fn test_post_spacing() {
        let level = test_level();
        assert!((level.post_delta_longitude() - 2.0).abs() < 1e-12);
        assert!((level.post_delta_latitude() - 2.0).abs() < 1e-12);
    }

    /// Coordinate -> index -> coordinate reproduces the input to within one
    /// post spacing.
    #[test]
    fn test_index_round_trip_within_one_post() {
        let level = test_level();
        for &longitude in &[-180.0, -179.3, -0.5, 0.0, 13.7, 179.99] {
            let index = level.longitude_to_index(longitude);
            let back = level.index_to_longitude(index.floor() as i64);
            assert!(
                (back - longitude).abs() <= level.post_delta_longitude(),
                "longitude {longitude} -> index {index} -> {back}"
            );
        }
        for &latitude in &[-90.0, -45.2, 0.0, 33.1, 89.9] {
            let index = level.latitude_to_index(latitude);
            let back = level.index_to_latitude(index.floor() as i64);
            assert!(
                (back - latitude).abs() <= level.post_delta_latitude(),
                "latitude {latitude} -> index {index} -> {back}"
            );
        }
    }

    #[test]
    fn test_single_tile_query() {
        let level = test_level();
        let regions = level.tiles_in_extent(2, 3, 7, 8);
        assert_eq!(regions.len(), 1);
        let r = regions[0];
        assert_eq!(r.tile.identifier(), RasterTileIdentifier::new(0, 0, 0));
        assert_eq!((r.west, r.south, r.east, r.north), (2, 3, 7, 8));
    }

    /// The union of local sub-regions covers the query exactly: every post in
    /// the query appears in exactly one region.
    #[test]
    fn test_tiles_in_extent_covers_exactly() {
        let level = test_level();
        let (west, south, east, north) = (-17_i64, -4_i64, 23_i64, 12_i64);
        let regions = level.tiles_in_extent(west, south, east, north);

        let mut seen = HashSet::new();
        for r in &regions {
            for y in r.south..=r.north {
                for x in r.west..=r.east {
                    let global = (r.tile.west() + x, r.tile.south() + y);
                    assert!(seen.insert(global), "post {global:?} covered twice");
                }
            }
        }

        let expected = ((east - west + 1) * (north - south + 1)) as usize;
        assert_eq!(seen.len(), expected, "gaps in tile coverage");
        for y in south..=north {
            for x in west..=east {
                assert!(seen.contains(&(x, y)), "post ({x}, {y}) not covered");
            }
        }
    }

    /// Negative post indices use floor division, keeping tile indexing
    /// continuous across the origin.
    #[test]
    fn test_negative_indices_floor_division() {
        let level = test_level();
        let regions = level.tiles_in_extent(-1, -1, 0, 0);
        assert_eq!(regions.len(), 4);
        let ids: Vec<_> = regions.iter().map(|r| r.tile.identifier()).collect();
        assert!(ids.contains(&RasterTileIdentifier::new(0, -1, -1)));
        assert!(ids.contains(&RasterTileIdentifier::new(0, 0, -1)));
        assert!(ids.contains(&RasterTileIdentifier::new(0, -1, 0)));
        assert!(ids.contains(&RasterTileIdentifier::new(0, 0, 0)));
        // The corner post of the (-1, -1) tile.
        let sw = regions
            .iter()
            .find(|r| r.tile.identifier() == RasterTileIdentifier::new(0, -1, -1))
            .unwrap();
        assert_eq!((sw.west, sw.south, sw.east, sw.north), (9, 9, 9, 9));
    }

    /// A query wider than the level still enumerates every intersecting tile.
    #[test]
    fn test_oversized_query_enumerates_all_tiles() {
        let level = test_level();
        let regions = level.tiles_in_extent(0, 0, level.longitude_posts() - 1, 9);
        // 181 posts at 10 posts per tile: 19 tile columns, 1 row.
        assert_eq!(regions.len(), 19);
    }

    #[test]
    #[should_panic(expected = "degenerate query extent")]
    fn test_inverted_query_panics() {
        test_level().tiles_in_extent(5, 0, 4, 0);
    }
}
