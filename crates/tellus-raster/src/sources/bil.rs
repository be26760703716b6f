//! WMS-style 16-bit elevation source.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tellus_math::GeodeticExtent;
use tracing::debug;

use crate::error::RasterError;
use crate::fetch::{DiskCache, TileFetcher};
use crate::payload::{TileData, TilePayload};
use crate::source::{RasterPyramid, RasterSource, RasterSourceSpec};
use crate::tile::RasterTileIdentifier;

const LEVEL_COUNT: usize = 12;
const TILE_POSTS: i64 = 150;
const LEVEL_ZERO_DELTA_DEGREES: f64 = 20.0;

/// Global elevation pyramid served as raw 16-bit signed samples (`bil16`)
/// from a WMS-style endpoint, one bounding-box query per 150x150 tile.
///
/// Remote rows run north to south; decode flips them so payloads follow the
/// engine-wide south-to-north convention.
pub struct BilElevationSource {
    name: String,
    base_url: String,
    pyramid: RasterPyramid,
    fetcher: Arc<dyn TileFetcher>,
    disk_cache: DiskCache,
    tiles_loaded: AtomicU64,
}

impl BilElevationSource {
    /// Create a source reading from `base_url` (a WMS GetMap prefix ending
    /// just before the `bbox` parameter), caching fetched tiles below
    /// `cache_root/<name>`.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        fetcher: Arc<dyn TileFetcher>,
        cache_root: impl Into<PathBuf>,
    ) -> Self {
        let name = name.into();
        let spec = RasterSourceSpec {
            extent: GeodeticExtent::whole_globe(),
            level_count: LEVEL_COUNT,
            tile_longitude_posts: TILE_POSTS,
            tile_latitude_posts: TILE_POSTS,
            level_zero_delta_longitude: LEVEL_ZERO_DELTA_DEGREES,
            level_zero_delta_latitude: LEVEL_ZERO_DELTA_DEGREES,
        };
        let disk_cache = DiskCache::new(cache_root.into().join(&name));
        Self {
            name,
            base_url: base_url.into(),
            pyramid: spec.build(),
            fetcher,
            disk_cache,
            tiles_loaded: AtomicU64::new(0),
        }
    }

    /// Tile size in posts per axis.
    pub fn tile_posts(&self) -> i64 {
        TILE_POSTS
    }

    /// Number of tiles fetched or read from disk so far.
    pub fn tiles_loaded(&self) -> u64 {
        self.tiles_loaded.load(Ordering::Relaxed)
    }

    /// Geographic query URL for one tile.
    fn tile_url(&self, identifier: RasterTileIdentifier) -> String {
        let divisor = (1u64 << identifier.level) as f64;
        let resolution = LEVEL_ZERO_DELTA_DEGREES / divisor;
        let extent = self.pyramid.extent();

        let west = extent.west() + resolution * identifier.x as f64;
        let east = extent.west() + resolution * (identifier.x + 1) as f64;
        let south = extent.south() + resolution * identifier.y as f64;
        let north = extent.south() + resolution * (identifier.y + 1) as f64;

        format!("{}&bbox={west:.11},{south:.11},{east:.11},{north:.11}&", self.base_url)
    }
}

impl RasterSource for BilElevationSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn pyramid(&self) -> &RasterPyramid {
        &self.pyramid
    }

    fn load_tile_payload(
        &self,
        identifier: RasterTileIdentifier,
    ) -> Result<TilePayload, RasterError> {
        let relative = PathBuf::from(format!(
            "{}/{}/{}.bil",
            identifier.level, identifier.y, identifier.x
        ));

        let url = self.tile_url(identifier);
        let bytes = self
            .disk_cache
            .get_or_fetch(&relative, || self.fetcher.fetch(&url))?;

        let count = self.tiles_loaded.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(tile = %identifier, count, "loaded elevation tile");

        let posts = (TILE_POSTS * TILE_POSTS) as usize;
        if bytes.len() != posts * 2 {
            return Err(RasterError::Malformed {
                id: identifier,
                reason: format!("expected {} bytes, got {}", posts * 2, bytes.len()),
            });
        }

        // Remote rows start at the northwest corner; re-order so the
        // southwest corner is the origin.
        let width = TILE_POSTS as usize;
        let height = TILE_POSTS as usize;
        let mut samples = Vec::with_capacity(posts);
        for row in (0..height).rev() {
            let row_offset = row * width * 2;
            for col in 0..width {
                let offset = row_offset + col * 2;
                let sample = i16::from_le_bytes([bytes[offset], bytes[offset + 1]]);
                samples.push(sample as f32);
            }
        }

        Ok(TilePayload::new(width, height, TileData::Height32F(samples)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MemoryTileFetcher;

    fn encode_north_to_south(width: usize, height: usize, f: impl Fn(usize, usize) -> i16) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(width * height * 2);
        for row in (0..height).rev() {
            for col in 0..width {
                bytes.extend_from_slice(&f(col, row).to_le_bytes());
            }
        }
        bytes
    }

    fn source_with_tile(identifier: RasterTileIdentifier, bytes: Vec<u8>) -> (BilElevationSource, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(MemoryTileFetcher::new());
        let source = BilElevationSource::new(
            "elevation",
            "http://elev?format=bil16",
            Arc::clone(&fetcher) as Arc<dyn TileFetcher>,
            dir.path(),
        );
        fetcher.insert(source.tile_url(identifier), bytes);
        (source, dir)
    }

    #[test]
    fn test_pyramid_geometry() {
        let (source, _dir) = source_with_tile(RasterTileIdentifier::new(0, 0, 0), Vec::new());
        assert_eq!(source.levels().len(), LEVEL_COUNT);
        assert_eq!(source.levels()[0].longitude_posts(), 18 * TILE_POSTS + 1);
    }

    /// Decoded rows are flipped to the south-to-north convention.
    #[test]
    fn test_payload_orientation_is_south_to_north() {
        let id = RasterTileIdentifier::new(0, 3, 2);
        // Sample value encodes its south-to-north row index.
        let bytes = encode_north_to_south(150, 150, |_, row| row as i16);
        let (source, _dir) = source_with_tile(id, bytes);

        let payload = source.load_tile_payload(id).unwrap();
        let heights = payload.heights().unwrap();
        assert_eq!(heights[0], 0.0, "first sample must be the southernmost row");
        assert_eq!(heights[149 * 150], 149.0, "last row must be the northernmost");
    }

    #[test]
    fn test_truncated_tile_is_malformed() {
        let id = RasterTileIdentifier::new(1, 0, 0);
        let (source, _dir) = source_with_tile(id, vec![0; 99]);
        assert!(matches!(
            source.load_tile_payload(id),
            Err(RasterError::Malformed { .. })
        ));
    }

    /// A second load reads the disk cache, not the fetcher.
    #[test]
    fn test_disk_cache_hit_skips_fetch() {
        let id = RasterTileIdentifier::new(0, 1, 1);
        let bytes = encode_north_to_south(150, 150, |_, _| 7);
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(MemoryTileFetcher::new());
        let source = BilElevationSource::new(
            "elevation",
            "http://elev?format=bil16",
            Arc::clone(&fetcher) as Arc<dyn TileFetcher>,
            dir.path(),
        );
        fetcher.insert(source.tile_url(id), bytes);

        source.load_tile_payload(id).unwrap();
        // Re-register with different content: the cache hit must win.
        fetcher.insert(source.tile_url(id), vec![0; 150 * 150 * 2]);
        let payload = source.load_tile_payload(id).unwrap();
        assert_eq!(payload.heights().unwrap()[0], 7.0);
    }

    #[test]
    fn test_fetch_failure_is_visible() {
        let dir = tempfile::tempdir().unwrap();
        let source = BilElevationSource::new(
            "elevation",
            "http://elev?format=bil16",
            Arc::new(MemoryTileFetcher::new()) as Arc<dyn TileFetcher>,
            dir.path(),
        );
        let result = source.load_tile_payload(RasterTileIdentifier::new(0, 0, 0));
        assert!(result.is_err());
    }
}
