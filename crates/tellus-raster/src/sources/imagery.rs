//! Slippy-map PNG imagery source.

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

const LEVEL_COUNT: usize = 16;
const TILE_POSTS: i64 = 512;
const LEVEL_ZERO_DELTA_DEGREES: f64 = 180.0;

/// Global imagery pyramid served as PNG tiles from a slippy-map style
/// endpoint (`<base>/<level>/<x>/<y>.png`).
///
/// The remote scheme numbers tile rows from the north, and decoded images
/// put row zero at the top; both flips are applied so payloads follow the
/// south-to-north convention.
pub struct WebImagerySource {
    name: String,
    base_url: String,
    pyramid: RasterPyramid,
    fetcher: Arc<dyn TileFetcher>,
    disk_cache: DiskCache,
    tiles_loaded: AtomicU64,
}

impl WebImagerySource {
    /// Create a source reading from `base_url` (the URL prefix before the
    /// `/<level>/<x>/<y>.png` path), caching fetched tiles below
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

    /// Remote URL for one tile. Remote rows are numbered from the north.
    fn tile_url(&self, identifier: RasterTileIdentifier) -> String {
        let flipped_y = (1i64 << identifier.level) - identifier.y - 1;
        format!(
            "{}/{}/{}/{}.png",
            self.base_url, identifier.level, identifier.x, flipped_y
        )
    }
}

impl RasterSource for WebImagerySource {
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
            "{}/{}/{}.png",
            identifier.level, identifier.y, identifier.x
        ));

        let url = self.tile_url(identifier);
        let bytes = self
            .disk_cache
            .get_or_fetch(&relative, || self.fetcher.fetch(&url))?;

        let count = self.tiles_loaded.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(tile = %identifier, count, "loaded imagery tile");

        let decoded = image::load_from_memory(&bytes).map_err(|source| RasterError::Decode {
            id: identifier,
            source,
        })?;

        // Decoded row zero is the northern edge; flip to the south-to-north
        // convention.
        let rgba = decoded.flipv().into_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(TilePayload::new(
            width as usize,
            height as usize,
            TileData::Rgba8(rgba.into_raw()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A 2x1 PNG: red pixel at the top (north), blue at the bottom (south).
    fn two_row_png() -> Vec<u8> {
        let mut img = image::RgbaImage::new(1, 2);
        img.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        img.put_pixel(0, 1, image::Rgba([0, 0, 255, 255]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    fn source_with_tile(
        identifier: RasterTileIdentifier,
        bytes: Vec<u8>,
    ) -> (WebImagerySource, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(crate::fetch::MemoryTileFetcher::new());
        let source = WebImagerySource::new(
            "imagery",
            "http://tiles",
            Arc::clone(&fetcher) as Arc<dyn TileFetcher>,
            dir.path(),
        );
        fetcher.insert(source.tile_url(identifier), bytes);
        (source, dir)
    }

    #[test]
    fn test_tile_url_flips_row_from_north() {
        let dir = tempfile::tempdir().unwrap();
        let source = WebImagerySource::new(
            "imagery",
            "http://tiles",
            Arc::new(crate::fetch::MemoryTileFetcher::new()) as Arc<dyn TileFetcher>,
            dir.path(),
        );
        // Level 2 has 4 rows; southern row 0 maps to remote row 3.
        assert_eq!(
            source.tile_url(RasterTileIdentifier::new(2, 1, 0)),
            "http://tiles/2/1/3.png"
        );
    }

    /// Decode flips image rows so row zero is the southern edge.
    #[test]
    fn test_payload_orientation_is_south_to_north() {
        let id = RasterTileIdentifier::new(0, 0, 0);
        let (source, _dir) = source_with_tile(id, two_row_png());

        let payload = source.load_tile_payload(id).unwrap();
        let rgba = payload.rgba().unwrap();
        // Southern (first) row is the blue pixel.
        assert_eq!(&rgba[0..4], &[0, 0, 255, 255]);
        assert_eq!(&rgba[4..8], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_garbage_bytes_fail_decode() {
        let id = RasterTileIdentifier::new(0, 0, 0);
        let (source, _dir) = source_with_tile(id, vec![1, 2, 3, 4]);
        assert!(matches!(
            source.load_tile_payload(id),
            Err(RasterError::Decode { .. })
        ));
    }
}
