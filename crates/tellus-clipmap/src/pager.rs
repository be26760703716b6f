//! Paging of raster data into clipmap windows.
//!
//! A [`ClipmapPager`] drives the resident windows of every level of one
//! raster source: it re-centers windows on the viewpoint, requests the tiles
//! covering the incremental update regions through the async loader, drains
//! completed payloads once per frame, and assembles contiguous post buffers
//! for the regions that became fully resident.

use std::sync::Arc;

use tellus_math::{Geodetic3, to_degrees};
use tellus_raster::{
    AsyncTileLoader, RasterLevel, RasterSource, TileCache, TileData, TilePayload,
};
use tracing::trace;

use crate::extent::PostExtent;
use crate::level::{ClipmapLevel, LevelState};
use crate::update::ClipmapUpdate;

/// A fully resident update region with its assembled samples, ready for the
/// render thread to upload.
#[derive(Clone, Debug)]
pub struct ReadyRegion {
    pub update: ClipmapUpdate,
    pub data: TileData,
}

/// Result of one per-frame pager pass.
#[derive(Debug, Default)]
pub struct PagerFrame {
    /// Regions whose data became resident this frame, in level order.
    pub ready: Vec<ReadyRegion>,
    /// Tile requests newly issued this frame.
    pub requested: usize,
    /// Number of active levels, coarsest first.
    pub active_levels: usize,
}

/// Pages one raster source through a stack of fixed-size clipmap windows.
pub struct ClipmapPager {
    source: Arc<dyn RasterSource>,
    loader: AsyncTileLoader,
    cache: TileCache,
    levels: Vec<ClipmapLevel>,
    window_posts: i64,
    meters_per_degree: f64,
    /// A level stays active while its window spans at least this multiple
    /// of the eye height.
    coverage_factor: f64,
    active_count: usize,
}

impl ClipmapPager {
    /// Create a pager with `window_posts`-wide windows over every level of
    /// `source`, caching up to `cache_tiles` payloads.
    ///
    /// `meters_per_degree` converts the source's angular post spacing to
    /// meters for distance-based level activation (nominally the planet
    /// radius times pi/180).
    ///
    /// # Panics
    ///
    /// Panics if the window does not fit the source's coarsest level.
    pub fn new(
        source: Arc<dyn RasterSource>,
        window_posts: i64,
        cache_tiles: usize,
        meters_per_degree: f64,
    ) -> Self {
        let coarsest = &source.levels()[0];
        assert!(
            window_posts <= coarsest.longitude_posts() && window_posts <= coarsest.latitude_posts(),
            "{window_posts}-post window does not fit the coarsest level ({}x{})",
            coarsest.longitude_posts(),
            coarsest.latitude_posts()
        );

        let levels = (0..source.levels().len())
            .map(|i| ClipmapLevel::new(i, window_posts))
            .collect();
        let loader = AsyncTileLoader::with_defaults(Arc::clone(&source));

        Self {
            source,
            loader,
            cache: TileCache::new(cache_tiles),
            levels,
            window_posts,
            meters_per_degree,
            coverage_factor: 2.0,
            active_count: 0,
        }
    }

    pub fn levels(&self) -> &[ClipmapLevel] {
        &self.levels
    }

    pub fn window_posts(&self) -> i64 {
        self.window_posts
    }

    /// Number of levels currently active (coarsest first).
    pub fn active_level_count(&self) -> usize {
        self.active_count
    }

    /// The payload cache, shared with whoever wants to inspect residency.
    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    /// The raster levels being paged, coarsest first.
    pub fn raster_levels(&self) -> &[RasterLevel] {
        self.source.levels()
    }

    /// Run one frame of paging: activation, window re-centering, request
    /// issue, drain, and region assembly.
    ///
    /// When `recenter` is false (LOD update frozen) the windows stay where
    /// they are, but completed tiles still drain and pending regions still
    /// resolve.
    pub fn update(&mut self, eye: Geodetic3, recenter: bool) -> PagerFrame {
        let mut frame = PagerFrame::default();

        if recenter {
            self.active_count = self.level_count_for_height(eye.height);
            self.recenter_levels(eye);
        }
        frame.active_levels = self.active_count;

        // Drain before assembly so freshly completed tiles are visible to
        // this frame's regions.
        for loaded in self.loader.drain_completed() {
            self.cache.insert(loaded.id, loaded.payload);
        }

        self.assemble_ready_regions(&mut frame);
        frame.requested = self.request_missing_tiles();
        self.cancel_stale_requests();

        frame
    }

    /// How many levels, coarsest first, the eye height justifies.
    fn level_count_for_height(&self, eye_height: f64) -> usize {
        let mut count = 1;
        for level in &self.source.levels()[1..] {
            let window_meters = (self.window_posts - 1) as f64
                * level.post_delta_longitude()
                * self.meters_per_degree;
            if window_meters >= eye_height.max(0.0) * self.coverage_factor {
                count += 1;
            } else {
                break;
            }
        }
        count
    }

    fn recenter_levels(&mut self, eye: Geodetic3) {
        let longitude = to_degrees(eye.longitude);
        let latitude = to_degrees(eye.latitude);

        for index in 0..self.levels.len() {
            if index >= self.active_count {
                // Deactivated rings release their window; the payload cache
                // keeps their tiles warm for reactivation.
                if self.levels[index].state() != LevelState::Inactive {
                    self.levels[index] = ClipmapLevel::new(index, self.window_posts);
                }
                continue;
            }

            let raster_level = &self.source.levels()[index];
            let desired = self.desired_window(raster_level, longitude, latitude);
            let regions = self.levels[index].set_next_extent(desired);
            if !regions.is_empty() {
                trace!(level = index, ?desired, regions = regions.len(), "window moved");
            }
        }
    }

    /// The window re-centered on the viewpoint, quantized to whole posts
    /// and clamped inside the level's post bounds.
    fn desired_window(&self, raster_level: &RasterLevel, longitude: f64, latitude: f64) -> PostExtent {
        let half = (self.window_posts - 1) / 2;
        let center_x = raster_level.longitude_to_index(longitude).round() as i64;
        let center_y = raster_level.latitude_to_index(latitude).round() as i64;

        let west = (center_x - half).clamp(0, raster_level.longitude_posts() - self.window_posts);
        let south = (center_y - half).clamp(0, raster_level.latitude_posts() - self.window_posts);
        PostExtent::new(
            west,
            south,
            west + self.window_posts - 1,
            south + self.window_posts - 1,
        )
    }

    /// Resolve pending regions whose tiles are all resident, and complete
    /// level transitions that have nothing left pending.
    fn assemble_ready_regions(&mut self, frame: &mut PagerFrame) {
        for level in &mut self.levels {
            let Some(next_extent) = level.next_extent() else {
                continue;
            };
            let raster_index = level.raster_index();
            let raster_level = &self.source.levels()[raster_index];

            let mut unresolved = Vec::new();
            let mut resolved = Vec::new();
            for region in level.pending.drain(..) {
                let buffered = ClipmapUpdate::new(raster_index, region)
                    .add_buffer_within_level_next_extent(next_extent);
                match assemble_region(raster_level, &self.cache, buffered.region()) {
                    Some(data) => resolved.push(ReadyRegion {
                        update: buffered,
                        data,
                    }),
                    None => unresolved.push(region),
                }
            }
            level.pending = unresolved;

            for ready in &resolved {
                if let TileData::Height32F(samples) = &ready.data
                    && let Some(&first) = samples.first()
                {
                    let (min, max) = samples.iter().fold((first, first), |(lo, hi), &h| {
                        (lo.min(h), hi.max(h))
                    });
                    level.merge_height_bounds(min, max);
                }
            }
            frame.ready.append(&mut resolved);

            if level.pending.is_empty() && level.state() == LevelState::Transitioning {
                level.complete_transition();
            }
        }
    }

    /// Queue loads for every tile a pending region still needs.
    fn request_missing_tiles(&self) -> usize {
        let mut requested = 0;
        for level in &self.levels {
            let Some(next_extent) = level.next_extent() else {
                continue;
            };
            let raster_level = &self.source.levels()[level.raster_index()];
            for region in &level.pending {
                let buffered = ClipmapUpdate::new(level.raster_index(), *region)
                    .add_buffer_within_level_next_extent(next_extent);
                let r = buffered.region();
                for tile_region in raster_level.tiles_in_extent(r.west, r.south, r.east, r.north) {
                    let id = tile_region.tile.identifier();
                    if !self.cache.contains(id) && self.loader.request(id) {
                        requested += 1;
                    }
                }
            }
        }
        requested
    }

    /// Cancel in-flight loads for tiles no pending region needs anymore, so
    /// their results are discarded on arrival instead of applied.
    fn cancel_stale_requests(&self) {
        let pending_ids = self.loader.pending_ids();
        if pending_ids.is_empty() {
            return;
        }

        for id in pending_ids {
            let needed = self.levels.get(id.level).is_some_and(|level| {
                let Some(next_extent) = level.next_extent() else {
                    return false;
                };
                let raster_level = &self.source.levels()[id.level];
                let tile = raster_level.tile(id);
                let tile_extent =
                    PostExtent::new(tile.west(), tile.south(), tile.east(), tile.north());
                level.pending.iter().any(|region| {
                    ClipmapUpdate::new(id.level, *region)
                        .add_buffer_within_level_next_extent(next_extent)
                        .region()
                        .intersection(&tile_extent)
                        .is_some()
                })
            });
            if !needed {
                self.loader.cancel(id);
            }
        }
    }
}

/// Copy the posts of `region` out of the cached tile payloads into one
/// contiguous south-to-north buffer. Returns `None` unless every covering
/// tile is resident.
fn assemble_region(
    raster_level: &RasterLevel,
    cache: &TileCache,
    region: PostExtent,
) -> Option<TileData> {
    let tile_regions =
        raster_level.tiles_in_extent(region.west, region.south, region.east, region.north);

    let mut payloads: Vec<Arc<TilePayload>> = Vec::with_capacity(tile_regions.len());
    for tile_region in &tile_regions {
        payloads.push(cache.get(tile_region.tile.identifier())?);
    }

    let width = region.width() as usize;
    let height = region.height() as usize;

    let mut data = match payloads[0].data() {
        TileData::Height32F(_) => TileData::Height32F(vec![0.0; width * height]),
        TileData::Rgba8(_) => TileData::Rgba8(vec![0; width * height * 4]),
    };

    for (tile_region, payload) in tile_regions.iter().zip(&payloads) {
        let tile = tile_region.tile;
        let src_stride = payload.width();
        for local_y in tile_region.south..=tile_region.north {
            let dest_y = (tile.south() + local_y - region.south) as usize;
            let dest_x = (tile.west() + tile_region.west - region.west) as usize;
            let src_offset = local_y as usize * src_stride + tile_region.west as usize;
            let run = tile_region.width() as usize;

            match (&mut data, payload.data()) {
                (TileData::Height32F(dest), TileData::Height32F(src)) => {
                    let dest_offset = dest_y * width + dest_x;
                    dest[dest_offset..dest_offset + run]
                        .copy_from_slice(&src[src_offset..src_offset + run]);
                }
                (TileData::Rgba8(dest), TileData::Rgba8(src)) => {
                    let dest_offset = (dest_y * width + dest_x) * 4;
                    dest[dest_offset..dest_offset + run * 4]
                        .copy_from_slice(&src[src_offset * 4..(src_offset + run) * 4]);
                }
                _ => panic!("mixed payload formats within one raster source"),
            }
        }
    }

    Some(data)
}
