//! The globe clipmap LOD controller.
//!
//! Owns the clipmap level stacks for a height source and an optional
//! imagery source, decides which rings are active from the eye height,
//! drives the per-frame paging pass, and assembles the per-level state the
//! render layer consumes. Within a frame the ordering is fixed: LOD update
//! (extent transitions and tile requests), then the done-queue drain, then
//! draw state assembly.

use std::sync::Arc;

use glam::DVec3;
use tellus_math::{Ellipsoid, Geodetic3};
use tellus_raster::RasterSource;
use tracing::debug;

use crate::extent::PostExtent;
use crate::level::LevelState;
use crate::pager::{ClipmapPager, ReadyRegion};

/// Rendering/update mode toggles. None of these change the correctness of
/// the update algorithm, only what gets drawn and whether windows move.
#[derive(Clone, Copy, Debug)]
pub struct TerrainOptions {
    pub wireframe: bool,
    pub color_by_level: bool,
    pub lighting: bool,
    pub show_imagery: bool,
    pub blend_regions_enabled: bool,
    pub show_blend_regions: bool,
    /// When false, windows freeze in place; pending writes still resolve.
    pub lod_update_enabled: bool,
    pub height_exaggeration: f32,
}

impl Default for TerrainOptions {
    fn default() -> Self {
        Self {
            wireframe: false,
            color_by_level: false,
            lighting: true,
            show_imagery: true,
            blend_regions_enabled: true,
            show_blend_regions: false,
            lod_update_enabled: true,
            height_exaggeration: 1.0,
        }
    }
}

/// Per-level blend band geometry: where, in posts from the window center,
/// the transition toward the coarser ring starts, and how wide it is.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TerrainBlendParams {
    pub alpha_offset: f32,
    pub one_over_alpha_extent: f32,
}

/// Everything the render layer needs to draw one clipmap ring.
#[derive(Clone, Copy, Debug)]
pub struct LevelRenderState {
    pub level: usize,
    pub extent: PostExtent,
    /// False while writes are outstanding; the renderer substitutes the
    /// coarser ancestor ring's data instead of blocking the frame.
    pub resident: bool,
    /// Toroidal origin of the extent's southwest corner in the level's
    /// wrap-addressed textures.
    pub origin_in_texture: (i64, i64),
    pub post_delta_degrees: (f64, f64),
    pub blend: TerrainBlendParams,
}

/// One frame of controller output.
#[derive(Debug, Default)]
pub struct ClipmapFrame {
    /// Height texture writes that became ready this frame.
    pub height_updates: Vec<ReadyRegion>,
    /// Imagery texture writes that became ready this frame.
    pub imagery_updates: Vec<ReadyRegion>,
    /// Active height rings, coarsest first.
    pub levels: Vec<LevelRenderState>,
    /// Active imagery rings, coarsest first.
    pub imagery_levels: Vec<LevelRenderState>,
}

/// Clipmap terrain over a whole globe: N nested rings of halving post
/// spacing, re-centered on the viewpoint every frame.
pub struct GlobeClipmapTerrain {
    ellipsoid: Ellipsoid,
    height_pager: ClipmapPager,
    imagery_pager: Option<ClipmapPager>,
    options: TerrainOptions,
    window_posts: i64,
}

impl GlobeClipmapTerrain {
    /// Create a controller with `window_posts`-wide rings (odd, typically
    /// 511) over a height source and an optional imagery source.
    pub fn new(
        ellipsoid: Ellipsoid,
        height_source: Arc<dyn RasterSource>,
        imagery_source: Option<Arc<dyn RasterSource>>,
        window_posts: i64,
        cache_tiles: usize,
    ) -> Self {
        let meters_per_degree = ellipsoid.maximum_radius() * std::f64::consts::PI / 180.0;
        let height_pager =
            ClipmapPager::new(height_source, window_posts, cache_tiles, meters_per_degree);
        let imagery_pager = imagery_source
            .map(|source| ClipmapPager::new(source, window_posts, cache_tiles, meters_per_degree));

        debug!(window_posts, "clipmap terrain ready");
        Self {
            ellipsoid,
            height_pager,
            imagery_pager,
            options: TerrainOptions::default(),
            window_posts,
        }
    }

    pub fn ellipsoid(&self) -> Ellipsoid {
        self.ellipsoid
    }

    pub fn options(&self) -> &TerrainOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut TerrainOptions {
        &mut self.options
    }

    pub fn window_posts(&self) -> i64 {
        self.window_posts
    }

    /// The geodetic position of a geocentric eye, for HUDs and debugging.
    pub fn eye_geodetic(&self, eye_position: DVec3) -> Geodetic3 {
        self.ellipsoid.to_geodetic3(eye_position)
    }

    /// Run one frame: page both sources around the eye and emit the draw
    /// state. The eye position is geocentric Cartesian in meters, double
    /// precision.
    pub fn update(&mut self, eye_position: DVec3) -> ClipmapFrame {
        let eye = self.ellipsoid.to_geodetic3(eye_position);
        let recenter = self.options.lod_update_enabled;

        let mut frame = ClipmapFrame::default();

        let height_frame = self.height_pager.update(eye, recenter);
        frame.height_updates = height_frame.ready;
        frame.levels = Self::render_states(&self.height_pager, self.window_posts);

        if let Some(imagery_pager) = &mut self.imagery_pager {
            let imagery_frame = imagery_pager.update(eye, recenter);
            frame.imagery_updates = imagery_frame.ready;
            frame.imagery_levels = Self::render_states(imagery_pager, self.window_posts);
        }

        frame
    }

    fn render_states(pager: &ClipmapPager, window_posts: i64) -> Vec<LevelRenderState> {
        let blend = Self::blend_params(window_posts);
        pager
            .levels()
            .iter()
            .take(pager.active_level_count())
            .filter_map(|level| {
                let extent = level.next_extent()?;
                let raster_level = &pager.raster_levels()[level.raster_index()];
                Some(LevelRenderState {
                    level: level.raster_index(),
                    extent,
                    resident: level.state() == LevelState::Stable,
                    origin_in_texture: level.origin_in_texture(),
                    post_delta_degrees: (
                        raster_level.post_delta_longitude(),
                        raster_level.post_delta_latitude(),
                    ),
                    blend,
                })
            })
            .collect()
    }

    /// Blend band geometry: the outer tenth of the window interpolates
    /// toward the coarser ring.
    fn blend_params(window_posts: i64) -> TerrainBlendParams {
        let half = ((window_posts - 1) / 2) as f32;
        let blend_posts = (window_posts / 10).max(1) as f32;
        TerrainBlendParams {
            alpha_offset: half - blend_posts,
            one_over_alpha_extent: 1.0 / blend_posts,
        }
    }
}
