//! Geometric clipmap terrain paging and level-of-detail control.
//!
//! A clipmap renders planet-scale terrain through a small stack of
//! fixed-size post windows ("levels"), one per resolution ring, each
//! re-centered incrementally as the viewpoint moves. Only the strip of
//! posts that entered the window is ever re-fetched, so per-frame I/O and
//! upload cost is proportional to viewpoint displacement, not window size.

mod extent;
mod level;
mod pager;
mod terrain;
mod update;

pub use extent::PostExtent;
pub use level::{ClipmapLevel, LevelState};
pub use pager::{ClipmapPager, PagerFrame, ReadyRegion};
pub use terrain::{
    ClipmapFrame, GlobeClipmapTerrain, LevelRenderState, TerrainBlendParams, TerrainOptions,
};
pub use update::{ClipmapUpdate, update_regions};
