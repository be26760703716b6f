//! Multi-resolution raster pyramids with asynchronous tile paging.
//!
//! A [`RasterSource`] exposes a pyramid of [`RasterLevel`]s, each a grid of
//! fixed-size tiles of height or imagery posts. Geographic coordinates map to
//! fractional post indices, post rectangles map to the tiles that cover them,
//! and tile payloads are fetched on demand (HTTP or in-memory), cached on
//! disk, and delivered to the render thread through a worker pool.

mod cache;
mod error;
mod fetch;
mod level;
mod loader;
mod payload;
mod source;
mod sources;
mod tile;

pub use cache::TileCache;
pub use error::RasterError;
pub use fetch::{DiskCache, HttpTileFetcher, MemoryTileFetcher, TileFetcher};
pub use level::{RasterLevel, RasterTileRegion};
pub use loader::{AsyncTileLoader, LoadedTile};
pub use payload::{TileData, TilePayload};
pub use source::{RasterPyramid, RasterSource, RasterSourceSpec};
pub use sources::{BilElevationSource, WebImagerySource};
pub use tile::{RasterTile, RasterTileIdentifier};
