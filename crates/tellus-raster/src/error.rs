//! Raster paging error types.

use std::path::PathBuf;

use crate::tile::RasterTileIdentifier;

/// Errors that can occur while fetching, caching, or decoding raster tiles.
///
/// Fetch and I/O failures are transient: callers log them and retry on a
/// future frame, rendering coarser data in the meantime. Malformed payloads
/// indicate a broken source and are surfaced unchanged.
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    /// The remote fetch failed (network error or non-success status).
    #[error("tile fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    /// Reading or writing the on-disk tile cache failed.
    #[error("tile cache I/O at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The fetched bytes do not match the expected tile layout.
    #[error("malformed payload for tile {id}: {reason}")]
    Malformed {
        id: RasterTileIdentifier,
        reason: String,
    },

    /// Decoding an imagery tile failed.
    #[error("failed to decode imagery tile {id}")]
    Decode {
        id: RasterTileIdentifier,
        #[source]
        source: image::ImageError,
    },

    /// No fixture registered for the requested URL (in-memory fetcher only).
    #[error("no fixture for {url}")]
    MissingFixture { url: String },
}

impl RasterError {
    /// True for failures worth retrying on a later frame.
    pub fn is_transient(&self) -> bool {
        matches!(self, RasterError::Fetch { .. } | RasterError::Io { .. })
    }
}
