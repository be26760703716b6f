//! Injectable tile-fetch capability and the on-disk byte cache.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::RasterError;

/// Fetches raw tile bytes for a URL.
///
/// Sources depend on this capability instead of a process-wide HTTP client
/// so tests can substitute a deterministic in-memory fetcher.
pub trait TileFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, RasterError>;
}

/// HTTP fetcher backed by a shared `ureq` agent.
pub struct HttpTileFetcher {
    agent: ureq::Agent,
}

impl HttpTileFetcher {
    pub fn new() -> Self {
        Self {
            agent: ureq::agent(),
        }
    }
}

impl Default for HttpTileFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl TileFetcher for HttpTileFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, RasterError> {
        let response = self.agent.get(url).call().map_err(|e| RasterError::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| RasterError::Fetch {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(bytes)
    }
}

/// Deterministic fetcher serving pre-registered byte fixtures, for tests.
#[derive(Default)]
pub struct MemoryTileFetcher {
    fixtures: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryTileFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the bytes returned for a URL.
    pub fn insert(&self, url: impl Into<String>, bytes: Vec<u8>) {
        self.fixtures
            .lock()
            .expect("fixture map poisoned")
            .insert(url.into(), bytes);
    }

    /// Number of fetches that would succeed.
    pub fn fixture_count(&self) -> usize {
        self.fixtures.lock().expect("fixture map poisoned").len()
    }
}

impl TileFetcher for MemoryTileFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, RasterError> {
        self.fixtures
            .lock()
            .expect("fixture map poisoned")
            .get(url)
            .cloned()
            .ok_or_else(|| RasterError::MissingFixture {
                url: url.to_string(),
            })
    }
}

/// On-disk verbatim byte cache below a root directory.
///
/// Layout is `<root>/<sourceName>/<level>/<y>/<x>.<ext>`; the relative path
/// is chosen by the source. Directories are created on demand. A hit skips
/// the remote fetch entirely; a miss writes the fetched bytes verbatim
/// before returning them.
pub struct DiskCache {
    root: PathBuf,
}

impl DiskCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return cached bytes for `relative`, or run `fetch`, persist its
    /// result, and return it.
    pub fn get_or_fetch(
        &self,
        relative: &Path,
        fetch: impl FnOnce() -> Result<Vec<u8>, RasterError>,
    ) -> Result<Vec<u8>, RasterError> {
        let path = self.root.join(relative);

        if path.is_file() {
            return std::fs::read(&path).map_err(|source| RasterError::Io {
                path: path.clone(),
                source,
            });
        }

        let bytes = fetch()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| RasterError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&path, &bytes).map_err(|source| RasterError::Io {
            path: path.clone(),
            source,
        })?;

        Ok(bytes)
    }
}
