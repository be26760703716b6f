//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Clipmap terrain settings.
    pub terrain: TerrainConfig,
    /// Tile cache settings.
    pub cache: CacheConfig,
    /// Rendering settings.
    pub render: RenderConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Clipmap terrain configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TerrainConfig {
    /// Clipmap window size in posts per axis. Must be odd.
    pub clipmap_posts: i64,
    /// Vertical exaggeration applied to heights.
    pub height_exaggeration: f32,
    /// Draw blend bands between adjacent rings.
    pub blend_regions: bool,
}

/// Tile cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Root directory for the on-disk tile cache. Empty means the
    /// platform cache directory.
    pub directory: PathBuf,
    /// Maximum decoded tile payloads held in memory.
    pub max_resident_payloads: usize,
    /// Worker threads for tile loading.
    pub loader_threads: usize,
}

/// Rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Render terrain as wireframe.
    pub wireframe: bool,
    /// Tint each clipmap ring for debugging.
    pub color_by_level: bool,
    /// Apply diffuse lighting.
    pub lighting: bool,
    /// Sample the imagery layer.
    pub show_imagery: bool,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Freeze LOD updates (windows stop following the eye).
    pub freeze_lod: bool,
    /// Show the blend bands as a tint.
    pub show_blend_regions: bool,
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            clipmap_posts: 511,
            height_exaggeration: 1.0,
            blend_regions: true,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::new(),
            max_resident_payloads: 1024,
            loader_threads: 4,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            wireframe: false,
            color_by_level: false,
            lighting: true,
            show_imagery: true,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            freeze_lod: false,
            show_blend_regions: false,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load config from the given directory, or create a default config
    /// file. The loaded config is validated; nonsense values are rejected
    /// rather than silently clamped.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            config.validate()?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let contents = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(ConfigError::SerializeError)?;
        std::fs::write(&config_path, contents).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.terrain.clipmap_posts < 3 || self.terrain.clipmap_posts % 2 == 0 {
            return Err(ConfigError::Invalid(format!(
                "terrain.clipmap_posts must be odd and at least 3, got {}",
                self.terrain.clipmap_posts
            )));
        }
        if self.cache.max_resident_payloads == 0 {
            return Err(ConfigError::Invalid(
                "cache.max_resident_payloads must be nonzero".to_string(),
            ));
        }
        if self.cache.loader_threads == 0 {
            return Err(ConfigError::Invalid(
                "cache.loader_threads must be nonzero".to_string(),
            ));
        }
        Ok(())
    }

    /// The effective tile cache directory: the configured one, or the
    /// platform cache directory.
    pub fn cache_directory(&self) -> PathBuf {
        if self.cache.directory.as_os_str().is_empty() {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("tellus")
        } else {
            self.cache.directory.clone()
        }
    }
}

/// The default config directory under the platform config location.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tellus")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.terrain.clipmap_posts = 255;
        config.render.wireframe = true;
        config.save(dir.path()).unwrap();

        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_creates_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join("config.ron").exists());
    }

    #[test]
    fn test_even_clipmap_posts_rejected() {
        let mut config = Config::default();
        config.terrain.clipmap_posts = 512;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_cache_capacity_rejected() {
        let mut config = Config::default();
        config.cache.max_resident_payloads = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_fields_tolerated_via_defaults() {
        // Forward compatibility: a partial file fills the rest from
        // defaults.
        let partial = "(terrain: (clipmap_posts: 127))";
        let config: Config = ron::from_str(partial).unwrap();
        assert_eq!(config.terrain.clipmap_posts, 127);
        assert_eq!(config.cache, CacheConfig::default());
    }
}
