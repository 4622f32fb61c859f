//! Server configuration
//!
//! Configuration is loaded from environment variables with defaults for
//! every setting.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::tilejson::MAX_ZOOM_LIMIT;

/// Main server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Public base URL for link and tile URL generation (optional)
    pub public_base_url: Option<String>,

    /// Raster source configuration
    pub raster: RasterConfig,

    /// Tile URL configuration
    pub tiles: TilesConfig,
}

/// Raster source configuration
#[derive(Debug, Clone)]
pub struct RasterConfig {
    /// Directory local source paths are resolved against (unrestricted when unset)
    pub data_dir: Option<PathBuf>,
    /// Whether `http://` and `https://` sources may be fetched
    pub allow_remote: bool,
    /// Timeout for remote fetches
    pub http_timeout: Duration,
    /// Time-to-live of cached raster metadata
    pub cache_ttl: Duration,
    /// Maximum number of cached raster metadata entries
    pub cache_max_entries: u64,
    /// Size of the first ranged read when looking for a GeoTIFF header
    pub header_fetch_bytes: usize,
    /// Largest prefix read while looking for a GeoTIFF header
    pub max_header_bytes: usize,
    /// Largest source served in full (coverage downloads)
    pub max_download_bytes: usize,
}

/// Tile URL configuration
#[derive(Debug, Clone)]
pub struct TilesConfig {
    /// Path prefix of the tile endpoint of the tiling factory
    pub prefix: String,
    /// Default minimum zoom for STAC-driven TileJSON
    pub default_minzoom: u8,
    /// Default maximum zoom for STAC-driven TileJSON
    pub default_maxzoom: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            public_base_url: None,
            raster: RasterConfig::default(),
            tiles: TilesConfig::default(),
        }
    }
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            allow_remote: true,
            http_timeout: Duration::from_secs(30),
            cache_ttl: Duration::from_secs(300),
            cache_max_entries: 512,
            header_fetch_bytes: 64 * 1024,
            max_header_bytes: 16 * 1024 * 1024,
            max_download_bytes: 1024 * 1024 * 1024,
        }
    }
}

impl Default for TilesConfig {
    fn default() -> Self {
        Self {
            prefix: "/tiles".to_string(),
            default_minzoom: 0,
            default_maxzoom: 24,
        }
    }
}

impl TilesConfig {
    /// Reset default zooms that no TileJSON document could carry
    pub fn validate_zoom(&mut self) {
        let defaults = Self::default();
        if self.default_minzoom > MAX_ZOOM_LIMIT {
            warn!(
                "DEFAULT_MINZOOM={} is above {}, using {}",
                self.default_minzoom, MAX_ZOOM_LIMIT, defaults.default_minzoom
            );
            self.default_minzoom = defaults.default_minzoom;
        }
        if self.default_maxzoom > MAX_ZOOM_LIMIT {
            warn!(
                "DEFAULT_MAXZOOM={} is above {}, using {}",
                self.default_maxzoom, MAX_ZOOM_LIMIT, defaults.default_maxzoom
            );
            self.default_maxzoom = defaults.default_maxzoom;
        }
        if self.default_minzoom > self.default_maxzoom {
            warn!(
                "DEFAULT_MINZOOM={} is above DEFAULT_MAXZOOM={}, using {}..{}",
                self.default_minzoom,
                self.default_maxzoom,
                defaults.default_minzoom,
                defaults.default_maxzoom
            );
            self.default_minzoom = defaults.default_minzoom;
            self.default_maxzoom = defaults.default_maxzoom;
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // Server config
        if let Ok(host) = env::var("HOST") {
            config.host = host;
        }
        if let Ok(port) = env::var("PORT")
            && let Ok(p) = port.parse()
        {
            config.port = p;
        }
        if let Ok(url) = env::var("PUBLIC_BASE_URL")
            && !url.is_empty()
        {
            config.public_base_url = Some(url.trim_end_matches('/').to_string());
        }

        // Raster config
        if let Ok(dir) = env::var("DATA_DIR")
            && !dir.is_empty()
        {
            config.raster.data_dir = Some(PathBuf::from(dir));
        }
        if let Ok(val) = env::var("ALLOW_REMOTE_SOURCES") {
            config.raster.allow_remote = val.to_lowercase() == "true" || val == "1";
        }
        if let Ok(val) = env::var("HTTP_TIMEOUT_SECS")
            && let Ok(secs) = val.parse::<u64>()
        {
            config.raster.http_timeout = Duration::from_secs(secs);
        }
        if let Ok(val) = env::var("RASTER_CACHE_TTL_SECS")
            && let Ok(secs) = val.parse::<u64>()
        {
            config.raster.cache_ttl = Duration::from_secs(secs);
        }
        if let Ok(val) = env::var("RASTER_CACHE_MAX_ENTRIES")
            && let Ok(v) = val.parse()
        {
            config.raster.cache_max_entries = v;
        }
        if let Ok(val) = env::var("RASTER_HEADER_FETCH_BYTES")
            && let Ok(v) = val.parse::<usize>()
            && v > 0
        {
            config.raster.header_fetch_bytes = v;
        }
        if let Ok(val) = env::var("RASTER_MAX_HEADER_BYTES")
            && let Ok(v) = val.parse()
        {
            config.raster.max_header_bytes = v;
        }
        if let Ok(val) = env::var("RASTER_MAX_DOWNLOAD_BYTES")
            && let Ok(v) = val.parse()
        {
            config.raster.max_download_bytes = v;
        }

        // Tiles config
        if let Ok(prefix) = env::var("TILES_PREFIX") {
            config.tiles.prefix = normalize_prefix(&prefix);
        }
        if let Ok(val) = env::var("DEFAULT_MINZOOM")
            && let Ok(z) = val.parse()
        {
            config.tiles.default_minzoom = z;
        }
        if let Ok(val) = env::var("DEFAULT_MAXZOOM")
            && let Ok(z) = val.parse()
        {
            config.tiles.default_maxzoom = z;
        }
        config.tiles.validate_zoom();

        config
    }

    /// Tile endpoint prefix, absolute when a public base URL is configured
    pub fn tile_prefix(&self) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}{}", base, self.tiles.prefix),
            None => self.tiles.prefix.clone(),
        }
    }
}

/// `tiles/` and `/tiles/` both become `/tiles`; an empty value stays empty
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}
