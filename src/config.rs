//! Configuration management for fxtg.
//!
//! This module provides a flexible configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `FXTG_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Environment Variables
//!
//! - `FXTG_HOST` - Server bind address (default: 0.0.0.0)
//! - `FXTG_PORT` - Server port (default: 3000)
//! - `FXTG_BASE_URL` - Public base URL for generated links (default: http://localhost:{port})
//! - `FXTG_CACHE_FILE` - Image URL cache file (default: imageUrls.json)
//! - `FXTG_CACHE_WINDOW` - Cache entry lifetime in seconds (default: 3600)
//! - `FXTG_CACHE_SWEEP_INTERVAL` - Seconds between cache sweeps (default: 3600)
//! - `FXTG_WHITELIST` - Comma-separated media host regexes (default: Instagram CDNs)
//! - `FXTG_MOSAIC_WIDTH` - Mosaic width in pixels (default: 1024)
//! - `FXTG_EXTRACTOR_URL` - Post extractor endpoint; enables the preview route
//! - `FXTG_ORIGIN_URL` - Origin site for posts (default: https://www.threads.net)
//! - `FXTG_CORS_ORIGINS` - Allowed CORS origins (comma-separated)

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use url::Url;

use crate::cache::{DEFAULT_CACHE_WINDOW, DEFAULT_SWEEP_INTERVAL};
use crate::mosaic::{DEFAULT_MOSAIC_WIDTH, MAX_MOSAIC_WIDTH};
use crate::proxy::{Whitelist, DEFAULT_WHITELIST};
use crate::server::DEFAULT_ORIGIN_URL;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default cache file.
pub const DEFAULT_CACHE_FILE: &str = "imageUrls.json";

/// Default cache entry lifetime in seconds.
pub const DEFAULT_CACHE_WINDOW_SECS: u64 = DEFAULT_CACHE_WINDOW.as_secs();

/// Default interval between cache sweeps in seconds.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = DEFAULT_SWEEP_INTERVAL.as_secs();

// =============================================================================
// CLI Arguments
// =============================================================================

/// fxtg - Telegram-friendly previews for social media posts.
///
/// Serves OpenGraph preview pages, image mosaics and a whitelisted media
/// proxy with HTTP range support.
#[derive(Parser, Debug, Clone)]
#[command(name = "fxtg")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "FXTG_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "FXTG_PORT")]
    pub port: u16,

    /// Public base URL used in generated media and mosaic links.
    ///
    /// Defaults to http://localhost:{port}.
    #[arg(long, env = "FXTG_BASE_URL")]
    pub base_url: Option<String>,

    // =========================================================================
    // Cache Configuration
    // =========================================================================
    /// File that persists cached image URLs across restarts.
    #[arg(long, default_value = DEFAULT_CACHE_FILE, env = "FXTG_CACHE_FILE")]
    pub cache_file: PathBuf,

    /// Seconds a cached entry stays valid.
    #[arg(long, default_value_t = DEFAULT_CACHE_WINDOW_SECS, env = "FXTG_CACHE_WINDOW")]
    pub cache_window: u64,

    /// Seconds between cache sweeps.
    #[arg(long, default_value_t = DEFAULT_SWEEP_INTERVAL_SECS, env = "FXTG_CACHE_SWEEP_INTERVAL")]
    pub cache_sweep_interval: u64,

    // =========================================================================
    // Proxy Configuration
    // =========================================================================
    /// Media host patterns the proxy may fetch from (comma-separated regexes).
    ///
    /// Each pattern must match the whole host. If not specified, the
    /// Instagram CDN patterns are used.
    #[arg(long, env = "FXTG_WHITELIST", value_delimiter = ',')]
    pub whitelist: Option<Vec<String>>,

    // =========================================================================
    // Preview Configuration
    // =========================================================================
    /// Output width of generated mosaics in pixels.
    #[arg(long, default_value_t = DEFAULT_MOSAIC_WIDTH, env = "FXTG_MOSAIC_WIDTH")]
    pub mosaic_width: u32,

    /// Post extractor endpoint, called as GET {url}?url=<post url>.
    ///
    /// The preview route is only served when this is set.
    #[arg(long, env = "FXTG_EXTRACTOR_URL")]
    pub extractor_url: Option<String>,

    /// Origin site posts are fetched from and redirected to.
    #[arg(long, default_value = DEFAULT_ORIGIN_URL, env = "FXTG_ORIGIN_URL")]
    pub origin_url: String,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "FXTG_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.mosaic_width == 0 {
            return Err("mosaic_width must be greater than 0".to_string());
        }
        if self.mosaic_width > MAX_MOSAIC_WIDTH {
            return Err(format!(
                "mosaic_width must be at most {}, got {}",
                MAX_MOSAIC_WIDTH, self.mosaic_width
            ));
        }
        if self.cache_window == 0 {
            return Err("cache_window must be greater than 0".to_string());
        }
        if self.cache_sweep_interval == 0 {
            return Err("cache_sweep_interval must be greater than 0".to_string());
        }

        if self.cache_file.as_os_str().is_empty() {
            return Err("cache_file must not be empty".to_string());
        }

        if let Some(base_url) = &self.base_url {
            parse_http_url("base_url", base_url)?;
        }
        parse_http_url("origin_url", &self.origin_url)?;
        self.extractor_url()?;
        self.whitelist()?;

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Public base URL, without a trailing slash.
    pub fn public_base_url(&self) -> String {
        self.base_url
            .as_deref()
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("http://localhost:{}", self.port))
    }

    pub fn cache_window(&self) -> Duration {
        Duration::from_secs(self.cache_window)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.cache_sweep_interval)
    }

    /// Compile the configured host whitelist.
    pub fn whitelist(&self) -> Result<Whitelist, String> {
        let whitelist = match &self.whitelist {
            None => Whitelist::new(DEFAULT_WHITELIST.iter().copied()),
            Some(patterns) => Whitelist::new(
                patterns
                    .iter()
                    .map(|p| p.trim())
                    .filter(|p| !p.is_empty()),
            ),
        };
        whitelist.map_err(|e| format!("Invalid whitelist pattern: {}", e))
    }

    /// Parsed extractor endpoint, if configured.
    pub fn extractor_url(&self) -> Result<Option<Url>, String> {
        self.extractor_url
            .as_deref()
            .map(|raw| parse_http_url("extractor_url", raw))
            .transpose()
    }
}

fn parse_http_url(name: &str, raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| format!("{} is not a valid URL ({}): {}", name, raw, e))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("{} must be an http(s) URL, got {}", name, raw));
    }
    Ok(url)
}

// =============================================================================
// Tests
// =============================================================================
