//! Optional config file loading. Search order: ./wparchive.toml, then
//! $XDG_CONFIG_HOME/wparchive/config.toml (or ~/.config/wparchive/config.toml).

use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from config loading. A missing file is not an error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot determine current directory: {0}")]
    CurrentDir(#[source] std::io::Error),

    #[error("Cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Config file contents. All fields optional; only present keys override defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    /// Cloudflare clearance token. CLI --token and the CF_CLEARANCE
    /// environment variable take precedence.
    pub token: Option<String>,
    /// Platform root URL.
    pub base_url: Option<String>,
    /// Directory receiving checkpoints and the per-category output directory.
    pub output_dir: Option<PathBuf>,
    /// HTTP User-Agent header.
    pub user_agent: Option<String>,
    /// Listing page size.
    pub per_page: Option<u32>,
    /// Delay in seconds between requests.
    pub request_delay_secs: Option<u64>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// TTF font for the PDF writer.
    pub font_path: Option<PathBuf>,
}

/// Search order: (1) ./wparchive.toml, (2) $XDG_CONFIG_HOME/wparchive/config.toml.
/// Missing file returns Ok(None). Invalid TOML or I/O error reading a present file returns Err.
pub fn load_config() -> Result<Option<Config>, ConfigError> {
    let cwd = std::env::current_dir().map_err(ConfigError::CurrentDir)?;
    let mut paths = vec![cwd.join("wparchive.toml")];
    if let Some(d) = dirs::config_dir() {
        paths.push(d.join("wparchive").join("config.toml"));
    }
    for path in &paths {
        if path.exists() {
            let s = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
                path: path.clone(),
                source: e,
            })?;
            let config: Config = toml::from_str(&s).map_err(|e| ConfigError::Parse {
                path: path.clone(),
                source: e,
            })?;
            return Ok(Some(config));
        }
    }
    Ok(None)
}
