//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Read a `.env` file from the working directory, if present
//! 2. Attempt to load from environment variables
//! 3. If incomplete, fall back to loading from file
//! 4. Probe multiple paths for config files
//! 5. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `DIRMIRROR_API_URL`: Directory API base URL (required)
//! - `DIRMIRROR_API_TOKEN`: Directory API token (required)
//! - `DIRMIRROR_DB_PATH`: Database file path (required)
//! - `DIRMIRROR_DB_POOL_SIZE`: Connection pool size
//! - `DIRMIRROR_AUTH_SCHEME`: Scheme placed before the token, `SSWS` by default
//! - `DIRMIRROR_HTTP_TIMEOUT`: Request timeout in seconds
//! - `DIRMIRROR_SYNC_WORKERS`: Upserts in flight during a sync pass
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./dirmirror.json` or `./dirmirror.toml` (current working directory)
//! 2. `./config.json` or `./config.toml` (current working directory)
//! 3. `$XDG_CONFIG_HOME/dirmirror/config.{json,toml}`, or
//!    `~/.config/dirmirror/config.{json,toml}` when `XDG_CONFIG_HOME` is unset

use std::path::{Path, PathBuf};
use std::str::FromStr;

use dirmirror_domain::{Config, DatabaseConfig, MirrorError, RemoteConfig, Result, SyncConfig};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file. The
/// result is validated either way.
///
/// # Errors
/// Returns `MirrorError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - A value fails [`Config::validate`]
pub fn load() -> Result<Config> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    let config = match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            config
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)?
        }
    };

    config.validate()?;
    Ok(config)
}

/// Load configuration from environment variables
///
/// The API URL, the token and the database path must be present; every
/// other variable falls back to its default.
///
/// # Errors
/// Returns `MirrorError::Config` if required variables are missing
/// or have invalid values.
pub fn load_from_env() -> Result<Config> {
    let base_url = env_var("DIRMIRROR_API_URL")?;
    let api_token = env_var("DIRMIRROR_API_TOKEN")?;
    let db_path = env_var("DIRMIRROR_DB_PATH")?;

    let defaults = Config::default();

    Ok(Config {
        database: DatabaseConfig {
            path: db_path,
            pool_size: env_parse("DIRMIRROR_DB_POOL_SIZE", defaults.database.pool_size)?,
        },
        remote: RemoteConfig {
            base_url,
            api_token,
            auth_scheme: std::env::var("DIRMIRROR_AUTH_SCHEME")
                .unwrap_or(defaults.remote.auth_scheme),
            timeout_secs: env_parse("DIRMIRROR_HTTP_TIMEOUT", defaults.remote.timeout_secs)?,
            max_attempts: defaults.remote.max_attempts,
        },
        sync: SyncConfig {
            workers: env_parse("DIRMIRROR_SYNC_WORKERS", defaults.sync.workers)?,
            ..defaults.sync
        },
    })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `MirrorError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Required fields are missing
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(MirrorError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            MirrorError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| MirrorError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `MirrorError::Config` if format is invalid or parsing fails.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| MirrorError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| MirrorError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(MirrorError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    candidate_paths().into_iter().find(|path| path.exists())
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend([
            cwd.join("dirmirror.json"),
            cwd.join("dirmirror.toml"),
            cwd.join("config.json"),
            cwd.join("config.toml"),
        ]);
    }

    if let Some(dir) = user_config_dir() {
        let dir = dir.join("dirmirror");
        candidates.extend([dir.join("config.json"), dir.join("config.toml")]);
    }

    candidates
}

fn user_config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
}

/// Get required environment variable
///
/// # Errors
/// Returns `MirrorError::Config` if the variable is not set or blank.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| MirrorError::Config(format!("Missing required environment variable: {}", key)))
}

/// Parse an optional numeric environment variable, using `default` when unset.
fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| MirrorError::Config(format!("Invalid value for {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}
