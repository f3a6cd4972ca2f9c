//! Configuration management

use serde::{Deserialize, Serialize};

use crate::{MirrorError, Result};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    pub remote: RemoteConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Local cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

/// Directory API configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// API base, e.g. `https://example.okta.com/api/v1`
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_token: String,
    /// Scheme placed before the token in the `Authorization` header.
    #[serde(default = "default_auth_scheme")]
    pub auth_scheme: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Total attempts per request. `1` disables automatic retries.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
}

/// Sync pass configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Maximum number of upserts in flight during a pass.
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_write_timeout_secs")]
    pub write_timeout_secs: u64,
}

fn default_pool_size() -> u32 {
    4
}

fn default_auth_scheme() -> String {
    "SSWS".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> usize {
    1
}

fn default_workers() -> usize {
    1
}

fn default_write_timeout_secs() -> u64 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "dirmirror.db".to_string(), pool_size: default_pool_size() }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_token: String::new(),
            auth_scheme: default_auth_scheme(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { workers: default_workers(), write_timeout_secs: default_write_timeout_secs() }
    }
}

impl Config {
    /// Check the values that cannot be expressed through serde defaults.
    ///
    /// # Errors
    /// Returns `MirrorError::Config` describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.database.path.trim().is_empty() {
            return Err(MirrorError::Config("database path is empty".into()));
        }
        if self.database.pool_size == 0 {
            return Err(MirrorError::Config("database pool size must be at least 1".into()));
        }
        if self.remote.api_token.trim().is_empty() {
            return Err(MirrorError::Config("API token is empty".into()));
        }
        if self.remote.auth_scheme.trim().is_empty() {
            return Err(MirrorError::Config("authorization scheme is empty".into()));
        }
        if self.remote.timeout_secs == 0 {
            return Err(MirrorError::Config("HTTP timeout must be at least 1 second".into()));
        }
        url::Url::parse(&self.remote.base_url).map_err(|e| {
            MirrorError::Config(format!("invalid API base URL '{}': {e}", self.remote.base_url))
        })?;
        if self.sync.workers == 0 {
            return Err(MirrorError::Config("sync workers must be at least 1".into()));
        }
        if self.sync.write_timeout_secs == 0 {
            return Err(MirrorError::Config("write timeout must be at least 1 second".into()));
        }
        Ok(())
    }
}
