//! SQLite connection pool
//!
//! Provides r2d2-based connection pooling with per-connection pragmas.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use tracing::{debug, info, instrument, warn};

use super::config::SqlitePoolConfig;
use super::connection::SqliteConnection;
use super::pragmas::apply_connection_pragmas;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::metrics::StorageMetrics;
use crate::storage::types::{HealthStatus, PoolMetrics};

/// SQLite connection pool
///
/// Manages a pool of SQLite connections using r2d2. Every connection gets
/// the pragmas from [`apply_connection_pragmas`] when it is opened.
#[derive(Debug)]
pub struct SqlitePool {
    pool: Pool<SqliteConnectionManager>,
    config: SqlitePoolConfig,
    metrics: Arc<StorageMetrics>,
}

impl SqlitePool {
    /// Create a new connection pool for the database file at `path`.
    ///
    /// The file is created when it does not exist. One connection is opened
    /// eagerly so a bad path fails here rather than on first use.
    ///
    /// # Errors
    /// Returns an error if the file can't be opened or the pool can't be built.
    #[instrument(skip(config), fields(db_path = ?path, pool_size = config.max_size))]
    pub fn new(path: &Path, config: SqlitePoolConfig) -> StorageResult<Self> {
        info!("Creating SQLite connection pool");

        if config.max_size == 0 {
            return Err(StorageError::InvalidConfig("pool size must be at least 1".into()));
        }

        let metrics = Arc::new(StorageMetrics::new(config.max_size));

        let pool_config = config.clone();
        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            apply_connection_pragmas(conn, &pool_config)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(config.max_size)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .map_err(|e| {
                warn!("Failed to create connection pool: {}", e);
                StorageError::Connection(format!("Failed to create pool: {e}"))
            })?;

        {
            let conn = pool.get().map_err(|e| {
                warn!("Failed to get test connection: {}", e);
                StorageError::Connection(format!("Failed to get test connection: {e}"))
            })?;
            conn.query_row("SELECT 1", [], |row| row.get::<_, i32>(0))?;
            debug!("Test connection verified");
        }

        info!("SQLite pool created with {} connections", config.max_size);

        Ok(Self { pool, config, metrics })
    }

    /// Get a connection from the pool
    ///
    /// Blocks up to the configured connection timeout when the pool is
    /// exhausted.
    #[instrument(skip(self), fields(pool_size = self.config.max_size))]
    pub fn get_connection(&self) -> StorageResult<SqliteConnection> {
        let start = Instant::now();

        match self.pool.get() {
            Ok(conn) => {
                let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                self.metrics.record_connection_acquired(duration_ms);
                debug!("Connection acquired in {}ms", duration_ms);
                Ok(SqliteConnection::new(conn))
            }
            Err(e) => {
                let err_str = e.to_string().to_lowercase();

                if err_str.contains("timed out") || err_str.contains("timeout") {
                    self.metrics.record_connection_timeout();
                    warn!("Connection timeout after {:?}", self.config.connection_timeout);
                    Err(StorageError::Timeout(self.config.connection_timeout.as_secs()))
                } else {
                    self.metrics.record_connection_error();
                    warn!("Connection error: {}", e);
                    Err(StorageError::Connection(format!("Failed to get connection: {e}")))
                }
            }
        }
    }

    /// Check pool health by acquiring a connection
    pub fn health_check(&self) -> HealthStatus {
        let state = self.pool.state();
        let max = self.config.max_size as usize;

        match self.pool.get() {
            Ok(_conn) => {
                HealthStatus::healthy(state.connections as usize, state.idle_connections as usize, max)
            }
            Err(e) => HealthStatus::unhealthy(format!("Pool unhealthy: {e}")),
        }
    }

    /// Snapshot of the pool counters
    pub fn metrics(&self) -> PoolMetrics {
        self.metrics.snapshot()
    }

    /// Shared metrics tracker, used by callers that record query outcomes
    pub fn storage_metrics(&self) -> &Arc<StorageMetrics> {
        &self.metrics
    }

    pub fn config(&self) -> &SqlitePoolConfig {
        &self.config
    }
}
