//! Database connection manager backed by the shared SQLite pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dirmirror_common::storage::sqlite::{SqliteConnection, SqlitePool, SqlitePoolConfig};
use dirmirror_common::storage::{HealthStatus, PoolMetrics, StorageError, StorageResult};
use dirmirror_domain::{DatabaseConfig, MirrorError, Result};
use parking_lot::Mutex;
use rusqlite::{params, Transaction};
use tracing::{debug, info, warn};

use crate::errors::{map_storage_error, InfraError};

const SCHEMA_VERSION: i32 = 1;
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Database manager that wraps an [`SqlitePool`].
///
/// Reads take any pooled connection. Writes go through
/// [`DbManager::with_write_tx`], which admits one transaction at a time.
pub struct DbManager {
    pool: Arc<SqlitePool>,
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl DbManager {
    /// Create a new manager with the given pool size.
    pub fn new<P: AsRef<Path>>(db_path: P, pool_size: u32) -> Result<Self> {
        let path = db_path.as_ref().to_path_buf();
        let config = SqlitePoolConfig::with_max_size(pool_size);

        let pool = SqlitePool::new(&path, config).map_err(map_storage_error)?;

        info!(
            db_path = %path.display(),
            max_connections = pool.storage_metrics().max_pool_size(),
            "sqlite pool initialised"
        );

        Ok(Self { pool: Arc::new(pool), path, write_lock: Mutex::new(()) })
    }

    /// Open the database described by `config` and bring its schema up to date.
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        if config.pool_size == 0 {
            return Err(MirrorError::Config("database pool size must be at least 1".into()));
        }
        let manager = Self::new(&config.path, config.pool_size)?;
        manager.run_migrations()?;
        Ok(manager)
    }

    /// Borrow the underlying pool.
    pub fn pool(&self) -> &Arc<SqlitePool> {
        &self.pool
    }

    /// Acquire a connection from the pool.
    pub fn get_connection(&self) -> Result<SqliteConnection> {
        self.pool.get_connection().map_err(map_storage_error)
    }

    /// Run `work` inside a single `BEGIN IMMEDIATE` transaction.
    ///
    /// Commits when `work` returns `Ok`; any error rolls the whole unit back.
    /// Only one write transaction runs at a time per manager.
    pub fn with_write_tx<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> StorageResult<T>,
    {
        self.run_write_tx(None, work)
    }

    /// Like [`DbManager::with_write_tx`], but rolls back instead of
    /// committing once `deadline` has passed.
    ///
    /// The clock starts when this call becomes the active writer, so time
    /// spent queued behind other writers on this manager does not count.
    /// Waiting on another process's lock does. The returned result always
    /// matches what was persisted.
    pub fn with_write_tx_within<T, F>(&self, deadline: Duration, work: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> StorageResult<T>,
    {
        self.run_write_tx(Some(deadline), work)
    }

    fn run_write_tx<T, F>(&self, deadline: Option<Duration>, work: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> StorageResult<T>,
    {
        let _writer = self.write_lock.lock();
        let started = Instant::now();
        let metrics = self.pool.storage_metrics();

        let mut conn = self.get_connection()?;
        let outcome = conn.immediate_transaction().and_then(|tx| {
            let value = work(&tx)?;
            if let Some(limit) = deadline.filter(|limit| started.elapsed() > *limit) {
                // Dropping `tx` rolls it back.
                return Err(StorageError::DeadlineExceeded(limit));
            }
            tx.commit()?;
            Ok(value)
        });

        match outcome {
            Ok(value) => {
                metrics.record_write_committed();
                Ok(value)
            }
            Err(err) => {
                metrics.record_write_failed();
                warn!(error = %err, "write transaction rolled back");
                Err(map_storage_error(err))
            }
        }
    }

    /// Ensure the full schema exists on the current database.
    pub fn run_migrations(&self) -> Result<()> {
        let conn = self.get_connection()?;
        create_schema(&conn)?;
        debug!(version = SCHEMA_VERSION, "schema up to date");
        Ok(())
    }

    /// Return the configured database path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Perform a health check to verify database connectivity.
    pub fn health_check(&self) -> Result<()> {
        match self.pool.health_check() {
            HealthStatus { healthy: true, .. } => {
                let conn = self.get_connection()?;
                conn.query_row("SELECT 1", params![], |row| row.get::<_, i32>(0))
                    .map_err(map_storage_error)?;
                Ok(())
            }
            HealthStatus { message, .. } => Err(MirrorError::Storage(
                message.unwrap_or_else(|| "database pool unhealthy".into()),
            )),
        }
    }

    /// Snapshot of pool and write counters.
    pub fn metrics(&self) -> PoolMetrics {
        self.pool.metrics()
    }
}

fn create_schema(conn: &SqliteConnection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL).map_err(map_sql_error)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?, CAST(strftime('%s','now') AS INTEGER))",
        params![SCHEMA_VERSION],
    )
    .map_err(map_storage_error)?;
    Ok(())
}

fn map_sql_error(err: rusqlite::Error) -> MirrorError {
    MirrorError::from(InfraError::from(err))
}
