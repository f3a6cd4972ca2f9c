//! Storage primitives for SQLite databases
//!
//! Connection pooling, per-connection pragmas, metrics and the storage error
//! type shared by the infrastructure layer.

pub mod error;
pub mod metrics;
pub mod sqlite;
pub mod types;

// Re-export commonly used types
pub use error::{StorageError, StorageResult};
pub use metrics::StorageMetrics;
pub use sqlite::{
    apply_connection_pragmas, SqliteConnection, SqlitePool, SqlitePoolConfig, SqliteStatement,
};
pub use types::{HealthStatus, PoolMetrics};
