//! # dirmirror Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The SQLite user cache and its connection manager
//! - The directory API client and cursor pagination
//! - Error conversions from external crates
//! - Configuration loading and tracing setup
//!
//! ## Architecture
//! - Implements traits defined in `dirmirror-core`
//! - Depends on `dirmirror-common` for pooled SQLite access
//! - Contains all "impure" code (database and network I/O)

pub mod config;
pub mod database;
pub mod directory;
pub mod errors;
pub mod http;
pub mod observability;

// Re-export commonly used items
pub use database::{DbManager, SqliteUserCache};
pub use directory::{DirectoryApiClient, PaginatedFetcher};
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use observability::init_tracing;
