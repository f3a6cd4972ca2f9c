//! Storage utilities shared across dirmirror crates.
//!
//! # Safety and Quality
//!
//! This crate holds the SQLite plumbing used by the infrastructure layer:
//! an r2d2 connection pool, the pooled connection wrapper, per-connection
//! pragmas and [`storage::StorageError`]. It knows nothing about users or
//! the directory API.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod storage;

pub use storage::{StorageError, StorageResult};
