//! # dirmirror Core
//!
//! Sync and lookup logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces for the directory API and the local cache (traits)
//! - The sync pass orchestrator
//! - Single-record user operations
//!
//! ## Architecture Principles
//! - Only depends on `dirmirror-domain`
//! - No database or HTTP code
//! - All external dependencies via traits

pub mod directory;
pub mod sync;
pub mod user;

pub use directory::{DirectoryClient, FetchProgress};
pub use sync::{SyncObserver, SyncService};
pub use user::{validate_email, ProfileUpdateResult, UserCache, UserService};
