//! # dirmirror Domain
//!
//! Data types shared by every dirmirror crate.
//!
//! This crate contains:
//! - Directory record types (`User`, `Profile`, `UserType`) and the raw
//!   `RemoteRecord` they are validated from
//! - The typed partial profile update (`ProfileField`, `ProfileUpdate`)
//! - Listing and sync reporting types
//! - Configuration structures
//! - The domain error type and `Result` alias
//!
//! ## Architecture
//! - No dependencies on other dirmirror crates
//! - No I/O

pub mod config;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
