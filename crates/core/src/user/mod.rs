//! Cached users and the single-record operations on them

pub mod ports;
pub mod service;

pub use ports::UserCache;
pub use service::{validate_email, ProfileUpdateResult, UserService};
