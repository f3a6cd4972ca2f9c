//! Directory API boundary

pub mod ports;

pub use ports::{DirectoryClient, FetchProgress};
