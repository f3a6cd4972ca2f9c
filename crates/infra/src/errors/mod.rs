//! Infrastructure error conversions

pub mod conversions;

pub use conversions::{map_join_error, map_storage_error, InfraError};
