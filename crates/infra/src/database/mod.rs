//! Database implementations

pub mod manager;
pub mod user_repository;

pub use manager::DbManager;
pub use user_repository::SqliteUserCache;
