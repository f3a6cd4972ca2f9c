//! Directory API adapters

pub mod client;
pub mod link;
pub mod pagination;

pub use client::DirectoryApiClient;
pub use pagination::{Page, PaginatedFetcher};
