//! HTTP transport shared by the directory adapters

pub mod client;

pub use client::{HttpClient, HttpClientBuilder};
