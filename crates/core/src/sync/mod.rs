//! Full directory sync passes

pub mod ports;
pub mod service;

pub use ports::SyncObserver;
pub use service::SyncService;
