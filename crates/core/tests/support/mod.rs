//! Shared test helpers for `dirmirror-core` integration tests.
//!
//! In-memory stand-ins for the directory API and the user cache so service
//! tests can focus on behaviour instead of I/O.

#![allow(dead_code)]

pub mod directory;
pub mod repositories;

use dirmirror_domain::RemoteRecord;
use serde_json::json;

/// Minimal remote record with a first name.
pub fn remote_user(id: &str, first_name: &str) -> RemoteRecord {
    RemoteRecord::new(json!({
        "id": id,
        "status": "ACTIVE",
        "type": {"id": "oty-default"},
        "profile": {
            "firstName": first_name,
            "email": format!("{}@example.com", id),
            "login": format!("{}@example.com", id)
        }
    }))
}
