//! In-memory mock for the `DirectoryClient` port

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dirmirror_core::{DirectoryClient, FetchProgress};
use dirmirror_domain::{
    MirrorError, PasswordReset, ProfileUpdate, RemoteRecord, Result as DomainResult,
};
use parking_lot::Mutex;
use serde_json::Value;

/// Scripted directory.
///
/// `list_users` replays the configured pages (reporting progress after each
/// one) or fails with the configured error. Single-record calls operate on a
/// map seeded from the same pages.
#[derive(Default, Clone)]
pub struct MockDirectory {
    pages: Vec<Vec<RemoteRecord>>,
    fetch_error: Option<MirrorError>,
    write_error: Option<MirrorError>,
    users: Arc<Mutex<BTreeMap<String, RemoteRecord>>>,
    remote_calls: Arc<AtomicUsize>,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a page of records
    pub fn with_page(mut self, page: Vec<RemoteRecord>) -> Self {
        {
            let mut users = self.users.lock();
            for record in &page {
                if let Some(id) = record.id() {
                    users.insert(id.to_string(), record.clone());
                }
            }
        }
        self.pages.push(page);
        self
    }

    /// Make `list_users` fail
    pub fn failing_fetch(mut self, error: MirrorError) -> Self {
        self.fetch_error = Some(error);
        self
    }

    /// Make update, delete and reset fail
    pub fn failing_writes(mut self, error: MirrorError) -> Self {
        self.write_error = Some(error);
        self
    }

    pub fn contains(&self, id: &str) -> bool {
        self.users.lock().contains_key(id)
    }

    /// Number of calls that reached the directory
    pub fn calls(&self) -> usize {
        self.remote_calls.load(Ordering::SeqCst)
    }

    fn record_call(&self) {
        self.remote_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn check_writes(&self) -> DomainResult<()> {
        match &self.write_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DirectoryClient for MockDirectory {
    async fn list_users(
        &self,
        progress: Option<&dyn FetchProgress>,
    ) -> DomainResult<Vec<RemoteRecord>> {
        self.record_call();
        if let Some(err) = &self.fetch_error {
            return Err(err.clone());
        }

        let mut records = Vec::new();
        for (page, items) in self.pages.iter().enumerate() {
            records.extend(items.iter().cloned());
            if let Some(progress) = progress {
                progress.on_page(page + 1, records.len());
            }
        }
        Ok(records)
    }

    async fn get_user(&self, id: &str) -> DomainResult<Option<RemoteRecord>> {
        self.record_call();
        Ok(self.users.lock().get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> DomainResult<Option<RemoteRecord>> {
        self.record_call();
        Ok(self
            .users
            .lock()
            .values()
            .find(|record| record.as_value()["profile"]["email"].as_str() == Some(email))
            .cloned())
    }

    async fn update_profile(
        &self,
        id: &str,
        update: &ProfileUpdate,
    ) -> DomainResult<RemoteRecord> {
        self.record_call();
        self.check_writes()?;

        let mut users = self.users.lock();
        let record = users
            .get_mut(id)
            .ok_or_else(|| MirrorError::RemoteUnavailable("HTTP 404 Not Found".into()))?;

        let mut value = record.as_value().clone();
        if let (Some(profile), Value::Object(changes)) =
            (value.get_mut("profile").and_then(Value::as_object_mut), update.to_json())
        {
            profile.extend(changes);
        }
        *record = RemoteRecord::new(value);
        Ok(record.clone())
    }

    async fn delete_user(&self, id: &str) -> DomainResult<()> {
        self.record_call();
        self.check_writes()?;
        match self.users.lock().remove(id) {
            Some(_) => Ok(()),
            None => Err(MirrorError::RemoteUnavailable("HTTP 404 Not Found".into())),
        }
    }

    async fn reset_password(&self, id: &str) -> DomainResult<PasswordReset> {
        self.record_call();
        self.check_writes()?;
        if !self.contains(id) {
            return Err(MirrorError::RemoteUnavailable("HTTP 404 Not Found".into()));
        }
        Ok(PasswordReset {
            summary: Some("Reset password without sending email".into()),
            reset_password_url: Some(format!("https://directory.test/reset_password/{id}")),
        })
    }
}
