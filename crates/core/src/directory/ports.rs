//! Port interfaces for the remote directory
//!
//! The directory API is the source of truth. Implementations live in the
//! infrastructure layer and speak HTTP; core code only sees these traits.

use async_trait::async_trait;
use dirmirror_domain::{PasswordReset, ProfileUpdate, RemoteRecord, Result};

/// Side channel for fetch progress, called after every page.
pub trait FetchProgress: Send + Sync {
    /// `pages` pages have been read so far, holding `records` records in total.
    fn on_page(&self, pages: usize, records: usize);
}

impl<F> FetchProgress for F
where
    F: Fn(usize, usize) + Send + Sync,
{
    fn on_page(&self, pages: usize, records: usize) {
        self(pages, records);
    }
}

/// Trait for reading and changing users in the remote directory
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Enumerate the whole user collection, following pagination to the end.
    ///
    /// All or nothing: any failure on any page returns an error and no
    /// records.
    async fn list_users(&self, progress: Option<&dyn FetchProgress>) -> Result<Vec<RemoteRecord>>;

    /// Get one user by id. An unknown id is `Ok(None)`.
    async fn get_user(&self, id: &str) -> Result<Option<RemoteRecord>>;

    /// Get the first user whose profile email matches.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<RemoteRecord>>;

    /// Apply a partial profile update and return the updated record.
    async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<RemoteRecord>;

    /// Delete a user
    async fn delete_user(&self, id: &str) -> Result<()>;

    /// Start a password reset for a user
    async fn reset_password(&self, id: &str) -> Result<PasswordReset>;
}
