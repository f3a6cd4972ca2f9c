//! Port interfaces for the local user cache
//!
//! These traits define the boundary between core logic and the relational
//! mirror of the directory.

use std::time::Duration;

use async_trait::async_trait;
use dirmirror_domain::{PageRequest, ProfileUpdate, ProfileUpdateOutcome, Result, User, UserPage};

/// Trait for persisting and reading mirrored users
#[async_trait]
pub trait UserCache: Send + Sync {
    /// Insert or fully replace a user, its profile and its type reference.
    ///
    /// One unit of work: either every row is written or none is.
    async fn upsert(&self, user: &User) -> Result<()>;

    /// Like [`UserCache::upsert`], but the unit of work is abandoned unless
    /// it can commit within `deadline`.
    ///
    /// An `Err` means nothing was written; an `Ok` means everything was.
    async fn upsert_within(&self, user: &User, deadline: Duration) -> Result<()>;

    /// Get a user by id
    async fn get_by_id(&self, id: &str) -> Result<Option<User>>;

    /// Get a user by profile email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// One page of users ordered by id
    async fn list(&self, request: PageRequest) -> Result<UserPage>;

    /// Change only the profile attributes named in `update`
    async fn update_profile(&self, id: &str, update: &ProfileUpdate)
        -> Result<ProfileUpdateOutcome>;

    /// Remove a user and its profile. Returns whether a user was removed.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Number of cached users
    async fn count(&self) -> Result<u64>;
}
