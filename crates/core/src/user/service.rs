//! Single-record user operations
//!
//! Reads are served from the local mirror or the directory. Writes always go
//! to the directory first and are then applied to the mirror, so the mirror
//! never holds a change the directory rejected.

use std::sync::Arc;

use dirmirror_domain::{
    MirrorError, PageRequest, PasswordReset, ProfileUpdate, ProfileUpdateOutcome, RemoteRecord,
    Result, Source, User, UserKey, UserPage,
};
use tracing::{debug, info, instrument, warn};

use super::ports::UserCache;
use crate::directory::DirectoryClient;

/// Outcome of a profile update that reached the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdateResult {
    /// The record as returned by the directory after the update.
    pub remote: User,
    /// What happened to the cached copy.
    pub local: ProfileUpdateOutcome,
}

/// User lookup, update, delete and password reset
pub struct UserService {
    directory: Arc<dyn DirectoryClient>,
    cache: Arc<dyn UserCache>,
}

impl UserService {
    pub fn new(directory: Arc<dyn DirectoryClient>, cache: Arc<dyn UserCache>) -> Self {
        Self { directory, cache }
    }

    /// Look up a single user.
    ///
    /// A remote hit is written through to the cache before it is returned.
    #[instrument(skip(self))]
    pub async fn lookup(&self, key: &UserKey, source: Source) -> Result<Option<User>> {
        match (source, key) {
            (Source::Local, UserKey::Id(id)) => self.cache.get_by_id(validate_id(id)?).await,
            (Source::Local, UserKey::Email(email)) => {
                self.cache.get_by_email(validate_email(email)?).await
            }
            (Source::Remote, UserKey::Id(id)) => {
                let record = self.directory.get_user(validate_id(id)?).await?;
                self.write_through(record).await
            }
            (Source::Remote, UserKey::Email(email)) => {
                let record = self.directory.find_user_by_email(validate_email(email)?).await?;
                self.write_through(record).await
            }
        }
    }

    /// One page of cached users
    pub async fn list(&self, page: u32, page_size: u32) -> Result<UserPage> {
        let request = PageRequest::new(page, page_size)?;
        self.cache.list(request).await
    }

    /// Update profile attributes in the directory, then in the cache.
    #[instrument(skip(self, update), fields(fields = update.len()))]
    pub async fn update_profile(
        &self,
        id: &str,
        update: &ProfileUpdate,
    ) -> Result<ProfileUpdateResult> {
        let id = validate_id(id)?;
        if update.is_empty() {
            return Err(MirrorError::Validation(
                "profile update names no updatable attribute".into(),
            ));
        }

        let remote = self.directory.update_profile(id, update).await?.into_user()?;
        info!(user_id = id, "profile updated in directory");

        let local = self.cache.update_profile(id, update).await?;
        match local {
            ProfileUpdateOutcome::Applied { fields } => {
                debug!(user_id = id, fields, "profile update applied to cache");
            }
            ProfileUpdateOutcome::NotCached => {
                debug!(user_id = id, "user not cached; cache left unchanged");
            }
            ProfileUpdateOutcome::NoRecognizedFields => {}
        }

        Ok(ProfileUpdateResult { remote, local })
    }

    /// Parse a JSON object of profile attributes and apply it.
    pub async fn update_profile_json(&self, id: &str, payload: &str) -> Result<ProfileUpdateResult> {
        let update = ProfileUpdate::from_json_str(payload)?;
        if !update.ignored_keys().is_empty() {
            warn!(ignored = ?update.ignored_keys(), "ignoring attributes that cannot be updated");
        }
        self.update_profile(id, &update).await
    }

    /// Delete a user from the directory, then from the cache.
    ///
    /// Returns whether a cached copy was removed.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let id = validate_id(id)?;
        self.directory.delete_user(id).await?;
        info!(user_id = id, "user deleted from directory");
        self.cache.delete(id).await
    }

    /// Delete the cached user with this email, resolving its id locally.
    ///
    /// Returns the id that was deleted.
    #[instrument(skip(self))]
    pub async fn delete_by_email(&self, email: &str) -> Result<String> {
        let email = validate_email(email)?;
        let user = self
            .cache
            .get_by_email(email)
            .await?
            .ok_or_else(|| MirrorError::NotFound(format!("no cached user with email {email}")))?;

        self.delete(&user.id).await?;
        Ok(user.id)
    }

    /// Ask the directory to start a password reset
    #[instrument(skip(self))]
    pub async fn reset_password(&self, id: &str) -> Result<PasswordReset> {
        let id = validate_id(id)?;
        let reset = self.directory.reset_password(id).await?;
        info!(user_id = id, "password reset requested");
        Ok(reset)
    }

    async fn write_through(&self, record: Option<RemoteRecord>) -> Result<Option<User>> {
        let Some(record) = record else {
            return Ok(None);
        };
        let user = record.into_user()?;
        self.cache.upsert(&user).await?;
        debug!(user_id = %user.id, "remote user written through to cache");
        Ok(Some(user))
    }
}

/// Directory ids are opaque tokens of ASCII letters, digits, `-` and `_`.
/// Anything else could change the meaning of the URL the id is placed in.
fn validate_id(id: &str) -> Result<&str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(MirrorError::Validation("user id is empty".into()));
    }
    if let Some(bad) = id.chars().find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))) {
        return Err(MirrorError::Validation(format!("user id '{id}' contains '{bad}'")));
    }
    Ok(id)
}

/// Check an email address before it is used in a lookup or a filter.
///
/// The address ends up inside a quoted filter expression, so quotes are
/// rejected outright.
///
/// # Errors
/// Returns `MirrorError::Validation` for an empty address, one without `@`,
/// or one containing `"`.
pub fn validate_email(email: &str) -> Result<&str> {
    let email = email.trim();
    if email.is_empty() {
        return Err(MirrorError::Validation("email is empty".into()));
    }
    if !email.contains('@') {
        return Err(MirrorError::Validation(format!("'{email}' is not an email address")));
    }
    if email.contains('"') {
        return Err(MirrorError::Validation("email must not contain '\"'".into()));
    }
    Ok(email)
}
