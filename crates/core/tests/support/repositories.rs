//! In-memory mock for the `UserCache` port

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dirmirror_core::UserCache;
use dirmirror_domain::{
    MirrorError, PageRequest, ProfileUpdate, ProfileUpdateOutcome, Result as DomainResult, User,
    UserPage,
};
use parking_lot::Mutex;

/// In-memory `UserCache`.
///
/// Ids registered with [`MockUserCache::fail_upsert_for`] fail with a storage
/// error, and [`MockUserCache::with_delay`] makes every upsert slow so
/// concurrency and timeouts can be observed.
#[derive(Default, Clone)]
pub struct MockUserCache {
    users: Arc<Mutex<BTreeMap<String, User>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    delay: Option<Duration>,
    upserts: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockUserCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, user: User) -> Self {
        self.users.lock().insert(user.id.clone(), user);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fail_upsert_for(self, id: &str) -> Self {
        self.failing.lock().insert(id.to_string());
        self
    }

    pub fn stored(&self, id: &str) -> Option<User> {
        self.users.lock().get(id).cloned()
    }

    pub fn ids(&self) -> Vec<String> {
        self.users.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.users.lock().len()
    }

    /// Upsert calls received, successful or not
    pub fn upsert_calls(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Writes that outlive `deadline` are abandoned without storing anything.
    async fn write(&self, user: &User, deadline: Option<Duration>) -> DomainResult<()> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let result = if deadline.is_some_and(|limit| self.delay.is_some_and(|d| d > limit)) {
            Err(MirrorError::Storage(format!("write for {} exceeded its deadline", user.id)))
        } else if self.failing.lock().contains(&user.id) {
            Err(MirrorError::Storage(format!("constraint failed for {}", user.id)))
        } else {
            self.users.lock().insert(user.id.clone(), user.clone());
            Ok(())
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl UserCache for MockUserCache {
    async fn upsert(&self, user: &User) -> DomainResult<()> {
        self.write(user, None).await
    }

    async fn upsert_within(&self, user: &User, deadline: Duration) -> DomainResult<()> {
        self.write(user, Some(deadline)).await
    }

    async fn get_by_id(&self, id: &str) -> DomainResult<Option<User>> {
        Ok(self.stored(id))
    }

    async fn get_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .values()
            .find(|user| user.profile.email.as_deref() == Some(email))
            .cloned())
    }

    async fn list(&self, request: PageRequest) -> DomainResult<UserPage> {
        let users = self.users.lock();
        let window = users
            .values()
            .skip(usize::try_from(request.offset()).unwrap_or(usize::MAX))
            .take(request.page_size() as usize)
            .cloned()
            .collect();
        Ok(UserPage::new(request, window, users.len() as u64))
    }

    async fn update_profile(
        &self,
        id: &str,
        update: &ProfileUpdate,
    ) -> DomainResult<ProfileUpdateOutcome> {
        if update.is_empty() {
            return Ok(ProfileUpdateOutcome::NoRecognizedFields);
        }
        let mut users = self.users.lock();
        let Some(user) = users.get_mut(id) else {
            return Ok(ProfileUpdateOutcome::NotCached);
        };
        update.apply_to(&mut user.profile);
        Ok(ProfileUpdateOutcome::Applied { fields: update.len() })
    }

    async fn delete(&self, id: &str) -> DomainResult<bool> {
        Ok(self.users.lock().remove(id).is_some())
    }

    async fn count(&self) -> DomainResult<u64> {
        Ok(self.users.lock().len() as u64)
    }
}
