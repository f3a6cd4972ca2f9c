//! Paginated listing of cached users

use serde::{Deserialize, Serialize};

use super::user::User;
use crate::{MirrorError, Result};

/// A validated 1-based page request.
///
/// Only [`PageRequest::new`] builds one, so `page` and `page_size` are never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    /// # Errors
    /// Returns `MirrorError::Validation` when `page` or `page_size` is zero.
    pub fn new(page: u32, page_size: u32) -> Result<Self> {
        if page == 0 {
            return Err(MirrorError::Validation("page numbers start at 1".into()));
        }
        if page_size == 0 {
            return Err(MirrorError::Validation("page size must be at least 1".into()));
        }
        Ok(Self { page, page_size })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Rows to skip before the window starts.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }
}

/// One window of cached users ordered by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPage {
    pub users: Vec<User>,
    pub page: u32,
    pub page_size: u32,
    pub total_users: u64,
    pub total_pages: u64,
}

impl UserPage {
    pub fn new(request: PageRequest, users: Vec<User>, total_users: u64) -> Self {
        Self {
            users,
            page: request.page,
            page_size: request.page_size,
            total_users,
            total_pages: total_users.div_ceil(u64::from(request.page_size)),
        }
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages
    }
}
