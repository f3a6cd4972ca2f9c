//! Directory user types
//!
//! The cached view of a directory user. Field names serialize in camelCase so
//! a cached record has the same shape as the record the directory API returns.

use serde::{Deserialize, Serialize};

/// A directory user together with its profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Remote-assigned identifier, immutable once created.
    pub id: String,
    /// Lifecycle status as reported by the directory (opaque).
    pub status: Option<String>,
    pub created: Option<String>,
    pub activated: Option<String>,
    pub status_changed: Option<String>,
    pub last_login: Option<String>,
    pub last_updated: Option<String>,
    pub password_changed: Option<String>,
    #[serde(rename = "type")]
    pub user_type: Option<UserType>,
    #[serde(default)]
    pub profile: Profile,
}

/// Reference to a directory user type. Owned by the directory, never by a user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserType {
    pub id: String,
}

/// Profile attributes mirrored for each user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub second_email: Option<String>,
    pub login: Option<String>,
    pub mobile_phone: Option<String>,
    pub placement_org: Option<String>,
    pub portal_access_group: Option<String>,
    pub report_group_list: Option<Vec<String>>,
    pub ack_new_business: Option<bool>,
}

impl User {
    /// Identifier of the referenced user type, if any.
    pub fn type_id(&self) -> Option<&str> {
        self.user_type.as_ref().map(|t| t.id.as_str())
    }
}

impl Profile {
    /// True when every profile attribute is absent.
    ///
    /// A user looked up without a stored profile row yields an empty profile.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
