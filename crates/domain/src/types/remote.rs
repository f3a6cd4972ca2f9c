//! Records as received from the directory API
//!
//! A `RemoteRecord` is the untouched JSON object for one user. It is validated
//! into a [`User`] exactly once, when it crosses into the cache. Unknown
//! attributes (`_links`, `credentials`, custom profile keys) are ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::user::{Profile, User, UserType};
use crate::{MirrorError, Result};

/// One raw user object returned by the directory API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteRecord(Value);

impl RemoteRecord {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Best-effort identifier, available even when the record is malformed.
    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Validate the record into a [`User`].
    ///
    /// # Errors
    /// Returns `MirrorError::Validation` when the record is not an object,
    /// lacks a non-empty `id`, or carries a known attribute of the wrong type.
    pub fn into_user(self) -> Result<User> {
        User::try_from(self)
    }
}

impl From<Value> for RemoteRecord {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl TryFrom<RemoteRecord> for User {
    type Error = MirrorError;

    fn try_from(record: RemoteRecord) -> Result<Self> {
        if !record.0.is_object() {
            return Err(MirrorError::Validation("user record is not a JSON object".into()));
        }

        let wire: WireUser = serde_json::from_value(record.0)
            .map_err(|e| MirrorError::Validation(format!("malformed user record: {e}")))?;

        let id = wire.id.trim();
        if id.is_empty() {
            return Err(MirrorError::Validation("user record has an empty id".into()));
        }

        let profile = wire.profile.unwrap_or_default();

        Ok(User {
            id: id.to_string(),
            status: wire.status,
            created: wire.created,
            activated: wire.activated,
            status_changed: wire.status_changed,
            last_login: wire.last_login,
            last_updated: wire.last_updated,
            password_changed: wire.password_changed,
            user_type: wire
                .user_type
                .and_then(|t| t.id)
                .filter(|id| !id.is_empty())
                .map(|id| UserType { id }),
            profile: Profile {
                first_name: profile.first_name,
                last_name: profile.last_name,
                email: profile.email,
                second_email: profile.second_email,
                login: profile.login,
                mobile_phone: profile.mobile_phone,
                placement_org: profile.placement_org,
                portal_access_group: profile.portal_access_group,
                report_group_list: profile.report_group_list.map(OneOrMany::into_vec),
                ack_new_business: profile.ack_new_business.map(Flag::into_bool),
            },
        })
    }
}

/// Summary returned by a password reset request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordReset {
    pub summary: Option<String>,
    pub reset_password_url: Option<String>,
}

/// How a single user is addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserKey {
    Id(String),
    Email(String),
}

/// Where a single-record operation is served from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// The local mirror.
    #[default]
    Local,
    /// The directory API (source of truth).
    Remote,
}

// =============================================================================
// Wire shapes
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUser {
    id: String,
    status: Option<String>,
    created: Option<String>,
    activated: Option<String>,
    status_changed: Option<String>,
    last_login: Option<String>,
    last_updated: Option<String>,
    password_changed: Option<String>,
    #[serde(rename = "type")]
    user_type: Option<WireUserType>,
    profile: Option<WireProfile>,
}

#[derive(Debug, Deserialize)]
struct WireUserType {
    id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireProfile {
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    second_email: Option<String>,
    login: Option<String>,
    mobile_phone: Option<String>,
    placement_org: Option<String>,
    portal_access_group: Option<String>,
    report_group_list: Option<OneOrMany>,
    ack_new_business: Option<Flag>,
}

/// The directory sends list attributes either as an array or a bare string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub(crate) fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

/// Flags arrive as booleans or as 0/1 integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub(crate) enum Flag {
    Bool(bool),
    Int(i64),
}

impl Flag {
    pub(crate) fn into_bool(self) -> bool {
        match self {
            Self::Bool(value) => value,
            Self::Int(value) => value != 0,
        }
    }
}
