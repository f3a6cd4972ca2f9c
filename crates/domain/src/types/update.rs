//! Partial profile updates
//!
//! Only the attributes listed in [`ProfileField`] can be updated. A
//! [`ProfileUpdate`] carries the subset of those attributes a caller supplied;
//! everything else is left untouched, unlike a full upsert.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::remote::{Flag, OneOrMany};
use super::user::Profile;
use crate::{MirrorError, Result};

/// Profile attributes that may be updated individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProfileField {
    FirstName,
    LastName,
    Email,
    SecondEmail,
    Login,
    MobilePhone,
    PlacementOrg,
    PortalAccessGroup,
    ReportGroupList,
    AckNewBusiness,
}

/// Value shape accepted by a [`ProfileField`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    List,
    Flag,
}

/// New value for one profile attribute. `None` clears the attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileValue {
    Text(Option<String>),
    List(Option<Vec<String>>),
    Flag(Option<bool>),
}

impl ProfileField {
    pub const ALL: [Self; 10] = [
        Self::FirstName,
        Self::LastName,
        Self::Email,
        Self::SecondEmail,
        Self::Login,
        Self::MobilePhone,
        Self::PlacementOrg,
        Self::PortalAccessGroup,
        Self::ReportGroupList,
        Self::AckNewBusiness,
    ];

    /// Attribute name used by the directory API and by the cache column.
    pub fn key(self) -> &'static str {
        match self {
            Self::FirstName => "firstName",
            Self::LastName => "lastName",
            Self::Email => "email",
            Self::SecondEmail => "secondEmail",
            Self::Login => "login",
            Self::MobilePhone => "mobilePhone",
            Self::PlacementOrg => "placementOrg",
            Self::PortalAccessGroup => "portalAccessGroup",
            Self::ReportGroupList => "reportGroupList",
            Self::AckNewBusiness => "ackNewBusiness",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Self::ReportGroupList => FieldKind::List,
            Self::AckNewBusiness => FieldKind::Flag,
            _ => FieldKind::Text,
        }
    }
}

impl ProfileValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Text(_) => FieldKind::Text,
            Self::List(_) => FieldKind::List,
            Self::Flag(_) => FieldKind::Flag,
        }
    }

    fn from_json(field: ProfileField, value: Value) -> Result<Self> {
        let invalid = |e: serde_json::Error| {
            MirrorError::Validation(format!("invalid value for '{}': {e}", field.key()))
        };

        match field.kind() {
            FieldKind::Text => {
                serde_json::from_value::<Option<String>>(value).map(Self::Text).map_err(invalid)
            }
            FieldKind::List => serde_json::from_value::<Option<OneOrMany>>(value)
                .map(|v| Self::List(v.map(OneOrMany::into_vec)))
                .map_err(invalid),
            FieldKind::Flag => serde_json::from_value::<Option<Flag>>(value)
                .map(|v| Self::Flag(v.map(Flag::into_bool)))
                .map_err(invalid),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Self::Text(v) => v.clone().map_or(Value::Null, Value::String),
            Self::List(v) => v
                .clone()
                .map_or(Value::Null, |items| Value::Array(items.into_iter().map(Value::String).collect())),
            Self::Flag(v) => v.map_or(Value::Null, Value::Bool),
        }
    }
}

/// Typed subset of profile attributes to change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    values: BTreeMap<ProfileField, ProfileValue>,
    ignored: Vec<String>,
}

impl ProfileUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one attribute.
    ///
    /// # Errors
    /// Returns `MirrorError::Validation` when the value shape does not match
    /// the attribute (e.g. a list for `firstName`).
    pub fn set(mut self, field: ProfileField, value: ProfileValue) -> Result<Self> {
        if field.kind() != value.kind() {
            return Err(MirrorError::Validation(format!(
                "'{}' expects a {:?} value, got {:?}",
                field.key(),
                field.kind(),
                value.kind()
            )));
        }
        self.values.insert(field, value);
        Ok(self)
    }

    /// Shorthand for setting a text attribute to a value.
    pub fn with_text(mut self, field: ProfileField, value: impl Into<String>) -> Self {
        if field.kind() == FieldKind::Text {
            self.values.insert(field, ProfileValue::Text(Some(value.into())));
        }
        self
    }

    /// Build an update from a JSON object keyed by attribute name.
    ///
    /// Keys outside the allow-list are skipped and remembered in
    /// [`ProfileUpdate::ignored_keys`].
    ///
    /// # Errors
    /// Returns `MirrorError::Validation` when the payload is not an object or
    /// a known attribute has a value of the wrong shape.
    pub fn from_json(payload: Value) -> Result<Self> {
        let Value::Object(map) = payload else {
            return Err(MirrorError::Validation("profile update must be a JSON object".into()));
        };

        let mut update = Self::default();
        for (key, value) in map {
            match ProfileField::from_key(&key) {
                Some(field) => {
                    let value = ProfileValue::from_json(field, value)?;
                    update.values.insert(field, value);
                }
                None => update.ignored.push(key),
            }
        }
        Ok(update)
    }

    /// Parse a caller-supplied JSON document into an update.
    ///
    /// # Errors
    /// Returns `MirrorError::Validation` when the text is not valid JSON or
    /// fails [`ProfileUpdate::from_json`].
    pub fn from_json_str(payload: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(payload)
            .map_err(|e| MirrorError::Validation(format!("invalid profile JSON: {e}")))?;
        Self::from_json(value)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, field: ProfileField) -> Option<&ProfileValue> {
        self.values.get(&field)
    }

    pub fn contains(&self, field: ProfileField) -> bool {
        self.values.contains_key(&field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (ProfileField, &ProfileValue)> {
        self.values.iter().map(|(field, value)| (*field, value))
    }

    /// Keys supplied by the caller that are not updatable attributes.
    pub fn ignored_keys(&self) -> &[String] {
        &self.ignored
    }

    /// Profile object sent to the directory API.
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .values
            .iter()
            .map(|(field, value)| (field.key().to_string(), value.to_json()))
            .collect();
        Value::Object(map)
    }

    /// Apply the update to an in-memory profile.
    pub fn apply_to(&self, profile: &mut Profile) {
        for (field, value) in &self.values {
            match (field, value.clone()) {
                (ProfileField::FirstName, ProfileValue::Text(v)) => profile.first_name = v,
                (ProfileField::LastName, ProfileValue::Text(v)) => profile.last_name = v,
                (ProfileField::Email, ProfileValue::Text(v)) => profile.email = v,
                (ProfileField::SecondEmail, ProfileValue::Text(v)) => profile.second_email = v,
                (ProfileField::Login, ProfileValue::Text(v)) => profile.login = v,
                (ProfileField::MobilePhone, ProfileValue::Text(v)) => profile.mobile_phone = v,
                (ProfileField::PlacementOrg, ProfileValue::Text(v)) => profile.placement_org = v,
                (ProfileField::PortalAccessGroup, ProfileValue::Text(v)) => {
                    profile.portal_access_group = v;
                }
                (ProfileField::ReportGroupList, ProfileValue::List(v)) => {
                    profile.report_group_list = v;
                }
                (ProfileField::AckNewBusiness, ProfileValue::Flag(v)) => {
                    profile.ack_new_business = v;
                }
                // `set` and `from_json` never pair a field with a foreign kind
                _ => {}
            }
        }
    }
}

/// Result of applying a [`ProfileUpdate`] to the local cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileUpdateOutcome {
    /// The stored profile was changed.
    Applied { fields: usize },
    /// The update named no updatable attribute; nothing was written.
    NoRecognizedFields,
    /// No profile is cached for the id; nothing was written.
    NotCached,
}
