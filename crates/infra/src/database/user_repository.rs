//! User cache implementation using SQLite
//!
//! Users live in three tables: `user`, `profile` (one row per user, cascade
//! deleted) and `user_type` (shared, never deleted here). Every write is one
//! transaction through [`DbManager::with_write_tx`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dirmirror_common::storage::error::StorageError;
use dirmirror_common::storage::StorageResult;
use dirmirror_core::user::ports::UserCache;
use dirmirror_domain::{
    PageRequest, Profile, ProfileField, ProfileUpdate, ProfileUpdateOutcome, ProfileValue,
    Result as DomainResult, User, UserPage, UserType,
};
use rusqlite::types::{Type, Value};
use rusqlite::{params, Row, ToSql, Transaction};
use tokio::task;
use tracing::debug;

use super::manager::DbManager;
use crate::errors::{map_join_error, map_storage_error};

const SELECT_USER: &str = "SELECT u.id, u.status, u.created, u.activated, u.statusChanged,
            u.lastLogin, u.lastUpdated, u.passwordChanged, u.type_id,
            p.firstName, p.lastName, p.email, p.secondEmail, p.login, p.mobilePhone,
            p.placementOrg, p.portalAccessGroup, p.reportGroupList, p.ackNewBusiness
     FROM user u
     LEFT JOIN profile p ON p.user_id = u.id";

const UPSERT_USER: &str = "INSERT INTO user (id, status, created, activated, statusChanged,
            lastLogin, lastUpdated, passwordChanged, placementOrg, type_id)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
     ON CONFLICT(id) DO UPDATE SET
            status = excluded.status,
            created = excluded.created,
            activated = excluded.activated,
            statusChanged = excluded.statusChanged,
            lastLogin = excluded.lastLogin,
            lastUpdated = excluded.lastUpdated,
            passwordChanged = excluded.passwordChanged,
            placementOrg = excluded.placementOrg,
            type_id = excluded.type_id";

const UPSERT_PROFILE: &str = "INSERT INTO profile (user_id, firstName, lastName, mobilePhone,
            portalAccessGroup, secondEmail, reportGroupList, ackNewBusiness, login, email,
            placementOrg)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
     ON CONFLICT(user_id) DO UPDATE SET
            firstName = excluded.firstName,
            lastName = excluded.lastName,
            mobilePhone = excluded.mobilePhone,
            portalAccessGroup = excluded.portalAccessGroup,
            secondEmail = excluded.secondEmail,
            reportGroupList = excluded.reportGroupList,
            ackNewBusiness = excluded.ackNewBusiness,
            login = excluded.login,
            email = excluded.email,
            placementOrg = excluded.placementOrg";

// Each column keeps its stored value unless its `:set_*` flag is 1.
const UPDATE_PROFILE: &str = "UPDATE profile SET
            firstName = CASE WHEN :set_firstName THEN :firstName ELSE firstName END,
            lastName = CASE WHEN :set_lastName THEN :lastName ELSE lastName END,
            email = CASE WHEN :set_email THEN :email ELSE email END,
            secondEmail = CASE WHEN :set_secondEmail THEN :secondEmail ELSE secondEmail END,
            login = CASE WHEN :set_login THEN :login ELSE login END,
            mobilePhone = CASE WHEN :set_mobilePhone THEN :mobilePhone ELSE mobilePhone END,
            placementOrg = CASE WHEN :set_placementOrg THEN :placementOrg ELSE placementOrg END,
            portalAccessGroup = CASE WHEN :set_portalAccessGroup THEN :portalAccessGroup
                                     ELSE portalAccessGroup END,
            reportGroupList = CASE WHEN :set_reportGroupList THEN :reportGroupList
                                   ELSE reportGroupList END,
            ackNewBusiness = CASE WHEN :set_ackNewBusiness THEN :ackNewBusiness
                                  ELSE ackNewBusiness END
     WHERE user_id = :id";

const UPDATE_USER_PLACEMENT: &str = "UPDATE user SET placementOrg = :placementOrg WHERE id = :id";

/// Named parameters of [`UPDATE_PROFILE`], in [`ProfileField::ALL`] order.
const FLAG_PARAMS: [&str; 10] = [
    ":set_firstName",
    ":set_lastName",
    ":set_email",
    ":set_secondEmail",
    ":set_login",
    ":set_mobilePhone",
    ":set_placementOrg",
    ":set_portalAccessGroup",
    ":set_reportGroupList",
    ":set_ackNewBusiness",
];

const VALUE_PARAMS: [&str; 10] = [
    ":firstName",
    ":lastName",
    ":email",
    ":secondEmail",
    ":login",
    ":mobilePhone",
    ":placementOrg",
    ":portalAccessGroup",
    ":reportGroupList",
    ":ackNewBusiness",
];

/// SQLite-backed implementation of `UserCache`
pub struct SqliteUserCache {
    db: Arc<DbManager>,
}

impl SqliteUserCache {
    /// Create a new cache over an already migrated database
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserCache for SqliteUserCache {
    async fn upsert(&self, user: &User) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let user = user.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            db.with_write_tx(|tx| upsert_user(tx, &user))?;
            debug!(user_id = %user.id, "user upserted");
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn upsert_within(&self, user: &User, deadline: Duration) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let user = user.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            db.with_write_tx_within(deadline, |tx| upsert_user(tx, &user))?;
            debug!(user_id = %user.id, "user upserted");
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn get_by_id(&self, id: &str) -> DomainResult<Option<User>> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<User>> {
            let conn = db.get_connection()?;

            let result =
                conn.query_row(&format!("{SELECT_USER} WHERE u.id = ?1"), params![&id], map_user_row);

            match result {
                Ok(user) => Ok(Some(user)),
                Err(StorageError::Rusqlite(rusqlite::Error::QueryReturnedNoRows)) => Ok(None),
                Err(err) => Err(map_storage_error(err)),
            }
        })
        .await
        .map_err(map_join_error)?
    }

    async fn get_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let db = Arc::clone(&self.db);
        let email = email.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<User>> {
            let conn = db.get_connection()?;

            let result = conn.query_row(
                &format!("{SELECT_USER} WHERE p.email = ?1 ORDER BY u.id LIMIT 1"),
                params![&email],
                map_user_row,
            );

            match result {
                Ok(user) => Ok(Some(user)),
                Err(StorageError::Rusqlite(rusqlite::Error::QueryReturnedNoRows)) => Ok(None),
                Err(err) => Err(map_storage_error(err)),
            }
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list(&self, request: PageRequest) -> DomainResult<UserPage> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<UserPage> {
            let conn = db.get_connection()?;

            let total = count_users(&conn).map_err(map_storage_error)?;
            let limit = i64::try_from(request.limit()).unwrap_or(i64::MAX);
            let offset = i64::try_from(request.offset()).unwrap_or(i64::MAX);

            let mut stmt = conn
                .prepare(&format!("{SELECT_USER} ORDER BY u.id LIMIT ?1 OFFSET ?2"))
                .map_err(map_storage_error)?;
            let users = stmt
                .query_map(params![limit, offset], map_user_row)
                .map_err(map_storage_error)?;

            Ok(UserPage::new(request, users, total))
        })
        .await
        .map_err(map_join_error)?
    }

    async fn update_profile(
        &self,
        id: &str,
        update: &ProfileUpdate,
    ) -> DomainResult<ProfileUpdateOutcome> {
        if update.is_empty() {
            return Ok(ProfileUpdateOutcome::NoRecognizedFields);
        }

        let db = Arc::clone(&self.db);
        let id = id.to_string();
        let update = update.clone();

        task::spawn_blocking(move || -> DomainResult<ProfileUpdateOutcome> {
            let changed = db.with_write_tx(|tx| apply_profile_update(tx, &id, &update))?;

            if changed == 0 {
                debug!(user_id = %id, "no cached profile to update");
                return Ok(ProfileUpdateOutcome::NotCached);
            }
            Ok(ProfileUpdateOutcome::Applied { fields: update.len() })
        })
        .await
        .map_err(map_join_error)?
    }

    async fn delete(&self, id: &str) -> DomainResult<bool> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();

        task::spawn_blocking(move || -> DomainResult<bool> {
            let removed = db.with_write_tx(|tx| {
                tx.execute("DELETE FROM profile WHERE user_id = ?1", params![&id])?;
                let users = tx.execute("DELETE FROM user WHERE id = ?1", params![&id])?;
                Ok(users > 0)
            })?;
            debug!(user_id = %id, removed, "user delete applied");
            Ok(removed)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn count(&self) -> DomainResult<u64> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<u64> {
            let conn = db.get_connection()?;
            count_users(&conn).map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

fn count_users(conn: &rusqlite::Connection) -> StorageResult<u64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM user", [], |row| row.get(0))?;
    Ok(u64::try_from(count).unwrap_or_default())
}

fn upsert_user(tx: &Transaction<'_>, user: &User) -> StorageResult<()> {
    let profile = &user.profile;

    if let Some(type_id) = user.type_id() {
        tx.execute("INSERT OR IGNORE INTO user_type (id) VALUES (?1)", params![type_id])?;
    }

    tx.execute(
        UPSERT_USER,
        params![
            &user.id,
            &user.status,
            &user.created,
            &user.activated,
            &user.status_changed,
            &user.last_login,
            &user.last_updated,
            &user.password_changed,
            &profile.placement_org,
            user.type_id(),
        ],
    )?;

    let report_groups = encode_report_groups(profile.report_group_list.as_deref())?;
    tx.execute(
        UPSERT_PROFILE,
        params![
            &user.id,
            &profile.first_name,
            &profile.last_name,
            &profile.mobile_phone,
            &profile.portal_access_group,
            &profile.second_email,
            report_groups,
            profile.ack_new_business,
            &profile.login,
            &profile.email,
            &profile.placement_org,
        ],
    )?;

    Ok(())
}

fn apply_profile_update(
    tx: &Transaction<'_>,
    id: &str,
    update: &ProfileUpdate,
) -> StorageResult<usize> {
    let mut flags = [false; 10];
    let mut values: [Value; 10] = std::array::from_fn(|_| Value::Null);

    for (slot, field) in ProfileField::ALL.into_iter().enumerate() {
        if let Some(value) = update.get(field) {
            flags[slot] = true;
            values[slot] = column_value(value)?;
        }
    }

    let mut named: Vec<(&str, &dyn ToSql)> = Vec::with_capacity(21);
    named.push((":id", &id));
    for slot in 0..ProfileField::ALL.len() {
        named.push((FLAG_PARAMS[slot], &flags[slot]));
        named.push((VALUE_PARAMS[slot], &values[slot]));
    }

    let changed = tx.execute(UPDATE_PROFILE, named.as_slice())?;

    if changed > 0 {
        if let Some(ProfileValue::Text(placement)) = update.get(ProfileField::PlacementOrg) {
            tx.execute(
                UPDATE_USER_PLACEMENT,
                &[(":placementOrg", placement as &dyn ToSql), (":id", &id)][..],
            )?;
        }
    }

    Ok(changed)
}

fn column_value(value: &ProfileValue) -> StorageResult<Value> {
    Ok(match value {
        ProfileValue::Text(text) => text.clone().map_or(Value::Null, Value::Text),
        ProfileValue::List(items) => {
            encode_report_groups(items.as_deref())?.map_or(Value::Null, Value::Text)
        }
        ProfileValue::Flag(flag) => flag.map_or(Value::Null, |f| Value::Integer(i64::from(f))),
    })
}

fn encode_report_groups(groups: Option<&[String]>) -> StorageResult<Option<String>> {
    groups.map(serde_json::to_string).transpose().map_err(StorageError::from)
}

fn decode_report_groups(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Vec<String>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|text| {
        serde_json::from_str(&text)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn map_user_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let type_id: Option<String> = row.get(8)?;

    Ok(User {
        id: row.get(0)?,
        status: row.get(1)?,
        created: row.get(2)?,
        activated: row.get(3)?,
        status_changed: row.get(4)?,
        last_login: row.get(5)?,
        last_updated: row.get(6)?,
        password_changed: row.get(7)?,
        user_type: type_id.map(|id| UserType { id }),
        profile: Profile {
            first_name: row.get(9)?,
            last_name: row.get(10)?,
            email: row.get(11)?,
            second_email: row.get(12)?,
            login: row.get(13)?,
            mobile_phone: row.get(14)?,
            placement_org: row.get(15)?,
            portal_access_group: row.get(16)?,
            report_group_list: decode_report_groups(row, 17)?,
            ack_new_business: row.get(18)?,
        },
    })
}
