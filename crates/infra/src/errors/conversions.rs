//! Conversions from external infrastructure errors into domain errors.

use dirmirror_common::storage::StorageError;
use dirmirror_domain::MirrorError;
use reqwest::Error as HttpError;
use reqwest::StatusCode;
use rusqlite::Error as SqlError;
use tokio::task::JoinError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub MirrorError);

impl From<InfraError> for MirrorError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<MirrorError> for InfraError {
    fn from(value: MirrorError) -> Self {
        InfraError(value)
    }
}

trait IntoMirrorError {
    fn into_mirror(self) -> MirrorError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → MirrorError */
/* -------------------------------------------------------------------------- */

impl IntoMirrorError for SqlError {
    fn into_mirror(self) -> MirrorError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => MirrorError::Storage("database is busy".into()),
                    (ErrorCode::DatabaseLocked, _) => {
                        MirrorError::Storage("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        MirrorError::Storage("foreign key constraint violation".into())
                    }
                    (ErrorCode::ConstraintViolation, _) => {
                        MirrorError::Storage(format!("constraint violation: {message}"))
                    }
                    _ => MirrorError::Storage(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => MirrorError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                MirrorError::Storage(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                MirrorError::Storage(format!("invalid column type: {ty}"))
            }
            RE::InvalidParameterName(parameter_name) => {
                MirrorError::Internal(format!("invalid parameter name: {parameter_name}"))
            }
            RE::InvalidPath(path) => MirrorError::Config(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => MirrorError::Storage(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_mirror())
    }
}

/* -------------------------------------------------------------------------- */
/* StorageError → MirrorError */
/* -------------------------------------------------------------------------- */

impl IntoMirrorError for StorageError {
    fn into_mirror(self) -> MirrorError {
        match self {
            StorageError::Rusqlite(err) => err.into_mirror(),
            StorageError::InvalidConfig(msg) => MirrorError::Config(msg),
            StorageError::SerdeJson(err) => {
                MirrorError::Storage(format!("stored JSON is malformed: {err}"))
            }
            other => MirrorError::Storage(other.to_string()),
        }
    }
}

impl From<StorageError> for InfraError {
    fn from(value: StorageError) -> Self {
        InfraError(value.into_mirror())
    }
}

/// Map a storage failure into the domain error.
pub fn map_storage_error(err: StorageError) -> MirrorError {
    InfraError::from(err).into()
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → MirrorError */
/* -------------------------------------------------------------------------- */

impl IntoMirrorError for HttpError {
    fn into_mirror(self) -> MirrorError {
        if self.is_timeout() {
            return MirrorError::RemoteUnavailable("HTTP request timed out".into());
        }

        if self.is_connect() {
            return MirrorError::RemoteUnavailable("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            return MirrorError::RemoteUnavailable(status_message(status));
        }

        if self.is_decode() {
            return MirrorError::RemoteUnavailable(format!("undecodable response body: {self}"));
        }

        if self.is_builder() {
            return MirrorError::Internal(format!("invalid HTTP request: {self}"));
        }

        MirrorError::RemoteUnavailable(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_mirror())
    }
}

/// Every non-2xx answer is reported the same way, carrying the status.
pub(crate) fn status_message(status: StatusCode) -> String {
    format!("HTTP {} {}", status.as_u16(), status.canonical_reason().unwrap_or("unknown status"))
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → MirrorError */
/* -------------------------------------------------------------------------- */

impl IntoMirrorError for serde_json::Error {
    fn into_mirror(self) -> MirrorError {
        MirrorError::RemoteUnavailable(format!("undecodable response body: {self}"))
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(value.into_mirror())
    }
}

/* -------------------------------------------------------------------------- */
/* JoinError → MirrorError */
/* -------------------------------------------------------------------------- */

/// Map a failed blocking task into the domain error.
pub fn map_join_error(err: JoinError) -> MirrorError {
    if err.is_cancelled() {
        MirrorError::Internal("blocking database task cancelled".into())
    } else {
        MirrorError::Internal(format!("blocking database task panicked: {err}"))
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
