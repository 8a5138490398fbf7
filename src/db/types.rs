//! Shared type definitions for the database layer.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDateTime, Timelike, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::ErrorCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage format for every timestamp column. Lexical order equals
/// chronological order, so range predicates can compare strings.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Errors specific to database operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Bad credentials. Deliberately says nothing about which half was wrong.
    #[error("Invalid login ID or password")]
    AuthenticationFailed,

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Stored data could not be read: {0}")]
    InvalidData(String),

    #[error("This operation requires the manager role")]
    NotPermitted,

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Schema migration failed: {0}")]
    Migration(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _)
                if code.code == ErrorCode::ConstraintViolation =>
            {
                StoreError::ConstraintViolation(err.to_string())
            }
            rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::IntegralValueOutOfRange(..) => {
                StoreError::InvalidData(err.to_string())
            }
            _ => StoreError::StoreUnavailable(err.to_string()),
        }
    }
}

/// Map an affected-row count to `NotFound` when nothing matched.
pub(crate) fn ensure_affected(
    affected: usize,
    entity: &'static str,
    id: i64,
) -> Result<(), StoreError> {
    if affected == 0 {
        Err(StoreError::NotFound { entity, id })
    } else {
        Ok(())
    }
}

/// Current UTC time in storage format.
pub(crate) fn now_timestamp() -> String {
    Utc::now().format(DATETIME_FORMAT).to_string()
}

/// Render a contact time for storage, dropping sub-second precision.
pub(crate) fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.with_nanosecond(0).unwrap_or(*dt).format(DATETIME_FORMAT).to_string()
}

pub(crate) fn parse_datetime(raw: &str) -> Result<NaiveDateTime, StoreError> {
    NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT)
        .map_err(|e| StoreError::InvalidData(format!("bad timestamp {raw:?}: {e}")))
}

/// Trim a free-text field; blanks become `None`.
pub(crate) fn blank_to_none(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Text-backed enumerations stored as their label.
macro_rules! text_enum {
    ($name:ident, $what:literal, { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $name {
            /// String label for SQL storage.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }

            pub fn all() -> &'static [$name] {
                &[$($name::$variant),+]
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok($name::$variant),)+
                    other => Err(format!("unknown {} {:?}", $what, other)),
                }
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let raw = value.as_str()?;
                raw.parse()
                    .map_err(|e: String| FromSqlError::Other(e.into()))
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Employee,
    Manager,
}

text_enum!(Role, "role", { Employee => "employee", Manager => "manager" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
    Client,
    Potential,
}

text_enum!(ClientType, "client type", { Client => "client", Potential => "potential" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContactMethod {
    Phone,
    Email,
    InPerson,
    Other,
}

text_enum!(ContactMethod, "contact method", {
    Phone => "phone",
    Email => "email",
    InPerson => "in-person",
    Other => "other",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContactStatus {
    Scheduled,
    Completed,
    Cancelled,
}

text_enum!(ContactStatus, "contact status", {
    Scheduled => "Scheduled",
    Completed => "Completed",
    Cancelled => "Cancelled",
});

/// Public employee profile. The password hash never leaves the store layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: i64,
    pub name: String,
    pub login_id: String,
    pub role: Role,
    pub created_at: String,
    pub updated_at: String,
}

impl Employee {
    pub fn is_manager(&self) -> bool {
        self.role == Role::Manager
    }
}

/// Fields for a new employee.
#[derive(Clone)]
pub struct NewEmployee {
    pub name: String,
    pub login_id: String,
    pub password: String,
    pub role: Role,
}

/// Fields for an employee edit. `password: None` keeps the stored hash.
#[derive(Clone)]
pub struct EmployeeUpdate {
    pub name: String,
    pub login_id: String,
    pub role: Role,
    pub password: Option<String>,
}

impl fmt::Debug for NewEmployee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewEmployee")
            .field("name", &self.name)
            .field("login_id", &self.login_id)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

impl fmt::Debug for EmployeeUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmployeeUpdate")
            .field("name", &self.name)
            .field("login_id", &self.login_id)
            .field("role", &self.role)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// A row from `clients`, joined with its state description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub state_code: Option<String>,
    pub client_type: ClientType,
    /// `state_codes.description`; `None` when no state or an unknown code.
    pub state_name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Editable client fields, used for both create and update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInput {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub state_code: Option<String>,
    pub client_type: ClientType,
}

/// A row from `contacts`, enriched with client and employee names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: i64,
    pub client_id: i64,
    pub employee_id: i64,
    pub contact_datetime: NaiveDateTime,
    pub contact_method: ContactMethod,
    pub conversion_rating: Option<u8>,
    pub notes: Option<String>,
    pub status: ContactStatus,
    pub client_name: String,
    pub client_type: ClientType,
    pub employee_name: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Editable contact fields, used for both create and update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInput {
    pub client_id: i64,
    pub employee_id: i64,
    pub contact_datetime: NaiveDateTime,
    pub contact_method: ContactMethod,
    #[serde(default)]
    pub conversion_rating: Option<u8>,
    #[serde(default)]
    pub notes: Option<String>,
    pub status: ContactStatus,
}

/// A row from `state_codes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCode {
    pub code: String,
    pub description: String,
}
