//! Presentation-facing view of store errors.
//!
//! Errors are classified by what the person at the screen can do:
//! - Retryable: the store could not be reached
//! - NonRetryable: bad input, missing record, corrupt data
//! - RequiresUserAction: sign in again, ask a manager, fix the setup
//!
//! Nothing is retried automatically; the UI decides whether to offer a retry.

use serde::Serialize;

use crate::db::StoreError;

impl StoreError {
    /// Returns true if repeating the same call might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::StoreUnavailable(_))
    }

    /// Returns true if this error requires user action to resolve
    pub fn requires_user_action(&self) -> bool {
        matches!(
            self,
            StoreError::AuthenticationFailed
                | StoreError::NotPermitted
                | StoreError::HomeDirNotFound
                | StoreError::CreateDir(_)
                | StoreError::Migration(_)
        )
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            StoreError::AuthenticationFailed => "Check your login ID and password and try again.",
            StoreError::NotFound { .. } => {
                "The record no longer exists. Refresh the list to see current data."
            }
            StoreError::ConstraintViolation(_) => {
                "Check the highlighted fields. Login IDs must be unique and referenced records must exist."
            }
            StoreError::StoreUnavailable(_) => {
                "The database could not be reached. Check the connection and try again."
            }
            StoreError::InvalidData(_) => "A stored record is unreadable. Contact your administrator.",
            StoreError::NotPermitted => "Ask a manager to perform this action.",
            StoreError::HomeDirNotFound => "Set databasePath in ~/.salesdesk/config.json.",
            StoreError::CreateDir(_) => "Check permissions on the database directory.",
            StoreError::Migration(_) => {
                "The database schema could not be upgraded. Update SalesDesk or restore the database from a backup."
            }
        }
    }
}

/// Serializable error for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFacingError {
    pub message: String,
    pub error_type: ErrorType,
    pub can_retry: bool,
    pub recovery_suggestion: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorType {
    Retryable,
    NonRetryable,
    RequiresUserAction,
}

impl From<&StoreError> for UserFacingError {
    fn from(err: &StoreError) -> Self {
        let error_type = if err.requires_user_action() {
            ErrorType::RequiresUserAction
        } else if err.is_retryable() {
            ErrorType::Retryable
        } else {
            ErrorType::NonRetryable
        };

        UserFacingError {
            message: err.to_string(),
            error_type,
            can_retry: err.is_retryable(),
            recovery_suggestion: err.recovery_suggestion().to_string(),
        }
    }
}
