//! Login and the role capability check.
//!
//! An unknown login id and a wrong password produce the same
//! `AuthenticationFailed` error, and both paths run a full key derivation,
//! so callers cannot tell which accounts exist.

use serde::Serialize;

use crate::db::{Employee, Role, SalesDb, StoreError};
use crate::password;

/// Verify credentials and return the employee's public profile.
pub fn authenticate(db: &SalesDb, login_id: &str, password: &str) -> Result<Employee, StoreError> {
    let login_id = login_id.trim();
    match db.get_credentials(login_id)? {
        Some((employee, hash)) if password::verify_password(password, &hash) => {
            log::info!("Employee {} signed in", employee.id);
            Ok(employee)
        }
        Some(_) => {
            log::warn!("Failed sign-in attempt");
            Err(StoreError::AuthenticationFailed)
        }
        None => {
            password::dummy_verify(password);
            log::warn!("Failed sign-in attempt");
            Err(StoreError::AuthenticationFailed)
        }
    }
}

/// The signed-in employee for the lifetime of a UI session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    employee: Employee,
}

impl Session {
    /// Authenticate and open a session.
    pub fn login(db: &SalesDb, login_id: &str, password: &str) -> Result<Self, StoreError> {
        authenticate(db, login_id, password).map(|employee| Self { employee })
    }

    #[cfg(test)]
    pub(crate) fn for_employee(employee: Employee) -> Self {
        Self { employee }
    }

    pub fn employee(&self) -> &Employee {
        &self.employee
    }

    pub fn employee_id(&self) -> i64 {
        self.employee.id
    }

    pub fn role(&self) -> Role {
        self.employee.role
    }

    pub fn is_manager(&self) -> bool {
        self.employee.is_manager()
    }

    /// Gate manager-only operations such as employee administration.
    pub fn require_manager(&self) -> Result<(), StoreError> {
        if self.is_manager() {
            Ok(())
        } else {
            Err(StoreError::NotPermitted)
        }
    }
}
