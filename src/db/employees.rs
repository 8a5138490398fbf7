use rusqlite::{params, OptionalExtension, Row};

use super::*;
use crate::auth::Session;
use crate::password;

/// Trim and check the identity fields shared by create and update.
fn clean_identity(name: &str, login_id: &str) -> Result<(String, String), StoreError> {
    let name = name.trim();
    let login_id = login_id.trim();
    if name.is_empty() || login_id.is_empty() {
        return Err(StoreError::ConstraintViolation(
            "Name and Login ID are required".to_string(),
        ));
    }
    Ok((name.to_string(), login_id.to_string()))
}

impl SalesDb {
    // =========================================================================
    // Employees
    // =========================================================================

    /// Insert an employee, hashing the password with a fresh salt.
    /// Managers only. A duplicate `login_id` is a `ConstraintViolation`.
    pub fn create_employee(
        &self,
        session: &Session,
        employee: &NewEmployee,
    ) -> Result<i64, StoreError> {
        session.require_manager()?;
        self.insert_employee(employee)
    }

    /// Create the first account of an empty store as a manager, whatever
    /// role `employee` asks for. Refused with `NotPermitted` once any
    /// employee exists.
    pub fn bootstrap_manager(&self, employee: &NewEmployee) -> Result<i64, StoreError> {
        let first = NewEmployee {
            role: Role::Manager,
            ..employee.clone()
        };
        self.insert_employee_when(&first, |db| {
            let existing: i64 =
                db.conn
                    .query_row("SELECT COUNT(*) FROM employees", [], |row| row.get(0))?;
            if existing > 0 {
                return Err(StoreError::NotPermitted);
            }
            Ok(())
        })
    }

    pub(crate) fn insert_employee(&self, employee: &NewEmployee) -> Result<i64, StoreError> {
        self.insert_employee_when(employee, |_| Ok(()))
    }

    /// Insert after `guard` passes, both inside one transaction.
    fn insert_employee_when<G>(&self, employee: &NewEmployee, guard: G) -> Result<i64, StoreError>
    where
        G: FnOnce(&Self) -> Result<(), StoreError>,
    {
        let (name, login_id) = clean_identity(&employee.name, &employee.login_id)?;
        if employee.password.is_empty() {
            return Err(StoreError::ConstraintViolation(
                "Password is required for new employees".to_string(),
            ));
        }
        let hash = password::hash_password(&employee.password, self.password_iterations);
        let now = now_timestamp();

        let id = self.with_transaction(|db| {
            guard(db)?;
            db.conn.execute(
                "INSERT INTO employees (name, login_id, password_hash, role, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![name, login_id, hash, employee.role, now],
            )?;
            Ok(db.conn.last_insert_rowid())
        })?;
        log::info!("Created employee {} ({})", id, employee.role);
        Ok(id)
    }

    /// All employees ordered by name.
    pub fn list_employees(&self) -> Result<Vec<Employee>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, login_id, role, created_at, updated_at
             FROM employees
             ORDER BY name COLLATE NOCASE, id",
        )?;
        let rows = stmt.query_map([], Self::map_employee_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Get an employee profile by id.
    pub fn get_employee(&self, id: i64) -> Result<Option<Employee>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, login_id, role, created_at, updated_at
                 FROM employees WHERE id = ?1",
                params![id],
                Self::map_employee_row,
            )
            .optional()?)
    }

    /// Update an employee. Managers only. The stored hash is replaced only
    /// when a new password is supplied.
    pub fn update_employee(
        &self,
        session: &Session,
        id: i64,
        update: &EmployeeUpdate,
    ) -> Result<(), StoreError> {
        session.require_manager()?;
        let (name, login_id) = clean_identity(&update.name, &update.login_id)?;
        let new_hash = match update.password.as_deref() {
            Some(pw) if !pw.is_empty() => {
                Some(password::hash_password(pw, self.password_iterations))
            }
            _ => None,
        };
        let now = now_timestamp();

        self.with_transaction(|db| {
            let affected = match &new_hash {
                Some(hash) => db.conn.execute(
                    "UPDATE employees
                     SET name = ?1, login_id = ?2, role = ?3, password_hash = ?4, updated_at = ?5
                     WHERE id = ?6",
                    params![name, login_id, update.role, hash, now, id],
                )?,
                None => db.conn.execute(
                    "UPDATE employees
                     SET name = ?1, login_id = ?2, role = ?3, updated_at = ?4
                     WHERE id = ?5",
                    params![name, login_id, update.role, now, id],
                )?,
            };
            ensure_affected(affected, "employee", id)
        })?;
        log::info!(
            "Updated employee {}{}",
            id,
            if new_hash.is_some() { " (password changed)" } else { "" }
        );
        Ok(())
    }

    /// Delete an employee. Managers only. Fails with `ConstraintViolation`
    /// while contacts still reference them.
    pub fn delete_employee(&self, session: &Session, id: i64) -> Result<(), StoreError> {
        session.require_manager()?;
        self.with_transaction(|db| {
            let affected = db
                .conn
                .execute("DELETE FROM employees WHERE id = ?1", params![id])?;
            ensure_affected(affected, "employee", id)
        })?;
        log::info!("Deleted employee {}", id);
        Ok(())
    }

    /// Fetch profile and stored hash for a login id. Only the auth module
    /// sees the hash.
    pub(crate) fn get_credentials(
        &self,
        login_id: &str,
    ) -> Result<Option<(Employee, String)>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, login_id, role, created_at, updated_at, password_hash
                 FROM employees WHERE login_id = ?1",
                params![login_id],
                |row| Ok((Self::map_employee_row(row)?, row.get::<_, String>(6)?)),
            )
            .optional()?)
    }

    fn map_employee_row(row: &Row<'_>) -> rusqlite::Result<Employee> {
        Ok(Employee {
            id: row.get(0)?,
            name: row.get(1)?,
            login_id: row.get(2)?,
            role: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }
}
