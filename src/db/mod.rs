//! SQLite-backed store for employees, clients, and contact history.
//!
//! `SalesDb` owns the session's single connection. It is opened once at
//! startup and passed by reference to every data-access call; there is no
//! module-level connection. Reads always go to the store (no cache).
//! Every mutation runs in its own transaction via [`SalesDb::with_transaction`].

use std::path::PathBuf;

use rusqlite::Connection;

use crate::config::SalesConfig;
use crate::password::DEFAULT_PBKDF2_ITERATIONS;

pub mod types;
pub use types::*;

pub mod clients;
pub mod contacts;
pub mod employees;
pub mod state_codes;

pub struct SalesDb {
    conn: Connection,
    password_iterations: u32,
}

impl SalesDb {
    /// Borrow the underlying connection for ad-hoc queries.
    pub fn conn_ref(&self) -> &Connection {
        &self.conn
    }

    /// PBKDF2 cost applied to newly hashed passwords.
    pub fn password_iterations(&self) -> u32 {
        self.password_iterations
    }

    /// Override the PBKDF2 cost for new hashes. Existing hashes keep theirs.
    pub fn with_password_iterations(mut self, iterations: u32) -> Self {
        self.password_iterations = iterations.max(1);
        self
    }

    /// Execute a closure within a SQLite transaction.
    /// Commits on Ok, rolls back on Err.
    pub fn with_transaction<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Self) -> Result<T, StoreError>,
    {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        match f(self) {
            Ok(val) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(val)
            }
            Err(e) => {
                if let Err(rollback) = self.conn.execute_batch("ROLLBACK") {
                    log::warn!("Rollback failed: {}", rollback);
                }
                Err(e)
            }
        }
    }

    /// Open the database named by `config` (default `~/.salesdesk/salesdesk.db`).
    pub fn open(config: &SalesConfig) -> Result<Self, StoreError> {
        let path = Self::db_path(config)?;
        Ok(Self::open_at(path)?.with_password_iterations(config.password_iterations))
    }

    /// Open a database at an explicit path, creating it if needed.
    pub fn open_at(path: PathBuf) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(StoreError::CreateDir)?;
            }
        }

        let conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        log::info!("Opened sales database at {}", path.display());
        Self::init(conn)
    }

    /// Open a private in-memory database. Contents vanish on drop.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        crate::migrations::run_migrations(&conn).map_err(StoreError::Migration)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self {
            conn,
            password_iterations: DEFAULT_PBKDF2_ITERATIONS,
        })
    }

    fn db_path(config: &SalesConfig) -> Result<PathBuf, StoreError> {
        if let Some(path) = &config.database_path {
            return Ok(path.clone());
        }
        let home = dirs::home_dir().ok_or(StoreError::HomeDirNotFound)?;
        Ok(home.join(".salesdesk").join("salesdesk.db"))
    }
}

// =============================================================================
// Shared test utilities
// =============================================================================


// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::test_utils::*;
    use super::*;
    use crate::error::UserFacingError;

    #[test]
    fn test_open_creates_tables() {
        let db = test_db();
        for table in ["employees", "clients", "contacts", "state_codes"] {
            db.conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get::<_, i64>(0)
                })
                .unwrap_or_else(|e| panic!("{table} table should exist: {e}"));
        }
    }

    #[test]
    fn test_open_via_config_uses_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("crm.db");
        let config = SalesConfig {
            database_path: Some(path.clone()),
            password_iterations: 42,
        };
        let db = SalesDb::open(&config).expect("open");
        assert!(path.exists());
        assert_eq!(db.password_iterations(), 42);
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let db = test_db();
        let enabled: i64 = db
            .conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let db = test_db();
        let result: Result<(), StoreError> = db.with_transaction(|tx| {
            tx.conn.execute("INSERT INTO clients (name) VALUES ('Rolled Back')", [])?;
            Err(StoreError::ConstraintViolation("forced".into()))
        });
        assert!(result.is_err());

        let count: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM clients", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persist.db");
        {
            let db = SalesDb::open_at(path.clone()).unwrap();
            db.create_client(&client_input("Durable")).unwrap();
        }
        let db = SalesDb::open_at(path).unwrap();
        let clients = db.list_clients("").unwrap();
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].name, "Durable");
    }

    #[test]
    fn test_constraint_errors_are_classified() {
        let db = test_db();
        let err = db
            .conn
            .execute("INSERT INTO clients (name, client_type) VALUES ('X', 'vip')", [])
            .map_err(StoreError::from)
            .unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)), "{err:?}");
    }

    #[test]
    fn test_in_memory_store_is_migrated_and_usable() {
        let db = SalesDb::open_in_memory().unwrap();
        assert_eq!(db.password_iterations(), DEFAULT_PBKDF2_ITERATIONS);
        assert!(db.list_state_codes().unwrap().len() >= 50);

        let id = db.create_client(&client_input("Scratch Co")).unwrap();
        let clients = db.list_clients("").unwrap();
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].id, id);

        let enabled: i64 = db
            .conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn test_query_against_missing_table_is_store_unavailable() {
        let db = test_db();
        let emp = seed_employee(&db, "Jan", "jan", Role::Employee);
        db.conn.execute_batch("DROP TABLE contacts").unwrap();

        let err = db.list_contacts_for_employee(emp, false, None).unwrap_err();
        assert!(matches!(err, StoreError::StoreUnavailable(_)), "{err:?}");
        assert!(UserFacingError::from(&err).can_retry);
    }
}
