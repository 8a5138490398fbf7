//! Schema setup and upgrades.
//!
//! Each numbered step is embedded with `include_str!` and recorded in
//! `schema_version` once applied. A step and its version row commit together,
//! so a failed upgrade leaves the store at the previous version.

use rusqlite::Connection;

struct Step {
    version: i32,
    sql: &'static str,
}

const STEPS: &[Step] = &[Step {
    version: 1,
    sql: include_str!("migrations/001_baseline.sql"),
}];

fn ensure_version_table(conn: &Connection) -> Result<(), String> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .map_err(|e| format!("Failed to create schema_version table: {}", e))
}

/// Highest applied version, 0 for an empty store.
fn current_version(conn: &Connection) -> Result<i32, String> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .map_err(|e| format!("Failed to read schema version: {}", e))
}

fn apply(conn: &Connection, step: &Step) -> Result<(), String> {
    let run = || -> rusqlite::Result<()> {
        conn.execute_batch("BEGIN IMMEDIATE")?;
        conn.execute_batch(step.sql)?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [step.version],
        )?;
        conn.execute_batch("COMMIT")
    };
    run().map_err(|e| {
        if let Err(rollback) = conn.execute_batch("ROLLBACK") {
            log::warn!("Rollback of v{} failed: {}", step.version, rollback);
        }
        format!("Migration v{} failed: {}", step.version, e)
    })
}

/// Bring the schema up to date. Returns how many steps ran.
///
/// A store stamped with a version newer than this build knows is refused.
pub fn run_migrations(conn: &Connection) -> Result<usize, String> {
    ensure_version_table(conn)?;

    let current = current_version(conn)?;
    let latest = STEPS.last().map(|s| s.version).unwrap_or(0);
    if current > latest {
        return Err(format!(
            "Database schema version ({}) is newer than this version of SalesDesk supports ({}). \
             Please update SalesDesk.",
            current, latest
        ));
    }

    let mut applied = 0;
    for step in STEPS.iter().filter(|s| s.version > current) {
        apply(conn, step)?;
        log::info!("Applied migration v{}", step.version);
        applied += 1;
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mem_db() -> Connection {
        Connection::open_in_memory().expect("in-memory db")
    }

    #[test]
    fn test_fresh_db_applies_baseline() {
        let conn = mem_db();
        let applied = run_migrations(&conn).expect("migrations should succeed");
        assert_eq!(applied, 1, "should apply exactly 1 migration (baseline)");

        let version = current_version(&conn).expect("version query");
        assert_eq!(version, 1);

        for table in ["employees", "clients", "contacts"] {
            let count: i32 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
                .expect("table should exist");
            assert_eq!(count, 0, "{table} should start empty");
        }

        let states: i32 = conn
            .query_row("SELECT COUNT(*) FROM state_codes", [], |row| row.get(0))
            .expect("state_codes table should exist");
        assert!(states >= 50, "state codes should be seeded, got {states}");
    }

    #[test]
    fn test_contacts_status_is_persisted_with_default() {
        let conn = mem_db();
        run_migrations(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO employees (name, login_id, password_hash) VALUES ('A', 'a', 'x');
             INSERT INTO clients (name) VALUES ('Acme');
             INSERT INTO contacts (client_id, employee_id, contact_datetime, contact_method)
             VALUES (1, 1, '2025-01-01 09:00:00', 'phone');",
        )
        .unwrap();
        let status: String = conn
            .query_row("SELECT status FROM contacts", [], |row| row.get(0))
            .unwrap();
        assert_eq!(status, "Scheduled");
    }

    #[test]
    fn test_check_constraints_reject_bad_enums() {
        let conn = mem_db();
        run_migrations(&conn).unwrap();
        let bad_role = conn.execute(
            "INSERT INTO employees (name, login_id, password_hash, role) VALUES ('A', 'a', 'x', 'admin')",
            [],
        );
        assert!(bad_role.is_err());

        let bad_type = conn.execute(
            "INSERT INTO clients (name, client_type) VALUES ('Acme', 'vip')",
            [],
        );
        assert!(bad_type.is_err());
    }

    #[test]
    fn test_failed_migration_leaves_version_untouched() {
        let conn = mem_db();
        run_migrations(&conn).unwrap();
        let broken = Step {
            version: 2,
            sql: "CREATE TABLE notes (id INTEGER PRIMARY KEY); SELECT * FROM missing_table;",
        };

        let err = apply(&conn, &broken).unwrap_err();
        assert!(err.contains("v2"), "{err}");
        assert_eq!(current_version(&conn).unwrap(), 1);
        let notes = conn.prepare("SELECT 1 FROM notes");
        assert!(notes.is_err(), "partial DDL should be rolled back");
    }

    #[test]
    fn test_forward_compat_guard() {
        let conn = mem_db();

        ensure_version_table(&conn).unwrap();
        conn.execute("INSERT INTO schema_version (version) VALUES (999)", [])
            .unwrap();

        let err = run_migrations(&conn).unwrap_err();
        assert!(
            err.contains("newer than this version"),
            "error should mention version mismatch: {}",
            err
        );
    }

    #[test]
    fn test_idempotency() {
        let conn = mem_db();

        let first = run_migrations(&conn).expect("first run");
        assert_eq!(first, 1);

        let second = run_migrations(&conn).expect("second run");
        assert_eq!(second, 0, "second run should apply no migrations");

        let version = current_version(&conn).expect("version query");
        assert_eq!(version, 1);
    }
}
