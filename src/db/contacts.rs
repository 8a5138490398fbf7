use chrono::NaiveDateTime;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};

use super::*;

const CONTACT_SELECT: &str = "SELECT c.id, c.client_id, c.employee_id, c.contact_datetime,
            c.contact_method, c.conversion_rating, c.notes, c.status,
            cl.name, cl.client_type, e.name, c.created_at, c.updated_at
     FROM contacts c
     JOIN clients cl ON c.client_id = cl.id
     JOIN employees e ON c.employee_id = e.id";

fn check_rating(rating: Option<u8>) -> Result<(), StoreError> {
    match rating {
        Some(r) if !(1..=5).contains(&r) => Err(StoreError::ConstraintViolation(format!(
            "Conversion rating must be between 1 and 5, got {r}"
        ))),
        _ => Ok(()),
    }
}

impl SalesDb {
    // =========================================================================
    // Contacts
    // =========================================================================

    /// Record a contact. Client and employee must exist.
    pub fn create_contact(&self, input: &ContactInput) -> Result<i64, StoreError> {
        check_rating(input.conversion_rating)?;
        let notes = blank_to_none(&input.notes);
        let when = format_datetime(&input.contact_datetime);
        let now = now_timestamp();

        let id = self.with_transaction(|db| {
            db.conn.execute(
                "INSERT INTO contacts
                    (client_id, employee_id, contact_datetime, contact_method,
                     conversion_rating, notes, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    input.client_id,
                    input.employee_id,
                    when,
                    input.contact_method,
                    input.conversion_rating,
                    notes,
                    input.status,
                    now,
                ],
            )?;
            Ok(db.conn.last_insert_rowid())
        })?;
        log::info!(
            "Created contact {} (client {}, employee {}, {})",
            id,
            input.client_id,
            input.employee_id,
            input.status
        );
        Ok(id)
    }

    pub fn update_contact(&self, id: i64, input: &ContactInput) -> Result<(), StoreError> {
        check_rating(input.conversion_rating)?;
        let notes = blank_to_none(&input.notes);
        let when = format_datetime(&input.contact_datetime);
        let now = now_timestamp();

        self.with_transaction(|db| {
            let affected = db.conn.execute(
                "UPDATE contacts
                 SET client_id = ?1, employee_id = ?2, contact_datetime = ?3,
                     contact_method = ?4, conversion_rating = ?5, notes = ?6,
                     status = ?7, updated_at = ?8
                 WHERE id = ?9",
                params![
                    input.client_id,
                    input.employee_id,
                    when,
                    input.contact_method,
                    input.conversion_rating,
                    notes,
                    input.status,
                    now,
                    id,
                ],
            )?;
            ensure_affected(affected, "contact", id)
        })?;
        log::info!("Updated contact {} ({})", id, input.status);
        Ok(())
    }

    /// Permanently delete a contact.
    pub fn delete_contact(&self, id: i64) -> Result<(), StoreError> {
        self.with_transaction(|db| {
            let affected = db
                .conn
                .execute("DELETE FROM contacts WHERE id = ?1", params![id])?;
            ensure_affected(affected, "contact", id)
        })?;
        log::info!("Deleted contact {}", id);
        Ok(())
    }

    pub fn get_contact(&self, id: i64) -> Result<Option<Contact>, StoreError> {
        let raw = self
            .conn
            .query_row(
                &format!("{CONTACT_SELECT} WHERE c.id = ?1"),
                params![id],
                Self::map_contact_row,
            )
            .optional()?;
        raw.map(RawContact::finish).transpose()
    }

    /// Contacts visible to an employee, oldest first.
    ///
    /// Managers see every employee's contacts and `employee_id` does not
    /// filter; everyone else sees only their own. `start`, when given,
    /// drops contacts before that moment.
    pub fn list_contacts_for_employee(
        &self,
        employee_id: i64,
        is_manager: bool,
        start: Option<NaiveDateTime>,
    ) -> Result<Vec<Contact>, StoreError> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if !is_manager {
            clauses.push("c.employee_id = ?");
            values.push(Value::Integer(employee_id));
        }
        if let Some(start) = start {
            clauses.push("c.contact_datetime >= ?");
            values.push(Value::Text(format_datetime(&start)));
        }

        let mut sql = CONTACT_SELECT.to_string();
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY c.contact_datetime, c.id");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), Self::map_contact_row)?;
        let mut contacts = Vec::new();
        for row in rows {
            contacts.push(row?.finish()?);
        }
        Ok(contacts)
    }

    fn map_contact_row(row: &Row<'_>) -> rusqlite::Result<RawContact> {
        Ok(RawContact {
            id: row.get(0)?,
            client_id: row.get(1)?,
            employee_id: row.get(2)?,
            contact_datetime: row.get(3)?,
            contact_method: row.get(4)?,
            conversion_rating: row.get(5)?,
            notes: row.get(6)?,
            status: row.get(7)?,
            client_name: row.get(8)?,
            client_type: row.get(9)?,
            employee_name: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }
}

/// Row as read, before the stored timestamp text is parsed.
struct RawContact {
    id: i64,
    client_id: i64,
    employee_id: i64,
    contact_datetime: String,
    contact_method: ContactMethod,
    conversion_rating: Option<u8>,
    notes: Option<String>,
    status: ContactStatus,
    client_name: String,
    client_type: ClientType,
    employee_name: String,
    created_at: String,
    updated_at: String,
}

impl RawContact {
    fn finish(self) -> Result<Contact, StoreError> {
        Ok(Contact {
            id: self.id,
            client_id: self.client_id,
            employee_id: self.employee_id,
            contact_datetime: parse_datetime(&self.contact_datetime)?,
            contact_method: self.contact_method,
            conversion_rating: self.conversion_rating,
            notes: self.notes,
            status: self.status,
            client_name: self.client_name,
            client_type: self.client_type,
            employee_name: self.employee_name,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
