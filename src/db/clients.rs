use rusqlite::{params, OptionalExtension, Row};

use super::*;

const CLIENT_COLUMNS: &str = "c.id, c.name, c.email, c.phone, c.address, c.state_code,
                              c.client_type, s.description, c.created_at, c.updated_at";

/// Normalized client fields ready for binding.
struct CleanClient {
    name: String,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    state_code: Option<String>,
}

fn clean_client(input: &ClientInput) -> Result<CleanClient, StoreError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(StoreError::ConstraintViolation(
            "Client name is required".to_string(),
        ));
    }
    Ok(CleanClient {
        name: name.to_string(),
        email: blank_to_none(&input.email),
        phone: blank_to_none(&input.phone),
        address: blank_to_none(&input.address),
        state_code: blank_to_none(&input.state_code),
    })
}

impl SalesDb {
    // =========================================================================
    // Clients
    // =========================================================================

    /// Insert a client. An unknown state code is a `ConstraintViolation`.
    pub fn create_client(&self, input: &ClientInput) -> Result<i64, StoreError> {
        let client = clean_client(input)?;
        let now = now_timestamp();
        let id = self.with_transaction(|db| {
            db.conn.execute(
                "INSERT INTO clients
                    (name, email, phone, address, state_code, client_type, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![
                    client.name,
                    client.email,
                    client.phone,
                    client.address,
                    client.state_code,
                    input.client_type,
                    now,
                ],
            )?;
            Ok(db.conn.last_insert_rowid())
        })?;
        log::info!("Created client {} ({})", id, input.client_type);
        Ok(id)
    }

    /// Clients ordered by name. A non-empty `search_term` keeps only clients
    /// whose name or email contains it, ignoring case. Matching is plain
    /// substring on Unicode lowercase, so `%` and `_` are literal and
    /// accented letters fold too.
    pub fn list_clients(&self, search_term: &str) -> Result<Vec<Client>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CLIENT_COLUMNS}
             FROM clients c
             LEFT JOIN state_codes s ON c.state_code = s.code
             ORDER BY c.name COLLATE NOCASE, c.id"
        ))?;
        let rows = stmt.query_map([], Self::map_client_row)?;
        let clients = rows.collect::<Result<Vec<_>, _>>()?;

        let term = search_term.trim().to_lowercase();
        if term.is_empty() {
            return Ok(clients);
        }
        Ok(clients
            .into_iter()
            .filter(|c| {
                c.name.to_lowercase().contains(&term)
                    || c
                        .email
                        .as_deref()
                        .is_some_and(|email| email.to_lowercase().contains(&term))
            })
            .collect())
    }

    /// Get a client by id, with its state description.
    pub fn get_client(&self, id: i64) -> Result<Option<Client>, StoreError> {
        Ok(self
            .conn
            .query_row(
                &format!(
                    "SELECT {CLIENT_COLUMNS}
                     FROM clients c
                     LEFT JOIN state_codes s ON c.state_code = s.code
                     WHERE c.id = ?1"
                ),
                params![id],
                Self::map_client_row,
            )
            .optional()?)
    }

    pub fn update_client(&self, id: i64, input: &ClientInput) -> Result<(), StoreError> {
        let client = clean_client(input)?;
        let now = now_timestamp();
        self.with_transaction(|db| {
            let affected = db.conn.execute(
                "UPDATE clients
                 SET name = ?1, email = ?2, phone = ?3, address = ?4, state_code = ?5,
                     client_type = ?6, updated_at = ?7
                 WHERE id = ?8",
                params![
                    client.name,
                    client.email,
                    client.phone,
                    client.address,
                    client.state_code,
                    input.client_type,
                    now,
                    id,
                ],
            )?;
            ensure_affected(affected, "client", id)
        })?;
        log::info!("Updated client {}", id);
        Ok(())
    }

    /// Delete a client. Fails with `ConstraintViolation` while contacts
    /// still reference it.
    pub fn delete_client(&self, id: i64) -> Result<(), StoreError> {
        self.with_transaction(|db| {
            let affected = db
                .conn
                .execute("DELETE FROM clients WHERE id = ?1", params![id])?;
            ensure_affected(affected, "client", id)
        })?;
        log::info!("Deleted client {}", id);
        Ok(())
    }

    fn map_client_row(row: &Row<'_>) -> rusqlite::Result<Client> {
        Ok(Client {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            phone: row.get(3)?,
            address: row.get(4)?,
            state_code: row.get(5)?,
            client_type: row.get(6)?,
            state_name: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::*;
    use super::*;

    fn client_with_email(name: &str, email: Option<&str>) -> ClientInput {
        ClientInput {
            email: email.map(str::to_string),
            ..client_input(name)
        }
    }

    fn names(clients: &[Client]) -> Vec<&str> {
        clients.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_list_all_ordered_by_name() {
        let db = test_db();
        seed_client(&db, "Omega Foods");
        seed_client(&db, "Acme Corp");
        seed_client(&db, "Lumen Labs");

        let clients = db.list_clients("").unwrap();
        assert_eq!(names(&clients), vec!["Acme Corp", "Lumen Labs", "Omega Foods"]);
    }

    #[test]
    fn test_search_matches_name_or_email_case_insensitive() {
        let db = test_db();
        db.create_client(&client_with_email("Janssen Pharma", None)).unwrap();
        db.create_client(&client_with_email("Dejan Consulting", Some("office@dejan.rs")))
            .unwrap();
        db.create_client(&client_with_email("Orbit", Some("JANE@orbit.com")))
            .unwrap();
        db.create_client(&client_with_email("Unrelated", Some("hello@example.com")))
            .unwrap();

        let found = db.list_clients("jan").unwrap();
        assert_eq!(names(&found), vec!["Dejan Consulting", "Janssen Pharma", "Orbit"]);
    }

    #[test]
    fn test_search_treats_wildcards_literally() {
        let db = test_db();
        seed_client(&db, "100% Organic");
        seed_client(&db, "1000 Widgets");

        let found = db.list_clients("0%").unwrap();
        assert_eq!(names(&found), vec!["100% Organic"]);
        assert!(db.list_clients("_").unwrap().is_empty());
    }

    #[test]
    fn test_search_folds_non_ascii_case() {
        let db = test_db();
        seed_client(&db, "Émile Bakery");
        db.create_client(&client_with_email("Nordic Fish", Some("SØREN@fish.dk")))
            .unwrap();
        seed_client(&db, "Acme");

        assert_eq!(names(&db.list_clients("émile").unwrap()), vec!["Émile Bakery"]);
        assert_eq!(names(&db.list_clients("ÉMILE").unwrap()), vec!["Émile Bakery"]);
        assert_eq!(names(&db.list_clients("BAKERY").unwrap()), vec!["Émile Bakery"]);
        assert_eq!(names(&db.list_clients("søren").unwrap()), vec!["Nordic Fish"]);
    }

    #[test]
    fn test_search_with_no_match_is_empty_not_error() {
        let db = test_db();
        seed_client(&db, "Acme");
        assert!(db.list_clients("zzz").unwrap().is_empty());
    }

    #[test]
    fn test_state_description_joined() {
        let db = test_db();
        let with_state = db
            .create_client(&ClientInput {
                state_code: Some("CA".into()),
                ..client_input("Sunset Realty")
            })
            .unwrap();
        let without_state = seed_client(&db, "Nowhere Inc");

        let a = db.get_client(with_state).unwrap().unwrap();
        assert_eq!(a.state_code.as_deref(), Some("CA"));
        assert_eq!(a.state_name.as_deref(), Some("California"));

        let b = db.get_client(without_state).unwrap().unwrap();
        assert_eq!(b.state_name, None);
    }

    #[test]
    fn test_unknown_state_code_rejected() {
        let db = test_db();
        let err = db
            .create_client(&ClientInput {
                state_code: Some("ZZ".into()),
                ..client_input("Bad State")
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)), "{err:?}");
    }

    #[test]
    fn test_name_required_and_blanks_become_null() {
        let db = test_db();
        let err = db.create_client(&client_input("   ")).unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));

        let id = db
            .create_client(&ClientInput {
                email: Some("  ".into()),
                phone: Some(" 555-0100 ".into()),
                ..client_input("  Trimmed Co  ")
            })
            .unwrap();
        let client = db.get_client(id).unwrap().unwrap();
        assert_eq!(client.name, "Trimmed Co");
        assert_eq!(client.email, None);
        assert_eq!(client.phone.as_deref(), Some("555-0100"));
    }

    #[test]
    fn test_update_client() {
        let db = test_db();
        let id = seed_client(&db, "Prospect");
        db.update_client(
            id,
            &ClientInput {
                client_type: ClientType::Potential,
                state_code: Some("NY".into()),
                ..client_input("Prospect Holdings")
            },
        )
        .unwrap();

        let client = db.get_client(id).unwrap().unwrap();
        assert_eq!(client.name, "Prospect Holdings");
        assert_eq!(client.client_type, ClientType::Potential);
        assert_eq!(client.state_name.as_deref(), Some("New York"));
    }

    #[test]
    fn test_update_missing_client_is_not_found() {
        let db = test_db();
        let err = db.update_client(42, &client_input("Ghost")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "client", id: 42 }));
    }

    #[test]
    fn test_delete_missing_client_is_not_found() {
        let db = test_db();
        let err = db.delete_client(12345).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "client", id: 12345 }));
    }

    #[test]
    fn test_delete_client() {
        let db = test_db();
        let id = seed_client(&db, "Short Lived");
        db.delete_client(id).unwrap();
        assert!(db.get_client(id).unwrap().is_none());
    }
}
