use super::*;

impl SalesDb {
    /// Reference list of state codes, ordered by description. Read-only.
    pub fn list_state_codes(&self) -> Result<Vec<StateCode>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT code, description FROM state_codes ORDER BY description")?;
        let rows = stmt.query_map([], |row| {
            Ok(StateCode {
                code: row.get(0)?,
                description: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
