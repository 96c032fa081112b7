//! Per-collection table layout and statements.
//!
//! Each collection is one table with two columns:
//!
//! | column | type | constraint            |
//! |--------|------|-----------------------|
//! | `id`   | TEXT | NOT NULL PRIMARY KEY  |
//! | `obj`  | TEXT | NOT NULL              |
//!
//! The collection name becomes the table identifier. It is quoted, never
//! bound as a value; callers supply identifier-safe names.

/// SQL statements targeting one collection's table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSql {
    ident: String,
}

impl TableSql {
    /// Builds statements for `collection`.
    pub fn new(collection: &str) -> Self {
        Self {
            ident: quote_ident(collection),
        }
    }

    /// Idempotent table creation.
    pub fn create(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (id TEXT NOT NULL PRIMARY KEY, obj TEXT NOT NULL)",
            self.ident
        )
    }

    /// Insert-or-replace of one payload, bound as `(?1 = id, ?2 = obj)`.
    pub fn upsert(&self) -> String {
        format!(
            "INSERT INTO {} (id, obj) VALUES (?1, ?2) ON CONFLICT(id) DO UPDATE SET obj = excluded.obj",
            self.ident
        )
    }

    /// Point delete, bound as `(?1 = id)`.
    pub fn delete(&self) -> String {
        format!("DELETE FROM {} WHERE id = ?1", self.ident)
    }

    /// Point lookup, bound as `(?1 = id)`.
    pub fn select_one(&self) -> String {
        format!("SELECT obj FROM {} WHERE id = ?1", self.ident)
    }

    /// Full scan.
    pub fn select_all(&self) -> String {
        format!("SELECT id, obj FROM {}", self.ident)
    }
}

/// Quotes an identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("widgets"), "\"widgets\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(quote_ident(""), "\"\"");
    }

    #[test]
    fn test_statements() {
        let sql = TableSql::new("storeTest");
        assert_eq!(
            sql.create(),
            "CREATE TABLE IF NOT EXISTS \"storeTest\" (id TEXT NOT NULL PRIMARY KEY, obj TEXT NOT NULL)"
        );
        assert!(sql.upsert().starts_with("INSERT INTO \"storeTest\" (id, obj)"));
        assert!(sql.upsert().contains("ON CONFLICT(id) DO UPDATE"));
        assert_eq!(sql.delete(), "DELETE FROM \"storeTest\" WHERE id = ?1");
        assert_eq!(sql.select_one(), "SELECT obj FROM \"storeTest\" WHERE id = ?1");
        assert_eq!(sql.select_all(), "SELECT id, obj FROM \"storeTest\"");
    }

    #[test]
    fn test_hostile_name_stays_one_identifier() {
        let sql = TableSql::new("x\"; DROP TABLE y; --");
        assert_eq!(
            sql.delete(),
            "DELETE FROM \"x\"\"; DROP TABLE y; --\" WHERE id = ?1"
        );
    }
}
