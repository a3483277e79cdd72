//! Stored cart snapshots in the relational database.

use cart_db::{params, Db};
use chrono::Utc;
use serde::Deserialize;
use tracing::debug;

use crate::cart::{CartContent, CartItem};
use crate::CartError;

/// A stored snapshot row.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StoredCart {
    /// Caller-supplied owner key (e.g. a user id).
    pub identifier: String,
    /// Bare instance name the snapshot was taken from.
    pub instance: String,
    /// JSON array of line items.
    pub content: String,
    /// RFC 3339 timestamp.
    pub created_at: String,
}

impl StoredCart {
    /// Decode the stored line items.
    pub fn items(&self) -> Result<Vec<CartItem>, CartError> {
        Ok(serde_json::from_str(&self.content)?)
    }
}

/// Reads and writes snapshot rows in one table.
pub struct SnapshotRepository {
    db: Db,
    table: String,
}

impl SnapshotRepository {
    /// Create a repository over `table`.
    ///
    /// The table name ends up in SQL text, so only ASCII letters, digits and
    /// `_` are accepted.
    pub fn new(db: Db, table: impl Into<String>) -> Result<Self, CartError> {
        let table = table.into();
        let valid = !table.is_empty()
            && table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(CartError::Config(format!("Invalid table name: {table:?}")));
        }
        Ok(Self { db, table })
    }

    /// Table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the table if it does not exist.
    pub fn ensure_table(&self) -> Result<(), CartError> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                identifier TEXT NOT NULL,
                instance TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            self.table
        );
        self.db.execute(&sql, params![])?;
        Ok(())
    }

    /// Whether a snapshot exists for the pair.
    pub fn exists(&self, identifier: &str, instance: &str) -> Result<bool, CartError> {
        Ok(self.find(identifier, instance)?.is_some())
    }

    /// Fetch the snapshot for the pair.
    pub fn find(&self, identifier: &str, instance: &str) -> Result<Option<StoredCart>, CartError> {
        let sql = format!(
            "SELECT identifier, instance, content, created_at FROM {} \
             WHERE identifier = ? AND instance = ? ORDER BY created_at DESC LIMIT 1",
            self.table
        );
        Ok(self.db.query_optional(&sql, params![identifier, instance])?)
    }

    /// Delete every snapshot for the pair.
    pub fn delete(&self, identifier: &str, instance: &str) -> Result<(), CartError> {
        let sql = format!(
            "DELETE FROM {} WHERE identifier = ? AND instance = ?",
            self.table
        );
        debug!(identifier, instance, "deleting stored cart");
        self.db.execute(&sql, params![identifier, instance])?;
        Ok(())
    }

    /// Insert a fresh snapshot of `content`.
    pub fn insert(
        &self,
        identifier: &str,
        instance: &str,
        content: &CartContent,
    ) -> Result<(), CartError> {
        let items: Vec<&CartItem> = content.values().collect();
        let encoded = serde_json::to_string(&items)?;
        let sql = format!(
            "INSERT INTO {} (identifier, instance, content, created_at) VALUES (?, ?, ?, ?)",
            self.table
        );
        debug!(identifier, instance, lines = items.len(), "inserting stored cart");
        self.db.execute(
            &sql,
            params![identifier, instance, encoded, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repository() -> SnapshotRepository {
        let repository = SnapshotRepository::new(Db::connect(None).unwrap(), "cart").unwrap();
        repository.ensure_table().unwrap();
        repository
    }

    fn content() -> CartContent {
        let item = CartItem::new("SKU1", "Widget", 2, 9.99);
        let mut content = CartContent::new();
        content.insert(item.row_id.clone(), item);
        content
    }

    #[test]
    fn test_invalid_table_name() {
        let result = SnapshotRepository::new(Db::connect(None).unwrap(), "cart; DROP TABLE x");
        assert!(matches!(result, Err(CartError::Config(_))));
    }

    #[test]
    fn test_insert_find_delete() {
        let repository = repository();
        assert!(repository.find("user-1", "default").unwrap().is_none());

        repository.insert("user-1", "default", &content()).unwrap();

        let stored = repository.find("user-1", "default").unwrap().unwrap();
        assert_eq!(stored.instance, "default");
        let items = stored.items().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].qty, 2);

        assert!(!repository.exists("user-1", "wishlist").unwrap());
        assert!(!repository.exists("user-2", "default").unwrap());

        repository.delete("user-1", "default").unwrap();
        assert!(!repository.exists("user-1", "default").unwrap());
    }

    #[test]
    fn test_ensure_table_is_idempotent() {
        let repository = repository();
        repository.ensure_table().unwrap();
        assert_eq!(repository.table(), "cart");
    }
}
