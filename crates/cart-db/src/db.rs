//! Database handle and typed query helpers.

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{Connection, DbError, QueryResult, Value};

/// Database handle.
///
/// Wraps a [`Connection`] backend and adds typed result helpers.
pub struct Db {
    conn: Box<dyn Connection>,
}

impl Db {
    /// Wrap an existing connection.
    pub fn new(conn: impl Connection + 'static) -> Self {
        Self {
            conn: Box::new(conn),
        }
    }

    /// Connect using a configured connection name.
    ///
    /// Natively the name is a SQLite file path and `None` means a private
    /// in-memory database.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn connect(connection: Option<&str>) -> Result<Self, DbError> {
        let conn = match connection {
            Some(path) => crate::SqliteConnection::open(path)?,
            None => crate::SqliteConnection::open_in_memory()?,
        };
        Ok(Self::new(conn))
    }

    /// Connect using a configured connection name.
    ///
    /// On Spin the name selects a named database and `None` the default one.
    #[cfg(target_arch = "wasm32")]
    pub fn connect(connection: Option<&str>) -> Result<Self, DbError> {
        let conn = match connection {
            Some(name) => crate::SpinConnection::open(name)?,
            None => crate::SpinConnection::open_default()?,
        };
        Ok(Self::new(conn))
    }

    /// Execute a SQL statement that doesn't return rows.
    ///
    /// Use this for INSERT, UPDATE, DELETE, CREATE TABLE, etc.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// db.execute(
    ///     "DELETE FROM cart WHERE identifier = ? AND instance = ?",
    ///     params!["user-1", "default"]
    /// )?;
    /// ```
    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<(), DbError> {
        debug!(sql, params = params.len(), "execute");
        self.conn.execute(sql, params)
    }

    /// Execute a SQL query and return raw results.
    pub fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult, DbError> {
        debug!(sql, params = params.len(), "query");
        self.conn.query(sql, params)
    }

    /// Execute a SQL query and return an optional single row.
    pub fn query_optional<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<Option<T>, DbError> {
        let result = self.query(sql, params)?;
        match result.first() {
            Some(row) => Ok(Some(row.deserialize()?)),
            None => Ok(None),
        }
    }
}
