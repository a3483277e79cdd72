//! SQL connection backends.

use crate::{DbError, QueryResult, Value};
#[cfg(not(target_arch = "wasm32"))]
use crate::Row;

/// A connection that can run SQL with positional `?` parameters.
pub trait Connection {
    /// Execute a statement that doesn't return rows.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<(), DbError>;

    /// Execute a query and collect every row.
    fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult, DbError>;
}

/// Native SQLite connection (file-backed or in-memory).
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug)]
pub struct SqliteConnection {
    conn: rusqlite::Connection,
}

#[cfg(not(target_arch = "wasm32"))]
impl SqliteConnection {
    /// Open (or create) a database file.
    pub fn open(path: &str) -> Result<Self, DbError> {
        let conn =
            rusqlite::Connection::open(path).map_err(|e| DbError::OpenError(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = rusqlite::Connection::open_in_memory()
            .map_err(|e| DbError::OpenError(e.to_string()))?;
        Ok(Self { conn })
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn to_sqlite(value: &Value) -> rusqlite::types::Value {
    match value {
        Value::Null => rusqlite::types::Value::Null,
        Value::Integer(i) => rusqlite::types::Value::Integer(*i),
        Value::Real(f) => rusqlite::types::Value::Real(*f),
        Value::Text(s) => rusqlite::types::Value::Text(s.clone()),
        Value::Blob(b) => rusqlite::types::Value::Blob(b.clone()),
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl From<rusqlite::types::Value> for Value {
    fn from(v: rusqlite::types::Value) -> Self {
        match v {
            rusqlite::types::Value::Null => Value::Null,
            rusqlite::types::Value::Integer(i) => Value::Integer(i),
            rusqlite::types::Value::Real(f) => Value::Real(f),
            rusqlite::types::Value::Text(s) => Value::Text(s),
            rusqlite::types::Value::Blob(b) => Value::Blob(b),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Connection for SqliteConnection {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<(), DbError> {
        self.conn
            .execute(sql, rusqlite::params_from_iter(params.iter().map(to_sqlite)))?;
        Ok(())
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult, DbError> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let width = columns.len();

        let rows = stmt
            .query_map(
                rusqlite::params_from_iter(params.iter().map(to_sqlite)),
                |row| {
                    (0..width)
                        .map(|i| row.get::<_, rusqlite::types::Value>(i).map(Value::from))
                        .collect::<Result<Vec<_>, _>>()
                },
            )?
            .map(|values| values.map(|values| Row::new(columns.clone(), values)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(QueryResult::new(columns, rows))
    }
}

/// Connection to Spin's SQLite database.
#[cfg(target_arch = "wasm32")]
pub struct SpinConnection {
    conn: spin_sdk::sqlite::Connection,
}

#[cfg(target_arch = "wasm32")]
impl SpinConnection {
    /// Open the default SQLite database.
    pub fn open_default() -> Result<Self, DbError> {
        let conn = spin_sdk::sqlite::Connection::open_default()
            .map_err(|e| DbError::OpenError(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Open a named SQLite database.
    pub fn open(name: &str) -> Result<Self, DbError> {
        let conn = spin_sdk::sqlite::Connection::open(name)
            .map_err(|e| DbError::OpenError(e.to_string()))?;
        Ok(Self { conn })
    }

    fn run(&self, sql: &str, params: &[Value]) -> Result<QueryResult, DbError> {
        let spin_params: Vec<spin_sdk::sqlite::Value> = params
            .iter()
            .map(|v| match v {
                Value::Null => spin_sdk::sqlite::Value::Null,
                Value::Integer(i) => spin_sdk::sqlite::Value::Integer(*i),
                Value::Real(f) => spin_sdk::sqlite::Value::Real(*f),
                Value::Text(s) => spin_sdk::sqlite::Value::Text(s.clone()),
                Value::Blob(b) => spin_sdk::sqlite::Value::Blob(b.clone()),
            })
            .collect();

        let result = self
            .conn
            .execute(sql, spin_params.as_slice())
            .map_err(|e| DbError::QueryError(e.to_string()))?;

        let columns: Vec<String> = result.columns.iter().map(|c| c.to_string()).collect();
        let rows = result
            .rows
            .iter()
            .map(|row| {
                let values = row
                    .values
                    .iter()
                    .map(|v| match v {
                        spin_sdk::sqlite::Value::Null => Value::Null,
                        spin_sdk::sqlite::Value::Integer(i) => Value::Integer(*i),
                        spin_sdk::sqlite::Value::Real(f) => Value::Real(*f),
                        spin_sdk::sqlite::Value::Text(s) => Value::Text(s.clone()),
                        spin_sdk::sqlite::Value::Blob(b) => Value::Blob(b.clone()),
                    })
                    .collect();
                crate::Row::new(columns.clone(), values)
            })
            .collect();

        Ok(QueryResult::new(columns, rows))
    }
}

#[cfg(target_arch = "wasm32")]
impl Connection for SpinConnection {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<(), DbError> {
        self.run(sql, params).map(|_| ())
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult, DbError> {
        self.run(sql, params)
    }
}
