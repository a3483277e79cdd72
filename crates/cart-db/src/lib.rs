//! Type-safe SQLite layer used for stored cart snapshots.
//!
//! Provides a simple, ergonomic API over SQLite with type-safe query
//! results. Native builds use `rusqlite`; `wasm32` builds talk to Spin's
//! SQLite database.
//!
//! # Example
//!
//! ```rust,ignore
//! use cart_db::{Db, params};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Snapshot {
//!     instance: String,
//!     content: String,
//! }
//!
//! let db = Db::connect(None)?;
//!
//! db.execute(
//!     "INSERT INTO cart (identifier, instance, content, created_at) VALUES (?, ?, ?, ?)",
//!     params!["user-1", "default", "[]", "2024-01-01T00:00:00Z"]
//! )?;
//!
//! let snapshot: Option<Snapshot> = db.query_optional(
//!     "SELECT instance, content FROM cart WHERE identifier = ?",
//!     params!["user-1"]
//! )?;
//! ```

mod connection;
mod db;
mod error;
mod types;

pub use connection::Connection;
#[cfg(target_arch = "wasm32")]
pub use connection::SpinConnection;
#[cfg(not(target_arch = "wasm32"))]
pub use connection::SqliteConnection;
pub use db::Db;
pub use error::DbError;
pub use types::{QueryResult, Row, Value};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{params, Connection, Db, DbError, QueryResult, Row, Value};
}

/// Create a parameter list for SQL queries.
///
/// # Example
///
/// ```rust,ignore
/// use cart_db::params;
///
/// let params = params!["value1", 42_i64, 3.14];
/// ```
#[macro_export]
macro_rules! params {
    () => {
        &[]
    };
    ($($param:expr),+ $(,)?) => {
        &[$($crate::Value::from($param)),+]
    };
}
