//! Session-scoped key-value storage for the cart engine.
//!
//! Provides a small, typed API over a byte-oriented key-value store: values
//! are JSON-encoded on the way in and decoded on the way out, and every key
//! is scoped to a session ID.
//!
//! # Example
//!
//! ```rust,ignore
//! use cart_session::{MemoryStore, Session, SessionId};
//!
//! let session = Session::new(SessionId::generate(), MemoryStore::new());
//!
//! // Store a value
//! session.put("cart.default", &items)?;
//!
//! // Retrieve a value
//! let items: Option<Vec<Item>> = session.get("cart.default")?;
//!
//! // Delete a value
//! session.remove("cart.default")?;
//! ```
//!
//! On `wasm32` the [`SpinStore`] backend talks to Spin's Key-Value Store.

mod error;
mod kv;
mod session;

pub use error::SessionError;
pub use kv::{KeyValueStore, MemoryStore};
#[cfg(target_arch = "wasm32")]
pub use kv::SpinStore;
pub use session::{Session, SessionId};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{KeyValueStore, MemoryStore, Session, SessionError, SessionId};
}
