//! Session shopping cart engine.
//!
//! A [`Cart`] keeps line items, fees and metadata in the user's session and
//! can write a snapshot of its content to a SQLite table to be restored in a
//! later session.
//!
//! - **Items**: lines are keyed by a row id derived from product id and
//!   options; adding the same product with the same options merges quantities
//! - **Totals**: subtotal, tax, fees and total are recomputed from the
//!   session on every call
//! - **Instances**: one session holds several named carts (`default`,
//!   `wishlist`, ...)
//! - **Snapshots**: [`Cart::store`] and [`Cart::restore`] move content to and
//!   from the database
//!
//! # Example
//!
//! ```rust,ignore
//! use cart_engine::prelude::*;
//! use cart_session::{MemoryStore, Session, SessionId};
//! use cart_db::Db;
//!
//! let session = Session::new(SessionId::generate(), MemoryStore::new());
//! let cart = Cart::new(CartConfig::default(), session, Db::connect(None)?)?
//!     .with_events(TracingDispatcher);
//!
//! cart.add_item("SKU1", "Widget", 2, 9.99)?;
//! cart.add(ItemAttributes::new("SKU2", "Shirt", 1, 25.0).with_option("size", "L"))?;
//! cart.add_fee("ship", "Shipping", 5)?;
//!
//! println!("Total: {}", cart.formatted(cart.total()?));
//!
//! cart.store("user-42")?;
//! ```

pub mod cart;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod storage;

pub use cart::{
    row_id, Added, Buyable, Cart, CartContent, CartItem, CartItemOptions, CartTotals, Fee,
    FeeValue, Fees, ItemAttributes, ItemPatch, ItemSpec, ItemUpdate, Metadata, DEFAULT_INSTANCE,
};
pub use config::{CartConfig, DatabaseConfig, FormatConfig};
pub use error::CartError;
pub use events::{
    CartEvent, EventDispatcher, NullDispatcher, RecordingDispatcher, TracingDispatcher,
};
pub use models::ModelRegistry;
pub use storage::{SnapshotRepository, StoredCart};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::cart::{
        Added, Buyable, Cart, CartItem, CartItemOptions, CartTotals, Fee, ItemAttributes,
        ItemPatch, ItemSpec, ItemUpdate,
    };
    pub use crate::config::CartConfig;
    pub use crate::error::CartError;
    pub use crate::events::{CartEvent, EventDispatcher, NullDispatcher, TracingDispatcher};
    pub use crate::models::ModelRegistry;
}
