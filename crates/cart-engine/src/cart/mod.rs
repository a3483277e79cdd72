//! Shopping cart module.
//!
//! Contains the session-backed cart, line items, fees, metadata paths and
//! totals.

#[allow(clippy::module_inception)]
mod cart;
mod fee;
mod item;
pub mod metadata;
mod pricing;

pub use cart::{Cart, DEFAULT_INSTANCE};
pub use fee::{Fee, FeeValue};
pub use item::{
    row_id, Added, Buyable, CartContent, CartItem, CartItemOptions, ItemAttributes, ItemPatch,
    ItemSpec, ItemUpdate,
};
pub use metadata::Metadata;
pub use pricing::{format_number, CartTotals, Fees};
