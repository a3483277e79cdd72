//! Cart error types.

use cart_db::DbError;
use cart_session::SessionError;
use thiserror::Error;

/// Errors that can occur in cart operations.
#[derive(Error, Debug)]
pub enum CartError {
    /// The row id is not part of the current cart content.
    #[error("Invalid row identifier: {0}")]
    InvalidRowIdentifier(String),

    /// Quantity added to the cart was zero or negative.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// A quantity sum does not fit in an `i64`.
    #[error("Arithmetic overflow in quantity calculation")]
    Overflow,

    /// Empty instance names and names starting with `_` (reserved for cart bookkeeping).
    #[error("Invalid instance name: {0}")]
    InvalidInstance(String),

    /// The association target is not a registered model.
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// A snapshot already exists and overwriting is disabled.
    #[error("Cart already stored for identifier {identifier} (instance {instance})")]
    AlreadyStored { identifier: String, instance: String },

    /// A fee value that is not a number (optionally with a trailing `%`).
    #[error("Invalid fee value: {0}")]
    InvalidFeeValue(String),

    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session store failure.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Relational store failure.
    #[error(transparent)]
    Database(#[from] DbError),

    /// Snapshot (de)serialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
