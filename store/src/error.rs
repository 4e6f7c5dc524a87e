//! Error types for table-store and cart operations.

use thiserror::Error;

/// Result type alias for table-store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors from the table-store gateway.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The table-store could not be reached.
    #[error("table-store unreachable: {0}")]
    Unavailable(String),

    /// The table-store answered with a non-success status.
    #[error("table-store error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body from the table-store
        message: String,
    },

    /// A row or file was not found upstream.
    #[error("{0} not found")]
    NotFound(String),

    /// A row could not be decoded into its record type.
    #[error("malformed row: {0}")]
    Decode(String),
}

/// Errors produced by cart reconciliation.
///
/// These are typed results, not sentinel values: "cart full" in particular
/// is a variant here and a 400 at the HTTP boundary, never a marker string
/// smuggled through a numeric field.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CartError {
    /// The cart already holds the maximum number of distinct titles.
    #[error("cart is full ({0} distinct items)")]
    CartFull(usize),

    /// The referenced title is not in the cart.
    #[error("\"{0}\" is not in the cart")]
    NotInCart(String),

    /// The requested quantity is unusable.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),
}
