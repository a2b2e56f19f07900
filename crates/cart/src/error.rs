//! Error types for the cart store and its collaborators.

use thiserror::Error;

use crate::storage::StorageError;

/// Errors produced by the cart store and the cart summary.
#[derive(Debug, Error)]
pub enum CartError {
    /// The storage collaborator failed to read or write.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The persisted snapshot could not be parsed.
    #[error("Invalid cart snapshot: {0}")]
    Snapshot(#[source] serde_json::Error),

    /// The cart could not be serialized for persistence.
    #[error("Failed to serialize cart: {0}")]
    Serialize(#[source] serde_json::Error),

    /// `hydrate` was called more than once on the same store.
    #[error("Cart store is already hydrated")]
    AlreadyHydrated,

    /// The cart was requested after its store was dropped.
    #[error("Cart accessed outside of an active cart store")]
    NoActiveStore,

    /// The cart total does not fit in a `Decimal`.
    #[error("Cart total is out of range")]
    TotalOverflow,

    /// A spawned storage write panicked or was cancelled.
    #[error("Cart write aborted: {0}")]
    WriteAborted(String),
}

/// Result type alias for `CartError`.
pub type Result<T> = std::result::Result<T, CartError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_error_display() {
        assert_eq!(
            CartError::NoActiveStore.to_string(),
            "Cart accessed outside of an active cart store"
        );
        assert_eq!(
            CartError::Storage(StorageError::Unavailable("disk full".to_string())).to_string(),
            "Storage error: Storage unavailable: disk full"
        );
    }
}
