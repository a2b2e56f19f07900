//! Key-value storage collaborators for cart snapshots.
//!
//! The store only needs two operations: read the text stored under a key,
//! and replace it. Implementations:
//!
//! - [`MemoryStorage`] - in-process map, with failure injection for tests
//! - [`FileStorage`] - one file per key under a directory

use async_trait::async_trait;
use thiserror::Error;

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Errors from a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend refused the operation.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// An async key-value store holding textual values.
#[async_trait]
pub trait CartStorage: Send + Sync {
    /// Read the value stored under `key`, or `None` if nothing is stored.
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value stored under `key`.
    async fn set_item(&self, key: &str, value: String) -> Result<(), StorageError>;
}
