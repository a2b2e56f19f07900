//! Marketplace Cart - persistent cart store and floating cart summary.
//!
//! # Architecture
//!
//! - [`CartStore`] owns the cart, applies mutations and schedules writes to a
//!   [`CartStorage`] backend without blocking the caller
//! - [`CartSummary`] derives the total price and item count from a store and
//!   delegates "open cart" to a [`Navigator`]
//! - [`CartConfig`] loads storage location, key and currency from the
//!   environment
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use marketplace_cart::{CartStore, CartSummary, MemoryStorage};
//! use marketplace_core::{CurrencyCode, NewLineItem, ProductId};
//! use rust_decimal::Decimal;
//!
//! # async fn run() -> Result<(), marketplace_cart::CartError> {
//! let store = CartStore::new(Arc::new(MemoryStorage::new()), "@GoMarketplace:cart");
//! store.hydrate().await?;
//!
//! let write = store.add_to_cart(NewLineItem {
//!     id: ProductId::new("a"),
//!     title: "Cap".to_string(),
//!     image_url: "https://cdn.example.com/cap.png".to_string(),
//!     price: Decimal::new(10, 0),
//! });
//! write.wait().await?;
//!
//! let summary = CartSummary::new(&store, CurrencyCode::USD);
//! assert_eq!(summary.view()?.total_price, "$10.00");
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod format;
pub mod navigation;
pub mod storage;
pub mod store;
pub mod summary;

pub use config::{CartConfig, ConfigError};
pub use error::{CartError, Result};
pub use format::CurrencyFormatter;
pub use navigation::{CART_SCREEN, Navigator};
pub use storage::{CartStorage, FileStorage, MemoryStorage, StorageError};
pub use store::{CartEvent, CartStore, HydrateOutcome, PendingWrite, WeakCartStore};
pub use summary::{CartSummary, CartTotals, SummaryView};
