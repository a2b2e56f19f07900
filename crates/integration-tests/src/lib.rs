//! Integration tests for the marketplace cart.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p marketplace-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_store` - Store mutations against file-backed storage
//! - `cart_summary` - Summary values derived from a live store
//!
//! This library holds the fixtures shared by the test files.

use std::path::Path;
use std::sync::Arc;

use marketplace_cart::{CartStore, FileStorage};
use marketplace_core::{NewLineItem, ProductId};
use rust_decimal::Decimal;

/// Storage key used by every test store.
pub const CART_KEY: &str = "@GoMarketplace:cart";

/// A product with a whole-unit price.
#[must_use]
pub fn product(id: &str, price: i64) -> NewLineItem {
    NewLineItem {
        id: ProductId::new(id),
        title: format!("Product {id}"),
        image_url: format!("https://cdn.example.com/{id}.png"),
        price: Decimal::new(price, 0),
    }
}

/// A store persisting to `dir`.
#[must_use]
pub fn file_store(dir: &Path) -> CartStore {
    CartStore::new(Arc::new(FileStorage::new(dir)), CART_KEY)
}
