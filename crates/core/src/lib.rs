//! Marketplace Core - Shared types library.
//!
//! This crate provides the cart data model used across the marketplace crates:
//! - `cart` - Cart store, persistence and summary derivation
//! - `cli` - Command-line driver over a file-backed cart
//!
//! # Architecture
//!
//! The core crate contains only types and pure list transformations - no I/O,
//! no storage access, no async runtime. This keeps it lightweight and allows it
//! to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Product IDs, prices, line items and the cart list

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
