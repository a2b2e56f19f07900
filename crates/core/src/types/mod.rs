//! Core types for the marketplace cart.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod id;
pub mod price;

pub use cart::{Cart, LineItem, NewLineItem};
pub use id::*;
pub use price::{CurrencyCode, Price, UnknownCurrency};
