//! Floating cart summary.
//!
//! Derives the running total and item count shown on the floating cart
//! button, and hands "open the cart" off to a [`Navigator`].
//!
//! Derived values are cached against the store revision. Any committed
//! change bumps the revision, so the next read recomputes.

use std::sync::{Mutex, PoisonError};

use marketplace_core::{Cart, CurrencyCode};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::error::{CartError, Result};
use crate::format::CurrencyFormatter;
use crate::navigation::{CART_SCREEN, Navigator};
use crate::store::{CartStore, WeakCartStore};

/// Aggregates over a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CartTotals {
    /// Sum of `price * quantity`.
    pub total_price: Decimal,
    /// Sum of quantities.
    pub item_count: u64,
}

impl CartTotals {
    /// # Errors
    ///
    /// Returns `CartError::TotalOverflow` if the total price is out of range.
    pub fn from_cart(cart: &Cart) -> Result<Self> {
        Ok(Self {
            total_price: cart.total_price().ok_or(CartError::TotalOverflow)?,
            item_count: cart.total_quantity(),
        })
    }
}

/// Display values for the floating cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryView {
    /// Formatted total price.
    pub total_price: String,
    pub item_count: u64,
    /// e.g. "3 items".
    pub item_label: String,
}

#[derive(Clone, Copy)]
struct Cached {
    revision: u64,
    totals: CartTotals,
}

/// Cart summary bound to a store.
///
/// Holds a non-owning handle: once the store is dropped every accessor
/// returns `CartError::NoActiveStore`.
pub struct CartSummary<F = CurrencyCode> {
    store: WeakCartStore,
    formatter: F,
    cache: Mutex<Option<Cached>>,
}

impl<F: CurrencyFormatter> CartSummary<F> {
    #[must_use]
    pub fn new(store: &CartStore, formatter: F) -> Self {
        Self {
            store: store.downgrade(),
            formatter,
            cache: Mutex::new(None),
        }
    }

    /// Current totals, recomputed if the cart changed since the last call.
    ///
    /// # Errors
    ///
    /// - `CartError::NoActiveStore` if the store has been dropped
    /// - `CartError::TotalOverflow` if the total price is out of range
    pub fn totals(&self) -> Result<CartTotals> {
        let store = self.store.upgrade().ok_or(CartError::NoActiveStore)?;
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);

        let current = store.revision();
        if let Some(cached) = cache.as_ref().filter(|cached| cached.revision == current) {
            return Ok(cached.totals);
        }

        let (cart, revision) = store.snapshot();
        let totals = CartTotals::from_cart(&cart).inspect_err(|_| {
            warn!(revision, items = cart.len(), "Cart total is out of range");
        })?;
        debug!(
            revision,
            item_count = totals.item_count,
            total_price = %totals.total_price,
            "Recomputed cart totals"
        );
        *cache = Some(Cached { revision, totals });
        Ok(totals)
    }

    /// Formatted values for display.
    ///
    /// # Errors
    ///
    /// Same as [`totals`](Self::totals).
    pub fn view(&self) -> Result<SummaryView> {
        let totals = self.totals()?;
        Ok(SummaryView {
            total_price: self.formatter.format(totals.total_price),
            item_count: totals.item_count,
            item_label: item_label(totals.item_count),
        })
    }

    /// Navigate to the full cart screen.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NoActiveStore` if the store has been dropped.
    pub fn open_cart(&self, navigator: &dyn Navigator) -> Result<()> {
        if self.store.upgrade().is_none() {
            return Err(CartError::NoActiveStore);
        }
        navigator.navigate(CART_SCREEN);
        Ok(())
    }
}

fn item_label(count: u64) -> String {
    if count == 1 {
        "1 item".to_string()
    } else {
        format!("{count} items")
    }
}
