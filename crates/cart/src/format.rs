//! Currency formatting seam used by the cart summary.

use marketplace_core::{CurrencyCode, Price};
use rust_decimal::Decimal;

/// Maps an amount to its display string.
pub trait CurrencyFormatter {
    fn format(&self, amount: Decimal) -> String;
}

impl CurrencyFormatter for CurrencyCode {
    fn format(&self, amount: Decimal) -> String {
        Price::new(amount, *self).display()
    }
}
