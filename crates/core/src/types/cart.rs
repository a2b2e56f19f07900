//! Cart line items and the cart list.
//!
//! A [`Cart`] is an ordered list of [`LineItem`]s, unique by [`ProductId`].
//! It is never mutated in place: every operation returns the next cart value,
//! and the caller decides whether that value becomes the new state.
//!
//! The JSON form is a bare array of line items. Prices are JSON numbers
//! written with their exact decimal digits:
//!
//! ```json
//! [{"id":"a","title":"Cap","image_url":"https://cdn/cap.png","price":10,"quantity":2}]
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ProductId;

/// One product's presence in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: ProductId,
    pub title: String,
    pub image_url: String,
    /// Unit price. Not validated.
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub price: Decimal,
    pub quantity: u32,
}

impl LineItem {
    /// `price * quantity`, or `None` if it does not fit in a `Decimal`.
    #[must_use]
    pub fn subtotal(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.quantity))
    }
}

/// Payload for adding a product to the cart. Carries no quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLineItem {
    pub id: ProductId,
    pub title: String,
    pub image_url: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub price: Decimal,
}

impl NewLineItem {
    fn with_quantity(self, quantity: u32) -> LineItem {
        LineItem {
            id: self.id,
            title: self.title,
            image_url: self.image_url,
            price: self.price,
            quantity,
        }
    }
}

/// An ordered list of line items, unique by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Return the cart with `item` added.
    ///
    /// If a line with the same id exists, it is rebuilt from the incoming
    /// item's fields (title, image, price) with the old quantity plus one.
    /// Otherwise the item is appended with quantity 1.
    #[must_use]
    pub fn with_added(&self, item: NewLineItem) -> Self {
        let Some(existing) = self.get(&item.id) else {
            let mut items = self.items.clone();
            items.push(item.with_quantity(1));
            return Self { items };
        };

        let quantity = existing.quantity.saturating_add(1);
        let replacement = item.with_quantity(quantity);
        let items = self
            .items
            .iter()
            .map(|line| {
                if line.id == replacement.id {
                    replacement.clone()
                } else {
                    line.clone()
                }
            })
            .collect();
        Self { items }
    }

    /// Return the cart with the matching line's quantity raised by one.
    #[must_use]
    pub fn with_incremented(&self, id: &ProductId) -> Self {
        self.map_quantity(id, |quantity| quantity.saturating_add(1))
    }

    /// Return the cart with the matching line's quantity lowered by one.
    ///
    /// Quantity floors at zero and the line stays in the cart.
    #[must_use]
    pub fn with_decremented(&self, id: &ProductId) -> Self {
        self.map_quantity(id, |quantity| quantity.saturating_sub(1))
    }

    fn map_quantity(&self, id: &ProductId, f: impl Fn(u32) -> u32) -> Self {
        let items = self
            .items
            .iter()
            .map(|line| {
                if &line.id == id {
                    LineItem {
                        quantity: f(line.quantity),
                        ..line.clone()
                    }
                } else {
                    line.clone()
                }
            })
            .collect();
        Self { items }
    }

    /// Sum of `price * quantity` over all lines.
    ///
    /// Prices are not validated, so the total can exceed the `Decimal`
    /// range. Returns `None` in that case.
    #[must_use]
    pub fn total_price(&self) -> Option<Decimal> {
        self.items.iter().try_fold(Decimal::ZERO, |total, line| {
            total.checked_add(line.subtotal()?)
        })
    }

    /// Sum of quantities over all lines (not the number of distinct lines).
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Look up a line by product id.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&LineItem> {
        self.items.iter().find(|line| &line.id == id)
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LineItem> {
        self.items.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[LineItem] {
        &self.items
    }
}

impl From<Vec<LineItem>> for Cart {
    /// Build a cart from a list as-is. Duplicate ids are not merged.
    fn from(items: Vec<LineItem>) -> Self {
        Self { items }
    }
}

impl<'a> IntoIterator for &'a Cart {
    type Item = &'a LineItem;
    type IntoIter = std::slice::Iter<'a, LineItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
