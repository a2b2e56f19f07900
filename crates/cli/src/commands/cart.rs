//! Cart commands.
//!
//! Each command works on a hydrated store and waits for its storage write
//! before returning, so the process never exits mid-write.

use marketplace_cart::{CartError, CartStore, CartSummary, CurrencyFormatter, Navigator};
use marketplace_core::{Cart, CurrencyCode, NewLineItem, ProductId};
use tracing::{info, warn};

/// Navigator for a terminal: there is no screen to move to, so it logs.
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, screen: &str) {
        info!(screen, "Navigate");
    }
}

/// Restore the saved cart.
///
/// An unreadable or corrupt snapshot is logged and the command carries on
/// with an empty cart. The next write replaces the bad snapshot.
///
/// # Errors
///
/// Returns any other hydration error.
pub async fn load(store: &CartStore) -> Result<(), CartError> {
    match store.hydrate().await {
        Ok(_) => Ok(()),
        Err(e @ (CartError::Snapshot(_) | CartError::Storage(_))) => {
            warn!(error = %e, "Could not restore saved cart, continuing with an empty cart");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Add a product to the cart.
///
/// # Errors
///
/// Returns an error if the snapshot cannot be written.
pub async fn add(store: &CartStore, item: NewLineItem) -> Result<(), CartError> {
    let id = item.id.clone();
    store.add_to_cart(item).wait().await?;

    let quantity = store.products().get(&id).map_or(0, |line| line.quantity);
    info!(product_id = %id, quantity, "Added to cart");
    Ok(())
}

/// Raise a product's quantity by one.
///
/// # Errors
///
/// Returns an error if the snapshot cannot be written.
pub async fn increment(store: &CartStore, id: &ProductId) -> Result<(), CartError> {
    warn_if_missing(store, id);
    store.increment(id).wait().await?;
    log_quantity(store, id);
    Ok(())
}

/// Lower a product's quantity by one, stopping at zero.
///
/// # Errors
///
/// Returns an error if the snapshot cannot be written.
pub async fn decrement(store: &CartStore, id: &ProductId) -> Result<(), CartError> {
    warn_if_missing(store, id);
    store.decrement(id).wait().await?;
    log_quantity(store, id);
    Ok(())
}

/// Log every line in the cart.
pub fn show(store: &CartStore, currency: CurrencyCode) {
    let cart = store.products();
    if cart.is_empty() {
        info!("Cart is empty");
        return;
    }
    for line in render_lines(&cart, &currency) {
        info!("{line}");
    }
}

/// Log the floating-cart summary.
///
/// # Errors
///
/// Returns an error if the store is no longer alive or the total is out
/// of range.
pub fn summary(store: &CartStore, currency: CurrencyCode) -> Result<(), CartError> {
    let view = CartSummary::new(store, currency).view()?;
    info!(
        total = %view.total_price,
        items = view.item_count,
        "{}: {}",
        view.item_label,
        view.total_price
    );
    Ok(())
}

/// Open the cart screen.
///
/// # Errors
///
/// Returns an error if the store is no longer alive.
pub fn open(store: &CartStore, currency: CurrencyCode) -> Result<(), CartError> {
    CartSummary::new(store, currency).open_cart(&LogNavigator)
}

/// One display line per cart line: `id  title  qty x price = subtotal`.
///
/// A subtotal outside the `Decimal` range shows as `out of range`.
pub fn render_lines(cart: &Cart, formatter: &dyn CurrencyFormatter) -> Vec<String> {
    cart.iter()
        .map(|line| {
            let subtotal = line
                .subtotal()
                .map_or_else(|| "out of range".to_string(), |s| formatter.format(s));
            format!(
                "{}  {}  {} x {} = {subtotal}",
                line.id,
                line.title,
                line.quantity,
                formatter.format(line.price),
            )
        })
        .collect()
}

fn warn_if_missing(store: &CartStore, id: &ProductId) {
    if store.products().get(id).is_none() {
        warn!(product_id = %id, "Product is not in the cart");
    }
}

fn log_quantity(store: &CartStore, id: &ProductId) {
    if let Some(line) = store.products().get(id) {
        info!(product_id = %id, quantity = line.quantity, "Updated quantity");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use marketplace_cart::{FileStorage, HydrateOutcome, MemoryStorage};
    use rust_decimal::Decimal;

    use super::*;

    const KEY: &str = "@GoMarketplace:cart";

    fn cap() -> NewLineItem {
        NewLineItem {
            id: ProductId::new("cap"),
            title: "Cap".to_string(),
            image_url: "https://cdn.example.com/cap.png".to_string(),
            price: Decimal::new(1250, 2),
        }
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_does_not_block_commands() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        let snapshot = storage.path_for(KEY);
        std::fs::write(&snapshot, "[{]").unwrap();

        let store = CartStore::new(Arc::new(storage), KEY);
        load(&store).await.unwrap();
        assert!(store.products().is_empty());
        summary(&store, CurrencyCode::USD).unwrap();

        add(&store, cap()).await.unwrap();
        let text = std::fs::read_to_string(&snapshot).unwrap();
        let saved: Cart = serde_json::from_str(&text).unwrap();
        assert_eq!(saved, store.products());
    }

    #[tokio::test]
    async fn test_load_rejects_second_hydrate() {
        let store = CartStore::new(Arc::new(MemoryStorage::new()), KEY);
        load(&store).await.unwrap();
        assert!(matches!(
            load(&store).await,
            Err(CartError::AlreadyHydrated)
        ));
    }

    #[test]
    fn test_render_lines_out_of_range_subtotal() {
        let mut item = cap();
        item.price = Decimal::MAX;
        let cart = Cart::new().with_added(item.clone()).with_added(item);
        let lines = render_lines(&cart, &CurrencyCode::USD);
        assert!(lines.first().unwrap().ends_with("= out of range"));
    }

    #[test]
    fn test_render_lines() {
        let cart = Cart::new().with_added(cap()).with_added(cap());
        let lines = render_lines(&cart, &CurrencyCode::USD);
        assert_eq!(lines, ["cap  Cap  2 x $12.50 = $25.00"]);
    }

    #[tokio::test]
    async fn test_commands_survive_process_restart() {
        let dir = tempfile::tempdir().unwrap();

        let store = CartStore::new(Arc::new(FileStorage::new(dir.path())), KEY);
        store.hydrate().await.unwrap();
        add(&store, cap()).await.unwrap();
        increment(&store, &ProductId::new("cap")).await.unwrap();
        decrement(&store, &ProductId::new("cap")).await.unwrap();
        let before = store.products();
        drop(store);

        let reopened = CartStore::new(Arc::new(FileStorage::new(dir.path())), KEY);
        assert_eq!(
            reopened.hydrate().await.unwrap(),
            HydrateOutcome::Restored { items: 1 }
        );
        assert_eq!(reopened.products(), before);
        assert_eq!(reopened.products().total_quantity(), 1);
        summary(&reopened, CurrencyCode::USD).unwrap();
        open(&reopened, CurrencyCode::USD).unwrap();
    }
}
