//! The cart store.
//!
//! [`CartStore`] owns the authoritative [`Cart`] and is the only place it
//! changes. Every mutation:
//!
//! 1. computes the next cart from the current one (pure, under the lock),
//! 2. commits it and bumps the revision,
//! 3. broadcasts [`CartEvent::Changed`],
//! 4. spawns a write of the serialized cart to storage.
//!
//! The caller does not wait for step 4. The returned [`PendingWrite`] can be
//! awaited to observe the outcome, and the outcome is also broadcast as
//! [`CartEvent::Persisted`] or [`CartEvent::PersistFailed`].
//!
//! Writes are not ordered against each other. If two writes finish out of
//! order the older snapshot wins on disk until the next mutation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use chrono::{DateTime, Utc};
use marketplace_core::{Cart, NewLineItem, ProductId};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::config::CartConfig;
use crate::error::{CartError, Result};
use crate::storage::{CartStorage, FileStorage};

/// Capacity of the event channel. Slow subscribers skip older events.
const EVENT_CAPACITY: usize = 64;

/// Notifications emitted by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEvent {
    /// A new cart value was committed.
    Changed { revision: u64 },
    /// The snapshot for `revision` was written to storage.
    Persisted { revision: u64, at: DateTime<Utc> },
    /// Writing the snapshot for `revision` failed. In-memory state is unaffected.
    PersistFailed { revision: u64, error: String },
}

/// Result of [`CartStore::hydrate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydrateOutcome {
    /// No snapshot was stored; the cart stays empty.
    Empty,
    /// The cart was replaced by the stored snapshot.
    Restored { items: usize },
}

/// A storage write scheduled by a mutation.
///
/// Dropping it detaches the write; it still runs to completion.
#[derive(Debug)]
pub struct PendingWrite {
    revision: u64,
    handle: JoinHandle<Result<()>>,
}

impl PendingWrite {
    /// Revision of the cart this write persists.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether the write has completed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the write to finish.
    ///
    /// # Errors
    ///
    /// Returns the storage or serialization error of the write, or
    /// `CartError::WriteAborted` if the write task panicked or was cancelled.
    pub async fn wait(self) -> Result<()> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(CartError::WriteAborted(e.to_string())),
        }
    }
}

struct CartState {
    products: Cart,
    revision: u64,
}

struct CartStoreInner {
    storage: Arc<dyn CartStorage>,
    storage_key: String,
    state: RwLock<CartState>,
    hydrated: AtomicBool,
    events: broadcast::Sender<CartEvent>,
}

impl CartStoreInner {
    // The state is only ever replaced wholesale, so a poisoned lock still
    // holds a consistent cart.
    fn read_state(&self) -> RwLockReadGuard<'_, CartState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, CartState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: CartEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }
}

/// Handle to the cart store.
///
/// Cheaply cloneable via `Arc`; clones share the same cart. Consumers receive
/// a reference or a clone explicitly, there is no global store.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.read_state();
        f.debug_struct("CartStore")
            .field("storage_key", &self.inner.storage_key)
            .field("revision", &state.revision)
            .field("items", &state.products.len())
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Create a store with an empty cart.
    ///
    /// Call [`hydrate`](Self::hydrate) once to restore a saved cart.
    #[must_use]
    pub fn new(storage: Arc<dyn CartStorage>, storage_key: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(CartStoreInner {
                storage,
                storage_key: storage_key.into(),
                state: RwLock::new(CartState {
                    products: Cart::new(),
                    revision: 0,
                }),
                hydrated: AtomicBool::new(false),
                events,
            }),
        }
    }

    /// Create a file-backed store from configuration.
    #[must_use]
    pub fn from_config(config: &CartConfig) -> Self {
        let storage = FileStorage::new(config.storage_dir.clone());
        Self::new(Arc::new(storage), config.storage_key.clone())
    }

    /// Key the snapshot is stored under.
    #[must_use]
    pub fn storage_key(&self) -> &str {
        &self.inner.storage_key
    }

    /// Restore the cart from storage. Runs once per store.
    ///
    /// A missing or empty snapshot leaves the cart empty. On failure the
    /// in-memory cart is left untouched.
    ///
    /// # Errors
    ///
    /// - `CartError::AlreadyHydrated` on a second call
    /// - `CartError::Storage` if the read fails
    /// - `CartError::Snapshot` if the stored text is not a valid cart
    #[instrument(skip(self), fields(key = %self.inner.storage_key))]
    pub async fn hydrate(&self) -> Result<HydrateOutcome> {
        if self.inner.hydrated.swap(true, Ordering::SeqCst) {
            return Err(CartError::AlreadyHydrated);
        }

        let stored = self
            .inner
            .storage
            .get_item(&self.inner.storage_key)
            .await
            .inspect_err(|e| warn!(error = %e, "Failed to read saved cart"))?;

        let Some(text) = stored.filter(|text| !text.is_empty()) else {
            info!("No saved cart, starting empty");
            return Ok(HydrateOutcome::Empty);
        };

        let cart: Cart = serde_json::from_str(&text).map_err(|e| {
            warn!(error = %e, "Saved cart is not valid, starting empty");
            CartError::Snapshot(e)
        })?;

        let items = cart.len();
        let revision = {
            let mut state = self.inner.write_state();
            state.products = cart;
            state.revision += 1;
            state.revision
        };
        self.inner.emit(CartEvent::Changed { revision });

        info!(items, revision, "Restored saved cart");
        Ok(HydrateOutcome::Restored { items })
    }

    /// Add a product, or bump its quantity if it is already in the cart.
    ///
    /// For an existing product the line takes the incoming title, image and
    /// price.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[instrument(skip(self, item), fields(product_id = %item.id))]
    pub fn add_to_cart(&self, item: NewLineItem) -> PendingWrite {
        self.commit(|cart| cart.with_added(item))
    }

    /// Raise the quantity of a product by one. Unknown ids change nothing.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[instrument(skip(self, id), fields(product_id = %id))]
    pub fn increment(&self, id: &ProductId) -> PendingWrite {
        self.commit(|cart| cart.with_incremented(id))
    }

    /// Lower the quantity of a product by one, stopping at zero.
    ///
    /// The line is kept at quantity zero. Unknown ids change nothing.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[instrument(skip(self, id), fields(product_id = %id))]
    pub fn decrement(&self, id: &ProductId) -> PendingWrite {
        self.commit(|cart| cart.with_decremented(id))
    }

    /// Snapshot of the current cart.
    #[must_use]
    pub fn products(&self) -> Cart {
        self.inner.read_state().products.clone()
    }

    /// Current revision. Starts at 0 and grows by one per committed change.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.inner.read_state().revision
    }

    /// Snapshot of the cart together with its revision, read atomically.
    #[must_use]
    pub fn snapshot(&self) -> (Cart, u64) {
        let state = self.inner.read_state();
        (state.products.clone(), state.revision)
    }

    /// Subscribe to store events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.inner.events.subscribe()
    }

    /// A non-owning handle to this store.
    #[must_use]
    pub fn downgrade(&self) -> WeakCartStore {
        WeakCartStore {
            inner: Arc::downgrade(&self.inner),
        }
    }

    fn commit(&self, next: impl FnOnce(&Cart) -> Cart) -> PendingWrite {
        let (cart, revision) = {
            let mut state = self.inner.write_state();
            state.products = next(&state.products);
            state.revision += 1;
            (state.products.clone(), state.revision)
        };

        debug!(revision, items = cart.len(), "Cart changed");
        self.inner.emit(CartEvent::Changed { revision });

        self.persist(cart, revision)
    }

    fn persist(&self, cart: Cart, revision: u64) -> PendingWrite {
        // The task must not keep the store alive, or a summary could still
        // reach a dropped store while the write is in flight.
        let storage = Arc::clone(&self.inner.storage);
        let key = self.inner.storage_key.clone();
        let events = self.inner.events.clone();
        let handle = tokio::spawn(async move {
            let result = write_snapshot(storage.as_ref(), &key, &cart).await;
            let event = match &result {
                Ok(()) => {
                    debug!(revision, "Cart persisted");
                    CartEvent::Persisted {
                        revision,
                        at: Utc::now(),
                    }
                }
                Err(e) => {
                    error!(revision, error = %e, "Failed to persist cart");
                    CartEvent::PersistFailed {
                        revision,
                        error: e.to_string(),
                    }
                }
            };
            // No subscribers is not an error.
            let _ = events.send(event);
            result
        });

        PendingWrite { revision, handle }
    }
}

async fn write_snapshot(storage: &dyn CartStorage, key: &str, cart: &Cart) -> Result<()> {
    let text = serde_json::to_string(cart).map_err(CartError::Serialize)?;
    storage.set_item(key, text).await?;
    Ok(())
}

/// Non-owning handle to a [`CartStore`].
#[derive(Clone, Debug)]
pub struct WeakCartStore {
    inner: Weak<CartStoreInner>,
}

impl WeakCartStore {
    /// The store, if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<CartStore> {
        self.inner.upgrade().map(|inner| CartStore { inner })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::storage::MemoryStorage;

    const KEY: &str = "@GoMarketplace:cart";

    fn product(id: &str, price: i64) -> NewLineItem {
        NewLineItem {
            id: ProductId::new(id),
            title: format!("Product {id}"),
            image_url: format!("https://cdn.example.com/{id}.png"),
            price: Decimal::new(price, 0),
        }
    }

    #[tokio::test]
    async fn test_new_store_is_empty() {
        let store = CartStore::new(Arc::new(MemoryStorage::new()), KEY);
        assert!(store.products().is_empty());
        assert_eq!(store.revision(), 0);
    }

    #[tokio::test]
    async fn test_add_persists_serialized_cart() {
        let storage = Arc::new(MemoryStorage::new());
        let store = CartStore::new(storage.clone(), KEY);

        store.add_to_cart(product("a", 10)).wait().await.unwrap();

        let text = storage.peek(KEY).await.unwrap();
        let saved: Cart = serde_json::from_str(&text).unwrap();
        assert_eq!(saved, store.products());
    }

    #[tokio::test]
    async fn test_each_mutation_bumps_revision() {
        let store = CartStore::new(Arc::new(MemoryStorage::new()), KEY);
        let id = ProductId::new("a");

        let first = store.add_to_cart(product("a", 10));
        let second = store.increment(&id);
        let third = store.decrement(&id);
        let fourth = store.increment(&ProductId::new("missing"));

        assert_eq!(first.revision(), 1);
        assert_eq!(second.revision(), 2);
        assert_eq!(third.revision(), 3);
        assert_eq!(fourth.revision(), 4);
        assert_eq!(store.revision(), 4);
    }

    #[tokio::test]
    async fn test_mutators_see_latest_state_without_awaiting() {
        let store = CartStore::new(Arc::new(MemoryStorage::new()), KEY);
        let id = ProductId::new("a");

        drop(store.add_to_cart(product("a", 10)));
        drop(store.increment(&id));
        drop(store.increment(&id));

        assert_eq!(store.products().get(&id).unwrap().quantity, 3);
    }

    #[tokio::test]
    async fn test_write_failure_is_reported_but_state_kept() {
        let storage = Arc::new(MemoryStorage::new());
        let store = CartStore::new(storage.clone(), KEY);
        let mut events = store.subscribe();

        storage.set_fail_writes(true);
        let result = store.add_to_cart(product("a", 10)).wait().await;

        assert!(matches!(result, Err(CartError::Storage(_))));
        assert_eq!(store.products().len(), 1);
        assert!(storage.peek(KEY).await.is_none());

        assert_eq!(events.recv().await.unwrap(), CartEvent::Changed { revision: 1 });
        assert!(matches!(
            events.recv().await.unwrap(),
            CartEvent::PersistFailed { revision: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_events_follow_commit_then_persist() {
        let store = CartStore::new(Arc::new(MemoryStorage::new()), KEY);
        let mut events = store.subscribe();

        store.add_to_cart(product("a", 10)).wait().await.unwrap();

        assert_eq!(events.recv().await.unwrap(), CartEvent::Changed { revision: 1 });
        assert!(matches!(
            events.recv().await.unwrap(),
            CartEvent::Persisted { revision: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_hydrate_without_snapshot() {
        let store = CartStore::new(Arc::new(MemoryStorage::new()), KEY);
        assert_eq!(store.hydrate().await.unwrap(), HydrateOutcome::Empty);
        assert!(store.products().is_empty());
        assert_eq!(store.revision(), 0);
    }

    #[tokio::test]
    async fn test_hydrate_treats_empty_text_as_absent() {
        let storage = Arc::new(MemoryStorage::with_entry(KEY, ""));
        let store = CartStore::new(storage, KEY);
        assert_eq!(store.hydrate().await.unwrap(), HydrateOutcome::Empty);
    }

    #[tokio::test]
    async fn test_hydrate_restores_snapshot_in_order() {
        let text = r#"[
            {"id":"2","title":"Tee","image_url":"u2","price":19.9,"quantity":1},
            {"id":"1","title":"Mug","image_url":"u1","price":10,"quantity":3}
        ]"#;
        let store = CartStore::new(Arc::new(MemoryStorage::with_entry(KEY, text)), KEY);

        let outcome = store.hydrate().await.unwrap();

        assert_eq!(outcome, HydrateOutcome::Restored { items: 2 });
        assert_eq!(store.products(), serde_json::from_str::<Cart>(text).unwrap());
        let ids: Vec<String> = store
            .products()
            .iter()
            .map(|line| line.id.to_string())
            .collect();
        assert_eq!(ids, ["2", "1"]);
        assert_eq!(store.revision(), 1);
    }

    #[tokio::test]
    async fn test_hydrate_runs_once() {
        let store = CartStore::new(Arc::new(MemoryStorage::new()), KEY);
        store.hydrate().await.unwrap();
        assert!(matches!(
            store.hydrate().await,
            Err(CartError::AlreadyHydrated)
        ));
    }

    #[tokio::test]
    async fn test_hydrate_invalid_snapshot_leaves_cart_empty() {
        let storage = Arc::new(MemoryStorage::with_entry(KEY, "{not json"));
        let store = CartStore::new(storage, KEY);

        assert!(matches!(store.hydrate().await, Err(CartError::Snapshot(_))));
        assert!(store.products().is_empty());
        assert_eq!(store.revision(), 0);
    }

    #[tokio::test]
    async fn test_hydrate_read_failure() {
        let storage = Arc::new(MemoryStorage::with_entry(KEY, "[]"));
        storage.set_fail_reads(true);
        let store = CartStore::new(storage, KEY);

        assert!(matches!(store.hydrate().await, Err(CartError::Storage(_))));
        assert!(store.products().is_empty());
    }

    #[tokio::test]
    async fn test_weak_handle_dies_with_store() {
        let store = CartStore::new(Arc::new(MemoryStorage::new()), KEY);
        let weak = store.downgrade();
        assert!(weak.upgrade().is_some());

        drop(store);
        assert!(weak.upgrade().is_none());
    }

    #[tokio::test]
    async fn test_in_flight_write_does_not_keep_store_alive() {
        let storage = Arc::new(MemoryStorage::new());
        let store = CartStore::new(storage.clone(), KEY);
        let weak = store.downgrade();

        let pending = store.add_to_cart(product("a", 10));
        drop(store);
        assert!(weak.upgrade().is_none());

        pending.wait().await.unwrap();
        assert!(storage.peek(KEY).await.unwrap().contains(r#""id":"a""#));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = CartStore::new(Arc::new(MemoryStorage::new()), KEY);
        let other = store.clone();

        other.add_to_cart(product("a", 1)).wait().await.unwrap();
        assert_eq!(store.products().len(), 1);
    }
}
