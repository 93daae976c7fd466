//! Backing storage for the active unit of work.
//!
//! A [`BackingStore`] is the raw, untyped item bag of one scope. Which store is
//! active is decided by a [`StoreSelector`]: if an [`AmbientScopeProvider`]
//! reports an active scope (for example an entered [`RequestScope`]), its
//! store is used; otherwise every thread falls back to a store of its own,
//! created lazily on first access.
//!
//! [`RequestScope`]: crate::request::RequestScope

mod thread;

use std::any::Any;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

/// A type-erased item kept in a [`BackingStore`].
pub type StoreItem = Arc<dyn Any + Send + Sync>;

/// A key into a [`BackingStore`].
///
/// Infrastructure may keep its own items next to the ones managed by this
/// crate through [`StoreKey::item`]. The key under which the scope registry
/// lives can't be constructed outside of this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreKey(KeyRepr);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum KeyRepr {
    Registry,
    Item(&'static str),
}

impl StoreKey {
    pub(crate) const REGISTRY: Self = Self(KeyRepr::Registry);

    /// Creates a key for an item owned by the caller.
    pub const fn item(name: &'static str) -> Self {
        Self(KeyRepr::Item(name))
    }
}

/// The untyped key/value map backing one scope.
///
/// A store can be closed once its scope has ended. Lifetime managers refuse
/// to cache new objects into a closed store, since nothing would sweep them.
#[derive(Default)]
pub struct BackingStore {
    items: RwLock<HashMap<StoreKey, StoreItem>>,
    closed: AtomicBool,
}

impl BackingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: StoreKey) -> Option<StoreItem> {
        self.items.read().get(&key).cloned()
    }

    pub fn contains(&self, key: StoreKey) -> bool {
        self.items.read().contains_key(&key)
    }

    pub fn insert(&self, key: StoreKey, item: StoreItem) -> Option<StoreItem> {
        self.items.write().insert(key, item)
    }

    pub fn remove(&self, key: StoreKey) -> Option<StoreItem> {
        self.items.write().remove(&key)
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Marks the store as closed. Returns false if it was closed already.
    pub fn close(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Returns the item stored under `key`, publishing the one built by `init`
    /// if the key is vacant. Concurrent callers racing on a vacant key all
    /// observe the same published item, and `init` runs at most once per key.
    ///
    /// Returns [`None`] if the item under `key` is not a `T`.
    pub fn get_or_insert_with<T, F>(&self, key: StoreKey, init: F) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        let item = match self.get(key) {
            Some(item) => item,
            None => {
                let mut items = self.items.write();
                let item = items
                    .entry(key)
                    .or_insert_with(|| -> StoreItem { Arc::new(init()) });
                Arc::clone(item)
            }
        };
        item.downcast::<T>().ok()
    }
}

impl Debug for BackingStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("BackingStore")
            .field("len", &self.len())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// A source of ambient scopes, typically supplied by request-handling
/// infrastructure.
#[cfg_attr(test, mockall::automock)]
pub trait AmbientScopeProvider: Send + Sync + 'static {
    /// Returns the store of the scope active on the calling thread, if any.
    fn current_store(&self) -> Option<Arc<BackingStore>>;

    /// Returns true if an ambient scope is active on the calling thread.
    fn is_active(&self) -> bool {
        self.current_store().is_some()
    }
}

/// The store resolved for the calling thread, tagged with where it came from.
#[derive(Debug, Clone)]
pub enum ActiveScope {
    Ambient(Arc<BackingStore>),
    Thread(Arc<BackingStore>),
}

impl ActiveScope {
    pub fn store(&self) -> &Arc<BackingStore> {
        match self {
            Self::Ambient(store) | Self::Thread(store) => store,
        }
    }

    pub fn into_store(self) -> Arc<BackingStore> {
        match self {
            Self::Ambient(store) | Self::Thread(store) => store,
        }
    }

    pub fn is_ambient(&self) -> bool {
        matches!(self, Self::Ambient(_))
    }
}

/// Chooses the [`BackingStore`] of the scope active on the calling thread.
#[derive(Clone, Default)]
pub struct StoreSelector {
    ambient: Option<Arc<dyn AmbientScopeProvider>>,
}

impl StoreSelector {
    /// Creates a selector that always uses the per-thread store.
    pub fn thread_local() -> Self {
        Self { ambient: None }
    }

    /// Creates a selector that prefers the scope reported by `provider` and
    /// falls back to the per-thread store when none is active.
    pub fn with_ambient<P>(provider: P) -> Self
    where
        P: AmbientScopeProvider,
    {
        Self::with_shared_ambient(Arc::new(provider))
    }

    pub fn with_shared_ambient(provider: Arc<dyn AmbientScopeProvider>) -> Self {
        Self {
            ambient: Some(provider),
        }
    }

    pub fn has_ambient(&self) -> bool {
        self.ambient.is_some()
    }

    /// Resolves the scope active on the calling thread.
    pub fn resolve(&self) -> ActiveScope {
        if let Some(provider) = self.ambient.as_ref().filter(|p| p.is_active()) {
            if let Some(store) = provider.current_store() {
                return ActiveScope::Ambient(store);
            }
        }
        ActiveScope::Thread(thread::current())
    }

    /// Returns the store of the scope active on the calling thread.
    pub fn acquire(&self) -> Arc<BackingStore> {
        self.resolve().into_store()
    }
}

impl Debug for StoreSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("StoreSelector")
            .field("ambient", &self.has_ambient())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::thread as std_thread;

    use super::*;

    const ITEM: StoreKey = StoreKey::item("test-item");

    #[test]
    fn backing_store_get_or_insert_with_publishes_once() {
        let store = BackingStore::new();
        let first = store.get_or_insert_with(ITEM, || 1i32).unwrap();
        let second = store.get_or_insert_with(ITEM, || 2i32).unwrap();

        assert_eq!(*first, 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn backing_store_get_or_insert_with_fails_when_item_type_differs() {
        let store = BackingStore::new();
        store.insert(ITEM, Arc::new("str"));

        assert!(store.get_or_insert_with(ITEM, || 1i32).is_none());
    }

    #[test]
    fn backing_store_get_or_insert_with_is_race_free() {
        let store = Arc::new(BackingStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std_thread::spawn(move || store.get_or_insert_with(ITEM, move || i).unwrap())
            })
            .collect();
        let items: Vec<Arc<i32>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(items.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn backing_store_close_succeeds_once() {
        let store = BackingStore::new();
        assert!(!store.is_closed());

        assert!(store.close());
        assert!(!store.close());
        assert!(store.is_closed());
    }

    #[test]
    fn store_key_registry_differs_from_items() {
        assert_ne!(StoreKey::REGISTRY, StoreKey::item("registry"));
        assert_eq!(StoreKey::item("a"), StoreKey::item("a"));
    }

    #[test]
    fn store_selector_resolve_succeeds_when_ambient_scope_is_active() {
        let store = Arc::new(BackingStore::new());
        let mut provider = MockAmbientScopeProvider::new();
        provider.expect_is_active().return_const(true);
        provider.expect_current_store().returning({
            let store = Arc::clone(&store);
            move || Some(Arc::clone(&store))
        });

        let selector = StoreSelector::with_ambient(provider);
        let scope = selector.resolve();

        assert!(scope.is_ambient());
        assert!(Arc::ptr_eq(scope.store(), &store));
    }

    #[test]
    fn store_selector_resolve_falls_back_to_thread_when_ambient_scope_is_inactive() {
        let mut provider = MockAmbientScopeProvider::new();
        provider.expect_is_active().return_const(false);
        provider.expect_current_store().never();

        let selector = StoreSelector::with_ambient(provider);
        let scope = selector.resolve();

        assert!(!scope.is_ambient());
        assert!(Arc::ptr_eq(scope.store(), &StoreSelector::thread_local().acquire()));
    }

    #[test]
    fn store_selector_acquire_differs_across_threads() {
        let selector = StoreSelector::thread_local();
        let here = selector.acquire();
        assert!(Arc::ptr_eq(&here, &selector.acquire()));

        let there = std_thread::spawn(move || selector.acquire()).join().unwrap();
        assert!(!Arc::ptr_eq(&here, &there));
    }
}
