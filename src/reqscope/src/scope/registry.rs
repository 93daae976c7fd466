use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::scope::{ManagerId, ScopeError, ScopedValue};
use crate::store::{BackingStore, StoreKey};

const MISPLACED: &str = "only a `ScopeRegistry` can live under `StoreKey::REGISTRY`";

/// The values cached by all [`LifetimeManager`]s for one scope.
///
/// [`LifetimeManager`]: crate::scope::LifetimeManager
#[derive(Default)]
pub struct ScopeRegistry {
    entries: Mutex<HashMap<ManagerId, ScopedValue>>,
}

impl ScopeRegistry {
    /// Returns the registry of `store`, creating it the first time the store
    /// is asked for one.
    pub fn of(store: &BackingStore) -> Arc<Self> {
        store
            .get_or_insert_with(StoreKey::REGISTRY, Self::default)
            .unwrap_or_else(|| unreachable!("{MISPLACED}"))
    }

    /// Returns the registry of `store` if one was created already.
    pub fn peek(store: &BackingStore) -> Option<Arc<Self>> {
        store.get(StoreKey::REGISTRY).map(|item| {
            item.downcast::<Self>()
                .unwrap_or_else(|_| unreachable!("{MISPLACED}"))
        })
    }

    pub fn get(&self, id: ManagerId) -> Option<ScopedValue> {
        self.entries.lock().get(&id).cloned()
    }

    pub fn contains(&self, id: ManagerId) -> bool {
        self.entries.lock().contains_key(&id)
    }

    /// Returns a snapshot of the identities holding a value.
    pub fn ids(&self) -> Vec<ManagerId> {
        self.entries.lock().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Stores `value` for `id`. A different value stored before is taken out
    /// and disposed first; storing the same object again does nothing.
    ///
    /// If disposing the previous value fails, it is put back and `value` is
    /// not stored.
    pub(crate) fn store(&self, id: ManagerId, value: ScopedValue) -> Result<(), ScopeError> {
        let previous = {
            let mut entries = self.entries.lock();
            if entries.get(&id).is_some_and(|existing| existing.is_same(&value)) {
                return Ok(());
            }
            entries.remove(&id)
        };

        if let Some(previous) = previous {
            if let Err(err) = dispose(id, &previous) {
                self.restore(id, previous);
                return Err(err);
            }
        }

        // Another continuation of the same scope may have stored a value for
        // `id` while the lock was released.
        let displaced = self.entries.lock().insert(id, value.clone());
        tracing::trace!(manager = %id, object = value.object_name(), "stored scoped object");

        match displaced {
            Some(displaced) if !displaced.is_same(&value) => dispose(id, &displaced),
            _ => Ok(()),
        }
    }

    /// Stores `value` for `id` unless a value is present already, in which case
    /// that value is returned and `value` is left untouched.
    pub(crate) fn insert_if_absent(
        &self,
        id: ManagerId,
        value: &ScopedValue,
    ) -> Option<ScopedValue> {
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(&id) {
            Some(existing.clone())
        } else {
            entries.insert(id, value.clone());
            None
        }
    }

    /// Takes the value of `id` out of the registry and disposes it. Returns
    /// whether there was a value.
    ///
    /// A value whose disposal fails is put back unless another one was stored
    /// for `id` in the meantime.
    pub(crate) fn evict(&self, id: ManagerId) -> Result<bool, ScopeError> {
        let Some(value) = self.take(id) else {
            return Ok(false);
        };
        match dispose(id, &value) {
            Ok(()) => Ok(true),
            Err(err) => {
                self.restore(id, value);
                Err(err)
            }
        }
    }

    /// Takes the value of `id` out of the registry without disposing it.
    pub(crate) fn take(&self, id: ManagerId) -> Option<ScopedValue> {
        self.entries.lock().remove(&id)
    }

    fn restore(&self, id: ManagerId, value: ScopedValue) {
        self.entries.lock().entry(id).or_insert(value);
    }

    /// Drops every remaining entry without disposing it and returns how many
    /// there were.
    pub(crate) fn clear(&self) -> usize {
        let mut entries = self.entries.lock();
        let len = entries.len();
        entries.clear();
        len
    }
}

impl Debug for ScopeRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ScopeRegistry")
            .field("len", &self.len())
            .finish()
    }
}

pub(crate) fn dispose(id: ManagerId, value: &ScopedValue) -> Result<(), ScopeError> {
    if !value.has_disposer() {
        return Ok(());
    }
    tracing::debug!(manager = %id, object = value.object_name(), "disposing scoped object");
    value.release().map_err(|source| ScopeError::Dispose {
        holder: format!("lifetime manager {id}"),
        object: value.object_name(),
        source,
    })
}
