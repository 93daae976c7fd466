use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use crate::scope::registry::{self, ScopeRegistry};
use crate::scope::{ManagerId, ScopeError, ScopedValue};
use crate::store::StoreSelector;

/// A cache cell holding one object per scope.
///
/// A [`LifetimeManager`] carries nothing but its identity and the strategy
/// used to find the active scope. The cached objects live in the
/// [`ScopeRegistry`] of whichever scope is active when an operation runs, so
/// the same manager observes different values in different requests or
/// threads, and nothing after the scope has been swept.
pub struct LifetimeManager {
    id: ManagerId,
    selector: StoreSelector,
}

impl LifetimeManager {
    pub fn new(selector: StoreSelector) -> Self {
        let id = ManagerId::next();
        tracing::trace!(manager = %id, "created lifetime manager");
        Self { id, selector }
    }

    pub fn id(&self) -> ManagerId {
        self.id
    }

    pub fn selector(&self) -> &StoreSelector {
        &self.selector
    }

    /// Returns the value cached for the active scope, if any.
    pub fn get(&self) -> Option<ScopedValue> {
        self.registry().ok()?.get(self.id)
    }

    /// Returns the value cached for the active scope if it is a `T`.
    pub fn get_as<T>(&self) -> Option<Arc<T>>
    where
        T: Send + Sync + ?Sized + 'static,
    {
        self.get().and_then(|value| value.downcast::<T>())
    }

    /// Caches `value` for the active scope. Passing [`None`] is the same as
    /// calling [`LifetimeManager::remove`].
    ///
    /// Setting the object that is already cached does nothing. Otherwise the
    /// previously cached object is disposed before `value` is stored.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::Ended`] if the active scope has already ended.
    /// Returns an error if disposing the previous object fails. The previous
    /// object stays cached and `value` is not stored in that case.
    pub fn set<V>(&self, value: V) -> Result<(), ScopeError>
    where
        V: Into<Option<ScopedValue>>,
    {
        match value.into() {
            Some(value) => self.registry()?.store(self.id, value),
            None => self.remove(),
        }
    }

    /// Disposes and forgets the value cached for the active scope. Does
    /// nothing if there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if disposing the object fails. The object stays cached
    /// in that case.
    pub fn remove(&self) -> Result<(), ScopeError> {
        match self.registry() {
            Ok(registry) => registry.evict(self.id).map(|_| ()),
            // Nothing outlives the sweep of an ended scope.
            Err(_) => Ok(()),
        }
    }

    /// Returns the value cached for the active scope, or caches the one built
    /// by `init`.
    ///
    /// `init` runs without holding any lock, so two continuations of the same
    /// scope may both build a value. Only the first one published is kept; the
    /// other is disposed and the published one returned.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::Ended`] without running `init` if the active
    /// scope has already ended. Otherwise returns the error of `init`, or the
    /// failure to dispose a losing value.
    pub fn get_or_insert_with<F, E>(&self, init: F) -> Result<ScopedValue, E>
    where
        F: FnOnce() -> Result<ScopedValue, E>,
        E: From<ScopeError>,
    {
        let registry = self.registry()?;
        if let Some(value) = registry.get(self.id) {
            tracing::trace!(manager = %self.id, "scoped object cache hit");
            return Ok(value);
        }

        let value = init()?;
        match registry.insert_if_absent(self.id, &value) {
            None => {
                tracing::trace!(
                    manager = %self.id,
                    object = value.object_name(),
                    "stored scoped object"
                );
                Ok(value)
            }
            Some(winner) => {
                registry::dispose(self.id, &value)?;
                Ok(winner)
            }
        }
    }

    fn registry(&self) -> Result<Arc<ScopeRegistry>, ScopeError> {
        let store = self.selector.acquire();
        if store.is_closed() {
            return Err(ScopeError::Ended {});
        }
        Ok(ScopeRegistry::of(&store))
    }
}

impl Debug for LifetimeManager {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("LifetimeManager")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
