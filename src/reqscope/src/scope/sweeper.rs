use crate::scope::registry::{dispose, ScopeRegistry};
use crate::scope::ScopeError;
use crate::store::{BackingStore, StoreSelector};

/// Ends a scope by disposing every object cached in it.
#[derive(Debug, Clone, Default)]
pub struct ScopeSweeper {
    selector: StoreSelector,
}

impl ScopeSweeper {
    pub fn new(selector: StoreSelector) -> Self {
        Self { selector }
    }

    /// Sweeps the scope active on the calling thread.
    ///
    /// # Errors
    ///
    /// See [`ScopeSweeper::sweep_store`].
    pub fn sweep_all(&self) -> Result<usize, ScopeError> {
        Self::sweep_store(&self.selector.acquire())
    }

    /// Disposes and forgets every object cached in `store` and returns how
    /// many entries were removed.
    ///
    /// Every entry is attempted even if disposing an earlier one fails, and
    /// every entry is forgotten whether its disposal succeeds or not. Objects
    /// stored concurrently while the sweep runs may be dropped without being
    /// disposed.
    ///
    /// # Errors
    ///
    /// Returns the disposal failures, aggregated if there are more than one.
    pub fn sweep_store(store: &BackingStore) -> Result<usize, ScopeError> {
        let Some(registry) = ScopeRegistry::peek(store) else {
            return Ok(0);
        };

        let mut removed = 0;
        let mut errors = Vec::new();
        for id in registry.ids() {
            let Some(value) = registry.take(id) else {
                continue;
            };
            removed += 1;
            if let Err(err) = dispose(id, &value) {
                errors.push(err);
            }
        }

        let late = registry.clear();
        if late > 0 {
            tracing::warn!(late, "dropped objects stored during the sweep without disposing them");
        }
        tracing::debug!(removed, failed = errors.len(), "swept scope");

        match ScopeError::from_failures(errors) {
            Some(err) => Err(err),
            None => Ok(removed),
        }
    }
}
