//! An ambient request scope.
//!
//! A [`RequestScope`] is one unit of work. Threads take part in it by
//! entering it; while entered, [`CurrentRequest`] reports its store as the
//! ambient scope, so every [`LifetimeManager`] backed by a selector built with
//! [`CurrentRequest`] caches into the request rather than into the thread.
//! Ending the request sweeps its store exactly once.
//!
//! ```rust
//! # use std::sync::Arc;
//! # use reqscope::request::{CurrentRequest, RequestScope};
//! # use reqscope::scope::{LifetimeManager, ScopedValue};
//! # use reqscope::store::StoreSelector;
//! let manager = LifetimeManager::new(StoreSelector::with_ambient(CurrentRequest));
//! let request = RequestScope::begin();
//!
//! request.in_scope(|| manager.set(ScopedValue::new(Arc::new(42)))).unwrap();
//! assert!(manager.get().is_none());
//! assert_eq!(request.in_scope(|| manager.get_as::<i32>()).as_deref(), Some(&42));
//!
//! request.end().unwrap();
//! assert!(request.in_scope(|| manager.get()).is_none());
//! ```
//!
//! [`LifetimeManager`]: crate::scope::LifetimeManager

use std::cell::RefCell;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::scope::{ScopeError, ScopeSweeper};
use crate::store::{AmbientScopeProvider, BackingStore};

thread_local! {
    static ENTERED: RefCell<Vec<Arc<BackingStore>>> = const { RefCell::new(Vec::new()) };
}

/// A handle to one request. Clones refer to the same request.
#[derive(Clone)]
pub struct RequestScope {
    inner: Arc<RequestInner>,
}

struct RequestInner {
    id: u64,
    store: Arc<BackingStore>,
    ended: AtomicBool,
}

impl RequestScope {
    /// Starts a new request with an empty store.
    pub fn begin() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        let id = NEXT.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(request = id, "request scope began");

        Self {
            inner: Arc::new(RequestInner {
                id,
                store: Arc::new(BackingStore::new()),
                ended: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn store(&self) -> &Arc<BackingStore> {
        &self.inner.store
    }

    pub fn is_ended(&self) -> bool {
        self.inner.ended.load(Ordering::Acquire)
    }

    /// Makes this request the ambient scope of the calling thread until the
    /// returned guard is dropped. Entering nests: the innermost entered
    /// request wins.
    pub fn enter(&self) -> EnterGuard {
        if self.is_ended() {
            tracing::warn!(
                request = self.inner.id,
                "entered a request scope that has already ended"
            );
        }
        ENTERED.with(|entered| entered.borrow_mut().push(Arc::clone(&self.inner.store)));
        EnterGuard {
            store: Arc::clone(&self.inner.store),
            _not_send: PhantomData,
        }
    }

    /// Runs `f` with this request entered on the calling thread.
    pub fn in_scope<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = self.enter();
        f()
    }

    /// Ends the request, disposing every object cached in it, and returns how
    /// many objects were removed.
    ///
    /// If no clone of the handle calls this, the request is still swept once
    /// the last handle is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::Ended`] if the request has already ended, or the
    /// disposal failures reported by [`ScopeSweeper::sweep_store`].
    pub fn end(&self) -> Result<usize, ScopeError> {
        self.inner.finish().unwrap_or(Err(ScopeError::Ended {}))
    }
}

impl Debug for RequestScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("RequestScope")
            .field("id", &self.inner.id)
            .field("ended", &self.is_ended())
            .finish_non_exhaustive()
    }
}

impl RequestInner {
    fn finish(&self) -> Option<Result<usize, ScopeError>> {
        if self.ended.swap(true, Ordering::AcqRel) {
            return None;
        }
        tracing::debug!(request = self.id, "request scope ended");
        self.store.close();
        Some(ScopeSweeper::sweep_store(&self.store))
    }
}

impl Drop for RequestInner {
    fn drop(&mut self) {
        if !self.ended.load(Ordering::Acquire) {
            tracing::debug!(request = self.id, "request scope dropped before it ended");
        }
        if let Some(Err(err)) = self.finish() {
            tracing::error!(request = self.id, error = %err, "failed to clean up request scope");
        }
    }
}

/// Keeps a [`RequestScope`] entered on the current thread.
#[must_use = "the request is left as soon as the guard is dropped"]
pub struct EnterGuard {
    store: Arc<BackingStore>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for EnterGuard {
    fn drop(&mut self) {
        let _ = ENTERED.try_with(|entered| {
            let mut entered = entered.borrow_mut();
            if let Some(pos) = entered.iter().rposition(|s| Arc::ptr_eq(s, &self.store)) {
                entered.remove(pos);
            }
        });
    }
}

impl Debug for EnterGuard {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("EnterGuard").finish_non_exhaustive()
    }
}

/// The [`AmbientScopeProvider`] backed by entered [`RequestScope`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentRequest;

impl AmbientScopeProvider for CurrentRequest {
    fn current_store(&self) -> Option<Arc<BackingStore>> {
        ENTERED.with(|entered| entered.borrow().last().cloned())
    }

    fn is_active(&self) -> bool {
        ENTERED.with(|entered| !entered.borrow().is_empty())
    }
}
