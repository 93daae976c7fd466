use std::cell::OnceCell;
use std::sync::Arc;

use crate::store::BackingStore;

thread_local! {
    static THREAD_STORE: OnceCell<Arc<BackingStore>> = const { OnceCell::new() };
}

/// Returns the store owned by the calling thread, creating it on first access.
/// The store is reclaimed together with the thread.
pub(super) fn current() -> Arc<BackingStore> {
    THREAD_STORE.with(|cell| {
        let store = cell.get_or_init(|| {
            tracing::trace!(
                thread = ?std::thread::current().id(),
                "created thread-local scope store"
            );
            Arc::new(BackingStore::new())
        });
        Arc::clone(store)
    })
}
