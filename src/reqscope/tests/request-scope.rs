mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use reqscope::request::{CurrentRequest, RequestScope};
use reqscope::scope::{LifetimeManager, ScopeSweeper, ScopedValue};
use reqscope::store::StoreSelector;

use common::{init_tracing, Connection};

fn manager() -> LifetimeManager {
    LifetimeManager::new(StoreSelector::with_ambient(CurrentRequest))
}

#[test]
fn request_end_disposes_every_manager_once() {
    init_tracing();
    let a = manager();
    let b = manager();
    let ca = Arc::new(Connection::default());
    let cb = Arc::new(Connection::default());

    let request = RequestScope::begin();
    request.in_scope(|| {
        a.set(ScopedValue::disposable(Arc::clone(&ca))).unwrap();
        b.set(ScopedValue::disposable(Arc::clone(&cb))).unwrap();
        assert!(a.get_as::<Connection>().is_some_and(|c| Arc::ptr_eq(&c, &ca)));
    });

    assert_eq!(request.end().unwrap(), 2);
    assert_eq!(ca.closed(), 1);
    assert_eq!(cb.closed(), 1);
    request.in_scope(|| {
        assert!(a.get().is_none());
        assert!(b.get().is_none());
    });
}

#[test]
fn set_replaces_and_disposes_previous_value() {
    init_tracing();
    let manager = manager();
    let first = Arc::new(Connection::default());
    let second = Arc::new(Connection::default());

    let request = RequestScope::begin();
    let _guard = request.enter();

    let value = ScopedValue::disposable(Arc::clone(&first));
    manager.set(value.clone()).unwrap();
    manager.set(value).unwrap();
    assert_eq!(first.closed(), 0);

    manager.set(ScopedValue::disposable(Arc::clone(&second))).unwrap();
    assert_eq!(first.closed(), 1);
    assert!(manager.get_as::<Connection>().is_some_and(|c| Arc::ptr_eq(&c, &second)));

    manager.set(None::<ScopedValue>).unwrap();
    assert_eq!(second.closed(), 1);
    assert!(manager.get().is_none());

    manager.remove().unwrap();
    assert_eq!(second.closed(), 1);
}

#[test]
fn concurrent_continuations_share_one_request() {
    const THREADS: usize = 8;
    const ROUNDS: usize = 1000;

    init_tracing();
    let request = RequestScope::begin();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|n| {
            let request = request.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let manager = manager();
                let connection = Arc::new(Connection::default());
                request.in_scope(|| {
                    barrier.wait();
                    for round in 0..ROUNDS {
                        let payload = Arc::new((n, round));
                        manager.set(ScopedValue::new(Arc::clone(&payload))).unwrap();
                        let seen = manager.get_as::<(usize, usize)>().unwrap();
                        assert!(Arc::ptr_eq(&seen, &payload));
                        manager.remove().unwrap();
                        assert!(manager.get().is_none());
                    }
                    manager
                        .set(ScopedValue::disposable(Arc::clone(&connection)))
                        .unwrap();
                });
                connection
            })
        })
        .collect();

    let connections: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("Each thread should not `panic!()`"))
        .collect();

    assert_eq!(request.end().unwrap(), THREADS);
    assert!(connections.iter().all(|c| c.closed() == 1));
}

#[test]
fn thread_scope_is_used_outside_of_requests() {
    init_tracing();
    let manager = manager();
    let connection = Arc::new(Connection::default());
    manager
        .set(ScopedValue::disposable(Arc::clone(&connection)))
        .unwrap();

    let request = RequestScope::begin();
    assert!(request.in_scope(|| manager.get()).is_none());
    assert!(manager.get().is_some());

    let seen_elsewhere = thread::spawn({
        let selector = manager.selector().clone();
        move || ScopeSweeper::new(selector).sweep_all().unwrap()
    })
    .join()
    .unwrap();
    assert_eq!(seen_elsewhere, 0);
    assert_eq!(connection.closed(), 0);

    assert_eq!(ScopeSweeper::new(manager.selector().clone()).sweep_all().unwrap(), 1);
    assert_eq!(connection.closed(), 1);
    assert!(manager.get().is_none());
}
