use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use oneshot::{Receiver, Sender};
use parking_lot::{RwLock, RwLockWriteGuard};

use crate::container::injector::InjectorError;
use crate::key::ServiceKey;
use crate::scope::ScopedValue;

/// The objects a container shares for its whole lifetime.
///
/// Each object is constructed once. Threads asking for an object under
/// construction wait for the constructing thread and share its result.
pub struct SingletonCache {
    data: RwLock<SingletonData>,
}

struct SingletonData {
    objects: HashMap<ServiceKey, ScopedValue>,
    order: Vec<ServiceKey>,
    constructing: HashMap<ServiceKey, ConstructingObjectContext>,
}

impl SingletonCache {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(SingletonData {
                objects: HashMap::new(),
                order: Vec::new(),
                constructing: HashMap::new(),
            }),
        }
    }

    pub fn get(&self, key: &ServiceKey) -> Option<ScopedValue> {
        self.data.read().objects.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.data.read().objects.len()
    }

    /// Returns the object stored under `key`, constructing it with
    /// `construct` if nobody has done so yet.
    ///
    /// # Errors
    ///
    /// Returns the construction error, which every waiting thread receives
    /// as well, or [`InjectorError::CyclicDependency`] if the calling thread
    /// is already constructing the object.
    pub fn get_or_construct<F>(
        &self,
        key: &ServiceKey,
        construct: F,
    ) -> Result<ScopedValue, InjectorError>
    where
        F: FnOnce() -> Result<ScopedValue, InjectorError>,
    {
        if let Some(object) = self.get(key) {
            return Ok(object);
        }

        let mut data = self.data.write();
        if let Some(object) = data.objects.get(key) {
            return Ok(object.clone());
        }

        if let Some(context) = data.constructing.get_mut(key) {
            if context.is_constructed_by_current_thread() {
                Err(self.stop_construction_on_cyclic_dependency(data, key))
            } else {
                let (sender, receiver) = oneshot::channel();
                context.register_waiter(sender);
                drop(data);
                self.wait_for_constructed_object(key, receiver)
            }
        } else {
            let on_thread = thread::current().id();
            data.constructing
                .insert(key.clone(), ConstructingObjectContext::new(on_thread));
            drop(data);
            self.construct_object(key, construct)
        }
    }

    /// Empties the cache and returns the objects, most recently constructed
    /// first.
    pub fn drain(&self) -> Vec<ScopedValue> {
        let mut data = self.data.write();
        let mut objects = std::mem::take(&mut data.objects);
        let order = std::mem::take(&mut data.order);
        drop(data);

        order
            .iter()
            .rev()
            .filter_map(|key| objects.remove(key))
            .collect()
    }

    fn stop_construction_on_cyclic_dependency(
        &self,
        data: RwLockWriteGuard<SingletonData>,
        key: &ServiceKey,
    ) -> InjectorError {
        let err = InjectorError::CyclicDependency { key: key.clone() };
        self.notify_waiters(data, key, WaitResponse::Error(err.clone()));
        err
    }

    fn wait_for_constructed_object(
        &self,
        key: &ServiceKey,
        receiver: Receiver<WaitResponse>,
    ) -> Result<ScopedValue, InjectorError> {
        match receiver.recv() {
            Ok(WaitResponse::Constructed(object)) => Ok(object),
            Ok(WaitResponse::Error(err)) => Err(err),
            // The constructing thread unwound and withdrew the construction.
            Err(_) => Err(InjectorError::ObjectConstruction {
                key: key.clone(),
                source: Arc::from(Box::<dyn Error + Send + Sync>::from(
                    "the constructing thread panicked",
                )),
            }),
        }
    }

    fn construct_object<F>(
        &self,
        key: &ServiceKey,
        construct: F,
    ) -> Result<ScopedValue, InjectorError>
    where
        F: FnOnce() -> Result<ScopedValue, InjectorError>,
    {
        let _guard = ConstructionGuard { cache: self, key };
        match construct() {
            Ok(object) => {
                let mut data = self.data.write();
                data.objects.insert(key.clone(), object.clone());
                data.order.push(key.clone());
                tracing::trace!(key = %key, "constructed singleton");
                self.notify_waiters(data, key, WaitResponse::Constructed(object.clone()));
                Ok(object)
            }
            Err(err) => {
                let data = self.data.write();
                self.notify_waiters(data, key, WaitResponse::Error(err.clone()));
                Err(err)
            }
        }
    }

    fn notify_waiters(
        &self,
        mut data: RwLockWriteGuard<SingletonData>,
        key: &ServiceKey,
        response: WaitResponse,
    ) {
        if let Some(context) = data.constructing.remove(key) {
            drop(data);
            context.notify(response);
        }
    }
}

/// Withdraws the construction of `key` if the constructor panics, dropping
/// the senders of the threads waiting for it.
struct ConstructionGuard<'a> {
    cache: &'a SingletonCache,
    key: &'a ServiceKey,
}

impl Drop for ConstructionGuard<'_> {
    fn drop(&mut self) {
        if !thread::panicking() {
            return;
        }
        let withdrawn = self.cache.data.write().constructing.remove(self.key);
        if let Some(context) = withdrawn {
            tracing::error!(
                key = %self.key,
                waiters = context.waiters.len(),
                "singleton construction panicked"
            );
        }
    }
}

struct ConstructingObjectContext {
    on_thread: ThreadId,
    waiters: Vec<Sender<WaitResponse>>,
}

impl ConstructingObjectContext {
    fn new(on_thread: ThreadId) -> Self {
        Self {
            on_thread,
            waiters: Vec::new(),
        }
    }

    fn is_constructed_by_current_thread(&self) -> bool {
        thread::current().id() == self.on_thread
    }

    fn register_waiter(&mut self, sender: Sender<WaitResponse>) {
        self.waiters.push(sender);
    }

    fn notify(self, response: WaitResponse) {
        for sender in self.waiters {
            let _ = sender.send(response.clone());
        }
    }
}

#[derive(Clone)]
enum WaitResponse {
    Constructed(ScopedValue),
    Error(InjectorError),
}
