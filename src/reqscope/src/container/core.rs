use std::any::TypeId;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::container::injector::{CallContext, Injector, InjectorError};
use crate::container::registry::{Activation, Registration, RegistrationMap};
use crate::container::singleton::SingletonCache;
use crate::key::ServiceKey;
use crate::scope::{ScopeError, ScopedValue};
use crate::store::StoreSelector;

pub struct ContainerCore {
    registrations: RegistrationMap,
    singletons: SingletonCache,
    selector: StoreSelector,
    disposed: AtomicBool,
}

impl ContainerCore {
    pub fn new(registrations: RegistrationMap, selector: StoreSelector) -> Self {
        tracing::debug!(registrations = registrations.len(), "container initialized");
        Self {
            registrations,
            singletons: SingletonCache::new(),
            selector,
            disposed: AtomicBool::new(false),
        }
    }

    pub fn selector(&self) -> &StoreSelector {
        &self.selector
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Releases every singleton constructed so far and every registered
    /// instance, exactly once.
    pub fn dispose(&self) -> Result<usize, ScopeError> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return Err(ScopeError::Ended {});
        }

        let instances = self.registrations.instances().cloned();

        let mut released = 0;
        let mut errors = Vec::new();
        for object in self.singletons.drain().into_iter().chain(instances) {
            released += 1;
            if let Err(source) = object.release() {
                errors.push(ScopeError::Dispose {
                    holder: String::from("container"),
                    object: object.object_name(),
                    source,
                });
            }
        }
        tracing::debug!(released, failed = errors.len(), "container disposed");

        match ScopeError::from_failures(errors) {
            Some(err) => Err(err),
            None => Ok(released),
        }
    }

    fn get_object(
        &self,
        key: &ServiceKey,
        dependent: Option<&CallContext<'_>>,
    ) -> Result<ScopedValue, InjectorError> {
        if self.is_disposed() {
            return Err(ScopeError::Ended {}.into());
        }

        let registration = self.try_get_registration_by_key(key)?;
        let lifetime = registration.lifetime();
        let context = match dependent {
            Some(dependent) => dependent.append(key, lifetime),
            None => CallContext::new(key, lifetime),
        };
        self.check_dependency(&context)?;
        tracing::trace!(key = %key, lifetime = %lifetime, "resolving service");

        match registration.activation() {
            Activation::Transient(provider) => provider.dyn_provide(self, &context),
            Activation::PerRequest { provider, manager } => {
                manager.get_or_insert_with(|| provider.dyn_provide(self, &context))
            }
            Activation::Singleton(provider) => self
                .singletons
                .get_or_construct(key, || provider.dyn_provide(self, &context)),
            Activation::Instance(instance) => Ok(instance.clone()),
        }
    }

    fn try_get_registration_by_key(
        &self,
        key: &ServiceKey,
    ) -> Result<&Registration, InjectorError> {
        if let Some(registration) = self.registrations.get(key) {
            Ok(registration)
        } else {
            Err(InjectorError::NotFound { key: key.clone() })
        }
    }

    fn check_dependency(&self, context: &CallContext<'_>) -> Result<(), InjectorError> {
        let key = context.key();
        if context.trace().previous_exist_key(key) {
            return Err(InjectorError::CyclicDependency { key: key.clone() });
        }

        let lifetime = context.lifetime();
        match context.trace().owner_lifetime() {
            // A shared object must not be captured by an object outliving it.
            Some(owner) if lifetime.is_shared() && !lifetime.outlive(owner) => {
                Err(InjectorError::ShortLifetime {
                    key: key.clone(),
                    lifetime,
                    owner,
                })
            }
            _ => Ok(()),
        }
    }
}

impl Injector for ContainerCore {
    fn dyn_get(&self, key: &ServiceKey) -> Result<ScopedValue, InjectorError> {
        self.get_object(key, None)
    }

    fn dyn_get_dependency<'a>(
        &self,
        key: &ServiceKey,
        context: &'a CallContext<'a>,
    ) -> Result<ScopedValue, InjectorError> {
        self.get_object(key, Some(context))
    }

    fn keys(&self, service: TypeId) -> Vec<ServiceKey> {
        self.registrations.keys(service)
    }
}

impl Drop for ContainerCore {
    fn drop(&mut self) {
        if self.is_disposed() {
            return;
        }
        if let Err(err) = self.dispose() {
            tracing::error!(error = %err, "failed to dispose container");
        }
    }
}
