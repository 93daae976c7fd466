use std::any::TypeId;
use std::collections::HashMap;
use std::mem;

use crate::container::registry::ExistingRegistrations;
use crate::key::{RegistrationKey, ServiceKey};
use crate::lifetime::Lifetime;
use crate::provider::Provider;
use crate::scope::{LifetimeManager, ScopedValue};

/// Every registration of a container, grouped by service type in
/// registration order.
#[derive(Debug, Default)]
pub struct RegistrationMap {
    services: HashMap<TypeId, Vec<Registration>>,
    retired: Vec<ScopedValue>,
}

impl RegistrationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a registration. One already holding the same key is replaced in
    /// place, keeping its position, and handed back.
    pub fn insert(&mut self, registration: Registration) -> Option<Registration> {
        let entries = self
            .services
            .entry(registration.key.service())
            .or_default();
        match entries.iter_mut().find(|entry| entry.key == registration.key) {
            Some(entry) => Some(mem::replace(entry, registration)),
            None => {
                entries.push(registration);
                None
            }
        }
    }

    /// Keeps an instance whose registration was replaced, so it is still
    /// released with the container.
    pub fn retire(&mut self, instance: ScopedValue) {
        self.retired.push(instance);
    }

    /// Lists the registered instances, replaced ones included.
    pub fn instances(&self) -> impl Iterator<Item = &ScopedValue> {
        let current = self.iter().filter_map(|registration| match &registration.activation {
            Activation::Instance(instance) => Some(instance),
            _ => None,
        });
        current.chain(self.retired.iter())
    }

    pub fn get(&self, key: &ServiceKey) -> Option<&Registration> {
        self.services
            .get(&key.service())
            .and_then(|entries| entries.iter().find(|entry| entry.key == *key))
    }

    /// Lists the keys of `service`: the anonymous registration first, then
    /// the others in registration order.
    pub fn keys(&self, service: TypeId) -> Vec<ServiceKey> {
        let Some(entries) = self.services.get(&service) else {
            return Vec::new();
        };
        let anonymous = entries.iter().filter(|entry| entry.key.key().is_anonymous());
        let others = entries.iter().filter(|entry| !entry.key.key().is_anonymous());
        anonymous.chain(others).map(|entry| entry.key.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Registration> {
        self.services.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.services.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ExistingRegistrations for RegistrationMap {
    fn contains(&self, service: TypeId, key: &RegistrationKey) -> bool {
        self.services
            .get(&service)
            .is_some_and(|entries| entries.iter().any(|entry| entry.key.key() == key))
    }
}

#[derive(Debug)]
pub struct Registration {
    key: ServiceKey,
    implementation: &'static str,
    activation: Activation,
}

impl Registration {
    pub fn new(key: ServiceKey, implementation: &'static str, activation: Activation) -> Self {
        Self {
            key,
            implementation,
            activation,
        }
    }

    pub fn key(&self) -> &ServiceKey {
        &self.key
    }

    pub fn implementation(&self) -> &'static str {
        self.implementation
    }

    pub fn activation(&self) -> &Activation {
        &self.activation
    }

    pub fn lifetime(&self) -> Lifetime {
        self.activation.lifetime()
    }

    pub fn into_activation(self) -> Activation {
        self.activation
    }
}

/// How the object of a registration is obtained.
#[derive(Debug)]
pub enum Activation {
    /// Built on every resolution.
    Transient(Box<dyn Provider>),
    /// Built once per scope and cached through the manager.
    PerRequest {
        provider: Box<dyn Provider>,
        manager: LifetimeManager,
    },
    /// Built once per container.
    Singleton(Box<dyn Provider>),
    /// A ready-made object owned by the container.
    Instance(ScopedValue),
}

impl Activation {
    pub fn lifetime(&self) -> Lifetime {
        match self {
            Self::Transient(_) => Lifetime::Transient,
            Self::PerRequest { .. } => Lifetime::PerRequest,
            Self::Singleton(_) | Self::Instance(_) => Lifetime::Singleton,
        }
    }
}
