use std::error::Error;

use crate::container::registry::{
    Activation, AdapterRegistrationPolicy, Configurer, ConfigurerPrivate, Registration,
    RegistrationMap, RegistryError,
};
use crate::key::ServiceKey;
use crate::lifetime::Lifetime;
use crate::provider::Provider;
use crate::scope::{LifetimeManager, ScopedValue};
use crate::store::StoreSelector;

pub struct ConfigurerImpl {
    registrations: RegistrationMap,
    policy: AdapterRegistrationPolicy,
    selector: StoreSelector,
    errors: Vec<RegistryError>,
}

impl ConfigurerImpl {
    pub fn new(selector: StoreSelector) -> Self {
        Self {
            registrations: RegistrationMap::new(),
            policy: AdapterRegistrationPolicy::new(),
            selector,
            errors: Vec::new(),
        }
    }

    pub fn finish(self) -> Result<RegistrationMap, Vec<RegistryError>> {
        if self.errors.is_empty() {
            Ok(self.registrations)
        } else {
            Err(self.errors)
        }
    }

    fn effective_key(&self, key: ServiceKey, implementation: &'static str) -> ServiceKey {
        let effective = self.policy.resolve_registration_key(
            key.key().clone(),
            key.service(),
            implementation,
            &self.registrations,
        );
        if effective != *key.key() {
            tracing::debug!(
                service = key.service_name(),
                key = %effective,
                "anonymous slot is taken, registration re-keyed"
            );
        }
        key.with_key(effective)
    }

    fn insert(&mut self, registration: Registration) {
        tracing::trace!(
            key = %registration.key(),
            implementation = registration.implementation(),
            lifetime = %registration.lifetime(),
            "registered service"
        );
        let Some(replaced) = self.registrations.insert(registration) else {
            return;
        };
        tracing::warn!(
            key = %replaced.key(),
            implementation = replaced.implementation(),
            "registration replaced by a later one with the same key"
        );
        if let Activation::Instance(instance) = replaced.into_activation() {
            self.registrations.retire(instance);
        }
    }
}

impl Configurer for ConfigurerImpl {
    #[allow(private_interfaces)]
    fn as_private(&mut self) -> &mut dyn ConfigurerPrivate {
        self
    }

    fn report_module_error(&mut self, module: &'static str, err: Box<dyn Error + Send + Sync>) {
        self.errors.push(RegistryError::ModuleInner {
            module,
            source: err,
        });
    }
}

impl ConfigurerPrivate for ConfigurerImpl {
    fn dyn_register_type(
        &mut self,
        key: ServiceKey,
        implementation: &'static str,
        provider: Box<dyn Provider>,
        lifetime: Lifetime,
    ) {
        let key = self.effective_key(key, implementation);
        let activation = match lifetime {
            Lifetime::Transient => Activation::Transient(provider),
            Lifetime::PerRequest => Activation::PerRequest {
                provider,
                manager: LifetimeManager::new(self.selector.clone()),
            },
            Lifetime::Singleton => Activation::Singleton(provider),
        };
        self.insert(Registration::new(key, implementation, activation));
    }

    fn dyn_register_instance(
        &mut self,
        key: ServiceKey,
        implementation: &'static str,
        instance: ScopedValue,
    ) {
        let key = self.effective_key(key, implementation);
        self.insert(Registration::new(key, implementation, Activation::Instance(instance)));
    }
}
