mod configurer;
mod policy;
mod registration_map;

use std::any;
use std::error::Error;
use std::sync::Arc;

use snafu::prelude::*;

use crate::key::{RegistrationKey, ServiceKey};
use crate::lifetime::Lifetime;
use crate::module::Module;
use crate::provider::component::{Component, ComponentProvider};
use crate::provider::{Provider, TypedProvider};
use crate::scope::{Dispose, ScopedValue};
use crate::util::fmt::Aggregated;

pub(crate) use configurer::ConfigurerImpl;
pub use policy::{AdapterRegistrationPolicy, ExistingRegistrations};
pub(crate) use registration_map::{Activation, Registration, RegistrationMap};

pub trait Registry: Sized + Send + Sync + 'static {
    fn init<M>(module: M) -> Result<Self, RegistryError>
    where
        M: Module;
}

pub trait Configurer: Send + Sync + 'static {
    #[doc(hidden)]
    #[allow(private_interfaces)]
    fn as_private(&mut self) -> &mut dyn ConfigurerPrivate;

    fn report_module_error(&mut self, module: &'static str, err: Box<dyn Error + Send + Sync>);
}

trait ConfigurerPrivate: Configurer {
    fn dyn_register_type(
        &mut self,
        key: ServiceKey,
        implementation: &'static str,
        provider: Box<dyn Provider>,
        lifetime: Lifetime,
    );

    fn dyn_register_instance(
        &mut self,
        key: ServiceKey,
        implementation: &'static str,
        instance: ScopedValue,
    );
}

pub trait TypedConfigurer: Configurer {
    /// Registers the component `C` as its service type. An empty `key`
    /// registers into the anonymous slot, or under the name of `C` if the
    /// slot is already taken.
    fn register_type<C>(&mut self, key: impl Into<RegistrationKey>, lifetime: Lifetime)
    where
        C: Component,
    {
        self.as_private().dyn_register_type(
            ServiceKey::named::<C::Service>(key),
            any::type_name::<C>(),
            Box::new(ComponentProvider::<C>::new()),
            lifetime,
        );
    }

    /// Registers a custom provider of `P::Service`.
    fn register_provider<P>(
        &mut self,
        key: impl Into<RegistrationKey>,
        provider: P,
        lifetime: Lifetime,
    ) where
        P: TypedProvider,
    {
        self.as_private().dyn_register_type(
            ServiceKey::named::<P::Service>(key),
            any::type_name::<P>(),
            Box::new(provider),
            lifetime,
        );
    }

    /// Registers a ready-made object. The container shares it with every
    /// resolution.
    fn register_instance<S>(&mut self, key: impl Into<RegistrationKey>, instance: Arc<S>)
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.as_private().dyn_register_instance(
            ServiceKey::named::<S>(key),
            any::type_name::<S>(),
            ScopedValue::new(instance),
        );
    }

    /// Registers a ready-made object that `disposer` releases when the
    /// container is disposed.
    fn register_instance_with<S>(
        &mut self,
        key: impl Into<RegistrationKey>,
        instance: Arc<S>,
        disposer: Arc<dyn Dispose>,
    ) where
        S: ?Sized + Send + Sync + 'static,
    {
        self.as_private().dyn_register_instance(
            ServiceKey::named::<S>(key),
            any::type_name::<S>(),
            ScopedValue::with_disposer(instance, disposer),
        );
    }
}

impl<T: Configurer + ?Sized> TypedConfigurer for T {}

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum RegistryError {
    #[snafu(display("module {module} fails to setup the configuration"))]
    #[non_exhaustive]
    ModuleInner {
        module: &'static str,
        source: Box<dyn Error + Send + Sync>,
    },
    #[snafu(display("aggregated registry errors:\n{}", Aggregated::new(errors)))]
    #[non_exhaustive]
    Aggregated { errors: Vec<RegistryError> },
}

impl RegistryError {
    pub(crate) fn from_errors(mut errors: Vec<RegistryError>) -> Self {
        if errors.len() == 1 {
            if let Some(err) = errors.pop() {
                return err;
            }
        }
        Self::Aggregated { errors }
    }
}
