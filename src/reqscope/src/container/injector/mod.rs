mod context;
mod proxy;

use std::any::TypeId;
use std::error::Error;
use std::sync::Arc;

use snafu::prelude::*;

use crate::key::{RegistrationKey, ServiceKey};
use crate::lifetime::Lifetime;
use crate::scope::{ScopeError, ScopedValue};

pub use context::{CallContext, InjectionTrace};
pub(crate) use proxy::ContextForwardingInjectorProxy;

#[cfg_attr(test, mockall::automock)]
pub trait Injector: Send + Sync {
    fn dyn_get(&self, key: &ServiceKey) -> Result<ScopedValue, InjectorError>;

    fn dyn_get_dependency<'a>(
        &self,
        key: &ServiceKey,
        context: &'a CallContext<'a>,
    ) -> Result<ScopedValue, InjectorError>;

    /// Lists the registrations of `service`: the anonymous one first, then the
    /// others in registration order.
    fn keys(&self, service: TypeId) -> Vec<ServiceKey>;
}

pub trait TypedInjector: Injector {
    /// Resolves the anonymous registration of `S`.
    fn resolve<S>(&self) -> Result<Arc<S>, InjectorError>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let key = ServiceKey::of::<S>();
        downcast_resolved(&key, self.dyn_get(&key)?)
    }

    /// Resolves the registration of `S` under `key`. An empty key is the
    /// anonymous registration.
    fn resolve_named<S>(
        &self,
        key: impl Into<RegistrationKey>,
    ) -> Result<Arc<S>, InjectorError>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let key = ServiceKey::named::<S>(key);
        downcast_resolved(&key, self.dyn_get(&key)?)
    }

    /// Resolves every registration of `S`, however it was keyed. Returns an
    /// empty list if `S` has none.
    fn resolve_all<S>(&self) -> Result<Vec<Arc<S>>, InjectorError>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.keys(TypeId::of::<S>())
            .iter()
            .map(|key| downcast_resolved(key, self.dyn_get(key)?))
            .collect()
    }
}

impl<T> TypedInjector for T where T: Injector {}

impl TypedInjector for dyn Injector + '_ {}

fn downcast_resolved<S>(key: &ServiceKey, value: ScopedValue) -> Result<Arc<S>, InjectorError>
where
    S: ?Sized + Send + Sync + 'static,
{
    match value.downcast::<S>() {
        Some(object) => Ok(object),
        None => unreachable!("the object registered as {key} should be an `Arc` of the service"),
    }
}

#[derive(Debug, Clone, Snafu)]
#[non_exhaustive]
pub enum InjectorError {
    #[snafu(display("could not find the object identified by the given key {key}"))]
    #[non_exhaustive]
    NotFound { key: ServiceKey },
    #[snafu(display("could not construct the object {key} which depends on itself somehow"))]
    #[non_exhaustive]
    CyclicDependency { key: ServiceKey },
    #[snafu(display(
        "could not inject the object {key} of {lifetime} lifetime \
         into an object of {owner} lifetime"
    ))]
    #[non_exhaustive]
    ShortLifetime {
        key: ServiceKey,
        lifetime: Lifetime,
        owner: Lifetime,
    },
    #[snafu(display("could not construct the object {key}"))]
    #[non_exhaustive]
    ObjectConstruction {
        key: ServiceKey,
        source: Arc<dyn Error + Send + Sync>,
    },
    #[snafu(display("could not access the scope of the object"))]
    #[non_exhaustive]
    Scope { source: Arc<ScopeError> },
}

impl From<ScopeError> for InjectorError {
    fn from(err: ScopeError) -> Self {
        Self::Scope {
            source: Arc::new(err),
        }
    }
}
