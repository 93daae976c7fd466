use std::any::TypeId;

use crate::container::injector::{CallContext, Injector, InjectorError, TypedInjector};
use crate::key::ServiceKey;
use crate::scope::ScopedValue;

/// Forwards every request as a dependency of the object described by
/// `context`.
pub struct ContextForwardingInjectorProxy<'a, I>
where
    I: TypedInjector + ?Sized,
{
    inner: &'a I,
    context: &'a CallContext<'a>,
}

impl<'a, I> ContextForwardingInjectorProxy<'a, I>
where
    I: TypedInjector + ?Sized,
{
    pub fn new(inner: &'a I, context: &'a CallContext<'a>) -> Self {
        Self { inner, context }
    }
}

impl<I> Injector for ContextForwardingInjectorProxy<'_, I>
where
    I: TypedInjector + ?Sized,
{
    fn dyn_get(&self, key: &ServiceKey) -> Result<ScopedValue, InjectorError> {
        self.dyn_get_dependency(key, self.context)
    }

    fn dyn_get_dependency<'a>(
        &self,
        key: &ServiceKey,
        context: &'a CallContext<'a>,
    ) -> Result<ScopedValue, InjectorError> {
        self.inner.dyn_get_dependency(key, context)
    }

    fn keys(&self, service: TypeId) -> Vec<ServiceKey> {
        self.inner.keys(service)
    }
}
