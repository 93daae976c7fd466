use std::error::Error;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::container::injector::{
    CallContext, ContextForwardingInjectorProxy, InjectorError, TypedInjector,
};
use crate::provider::component::Component;
use crate::provider::{Provided, TypedProvider};
use crate::scope::Dispose;

pub struct ComponentProvider<C>
where
    C: Component,
{
    _marker: PhantomData<fn() -> C>,
}

impl<C> ComponentProvider<C>
where
    C: Component,
{
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<C> Debug for ComponentProvider<C>
where
    C: Component,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ComponentProvider<C>")
            .finish_non_exhaustive()
    }
}

impl<C> TypedProvider for ComponentProvider<C>
where
    C: Component,
{
    type Service = C::Service;

    fn provide<I>(
        &self,
        injector: &I,
        context: &CallContext<'_>,
    ) -> Result<Provided<Self::Service>, InjectorError>
    where
        I: TypedInjector + ?Sized,
    {
        let injector = ContextForwardingInjectorProxy::new(injector, context);
        match C::construct(&injector) {
            Ok(Ok(component)) => {
                let component = Arc::new(component);
                let disposer = Arc::new(Release(Arc::clone(&component)));
                Ok(Provided::with_disposer(component.post_process(), disposer))
            }
            Ok(Err(err)) => Err(InjectorError::ObjectConstruction {
                key: context.key().clone(),
                source: Arc::from(err.into()),
            }),
            Err(err) => Err(err),
        }
    }
}

/// Runs [`Component::release`] on behalf of the service handle.
struct Release<C: Component>(Arc<C>);

impl<C: Component> Dispose for Release<C> {
    fn dispose(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.0.release()
    }
}
