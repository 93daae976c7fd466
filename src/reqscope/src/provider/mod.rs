pub mod component;

use std::fmt::Debug;
use std::sync::Arc;

use crate::container::injector::{CallContext, Injector, InjectorError, TypedInjector};
use crate::scope::{Dispose, ScopedValue};

/// A universal factory which constructs objects of one service type.
///
/// A [`Provider`] is responsible for constructing an object on each request
/// and retrieving all dependencies from an [`Injector`]. Caching is not its
/// concern: whether the object is shared, and for how long, is decided by the
/// lifetime of the registration the provider is bound to.
///
/// Usually, you don't need to implement [`Provider`] manually, since this is
/// automatically done by [`TypedProvider`]'s blanket implementation.
pub trait Provider: Debug + Send + Sync + 'static {
    /// Provides a newly created type-erased object together with its release
    /// hook.
    ///
    /// # Errors
    ///
    /// Returns an error if any dependency can't be fetched or the object
    /// construction fails.
    fn dyn_provide(
        &self,
        injector: &dyn Injector,
        context: &CallContext<'_>,
    ) -> Result<ScopedValue, InjectorError>;
}

/// A static variant of the [`Provider`] trait, leveraging static dispatch and
/// type-safety.
pub trait TypedProvider: Provider {
    /// The service type the provided objects are exposed as. This is usually
    /// a trait object.
    type Service: ?Sized + Send + Sync + 'static;

    /// Provides a newly created object of type [`TypedProvider::Service`].
    ///
    /// # Errors
    ///
    /// Returns an error if any dependency can't be fetched or the object
    /// construction fails.
    fn provide<I>(
        &self,
        injector: &I,
        context: &CallContext<'_>,
    ) -> Result<Provided<Self::Service>, InjectorError>
    where
        I: TypedInjector + ?Sized;
}

impl<T: TypedProvider> Provider for T {
    fn dyn_provide(
        &self,
        injector: &dyn Injector,
        context: &CallContext<'_>,
    ) -> Result<ScopedValue, InjectorError> {
        self.provide(injector, context).map(Provided::into_value)
    }
}

/// A freshly provided object and the hook releasing it.
pub struct Provided<S>
where
    S: ?Sized + Send + Sync + 'static,
{
    object: Arc<S>,
    disposer: Option<Arc<dyn Dispose>>,
}

impl<S> Provided<S>
where
    S: ?Sized + Send + Sync + 'static,
{
    pub fn new(object: Arc<S>) -> Self {
        Self {
            object,
            disposer: None,
        }
    }

    pub fn with_disposer(object: Arc<S>, disposer: Arc<dyn Dispose>) -> Self {
        Self {
            object,
            disposer: Some(disposer),
        }
    }

    pub fn object(&self) -> &Arc<S> {
        &self.object
    }

    pub fn into_value(self) -> ScopedValue {
        match self.disposer {
            Some(disposer) => ScopedValue::with_disposer(self.object, disposer),
            None => ScopedValue::new(self.object),
        }
    }
}
