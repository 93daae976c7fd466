mod wrapper;

use std::error::Error;
use std::sync::Arc;

use crate::container::injector::{InjectorError, TypedInjector};

pub use wrapper::ComponentProvider;

/// A type that has a dedicated constructor for dependency injection.
///
/// ```rust
/// # use std::convert::Infallible;
/// # use std::error::Error;
/// # use std::sync::Arc;
/// # use reqscope::container::injector::{InjectorError, TypedInjector};
/// # use reqscope::provider::component::Component;
/// #
/// trait Repository: Send + Sync + 'static {}
///
/// struct SqlRepository {
///     url: Arc<String>,
/// }
///
/// impl Repository for SqlRepository {}
///
/// impl Component for SqlRepository {
///     type Service = dyn Repository;
///
///     type Error = Infallible;
///
///     fn construct<I>(injector: &I) -> Result<Result<Self, Self::Error>, InjectorError>
///     where
///         I: TypedInjector + ?Sized,
///     {
///         let url = injector.resolve_named::<String>("database-url")?;
///         Ok(Ok(Self { url }))
///     }
///
///     fn post_process(self: Arc<Self>) -> Arc<Self::Service> {
///         self
///     }
///
///     fn release(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
///         // close connections to `self.url`
///         Ok(())
///     }
/// }
/// ```
///
/// Wrap your [`Component`] in a [`ComponentProvider`] if you need a
/// [`Provider`], or register it directly with
/// [`TypedConfigurer::register_type`].
///
/// [`Provider`]: crate::provider::Provider
/// [`TypedConfigurer::register_type`]: crate::container::registry::TypedConfigurer::register_type
pub trait Component: Send + Sync + Sized + 'static {
    /// The service type the component is exposed as, usually a trait object.
    type Service: ?Sized + Send + Sync + 'static;

    /// The error occurred in object construction after all dependencies are
    /// retrieved.
    type Error: Into<Box<dyn Error + Send + Sync>>;

    /// Retrieves the dependencies from the injector and creates the object.
    ///
    /// # Errors
    ///
    /// Returns an error if any dependency can't be fetched.
    ///
    /// Returns an inner error [`Component::Error`] wrapped in the outer [`Ok`]
    /// if the object construction fails.
    fn construct<I>(injector: &I) -> Result<Result<Self, Self::Error>, InjectorError>
    where
        I: TypedInjector + ?Sized;

    /// Coerces the constructed object to [`Component::Service`].
    fn post_process(self: Arc<Self>) -> Arc<Self::Service>;

    /// Releases the resources held by the object. Runs once when the scope
    /// caching the object ends, or when the object is replaced in it.
    /// Transient objects are never released.
    ///
    /// # Errors
    ///
    /// Returns an error if the resources can't be released.
    fn release(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
