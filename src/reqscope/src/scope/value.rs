use std::any::TypeId;
use std::error::Error;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use crate::container::SharedManaged;

/// A release hook run when a scoped object is replaced, removed, or swept.
///
/// Implementing [`Dispose`] is optional. Objects stored without a disposer
/// are simply dropped when their last handle goes away.
pub trait Dispose: Send + Sync + 'static {
    /// Releases the resources held by `self`.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource fails to close. The error is passed on
    /// to whoever triggered the disposal.
    fn dispose(&self) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// A shared object cached for some scope, together with its optional release
/// hook.
///
/// Cloning a [`ScopedValue`] clones the handle, not the object: clones are
/// the same object as far as [`ScopedValue::is_same`] is concerned.
pub struct ScopedValue {
    object: Box<dyn SharedManaged>,
    disposer: Option<Arc<dyn Dispose>>,
}

impl ScopedValue {
    /// Wraps an object that needs no cleanup.
    pub fn new<T>(object: Arc<T>) -> Self
    where
        T: Send + Sync + ?Sized + 'static,
    {
        Self {
            object: Box::new(object),
            disposer: None,
        }
    }

    /// Wraps an object whose own [`Dispose`] implementation releases it.
    pub fn disposable<T>(object: Arc<T>) -> Self
    where
        T: Dispose,
    {
        let disposer: Arc<dyn Dispose> = Arc::clone(&object) as _;
        Self {
            object: Box::new(object),
            disposer: Some(disposer),
        }
    }

    /// Wraps an object released by a separate `disposer`. This is how an
    /// `Arc<dyn Trait>` keeps the release hook of its concrete type.
    pub fn with_disposer<T>(object: Arc<T>, disposer: Arc<dyn Dispose>) -> Self
    where
        T: Send + Sync + ?Sized + 'static,
    {
        Self {
            object: Box::new(object),
            disposer: Some(disposer),
        }
    }

    /// Returns the handle as an `Arc<T>` if the object is a `T`.
    pub fn downcast<T>(&self) -> Option<Arc<T>>
    where
        T: Send + Sync + ?Sized + 'static,
    {
        (*self.object).as_any().downcast_ref::<Arc<T>>().cloned()
    }

    /// Returns true if both values hold the very same object.
    pub fn is_same(&self, other: &ScopedValue) -> bool {
        self.object.identity() == other.object.identity()
    }

    pub fn has_disposer(&self) -> bool {
        self.disposer.is_some()
    }

    /// The [`TypeId`] of the object type behind the handle.
    pub fn object_type(&self) -> TypeId {
        self.object.target_type()
    }

    /// The name of the object type behind the handle.
    pub fn object_name(&self) -> &'static str {
        self.object.target_name()
    }

    /// Runs the release hook, if any.
    pub(crate) fn release(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        match self.disposer.as_ref() {
            Some(disposer) => disposer.dispose(),
            None => Ok(()),
        }
    }
}

impl Clone for ScopedValue {
    fn clone(&self) -> Self {
        Self {
            object: self.object.dyn_clone(),
            disposer: self.disposer.clone(),
        }
    }
}

impl Debug for ScopedValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ScopedValue")
            .field("object", &self.object_name())
            .field("disposable", &self.has_disposer())
            .finish()
    }
}

impl<T> From<Arc<T>> for ScopedValue
where
    T: Send + Sync + ?Sized + 'static,
{
    fn from(object: Arc<T>) -> Self {
        Self::new(object)
    }
}

#[cfg(test)]
mod tests {
    use crate::scope::testing::Resource;

    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> &'static str;
    }

    impl Greeter for Resource {
        fn greet(&self) -> &'static str {
            "hello"
        }
    }

    #[test]
    fn scoped_value_downcast_succeeds() {
        let value = ScopedValue::new(Arc::new(42i32));
        assert_eq!(value.downcast::<i32>().as_deref(), Some(&42));
        assert!(value.downcast::<i64>().is_none());
        assert_eq!(value.object_type(), TypeId::of::<i32>());
    }

    #[test]
    fn scoped_value_downcast_succeeds_when_object_is_unsized() {
        let resource = Arc::new(Resource::new());
        let greeter: Arc<dyn Greeter> = resource.clone();
        let value = ScopedValue::with_disposer(greeter, resource.clone());

        assert_eq!(value.downcast::<dyn Greeter>().unwrap().greet(), "hello");
        value.release().unwrap();
        assert_eq!(resource.disposed(), 1);
    }

    #[test]
    fn scoped_value_is_same_compares_identity() {
        let object = Arc::new(1i32);
        let a = ScopedValue::new(Arc::clone(&object));
        let b = ScopedValue::new(object);
        let c = ScopedValue::new(Arc::new(1i32));

        assert!(a.is_same(&b));
        assert!(a.is_same(&a.clone()));
        assert!(!a.is_same(&c));
    }

    #[test]
    fn scoped_value_release_is_noop_without_disposer() {
        let value: ScopedValue = Arc::new("plain").into();
        assert!(!value.has_disposer());
        assert!(value.release().is_ok());
    }

    #[test]
    fn scoped_value_release_fails_when_disposer_fails() {
        let resource = Arc::new(Resource::failing());
        let value = ScopedValue::disposable(Arc::clone(&resource));
        assert!(value.release().is_err());
        assert_eq!(resource.disposed(), 1);
    }
}
