pub mod injector;
pub mod registry;

mod core;
mod handle;
mod singleton;

use std::any::{self, TypeId};
use std::sync::Arc;

use crate::util::any::AsAny;

pub use handle::Container;

pub trait Managed: AsAny + Send + Sync + 'static {}

impl<T> Managed for T where T: AsAny + Send + Sync + 'static {}

/// A shared handle to a managed object, i.e. an `Arc<T>` with `T` possibly
/// unsized.
pub trait SharedManaged: Managed {
    fn dyn_clone(&self) -> Box<dyn SharedManaged>;

    /// Returns the address of the shared object, used to tell whether two
    /// handles point to the very same object.
    fn identity(&self) -> *const ();

    /// Returns the [`TypeId`] of the pointee.
    fn target_type(&self) -> TypeId;

    /// Returns the name of the pointee type.
    fn target_name(&self) -> &'static str;
}

impl<T> SharedManaged for Arc<T>
where
    T: Send + Sync + ?Sized + 'static,
{
    fn dyn_clone(&self) -> Box<dyn SharedManaged> {
        Box::new(Arc::clone(self))
    }

    fn identity(&self) -> *const () {
        Arc::as_ptr(self) as *const ()
    }

    fn target_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn target_name(&self) -> &'static str {
        any::type_name::<T>()
    }
}
