#![allow(clippy::new_without_default)]

pub mod container;
pub mod key;
pub mod lifetime;
pub mod module;
pub mod provider;
pub mod request;
pub mod scope;
pub mod store;
mod util;

pub mod prelude {
    pub use crate::container::injector::{InjectorError, TypedInjector};
    pub use crate::container::registry::{Configurer, Registry, RegistryError, TypedConfigurer};
    pub use crate::container::Container;
    pub use crate::key::{RegistrationKey, ServiceKey};
    pub use crate::lifetime::Lifetime;
    pub use crate::module::{Configuration, Module};
    pub use crate::provider::component::Component;
    pub use crate::request::RequestScope;
    pub use crate::scope::{Dispose, LifetimeManager, ScopeError, ScopeSweeper, ScopedValue};
}
