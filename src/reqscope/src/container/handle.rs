use std::any::TypeId;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use crate::container::core::ContainerCore;
use crate::container::injector::{CallContext, Injector, InjectorError};
use crate::container::registry::{ConfigurerImpl, Registry, RegistryError};
use crate::key::ServiceKey;
use crate::module::Module;
use crate::request::CurrentRequest;
use crate::scope::{ScopeError, ScopeSweeper, ScopedValue};
use crate::store::StoreSelector;

/// A shareable handle to a set of registrations and the objects built from
/// them.
///
/// Per-request objects are cached in whatever scope the container's
/// [`StoreSelector`] picks at resolution time. Singletons live until
/// [`Container::dispose`] is called or the last handle is dropped.
#[derive(Clone)]
pub struct Container {
    core: Arc<ContainerCore>,
}

impl Container {
    /// Builds a container whose per-request objects go to the scope chosen by
    /// `selector`.
    ///
    /// # Errors
    ///
    /// Returns every error reported while configuring `module`.
    pub fn init_with_selector<M>(
        module: M,
        selector: StoreSelector,
    ) -> Result<Self, RegistryError>
    where
        M: Module,
    {
        let mut configurer = ConfigurerImpl::new(selector.clone());
        module.setup(&mut configurer);
        let registrations = configurer.finish().map_err(RegistryError::from_errors)?;
        Ok(Self {
            core: Arc::new(ContainerCore::new(registrations, selector)),
        })
    }

    pub fn selector(&self) -> &StoreSelector {
        self.core.selector()
    }

    /// Returns a sweeper over the scopes this container caches into. Call
    /// [`ScopeSweeper::sweep_all`] at the end of a unit of work that is not
    /// an entered [`RequestScope`].
    ///
    /// [`RequestScope`]: crate::request::RequestScope
    pub fn sweeper(&self) -> ScopeSweeper {
        ScopeSweeper::new(self.core.selector().clone())
    }

    /// Releases the container's singletons and registered instances.
    ///
    /// Any resolution afterwards fails with [`InjectorError::Scope`].
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::Ended`] if the container is already disposed, or
    /// the failures of the release hooks.
    pub fn dispose(&self) -> Result<usize, ScopeError> {
        self.core.dispose()
    }

    pub fn is_disposed(&self) -> bool {
        self.core.is_disposed()
    }
}

impl Registry for Container {
    fn init<M>(module: M) -> Result<Self, RegistryError>
    where
        M: Module,
    {
        Self::init_with_selector(module, StoreSelector::with_ambient(CurrentRequest))
    }
}

impl Injector for Container {
    fn dyn_get(&self, key: &ServiceKey) -> Result<ScopedValue, InjectorError> {
        self.core.dyn_get(key)
    }

    fn dyn_get_dependency<'a>(
        &self,
        key: &ServiceKey,
        context: &'a CallContext<'a>,
    ) -> Result<ScopedValue, InjectorError> {
        self.core.dyn_get_dependency(key, context)
    }

    fn keys(&self, service: TypeId) -> Vec<ServiceKey> {
        self.core.keys(service)
    }
}

impl Debug for Container {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Container")
            .field("selector", self.core.selector())
            .field("disposed", &self.core.is_disposed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::error::Error;
    use std::thread;

    use parking_lot::Mutex;

    use crate::container::injector::TypedInjector;
    use crate::container::registry::{Configurer, TypedConfigurer};
    use crate::lifetime::Lifetime;
    use crate::module::Configuration;
    use crate::provider::component::Component;
    use crate::request::RequestScope;

    use super::*;

    struct TestObject {
        value: Mutex<i32>,
        name: Arc<String>,
    }

    impl TestObject {
        fn set(&self, value: i32) {
            *self.value.lock() = value;
        }

        fn get(&self) -> i32 {
            *self.value.lock()
        }

        fn name(&self) -> &str {
            self.name.as_ref()
        }
    }

    impl Component for TestObject {
        type Service = Self;

        type Error = Infallible;

        fn construct<I>(injector: &I) -> Result<Result<Self, Self::Error>, InjectorError>
        where
            I: TypedInjector + ?Sized,
        {
            Ok(Ok(Self {
                value: Mutex::new(0),
                name: injector.resolve()?,
            }))
        }

        fn post_process(self: Arc<Self>) -> Arc<Self::Service> {
            self
        }
    }

    struct TestModule;

    impl Module for TestModule {
        fn configure(
            &self,
            configurer: &mut dyn Configurer,
        ) -> Result<(), Box<dyn Error + Send + Sync>> {
            configurer.register_type::<TestObject>("", Lifetime::PerRequest);
            configurer.register_instance("", Arc::new(String::from("test-object")));
            configurer.register_instance("1", Arc::new(1i32));
            configurer.register_instance("2", Arc::new(2i32));
            Ok(())
        }
    }

    struct RepeatedModule;

    impl Module for RepeatedModule {
        fn configure(
            &self,
            configurer: &mut dyn Configurer,
        ) -> Result<(), Box<dyn Error + Send + Sync>> {
            configurer.register_instance("same", Arc::new(1i32));
            configurer.register_instance("same", Arc::new(2i32));
            Ok(())
        }
    }

    struct BrokenModule;

    impl Module for BrokenModule {
        fn configure(
            &self,
            configurer: &mut dyn Configurer,
        ) -> Result<(), Box<dyn Error + Send + Sync>> {
            configurer.register_instance("same", Arc::new(1i32));
            Err("missing settings".into())
        }
    }

    #[test]
    fn container_operations_succeeds() {
        let container = Container::init(TestModule).unwrap();
        let request = RequestScope::begin();

        let object = request.in_scope(|| container.resolve::<TestObject>()).unwrap();
        assert_eq!(object.get(), 0);
        assert_eq!(object.name(), "test-object");
        object.set(42);

        thread::spawn({
            let container = container.clone();
            let request = request.clone();
            move || {
                let object = request.in_scope(|| container.resolve::<TestObject>()).unwrap();
                assert_eq!(object.get(), 42);
            }
        })
        .join()
        .unwrap();

        let other = RequestScope::begin();
        let object = other.in_scope(|| container.resolve::<TestObject>()).unwrap();
        assert_eq!(object.get(), 0);

        let mut numbers: Vec<i32> = container
            .resolve_all::<i32>()
            .unwrap()
            .into_iter()
            .map(|n| *n)
            .collect();
        numbers.sort_unstable();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn container_init_fails_with_every_error() {
        let err = Container::init(Configuration::new().with(BrokenModule).with(BrokenModule))
            .unwrap_err();
        let RegistryError::Aggregated { errors } = err else {
            panic!("errors should be aggregated");
        };
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|err| matches!(err, RegistryError::ModuleInner { .. })));
    }

    #[test]
    fn container_init_keeps_last_registration_of_a_key() {
        let container = Container::init(RepeatedModule).unwrap();

        assert_eq!(*container.resolve_named::<i32>("same").unwrap(), 2);
        assert_eq!(container.resolve_all::<i32>().unwrap().len(), 1);
    }
}
