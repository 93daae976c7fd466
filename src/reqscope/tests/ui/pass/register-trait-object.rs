use std::convert::Infallible;
use std::error::Error;
use std::sync::Arc;

use reqscope::prelude::*;

pub trait Clock: Send + Sync + 'static {}

pub struct SystemClock;

impl Clock for SystemClock {}

impl Component for SystemClock {
    type Service = dyn Clock;

    type Error = Infallible;

    fn construct<I>(_injector: &I) -> Result<Result<Self, Self::Error>, InjectorError>
    where
        I: TypedInjector + ?Sized,
    {
        Ok(Ok(SystemClock))
    }

    fn post_process(self: Arc<Self>) -> Arc<Self::Service> {
        self
    }
}

pub struct ClockModule;

impl Module for ClockModule {
    fn configure(
        &self,
        configurer: &mut dyn Configurer,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        configurer.register_type::<SystemClock>("", Lifetime::PerRequest);
        configurer.register_instance::<dyn Clock>("fixed", Arc::new(SystemClock));
        configurer.register_instance("greeting", Arc::new(String::from("hello")));
        Ok(())
    }
}

fn main() {
    let container = Container::init(Configuration::new().with(ClockModule)).unwrap();
    let _: Arc<dyn Clock> = container.resolve_named::<dyn Clock>("fixed").unwrap();
    let _: Vec<Arc<dyn Clock>> = container.resolve_all::<dyn Clock>().unwrap();
}
