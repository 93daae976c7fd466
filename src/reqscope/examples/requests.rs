use std::convert::Infallible;
use std::error::Error;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;

use reqscope::prelude::*;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let container = Container::init(AppModule::new("requests")).unwrap();

    let workers: Vec<_> = (0..3)
        .map(|n| {
            let container = container.clone();
            thread::spawn(move || handle_request(&container, n))
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    container.dispose().unwrap();
}

fn handle_request(container: &Container, n: u32) {
    let request = RequestScope::begin();
    request.in_scope(|| {
        let handler = container.resolve::<Handler>().unwrap();
        handler.handle(n);
        handler.handle(n + 100);
    });
    request.end().unwrap();
}

struct AppModule {
    app_name: &'static str,
}

impl AppModule {
    fn new(app_name: &'static str) -> Self {
        Self { app_name }
    }
}

impl Module for AppModule {
    fn configure(
        &self,
        configurer: &mut dyn Configurer,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        configurer.register_instance("app_name", Arc::new(self.app_name));
        configurer.register_type::<ConsoleLogger>("", Lifetime::Singleton);
        configurer.register_type::<Transaction>("", Lifetime::PerRequest);
        configurer.register_type::<Handler>("", Lifetime::Transient);
        Ok(())
    }
}

trait Logger: Send + Sync + 'static {
    fn log(&self, message: &str);
}

struct ConsoleLogger {
    app_name: Arc<&'static str>,
}

impl Component for ConsoleLogger {
    type Service = dyn Logger;

    type Error = Infallible;

    fn construct<I>(injector: &I) -> Result<Result<Self, Self::Error>, InjectorError>
    where
        I: TypedInjector + ?Sized,
    {
        Ok(Ok(Self {
            app_name: injector.resolve_named("app_name")?,
        }))
    }

    fn post_process(self: Arc<Self>) -> Arc<Self::Service> {
        self
    }
}

impl Logger for ConsoleLogger {
    fn log(&self, message: &str) {
        eprintln!("[{}] {}", self.app_name, message);
    }
}

/// Collects the work of one request and commits it when the request ends.
struct Transaction {
    logger: Arc<dyn Logger>,
    statements: AtomicU32,
}

impl Transaction {
    fn execute(&self, statement: &str) {
        self.statements.fetch_add(1, Ordering::SeqCst);
        self.logger.log(&format!("executing `{statement}`"));
    }
}

impl Component for Transaction {
    type Service = Self;

    type Error = Infallible;

    fn construct<I>(injector: &I) -> Result<Result<Self, Self::Error>, InjectorError>
    where
        I: TypedInjector + ?Sized,
    {
        Ok(Ok(Self {
            logger: injector.resolve()?,
            statements: AtomicU32::new(0),
        }))
    }

    fn post_process(self: Arc<Self>) -> Arc<Self::Service> {
        self
    }

    fn release(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let statements = self.statements.load(Ordering::SeqCst);
        self.logger
            .log(&format!("committing {statements} statements"));
        Ok(())
    }
}

struct Handler {
    transaction: Arc<Transaction>,
}

impl Handler {
    fn handle(&self, n: u32) {
        self.transaction
            .execute(&format!("INSERT INTO events VALUES ({n})"));
    }
}

impl Component for Handler {
    type Service = Self;

    type Error = Infallible;

    fn construct<I>(injector: &I) -> Result<Result<Self, Self::Error>, InjectorError>
    where
        I: TypedInjector + ?Sized,
    {
        Ok(Ok(Self {
            transaction: injector.resolve()?,
        }))
    }

    fn post_process(self: Arc<Self>) -> Arc<Self::Service> {
        self
    }
}
