use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};

use reqscope::scope::Dispose;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Counts how many times it has been disposed.
#[derive(Debug, Default)]
pub struct Connection {
    closed: AtomicUsize,
}

impl Connection {
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Dispose for Connection {
    fn dispose(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
