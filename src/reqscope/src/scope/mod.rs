//! Per-scope object cells and their cleanup.
//!
//! Every scope's [`BackingStore`] holds exactly one [`ScopeRegistry`], which
//! maps [`LifetimeManager`] handles to the [`ScopedValue`] they cache. Values
//! leave a registry only through disposal: replacing, removing, or sweeping a
//! value runs its [`Dispose`] hook, if it has one.
//!
//! [`BackingStore`]: crate::store::BackingStore

mod manager;
mod registry;
mod sweeper;
mod value;

use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::atomic::{AtomicU64, Ordering};

use snafu::prelude::*;

use crate::util::fmt::Aggregated;

pub use manager::LifetimeManager;
pub use registry::ScopeRegistry;
pub use sweeper::ScopeSweeper;
pub use value::{Dispose, ScopedValue};

/// The opaque identity of a [`LifetimeManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ManagerId(u64);

impl ManagerId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl Display for ManagerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum ScopeError {
    #[snafu(display("could not dispose the object {object} held by {holder}"))]
    #[non_exhaustive]
    Dispose {
        holder: String,
        object: &'static str,
        source: Box<dyn Error + Send + Sync>,
    },
    #[snafu(display(
        "{} objects could not be disposed:\n{}",
        errors.len(),
        Aggregated::new(errors)
    ))]
    #[non_exhaustive]
    Aggregated { errors: Vec<ScopeError> },
    #[snafu(display("the scope has already ended"))]
    #[non_exhaustive]
    Ended {},
}

impl ScopeError {
    /// Folds the failures of a batch of disposals into one error, if any.
    pub(crate) fn from_failures(mut errors: Vec<ScopeError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Aggregated { errors }),
        }
    }
}
