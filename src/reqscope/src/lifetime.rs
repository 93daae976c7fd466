use std::fmt::{Display, Formatter, Result as FmtResult};

/// How long an object resolved from a [`Container`] is shared.
///
/// Variants are ordered by how long they live, so `a > b` means objects of
/// lifetime `a` strictly outlive objects of lifetime `b`:
///
/// - [`Lifetime::Transient`] objects are built on every request and owned by
///   the caller alone.
/// - [`Lifetime::PerRequest`] objects are built once per unit of work (an
///   entered [`RequestScope`], or the calling thread when no request is
///   active) and disposed when that unit of work ends.
/// - [`Lifetime::Singleton`] objects are built once per container and
///   disposed when the container is disposed.
///
/// [`Container`]: crate::container::Container
/// [`RequestScope`]: crate::request::RequestScope
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Lifetime {
    #[default]
    Transient = 0,
    PerRequest = 1,
    Singleton = 2,
}

impl Lifetime {
    /// Returns true if `self` lives at least as long as `other`.
    pub fn outlive(self, other: Self) -> bool {
        self >= other
    }

    /// Returns true if objects of this lifetime are cached somewhere and
    /// therefore shared between resolutions.
    pub fn is_shared(self) -> bool {
        self != Self::Transient
    }

    /// Returns the name of the lifetime in a string literal.
    pub fn to_str(&self) -> &'static str {
        match self {
            Self::Transient => "Transient",
            Self::PerRequest => "PerRequest",
            Self::Singleton => "Singleton",
        }
    }
}

impl Display for Lifetime {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.to_str())
    }
}
