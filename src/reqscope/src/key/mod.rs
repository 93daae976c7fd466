mod registration;

use std::any::{self, TypeId};
use std::fmt::{Display, Formatter, Result as FmtResult};

pub use registration::RegistrationKey;

/// Identifies one registration: a service type plus the key it was
/// registered under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceKey {
    service: TypeId,
    service_name: &'static str,
    key: RegistrationKey,
}

impl ServiceKey {
    /// The anonymous registration of `S`.
    pub fn of<S>() -> Self
    where
        S: ?Sized + 'static,
    {
        Self::named::<S>(RegistrationKey::Anonymous)
    }

    pub fn named<S>(key: impl Into<RegistrationKey>) -> Self
    where
        S: ?Sized + 'static,
    {
        Self {
            service: TypeId::of::<S>(),
            service_name: any::type_name::<S>(),
            key: key.into(),
        }
    }

    pub fn service(&self) -> TypeId {
        self.service
    }

    pub fn service_name(&self) -> &'static str {
        self.service_name
    }

    pub fn key(&self) -> &RegistrationKey {
        &self.key
    }

    pub fn with_key(&self, key: RegistrationKey) -> Self {
        Self {
            service: self.service,
            service_name: self.service_name,
            key,
        }
    }
}

impl Display for ServiceKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}@{}", self.service_name, self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Service {}

    #[test]
    fn service_key_of_is_anonymous() {
        let key = ServiceKey::of::<dyn Service>();
        assert_eq!(key.service(), TypeId::of::<dyn Service>());
        assert!(key.key().is_anonymous());
        assert_eq!(key, ServiceKey::named::<dyn Service>(""));
    }

    #[test]
    fn service_key_eq_succeeds() {
        let a = ServiceKey::named::<i32>("a");
        let b = ServiceKey::named::<i32>("b");
        let other = ServiceKey::named::<u32>("a");

        assert_ne!(a, b);
        assert_ne!(a, other);
        assert_eq!(a, b.with_key(RegistrationKey::from("a")));
        assert_eq!(a.to_string(), "i32@a");
    }
}
