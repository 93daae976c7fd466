use std::any::TypeId;

use crate::key::RegistrationKey;

/// A read-only view of the registrations made so far.
#[cfg_attr(test, mockall::automock)]
pub trait ExistingRegistrations {
    fn contains(&self, service: TypeId, key: &RegistrationKey) -> bool;
}

/// Decides the key a new registration is stored under.
///
/// Explicitly keyed registrations keep their key. The first anonymous
/// registration of a service type takes the anonymous slot; later anonymous
/// registrations of the same service type are re-keyed under the name of their
/// implementation type instead of replacing it. The slot's owner stays the
/// default resolution while every registration remains reachable through
/// [`TypedInjector::resolve_all`].
///
/// [`TypedInjector::resolve_all`]: crate::container::injector::TypedInjector::resolve_all
#[derive(Debug, Clone, Copy, Default)]
pub struct AdapterRegistrationPolicy;

impl AdapterRegistrationPolicy {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve_registration_key(
        &self,
        explicit_key: RegistrationKey,
        service: TypeId,
        implementation: &'static str,
        existing: &dyn ExistingRegistrations,
    ) -> RegistrationKey {
        if !explicit_key.is_anonymous() {
            return explicit_key;
        }
        if existing.contains(service, &RegistrationKey::Anonymous) {
            RegistrationKey::from_explicit(implementation)
        } else {
            RegistrationKey::Anonymous
        }
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate::*;

    use super::*;

    trait Foo {}

    #[test]
    fn policy_keeps_explicit_keys() {
        let mut existing = MockExistingRegistrations::new();
        existing.expect_contains().never();

        let key = AdapterRegistrationPolicy::new().resolve_registration_key(
            RegistrationKey::from("primary"),
            TypeId::of::<dyn Foo>(),
            "app::FooImpl",
            &existing,
        );
        assert_eq!(key, RegistrationKey::from("primary"));
    }

    #[test]
    fn policy_takes_the_anonymous_slot_when_free() {
        let mut existing = MockExistingRegistrations::new();
        existing
            .expect_contains()
            .with(eq(TypeId::of::<dyn Foo>()), eq(RegistrationKey::Anonymous))
            .times(1)
            .return_const(false);

        let key = AdapterRegistrationPolicy::new().resolve_registration_key(
            RegistrationKey::from(""),
            TypeId::of::<dyn Foo>(),
            "app::FooImpl",
            &existing,
        );
        assert!(key.is_anonymous());
    }

    #[test]
    fn policy_rekeys_under_the_implementation_when_the_slot_is_taken() {
        let mut existing = MockExistingRegistrations::new();
        existing.expect_contains().return_const(true);

        let key = AdapterRegistrationPolicy::new().resolve_registration_key(
            RegistrationKey::Anonymous,
            TypeId::of::<dyn Foo>(),
            "app::FooImpl2",
            &existing,
        );
        assert_eq!(key.name(), Some("app::FooImpl2"));
    }
}
