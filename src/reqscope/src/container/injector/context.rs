use crate::key::ServiceKey;
use crate::lifetime::Lifetime;

/// The chain of registrations being built on the current call stack.
#[derive(Debug, Clone)]
pub struct CallContext<'a> {
    trace: InjectionTrace<'a>,
}

impl<'a> CallContext<'a> {
    pub fn new(key: &'a ServiceKey, lifetime: Lifetime) -> Self {
        Self {
            trace: InjectionTrace::new(key, lifetime),
        }
    }

    pub fn append<'b>(&'b self, key: &'b ServiceKey, lifetime: Lifetime) -> CallContext<'b> {
        CallContext {
            trace: self.trace.append(key, lifetime),
        }
    }

    pub fn key(&self) -> &ServiceKey {
        self.trace.key()
    }

    pub fn lifetime(&self) -> Lifetime {
        self.trace.lifetime()
    }

    pub fn trace(&self) -> &InjectionTrace<'_> {
        &self.trace
    }
}

#[derive(Debug, Clone)]
pub struct InjectionTrace<'a> {
    key: &'a ServiceKey,
    lifetime: Lifetime,
    previous: Option<&'a InjectionTrace<'a>>,
}

impl<'a> InjectionTrace<'a> {
    pub fn new(key: &'a ServiceKey, lifetime: Lifetime) -> Self {
        Self {
            key,
            lifetime,
            previous: None,
        }
    }

    pub fn append<'b>(&'b self, key: &'b ServiceKey, lifetime: Lifetime) -> InjectionTrace<'b> {
        InjectionTrace {
            key,
            lifetime,
            previous: Some(self),
        }
    }

    pub fn key(&self) -> &ServiceKey {
        self.key
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    pub fn previous(&self) -> Option<&InjectionTrace<'a>> {
        self.previous
    }

    pub fn previous_exist_key(&self, key: &ServiceKey) -> bool {
        let mut this = self;
        while let Some(previous) = this.previous() {
            if previous.key() == key {
                return true;
            }
            this = previous;
        }
        false
    }

    /// Returns the longest lifetime among the objects depending on this one.
    pub fn owner_lifetime(&self) -> Option<Lifetime> {
        let mut owner = None;
        let mut this = self;
        while let Some(previous) = this.previous() {
            owner = owner.max(Some(previous.lifetime()));
            this = previous;
        }
        owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injection_trace_previous_exist_key_skips_itself() {
        let a = ServiceKey::named::<i32>("a");
        let b = ServiceKey::named::<i32>("b");
        let root = CallContext::new(&a, Lifetime::Transient);
        let child = root.append(&b, Lifetime::Transient);
        let again = child.append(&a, Lifetime::Transient);

        assert!(!root.trace().previous_exist_key(&a));
        assert!(!child.trace().previous_exist_key(&b));
        assert!(again.trace().previous_exist_key(&a));
    }

    #[test]
    fn injection_trace_owner_lifetime_takes_the_longest() {
        let a = ServiceKey::named::<i32>("a");
        let b = ServiceKey::named::<i32>("b");
        let c = ServiceKey::named::<i32>("c");
        let root = CallContext::new(&a, Lifetime::Singleton);
        let child = root.append(&b, Lifetime::Transient);
        let leaf = child.append(&c, Lifetime::PerRequest);

        assert_eq!(root.trace().owner_lifetime(), None);
        assert_eq!(leaf.trace().owner_lifetime(), Some(Lifetime::Singleton));
        assert_eq!(leaf.lifetime(), Lifetime::PerRequest);
    }
}
