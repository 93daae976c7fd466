use std::borrow::Cow;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// The key a service type is registered under.
///
/// Every service type has one anonymous slot and any number of named ones.
/// An empty name always means the anonymous slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum RegistrationKey {
    #[default]
    Anonymous,
    Named(Cow<'static, str>),
}

impl RegistrationKey {
    pub fn from_explicit(key: impl Into<Cow<'static, str>>) -> Self {
        let key = key.into();
        if key.is_empty() {
            Self::Anonymous
        } else {
            Self::Named(key)
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Anonymous => None,
            Self::Named(name) => Some(name.as_ref()),
        }
    }
}

impl Display for RegistrationKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Anonymous => f.write_str("<anonymous>"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

impl From<&'static str> for RegistrationKey {
    fn from(key: &'static str) -> Self {
        Self::from_explicit(key)
    }
}

impl From<String> for RegistrationKey {
    fn from(key: String) -> Self {
        Self::from_explicit(key)
    }
}

impl<K: Into<RegistrationKey>> From<Option<K>> for RegistrationKey {
    fn from(key: Option<K>) -> Self {
        key.map_or(Self::Anonymous, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_key_from_explicit_treats_empty_as_anonymous() {
        assert!(RegistrationKey::from_explicit("").is_anonymous());
        assert!(RegistrationKey::from(String::new()).is_anonymous());
        assert!(RegistrationKey::from(None::<&'static str>).is_anonymous());

        let key = RegistrationKey::from("primary");
        assert_eq!(key.name(), Some("primary"));
        assert_eq!(key.to_string(), "primary");
    }
}
