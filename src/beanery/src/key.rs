use std::any::{self, TypeId};
use std::fmt::{Debug, Display, Formatter, Result as FmtResult};

use crate::container::Managed;

/// Runtime identity of a bean type.
///
/// Every per-type index in the container is keyed by the [`TypeId`] carried
/// here; the type name is kept alongside for diagnostics only and never
/// participates in comparisons.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: Managed>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Debug for TypeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Display::fmt(self, f)
    }
}

impl Display for TypeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_key_of_succeeds() {
        let i32_key = TypeKey::of::<i32>();
        let str_key = TypeKey::of::<String>();

        assert_eq!(i32_key.id(), TypeId::of::<i32>());
        assert_eq!(str_key.id(), TypeId::of::<String>());
        assert_ne!(i32_key, str_key);
        assert_eq!(i32_key, TypeKey::of::<i32>());
    }

    #[test]
    fn type_key_display_shows_type_name() {
        assert_eq!(TypeKey::of::<i32>().to_string(), "i32");
    }
}
