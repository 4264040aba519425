use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::container::core::ContainerCore;
use crate::container::ContainerError;
use crate::convert::TargetType;
use crate::definition::{BeanDefinition, BeanReference};
use crate::value::BeanValue;

/// Deferred computation cached by a resolution cell.
///
/// Suppliers are re-invoked on every resolve so that references to
/// non-singleton definitions keep yielding fresh instances.
pub(crate) type ValueSupplier =
    Arc<dyn Fn(&Arc<ContainerCore>) -> Result<BeanValue, ContainerError> + Send + Sync>;

/// State of a value definition's resolution cell.
pub(crate) enum Resolution {
    Unresolved,
    Value(BeanValue),
    Supplier(ValueSupplier),
}

/// Description of a single resolvable value: a literal, a reference to
/// another definition, a nested definition, or a collection of the same.
pub enum DefinedValue {
    Literal(BeanValue),
    Reference(BeanReference),
    Definition(Arc<BeanDefinition>),
    List(Vec<ValueDefinition>),
    Map(Vec<(ValueDefinition, ValueDefinition)>),
}

impl Debug for DefinedValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Reference(reference) => f.debug_tuple("Reference").field(reference).finish(),
            Self::Definition(definition) => {
                write!(f, "Definition({})", definition.diagnostic_name())
            }
            Self::List(elements) => write!(f, "List(len={})", elements.len()),
            Self::Map(pairs) => write!(f, "Map(len={})", pairs.len()),
        }
    }
}

/// A resolvable value attached to a definition, with declared conversion
/// types and a memoizing resolution cell.
///
/// Resolution happens at most once per cell: once resolved, the cached
/// value or supplier is reused for the lifetime of the definition.
pub struct ValueDefinition {
    value: Option<DefinedValue>,
    target: Option<TargetType>,
    element: Option<TargetType>,
    key: Option<TargetType>,
    cell: Mutex<Resolution>,
}

impl ValueDefinition {
    pub fn new(value: DefinedValue) -> Self {
        Self {
            value: Some(value),
            target: None,
            element: None,
            key: None,
            cell: Mutex::new(Resolution::Unresolved),
        }
    }

    /// A definition without a defined value; resolves to the caller's
    /// default, or null.
    pub fn empty() -> Self {
        Self {
            value: None,
            target: None,
            element: None,
            key: None,
            cell: Mutex::new(Resolution::Unresolved),
        }
    }

    pub fn literal(value: impl Into<BeanValue>) -> Self {
        Self::new(DefinedValue::Literal(value.into()))
    }

    pub fn reference(reference: BeanReference) -> Self {
        Self::new(DefinedValue::Reference(reference))
    }

    pub fn with_target(mut self, target: TargetType) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_element(mut self, element: TargetType) -> Self {
        self.element = Some(element);
        self
    }

    pub fn with_key(mut self, key: TargetType) -> Self {
        self.key = Some(key);
        self
    }

    pub fn value(&self) -> Option<&DefinedValue> {
        self.value.as_ref()
    }

    pub fn target(&self) -> Option<&TargetType> {
        self.target.as_ref()
    }

    pub fn element(&self) -> Option<&TargetType> {
        self.element.as_ref()
    }

    pub fn key_type(&self) -> Option<&TargetType> {
        self.key.as_ref()
    }

    pub(crate) fn cell(&self) -> &Mutex<Resolution> {
        &self.cell
    }
}

impl Debug for ValueDefinition {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ValueDefinition")
            .field("value", &self.value)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_definition_starts_unresolved() {
        let definition = ValueDefinition::literal(42i64).with_target(TargetType::Int);

        assert!(matches!(*definition.cell().lock(), Resolution::Unresolved));
        assert!(matches!(
            definition.value(),
            Some(DefinedValue::Literal(BeanValue::Int(42)))
        ));
        assert_eq!(definition.target(), Some(&TargetType::Int));
    }

    #[test]
    fn empty_value_definition_has_no_defined_value() {
        let definition = ValueDefinition::empty();
        assert!(definition.value().is_none());
    }
}
