use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::sync::{Arc, OnceLock};

use crate::definition::BeanDefinition;
use crate::key::TypeKey;
use crate::value::ValueDefinition;

/// Where a reference or alias points: a definition id, or a (type, name)
/// pair.
#[derive(Debug, Clone)]
pub enum RefTarget {
    Id(String),
    TypeNamed(TypeKey, String),
}

impl Display for RefTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::TypeNamed(type_key, name) => write!(f, "{type_key}@{name}"),
        }
    }
}

/// A deferred pointer to another definition, bound the first time it is
/// used and cached afterwards.
pub struct BeanReference {
    target: RefTarget,
    bound: OnceLock<Arc<BeanDefinition>>,
}

impl BeanReference {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            target: RefTarget::Id(id.into()),
            bound: OnceLock::new(),
        }
    }

    pub fn by_type_name(type_key: TypeKey, name: impl Into<String>) -> Self {
        Self {
            target: RefTarget::TypeNamed(type_key, name.into()),
            bound: OnceLock::new(),
        }
    }

    pub fn target(&self) -> &RefTarget {
        &self.target
    }

    /// Returns the bound target, looking it up through `resolve` on first
    /// use only.
    pub(crate) fn bind_with(
        &self,
        resolve: impl FnOnce() -> Option<Arc<BeanDefinition>>,
    ) -> Option<Arc<BeanDefinition>> {
        if let Some(definition) = self.bound.get() {
            return Some(Arc::clone(definition));
        }
        let definition = resolve()?;
        Some(Arc::clone(self.bound.get_or_init(|| definition)))
    }
}

impl Debug for BeanReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("BeanReference")
            .field("target", &self.target)
            .field("bound", &self.bound.get().is_some())
            .finish()
    }
}

/// An additional lookup key mapped to an existing definition.
#[derive(Debug, Clone)]
pub struct AliasDefinition {
    alias: String,
    target: RefTarget,
}

impl AliasDefinition {
    pub fn new(alias: impl Into<String>, target: RefTarget) -> Self {
        Self {
            alias: alias.into(),
            target,
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn target(&self) -> &RefTarget {
        &self.target
    }
}

/// An ordered, optionally qualified sequence of values materialized as the
/// list bean for its element type.
pub struct BeanListDefinition {
    type_key: TypeKey,
    qualifier: Option<String>,
    elements: Vec<ValueDefinition>,
}

impl BeanListDefinition {
    pub fn new(type_key: TypeKey) -> Self {
        Self {
            type_key,
            qualifier: None,
            elements: Vec::new(),
        }
    }

    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    pub fn element(mut self, element: ValueDefinition) -> Self {
        self.elements.push(element);
        self
    }

    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    pub fn elements(&self) -> &[ValueDefinition] {
        &self.elements
    }
}

impl Debug for BeanListDefinition {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("BeanListDefinition")
            .field("type_key", &self.type_key)
            .field("qualifier", &self.qualifier)
            .field("elements", &self.elements.len())
            .finish()
    }
}
