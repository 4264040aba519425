mod definition;

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use crate::container::Bean;

pub use definition::{DefinedValue, ValueDefinition};

pub(crate) use definition::{Resolution, ValueSupplier};

/// Runtime value currency passed between the resolver, slots, constructors
/// and declared method invocations.
#[derive(Clone)]
pub enum BeanValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bean(Bean),
    List(Vec<BeanValue>),
    Map(Vec<(BeanValue, BeanValue)>),
}

impl BeanValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Bean(_) => "bean",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// Materializes the value as a managed instance, or nothing for null.
    pub(crate) fn into_bean(self) -> Option<Bean> {
        match self {
            Self::Null => None,
            Self::Bool(value) => Some(Arc::new(value)),
            Self::Int(value) => Some(Arc::new(value)),
            Self::Float(value) => Some(Arc::new(value)),
            Self::Str(value) => Some(Arc::new(value)),
            Self::Bean(bean) => Some(bean),
            Self::List(values) => Some(Arc::new(values)),
            Self::Map(pairs) => Some(Arc::new(pairs)),
        }
    }
}

impl Debug for BeanValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Bool(value) => write!(f, "Bool({value})"),
            Self::Int(value) => write!(f, "Int({value})"),
            Self::Float(value) => write!(f, "Float({value})"),
            Self::Str(value) => write!(f, "Str({value:?})"),
            Self::Bean(bean) => write!(f, "Bean({})", bean.as_ref().type_name()),
            Self::List(values) => f.debug_tuple("List").field(values).finish(),
            Self::Map(pairs) => f.debug_tuple("Map").field(pairs).finish(),
        }
    }
}

impl PartialEq for BeanValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Bean(a), Self::Bean(b)) => Arc::ptr_eq(a, b),
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for BeanValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for BeanValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for BeanValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for BeanValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for BeanValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}
