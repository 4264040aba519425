pub mod registry;

pub(crate) mod core;

mod handle;
mod lazy;
mod resolver;

use std::any::{self, Any};
use std::error::Error;
use std::sync::Arc;

use snafu::prelude::*;

use crate::config::ConfigError;
use crate::container::registry::DefinitionError;
use crate::convert::ConvertError;

pub use handle::{BeanContainer, ShutdownGuard};
pub use lazy::{LazyBean, LazyBeanList, LazySpec};

/// Anything the container may own and hand out.
///
/// Instances are always shared as [`Bean`]s, so mutation after construction
/// goes through interior mutability inside the bean type itself.
pub trait Managed: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    fn type_name(&self) -> &'static str;
}

impl<T: Any + Send + Sync> Managed for T {
    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    #[inline]
    fn type_name(&self) -> &'static str {
        any::type_name::<T>()
    }
}

/// A managed instance owned by a container.
pub type Bean = Arc<dyn Managed>;

#[derive(Debug, Clone, Snafu)]
#[non_exhaustive]
pub enum ContainerError {
    #[snafu(display("no bean matches {selector}"))]
    #[non_exhaustive]
    NoSuchBean { selector: String },
    #[snafu(display("could not create bean {bean}"))]
    #[non_exhaustive]
    Creation {
        bean: String,
        source: Arc<dyn Error + Send + Sync>,
    },
    #[snafu(display(
        "could not create bean {bean} which depends on itself before any instance exists"
    ))]
    #[non_exhaustive]
    UnresolvableCycle { bean: String },
    #[snafu(display("bean reference {reference} does not match any definition"))]
    #[non_exhaustive]
    MissingReference { reference: String },
    #[snafu(display("required slot {slot} of bean {bean} has no value"))]
    #[non_exhaustive]
    RequiredSlot { bean: String, slot: String },
    #[snafu(display("non-nullable slot {slot} of bean {bean} holds a null value"))]
    #[non_exhaustive]
    NullSlot { bean: String, slot: String },
    #[snafu(display("no candidate satisfies the required handle of {type_name}"))]
    #[non_exhaustive]
    EmptyBean { type_name: String },
    #[snafu(display("the handle of {type_name} resolved to null"))]
    #[non_exhaustive]
    NullBean { type_name: String },
    #[snafu(display("bean {bean} reported a failed load and is not exposed"))]
    #[non_exhaustive]
    BeanNotLoadable { bean: String },
    #[snafu(display("{operation} failed"))]
    #[non_exhaustive]
    Callback {
        operation: String,
        source: Arc<dyn Error + Send + Sync>,
    },
    #[snafu(display("value conversion failed"))]
    #[non_exhaustive]
    Conversion { source: ConvertError },
    #[snafu(display("configuration lookup failed"))]
    #[non_exhaustive]
    Config { source: ConfigError },
    #[snafu(display("container definitions are invalid"))]
    #[non_exhaustive]
    Definition { source: DefinitionError },
    #[snafu(display("the container is closed"))]
    Closed,
}

impl ContainerError {
    pub(crate) fn callback(
        operation: impl Into<String>,
        source: Box<dyn Error + Send + Sync>,
    ) -> Self {
        Self::Callback {
            operation: operation.into(),
            source: Arc::from(source),
        }
    }
}
