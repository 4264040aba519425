#![allow(clippy::new_without_default)]

pub mod capability;
pub mod class;
pub mod config;
pub mod container;
pub mod convert;
pub mod definition;
pub mod key;
pub mod value;
mod util;

pub mod prelude {
    pub use crate::capability::{
        BeanFactory, BeanNameAware, Closeable, ConfigAware, ContextAware, Disposable,
        FactoryAware, Loadable, PostConfigure, PostCreate, PostProcessor,
    };
    pub use crate::class::{BeanClass, BeanClassBuilder, InjectMetadata, Slot, SlotKind};
    pub use crate::config::{ConfigSource, MapConfig};
    pub use crate::container::registry::DefinitionError;
    pub use crate::container::{
        Bean, BeanContainer, ContainerError, LazyBean, LazyBeanList, LazySpec, Managed,
        ShutdownGuard,
    };
    pub use crate::convert::{Converter, DefaultConverter, TargetType};
    pub use crate::definition::{
        AliasDefinition, BeanDefinition, BeanListDefinition, BeanReference, InitHook, RefTarget,
    };
    pub use crate::key::TypeKey;
    pub use crate::value::{BeanValue, DefinedValue, ValueDefinition};
}
