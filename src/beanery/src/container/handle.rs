use std::sync::Arc;

use crate::config::{ConfigSource, MapConfig};
use crate::container::core::ContainerCore;
use crate::container::lazy::{LazyBean, LazyBeanList, LazySpec};
use crate::container::registry::DefinitionError;
use crate::container::{Bean, ContainerError, Managed};
use crate::convert::{Converter, DefaultConverter};
use crate::definition::{AliasDefinition, BeanDefinition, BeanListDefinition, InitHook};
use crate::key::TypeKey;
use crate::util::any::downcast_arc;

/// Handle to a bean container.
///
/// Cheap to clone; every clone refers to the same container. Definitions
/// are registered from a single thread before [`init`](Self::init), after
/// which lookups and on-demand creation are safe from any thread.
#[derive(Clone)]
pub struct BeanContainer {
    core: Arc<ContainerCore>,
}

impl BeanContainer {
    /// A container with an empty configuration and the default converter.
    pub fn new() -> Self {
        Self::with_capabilities(Arc::new(MapConfig::new()), Arc::new(DefaultConverter))
    }

    pub fn with_capabilities(
        config: Arc<dyn ConfigSource>,
        converter: Arc<dyn Converter>,
    ) -> Self {
        Self {
            core: Arc::new(ContainerCore::new(config, converter)),
        }
    }

    pub(crate) fn from_core(core: Arc<ContainerCore>) -> Self {
        Self { core }
    }

    pub fn register(&self, definition: BeanDefinition) -> Result<(), DefinitionError> {
        self.core.register(definition)
    }

    pub fn register_alias(&self, alias: AliasDefinition) -> Result<(), DefinitionError> {
        self.core.register_alias(alias)
    }

    pub fn register_bean_list(&self, list: BeanListDefinition) -> Result<(), DefinitionError> {
        self.core.register_bean_list(list)
    }

    pub fn register_init_hook(&self, hook: InitHook) -> Result<(), DefinitionError> {
        self.core.register_init_hook(hook)
    }

    /// Validates aliases, runs init hooks, discovers post-processors and
    /// factories, then eagerly creates every non-lazy singleton. Fails
    /// when called twice.
    pub fn init(&self) -> Result<(), ContainerError> {
        self.core.init()
    }

    /// Destroys every live singleton. Idempotent; destruction failures are
    /// logged per bean and never abort the sweep.
    pub fn close(&self) {
        self.core.close();
    }

    /// Closes the container when the returned guard is dropped.
    pub fn shutdown_guard(&self) -> ShutdownGuard {
        ShutdownGuard {
            container: self.clone(),
        }
    }

    pub fn get_bean(&self, id: &str) -> Result<Bean, ContainerError> {
        self.core.get_bean_by_id(id)
    }

    pub fn try_get_bean(&self, id: &str) -> Result<Option<Bean>, ContainerError> {
        match self.core.get_bean_by_id(id) {
            Ok(bean) => Ok(Some(bean)),
            Err(ContainerError::NoSuchBean { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn get_bean_by_type(&self, key: TypeKey) -> Result<Bean, ContainerError> {
        self.core.get_bean_by_type(key)
    }

    pub fn try_get_bean_by_type(&self, key: TypeKey) -> Result<Option<Bean>, ContainerError> {
        match self.core.get_bean_by_type(key) {
            Ok(bean) => Ok(Some(bean)),
            Err(ContainerError::NoSuchBean { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn get_bean_named(&self, key: TypeKey, name: &str) -> Result<Bean, ContainerError> {
        self.core.get_bean_named(key, name)
    }

    pub fn try_get_bean_named(
        &self,
        key: TypeKey,
        name: &str,
    ) -> Result<Option<Bean>, ContainerError> {
        match self.core.get_bean_named(key, name) {
            Ok(bean) => Ok(Some(bean)),
            Err(ContainerError::NoSuchBean { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Typed lookup by type, downcast to the concrete bean type.
    pub fn get<T: Managed>(&self) -> Result<Arc<T>, ContainerError> {
        let key = TypeKey::of::<T>();
        let bean = self.core.get_bean_by_type(key)?;
        downcast_arc::<T>(&bean).ok_or_else(|| ContainerError::NoSuchBean {
            selector: key.to_string(),
        })
    }

    pub fn get_named<T: Managed>(&self, name: &str) -> Result<Arc<T>, ContainerError> {
        let key = TypeKey::of::<T>();
        let bean = self.core.get_bean_named(key, name)?;
        downcast_arc::<T>(&bean).ok_or_else(|| ContainerError::NoSuchBean {
            selector: format!("{key}@{name}"),
        })
    }

    /// Constructs a fresh instance, bypassing the singleton cache even for
    /// singleton definitions.
    pub fn create_bean(&self, id: &str) -> Result<Bean, ContainerError> {
        self.core.create_bean_by_id(id)
    }

    pub fn create_bean_by_type(&self, key: TypeKey) -> Result<Bean, ContainerError> {
        self.core.create_bean_by_type(key)
    }

    /// Every instance of the type, optionally narrowed to a qualifier;
    /// memoized per key.
    pub fn get_beans(
        &self,
        key: TypeKey,
        qualifier: Option<&str>,
    ) -> Result<Arc<Vec<Bean>>, ContainerError> {
        self.core.beans_of(key, qualifier)
    }

    /// Every (name, instance) pair of the type, ordered by name.
    pub fn get_named_beans(&self, key: TypeKey) -> Result<Vec<(String, Bean)>, ContainerError> {
        self.core.named_beans(key)
    }

    pub fn is_singleton(&self, id: &str) -> Result<bool, ContainerError> {
        self.core.is_singleton_id(id)
    }

    pub fn is_singleton_named(
        &self,
        key: TypeKey,
        name: Option<&str>,
    ) -> Result<bool, ContainerError> {
        self.core.is_singleton_named(key, name)
    }

    /// A deferred handle resolving on first access.
    pub fn lazy(&self, spec: LazySpec) -> LazyBean {
        LazyBean::new(Arc::clone(&self.core), spec)
    }

    /// A deferred handle to every bean of the type.
    pub fn lazy_list(
        &self,
        key: TypeKey,
        qualifier: Option<&str>,
        not_empty: bool,
    ) -> LazyBeanList {
        LazyBeanList::new(
            Arc::clone(&self.core),
            key,
            qualifier.map(str::to_owned),
            not_empty,
        )
    }
}

/// Closes its container on drop; the shutdown hook in guard form.
pub struct ShutdownGuard {
    container: BeanContainer,
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        self.container.close();
    }
}
