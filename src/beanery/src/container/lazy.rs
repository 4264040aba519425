use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::container::core::ContainerCore;
use crate::container::{Bean, ContainerError, Managed};
use crate::key::TypeKey;
use crate::util::any::downcast_arc;

/// Lookup contract of a deferred bean handle.
#[derive(Debug, Clone)]
pub struct LazySpec {
    pub type_key: TypeKey,
    pub name: Option<String>,
    pub qualifier: Option<String>,
    pub required: bool,
    pub nullable: bool,
    pub named_or_primary: bool,
}

impl LazySpec {
    pub fn of(type_key: TypeKey) -> Self {
        Self {
            type_key,
            name: None,
            qualifier: None,
            required: true,
            nullable: false,
            named_or_primary: false,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn qualified(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    pub fn named_or_primary(mut self) -> Self {
        self.named_or_primary = true;
        self
    }

    /// Relaxes both the required and the non-null contracts.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self.nullable = true;
        self
    }
}

/// A deferred, memoized handle to a single bean.
///
/// The underlying lookup runs on the first access only; every later call
/// reuses the outcome, success or failure.
pub struct LazyBean {
    core: Arc<ContainerCore>,
    spec: LazySpec,
    cell: Mutex<Option<Result<Option<Bean>, ContainerError>>>,
}

impl LazyBean {
    pub(crate) fn new(core: Arc<ContainerCore>, spec: LazySpec) -> Self {
        Self {
            core,
            spec,
            cell: Mutex::new(None),
        }
    }

    pub fn spec(&self) -> &LazySpec {
        &self.spec
    }

    pub fn get(&self) -> Result<Bean, ContainerError> {
        match self.try_get()? {
            Some(bean) => Ok(bean),
            None => Err(ContainerError::NullBean {
                type_name: self.spec.type_key.name().to_owned(),
            }),
        }
    }

    pub fn get_as<T: Managed>(&self) -> Result<Arc<T>, ContainerError> {
        let bean = self.get()?;
        downcast_arc::<T>(&bean).ok_or_else(|| ContainerError::NoSuchBean {
            selector: self.spec.type_key.to_string(),
        })
    }

    pub fn try_get(&self) -> Result<Option<Bean>, ContainerError> {
        let mut cell = self.cell.lock();
        if let Some(outcome) = &*cell {
            return outcome.clone();
        }
        let outcome = self.resolve_once();
        *cell = Some(outcome.clone());
        outcome
    }

    fn resolve_once(&self) -> Result<Option<Bean>, ContainerError> {
        match self.core.lookup_lazy(&self.spec)? {
            Some(bean) => Ok(Some(bean)),
            None if self.spec.required => Err(ContainerError::EmptyBean {
                type_name: self.spec.type_key.name().to_owned(),
            }),
            None if !self.spec.nullable => Err(ContainerError::NullBean {
                type_name: self.spec.type_key.name().to_owned(),
            }),
            None => Ok(None),
        }
    }
}

impl Debug for LazyBean {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("LazyBean")
            .field("spec", &self.spec)
            .field("resolved", &self.cell.lock().is_some())
            .finish()
    }
}

/// A deferred, memoized handle to every bean of one type.
pub struct LazyBeanList {
    core: Arc<ContainerCore>,
    type_key: TypeKey,
    qualifier: Option<String>,
    not_empty: bool,
    cell: Mutex<Option<Result<Arc<Vec<Bean>>, ContainerError>>>,
}

impl LazyBeanList {
    pub(crate) fn new(
        core: Arc<ContainerCore>,
        type_key: TypeKey,
        qualifier: Option<String>,
        not_empty: bool,
    ) -> Self {
        Self {
            core,
            type_key,
            qualifier,
            not_empty,
            cell: Mutex::new(None),
        }
    }

    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    pub fn get(&self) -> Result<Arc<Vec<Bean>>, ContainerError> {
        let mut cell = self.cell.lock();
        if let Some(outcome) = &*cell {
            return outcome.clone();
        }
        let outcome = self.resolve_once();
        *cell = Some(outcome.clone());
        outcome
    }

    fn resolve_once(&self) -> Result<Arc<Vec<Bean>>, ContainerError> {
        let beans = self
            .core
            .beans_of(self.type_key, self.qualifier.as_deref())?;
        if self.not_empty && beans.is_empty() {
            return Err(ContainerError::EmptyBean {
                type_name: self.type_key.name().to_owned(),
            });
        }
        Ok(beans)
    }
}

impl Debug for LazyBeanList {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("LazyBeanList")
            .field("type_key", &self.type_key)
            .field("qualifier", &self.qualifier)
            .field("resolved", &self.cell.lock().is_some())
            .finish()
    }
}
