use std::sync::Arc;

use crate::config::resolve_placeholders;
use crate::container::core::ContainerCore;
use crate::container::ContainerError;
use crate::convert::TargetType;
use crate::value::{BeanValue, DefinedValue, Resolution, ValueDefinition, ValueSupplier};

enum Computed {
    Value(BeanValue),
    Supplier(ValueSupplier),
}

/// Turns value definitions into runtime values, memoizing every outcome in
/// the definition's resolution cell.
///
/// The cell lock is held across a fresh computation, so the construction
/// of a collection value runs exactly once even under concurrent first
/// access. Cached suppliers are invoked outside the lock.
pub(crate) struct ValueResolver<'a> {
    core: &'a Arc<ContainerCore>,
}

impl<'a> ValueResolver<'a> {
    pub(crate) fn new(core: &'a Arc<ContainerCore>) -> Self {
        Self { core }
    }

    pub(crate) fn resolve(
        &self,
        value: &ValueDefinition,
        default: Option<&str>,
    ) -> Result<BeanValue, ContainerError> {
        let mut cell = value.cell().lock();
        match &*cell {
            Resolution::Value(cached) => Ok(cached.clone()),
            Resolution::Supplier(supplier) => {
                let supplier = Arc::clone(supplier);
                drop(cell);
                supplier(self.core)
            }
            Resolution::Unresolved => match self.compute(value, default)? {
                Computed::Value(resolved) => {
                    *cell = Resolution::Value(resolved.clone());
                    Ok(resolved)
                }
                Computed::Supplier(supplier) => {
                    *cell = Resolution::Supplier(Arc::clone(&supplier));
                    drop(cell);
                    supplier(self.core)
                }
            },
        }
    }

    fn compute(
        &self,
        value: &ValueDefinition,
        default: Option<&str>,
    ) -> Result<Computed, ContainerError> {
        match value.value() {
            None => {
                let resolved = match default {
                    Some(text) => {
                        let text = resolve_placeholders(text, self.core.config().as_ref())
                            .map_err(|source| ContainerError::Config { source })?;
                        self.convert(BeanValue::Str(text), value.target())?
                    }
                    None => BeanValue::Null,
                };
                Ok(Computed::Value(resolved))
            }
            Some(DefinedValue::Literal(BeanValue::Str(text))) => {
                let text = resolve_placeholders(text, self.core.config().as_ref())
                    .map_err(|source| ContainerError::Config { source })?;
                let resolved = self.convert(BeanValue::Str(text), value.target())?;
                Ok(Computed::Value(resolved))
            }
            Some(DefinedValue::Literal(literal)) => {
                let resolved = self.convert(literal.clone(), value.target())?;
                Ok(Computed::Value(resolved))
            }
            Some(DefinedValue::Reference(reference)) => {
                let target = self.core.bind_reference(reference)?;
                Ok(Computed::Supplier(Arc::new(move |core| {
                    core.get_or_create(&target).map(BeanValue::Bean)
                })))
            }
            Some(DefinedValue::Definition(nested)) => {
                let nested = Arc::clone(nested);
                Ok(Computed::Supplier(Arc::new(move |core| {
                    core.get_or_create(&nested).map(BeanValue::Bean)
                })))
            }
            Some(DefinedValue::List(elements)) => {
                let mut resolved = Vec::with_capacity(elements.len());
                for element in elements {
                    let item = self.resolve(element, None)?;
                    resolved.push(self.convert(item, value.element())?);
                }
                Ok(Computed::Value(BeanValue::List(resolved)))
            }
            Some(DefinedValue::Map(pairs)) => {
                let mut resolved = Vec::with_capacity(pairs.len());
                for (key, entry) in pairs {
                    let key = self.convert(self.resolve(key, None)?, value.key_type())?;
                    let entry = self.convert(self.resolve(entry, None)?, value.element())?;
                    resolved.push((key, entry));
                }
                Ok(Computed::Value(BeanValue::Map(resolved)))
            }
        }
    }

    fn convert(
        &self,
        value: BeanValue,
        target: Option<&TargetType>,
    ) -> Result<BeanValue, ContainerError> {
        match target {
            None | Some(TargetType::Any) => Ok(value),
            Some(target) => self
                .core
                .converter()
                .convert(value, target)
                .map_err(|source| ContainerError::Conversion { source }),
        }
    }
}
