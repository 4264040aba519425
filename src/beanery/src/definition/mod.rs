mod reference;

use std::error::Error;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::class::BeanClass;
use crate::key::TypeKey;
use crate::value::ValueDefinition;

pub use reference::{AliasDefinition, BeanListDefinition, BeanReference, RefTarget};

/// Identity of a registered definition, stable for its whole lifetime.
pub(crate) type DefinitionId = usize;

pub(crate) fn definition_id(definition: &Arc<BeanDefinition>) -> DefinitionId {
    Arc::as_ptr(definition) as *const () as usize
}

/// Secondary (type, name) identity the same instance satisfies.
#[derive(Debug, Clone)]
pub struct SecondaryType {
    pub type_key: TypeKey,
    pub name: Option<String>,
}

/// Explicit property assignment applied after construction.
#[derive(Debug)]
pub struct PropertyDefinition {
    pub name: String,
    pub value: ValueDefinition,
}

/// Declared method invocation executed after properties are set.
#[derive(Debug)]
pub struct MethodInvocation {
    pub method: String,
    pub args: Vec<ValueDefinition>,
}

/// One-shot initialization callback executed during container startup,
/// before any bean is created.
pub struct InitHook {
    name: &'static str,
    hook: Box<dyn Fn() -> Result<(), Box<dyn Error + Send + Sync>> + Send + Sync>,
}

impl InitHook {
    pub fn new<F>(name: &'static str, hook: F) -> Self
    where
        F: Fn() -> Result<(), Box<dyn Error + Send + Sync>> + Send + Sync + 'static,
    {
        Self {
            name,
            hook: Box::new(hook),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        (self.hook)()
    }
}

impl Debug for InitHook {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("InitHook").field("name", &self.name).finish_non_exhaustive()
    }
}

/// The declarative blueprint a bean is created from.
///
/// Built by loaders through [`BeanDefinitionBuilder`] and immutable once
/// registered, apart from the `inited` flag the creation engine sets.
pub struct BeanDefinition {
    id: Option<String>,
    name: Option<String>,
    type_key: TypeKey,
    class: Option<Arc<BeanClass>>,
    primary: bool,
    singleton: bool,
    lazy_init: bool,
    overriding: bool,
    qualifiers: Vec<String>,
    sort_order: i32,
    source: Option<String>,
    value: Option<ValueDefinition>,
    constructor_args: Vec<ValueDefinition>,
    properties: Vec<PropertyDefinition>,
    invocations: Vec<MethodInvocation>,
    init_method: Option<String>,
    destroy_method: Option<String>,
    factory_for: Vec<TypeKey>,
    secondary_types: Vec<SecondaryType>,
    inited: AtomicBool,
}

impl BeanDefinition {
    pub fn builder(type_key: TypeKey) -> BeanDefinitionBuilder {
        BeanDefinitionBuilder::new(type_key)
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    pub fn class(&self) -> Option<&Arc<BeanClass>> {
        self.class.as_ref()
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn is_singleton(&self) -> bool {
        self.singleton
    }

    pub fn is_lazy_init(&self) -> bool {
        self.lazy_init
    }

    pub fn is_overriding(&self) -> bool {
        self.overriding
    }

    pub fn qualifiers(&self) -> &[String] {
        &self.qualifiers
    }

    pub fn has_qualifier(&self, qualifier: &str) -> bool {
        self.qualifiers.iter().any(|q| q == qualifier)
    }

    pub fn sort_order(&self) -> i32 {
        self.sort_order
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn value(&self) -> Option<&ValueDefinition> {
        self.value.as_ref()
    }

    pub fn constructor_args(&self) -> &[ValueDefinition] {
        &self.constructor_args
    }

    pub fn properties(&self) -> &[PropertyDefinition] {
        &self.properties
    }

    pub fn invocations(&self) -> &[MethodInvocation] {
        &self.invocations
    }

    pub fn init_method(&self) -> Option<&str> {
        self.init_method.as_deref()
    }

    pub fn destroy_method(&self) -> Option<&str> {
        self.destroy_method.as_deref()
    }

    pub fn factory_for(&self) -> &[TypeKey] {
        &self.factory_for
    }

    pub fn secondary_types(&self) -> &[SecondaryType] {
        &self.secondary_types
    }

    pub fn is_inited(&self) -> bool {
        self.inited.load(Ordering::Acquire)
    }

    pub(crate) fn mark_inited(&self) {
        self.inited.store(true, Ordering::Release);
    }

    /// Best identifier for diagnostics: the id, else the (type, name)
    /// pair, else the declared type name.
    pub fn diagnostic_name(&self) -> String {
        if let Some(id) = &self.id {
            id.clone()
        } else if let Some(name) = &self.name {
            format!("{}@{name}", self.type_key)
        } else {
            self.type_key.to_string()
        }
    }
}

impl Debug for BeanDefinition {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("BeanDefinition")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("type_key", &self.type_key)
            .field("primary", &self.primary)
            .field("singleton", &self.singleton)
            .field("lazy_init", &self.lazy_init)
            .finish_non_exhaustive()
    }
}

/// Builder for [`BeanDefinition`].
pub struct BeanDefinitionBuilder {
    definition: BeanDefinition,
}

impl BeanDefinitionBuilder {
    fn new(type_key: TypeKey) -> Self {
        Self {
            definition: BeanDefinition {
                id: None,
                name: None,
                type_key,
                class: None,
                primary: false,
                singleton: true,
                lazy_init: false,
                overriding: false,
                qualifiers: Vec::new(),
                sort_order: 0,
                source: None,
                value: None,
                constructor_args: Vec::new(),
                properties: Vec::new(),
                invocations: Vec::new(),
                init_method: None,
                destroy_method: None,
                factory_for: Vec::new(),
                secondary_types: Vec::new(),
                inited: AtomicBool::new(false),
            },
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.definition.id = Some(id.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.definition.name = Some(name.into());
        self
    }

    pub fn class(mut self, class: Arc<BeanClass>) -> Self {
        self.definition.class = Some(class);
        self
    }

    pub fn primary(mut self) -> Self {
        self.definition.primary = true;
        self
    }

    /// Marks the definition as non-singleton: every request constructs a
    /// fresh instance.
    pub fn prototype(mut self) -> Self {
        self.definition.singleton = false;
        self
    }

    pub fn lazy_init(mut self) -> Self {
        self.definition.lazy_init = true;
        self
    }

    pub fn overriding(mut self) -> Self {
        self.definition.overriding = true;
        self
    }

    pub fn qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.definition.qualifiers.push(qualifier.into());
        self
    }

    pub fn sort_order(mut self, sort_order: i32) -> Self {
        self.definition.sort_order = sort_order;
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.definition.source = Some(source.into());
        self
    }

    pub fn value(mut self, value: ValueDefinition) -> Self {
        self.definition.value = Some(value);
        self
    }

    pub fn constructor_arg(mut self, arg: ValueDefinition) -> Self {
        self.definition.constructor_args.push(arg);
        self
    }

    pub fn property(mut self, name: impl Into<String>, value: ValueDefinition) -> Self {
        self.definition.properties.push(PropertyDefinition {
            name: name.into(),
            value,
        });
        self
    }

    pub fn invocation(mut self, method: impl Into<String>, args: Vec<ValueDefinition>) -> Self {
        self.definition.invocations.push(MethodInvocation {
            method: method.into(),
            args,
        });
        self
    }

    pub fn init_method(mut self, method: impl Into<String>) -> Self {
        self.definition.init_method = Some(method.into());
        self
    }

    pub fn destroy_method(mut self, method: impl Into<String>) -> Self {
        self.definition.destroy_method = Some(method.into());
        self
    }

    pub fn factory_for(mut self, target: TypeKey) -> Self {
        self.definition.factory_for.push(target);
        self
    }

    pub fn secondary_type(mut self, type_key: TypeKey, name: Option<&str>) -> Self {
        self.definition.secondary_types.push(SecondaryType {
            type_key,
            name: name.map(str::to_owned),
        });
        self
    }

    pub fn build(self) -> BeanDefinition {
        self.definition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_to_eager_singleton() {
        let definition = BeanDefinition::builder(TypeKey::of::<String>()).build();

        assert!(definition.is_singleton());
        assert!(!definition.is_lazy_init());
        assert!(!definition.is_primary());
        assert!(!definition.is_inited());
    }

    #[test]
    fn diagnostic_name_prefers_the_id() {
        let definition = BeanDefinition::builder(TypeKey::of::<String>())
            .id("greeter")
            .name("aside")
            .build();
        assert_eq!(definition.diagnostic_name(), "greeter");

        let definition = BeanDefinition::builder(TypeKey::of::<String>())
            .name("aside")
            .build();
        assert_eq!(
            definition.diagnostic_name(),
            "alloc::string::String@aside"
        );

        let definition = BeanDefinition::builder(TypeKey::of::<String>()).build();
        assert_eq!(definition.diagnostic_name(), "alloc::string::String");
    }

    #[test]
    fn definition_id_is_stable_per_arc() {
        let definition = Arc::new(BeanDefinition::builder(TypeKey::of::<String>()).build());
        let other = Arc::new(BeanDefinition::builder(TypeKey::of::<String>()).build());

        assert_eq!(definition_id(&definition), definition_id(&Arc::clone(&definition)));
        assert_ne!(definition_id(&definition), definition_id(&other));
    }
}
