use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use snafu::prelude::*;

use crate::definition::{AliasDefinition, BeanDefinition, BeanListDefinition, InitHook, RefTarget};
use crate::key::TypeKey;

#[derive(Debug, Clone, Snafu)]
#[non_exhaustive]
pub enum DefinitionError {
    #[snafu(display("a definition with id {id} is already registered"))]
    #[non_exhaustive]
    DuplicateId { id: String },
    #[snafu(display("a definition named {name} of type {type_name} is already registered"))]
    #[non_exhaustive]
    DuplicateName { type_name: String, name: String },
    #[snafu(display("type {type_name} already has a primary definition"))]
    #[non_exhaustive]
    DuplicatePrimary { type_name: String },
    #[snafu(display("alias {alias} is already registered"))]
    #[non_exhaustive]
    DuplicateAlias { alias: String },
    #[snafu(display("a bean list for {key} is already registered"))]
    #[non_exhaustive]
    DuplicateBeanList { key: String },
    #[snafu(display("alias {alias} does not resolve to any definition"))]
    #[non_exhaustive]
    DanglingAlias { alias: String },
    #[snafu(display("alias {alias} collides with an existing definition"))]
    #[non_exhaustive]
    AliasCollision { alias: String },
    #[snafu(display("definition {bean} declares {declared} but its class implements {actual}"))]
    #[non_exhaustive]
    TypeMismatch {
        bean: String,
        declared: String,
        actual: String,
    },
    #[snafu(display("the registry no longer accepts definitions once the container initializes"))]
    RegistryFrozen,
    #[snafu(display("the container is already initialized"))]
    AlreadyInitialized,
}

/// Write-once index of every registered definition.
///
/// Append-only until the container initializes, at which point the
/// structure freezes; lookups stay valid afterwards while instances keep
/// being created on demand.
pub(crate) struct DefinitionRegistry {
    ordered: Vec<Arc<BeanDefinition>>,
    by_id: HashMap<String, Arc<BeanDefinition>>,
    by_type_name: HashMap<(TypeId, String), Arc<BeanDefinition>>,
    primary: HashMap<TypeId, Arc<BeanDefinition>>,
    by_type: HashMap<TypeId, Vec<Arc<BeanDefinition>>>,
    aliases: HashMap<String, AliasDefinition>,
    bean_lists: HashMap<(TypeId, Option<String>), Arc<BeanListDefinition>>,
    init_hooks: Vec<InitHook>,
    frozen: bool,
}

impl DefinitionRegistry {
    pub(crate) fn new() -> Self {
        Self {
            ordered: Vec::new(),
            by_id: HashMap::new(),
            by_type_name: HashMap::new(),
            primary: HashMap::new(),
            by_type: HashMap::new(),
            aliases: HashMap::new(),
            bean_lists: HashMap::new(),
            init_hooks: Vec::new(),
            frozen: false,
        }
    }

    fn ensure_open(&self) -> Result<(), DefinitionError> {
        if self.frozen {
            Err(DefinitionError::RegistryFrozen)
        } else {
            Ok(())
        }
    }

    /// Every (type, name) pair the definition is reachable under.
    fn identity_pairs(definition: &BeanDefinition) -> Vec<(TypeKey, Option<&str>)> {
        let mut pairs = vec![(definition.type_key(), definition.name())];
        for secondary in definition.secondary_types() {
            pairs.push((secondary.type_key, secondary.name.as_deref()));
        }
        pairs
    }

    pub(crate) fn register(
        &mut self,
        definition: BeanDefinition,
    ) -> Result<Arc<BeanDefinition>, DefinitionError> {
        self.ensure_open()?;

        if let (Some(class), None) = (definition.class(), definition.value()) {
            if class.type_key().id() != definition.type_key().id() {
                return Err(DefinitionError::TypeMismatch {
                    bean: definition.diagnostic_name(),
                    declared: definition.type_key().to_string(),
                    actual: class.type_key().to_string(),
                });
            }
        }

        let definition = Arc::new(definition);
        let pairs = Self::identity_pairs(&definition);

        // Validate every collision before touching any index, so a failed
        // registration leaves the registry untouched.
        if !definition.is_overriding() {
            if let Some(id) = definition.id() {
                if self.by_id.contains_key(id) {
                    return Err(DefinitionError::DuplicateId { id: id.to_owned() });
                }
            }
            for (type_key, name) in &pairs {
                if let Some(name) = name {
                    if self
                        .by_type_name
                        .contains_key(&(type_key.id(), (*name).to_owned()))
                    {
                        return Err(DefinitionError::DuplicateName {
                            type_name: type_key.to_string(),
                            name: (*name).to_owned(),
                        });
                    }
                }
            }
            if definition.is_primary() && self.primary.contains_key(&definition.type_key().id()) {
                return Err(DefinitionError::DuplicatePrimary {
                    type_name: definition.type_key().to_string(),
                });
            }
        } else {
            if let Some(id) = definition.id() {
                if let Some(existing) = self.by_id.get(id).cloned() {
                    self.remove(&existing);
                }
            }
            for (type_key, name) in &pairs {
                if let Some(name) = name {
                    let key = (type_key.id(), (*name).to_owned());
                    if let Some(existing) = self.by_type_name.get(&key).cloned() {
                        self.remove(&existing);
                    }
                }
            }
        }

        if let Some(id) = definition.id() {
            self.by_id.insert(id.to_owned(), Arc::clone(&definition));
        }
        for (type_key, name) in Self::identity_pairs(&definition) {
            if let Some(name) = name {
                self.by_type_name
                    .insert((type_key.id(), name.to_owned()), Arc::clone(&definition));
            }
            self.by_type
                .entry(type_key.id())
                .or_default()
                .push(Arc::clone(&definition));
        }
        if definition.is_primary() {
            self.primary
                .insert(definition.type_key().id(), Arc::clone(&definition));
        }
        self.ordered.push(Arc::clone(&definition));
        Ok(definition)
    }

    /// Drops `existing` from every index it was reachable under.
    fn remove(&mut self, existing: &Arc<BeanDefinition>) {
        if let Some(id) = existing.id() {
            if self
                .by_id
                .get(id)
                .is_some_and(|def| Arc::ptr_eq(def, existing))
            {
                self.by_id.remove(id);
            }
        }
        for (type_key, name) in Self::identity_pairs(existing) {
            if let Some(name) = name {
                let key = (type_key.id(), name.to_owned());
                if self
                    .by_type_name
                    .get(&key)
                    .is_some_and(|def| Arc::ptr_eq(def, existing))
                {
                    self.by_type_name.remove(&key);
                }
            }
            if let Some(slot) = self.by_type.get_mut(&type_key.id()) {
                slot.retain(|def| !Arc::ptr_eq(def, existing));
            }
        }
        if self
            .primary
            .get(&existing.type_key().id())
            .is_some_and(|def| Arc::ptr_eq(def, existing))
        {
            self.primary.remove(&existing.type_key().id());
        }
        self.ordered.retain(|def| !Arc::ptr_eq(def, existing));
    }

    pub(crate) fn register_alias(&mut self, alias: AliasDefinition) -> Result<(), DefinitionError> {
        self.ensure_open()?;
        if self.aliases.contains_key(alias.alias()) {
            return Err(DefinitionError::DuplicateAlias {
                alias: alias.alias().to_owned(),
            });
        }
        self.aliases.insert(alias.alias().to_owned(), alias);
        Ok(())
    }

    pub(crate) fn register_bean_list(
        &mut self,
        list: BeanListDefinition,
    ) -> Result<(), DefinitionError> {
        self.ensure_open()?;
        let key = (list.type_key().id(), list.qualifier().map(str::to_owned));
        if self.bean_lists.contains_key(&key) {
            return Err(DefinitionError::DuplicateBeanList {
                key: match list.qualifier() {
                    Some(qualifier) => format!("{}[{qualifier}]", list.type_key()),
                    None => list.type_key().to_string(),
                },
            });
        }
        self.bean_lists.insert(key, Arc::new(list));
        Ok(())
    }

    pub(crate) fn register_init_hook(&mut self, hook: InitHook) -> Result<(), DefinitionError> {
        self.ensure_open()?;
        self.init_hooks.push(hook);
        Ok(())
    }

    pub(crate) fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Every alias must resolve to a registered definition in one hop, and
    /// must not shadow a definition's own id or name.
    pub(crate) fn validate_aliases(&self) -> Result<(), DefinitionError> {
        for alias in self.aliases.values() {
            if self.by_id.contains_key(alias.alias())
                || self
                    .ordered
                    .iter()
                    .any(|def| def.name() == Some(alias.alias()))
            {
                return Err(DefinitionError::AliasCollision {
                    alias: alias.alias().to_owned(),
                });
            }
            if self.resolve_target(alias.target()).is_none() {
                return Err(DefinitionError::DanglingAlias {
                    alias: alias.alias().to_owned(),
                });
            }
        }
        Ok(())
    }

    fn resolve_target(&self, target: &RefTarget) -> Option<Arc<BeanDefinition>> {
        match target {
            RefTarget::Id(id) => self.by_id.get(id).cloned(),
            RefTarget::TypeNamed(type_key, name) => self
                .by_type_name
                .get(&(type_key.id(), name.clone()))
                .cloned(),
        }
    }

    /// Lookup by id, falling through an alias when the id names one.
    pub(crate) fn lookup_id(&self, id: &str) -> Option<Arc<BeanDefinition>> {
        if let Some(definition) = self.by_id.get(id) {
            return Some(Arc::clone(definition));
        }
        self.aliases
            .get(id)
            .and_then(|alias| self.resolve_target(alias.target()))
    }

    /// Lookup by type: the explicit primary, else the unique candidate.
    pub(crate) fn lookup_type(&self, key: TypeKey) -> Option<Arc<BeanDefinition>> {
        if let Some(definition) = self.primary.get(&key.id()) {
            return Some(Arc::clone(definition));
        }
        match self.by_type.get(&key.id()) {
            Some(candidates) if candidates.len() == 1 => Some(Arc::clone(&candidates[0])),
            _ => None,
        }
    }

    /// Lookup by (type, name), falling through an alias whose target
    /// satisfies the type.
    pub(crate) fn lookup_type_named(
        &self,
        key: TypeKey,
        name: &str,
    ) -> Option<Arc<BeanDefinition>> {
        if let Some(definition) = self.by_type_name.get(&(key.id(), name.to_owned())) {
            return Some(Arc::clone(definition));
        }
        self.aliases
            .get(name)
            .and_then(|alias| self.resolve_target(alias.target()))
            .filter(|definition| {
                definition.type_key().id() == key.id()
                    || definition
                        .secondary_types()
                        .iter()
                        .any(|secondary| secondary.type_key.id() == key.id())
            })
    }

    /// Every definition of the type, ordered by sort order then insertion.
    pub(crate) fn definitions_of(&self, key: TypeKey) -> Vec<Arc<BeanDefinition>> {
        let mut definitions = self.by_type.get(&key.id()).cloned().unwrap_or_default();
        definitions.sort_by_key(|definition| definition.sort_order());
        definitions
    }

    pub(crate) fn bean_list(
        &self,
        key: TypeKey,
        qualifier: Option<&str>,
    ) -> Option<Arc<BeanListDefinition>> {
        self.bean_lists
            .get(&(key.id(), qualifier.map(str::to_owned)))
            .cloned()
    }

    /// Every (name, definition) pair of the type, ordered by name.
    pub(crate) fn named_of_type(&self, key: TypeKey) -> Vec<(String, Arc<BeanDefinition>)> {
        let mut named: Vec<_> = self
            .by_type_name
            .iter()
            .filter(|((type_id, _), _)| *type_id == key.id())
            .map(|((_, name), definition)| (name.clone(), Arc::clone(definition)))
            .collect();
        named.sort_by(|(a, _), (b, _)| a.cmp(b));
        named
    }

    pub(crate) fn ordered(&self) -> &[Arc<BeanDefinition>] {
        &self.ordered
    }

    pub(crate) fn take_init_hooks(&mut self) -> Vec<InitHook> {
        std::mem::take(&mut self.init_hooks)
    }
}

#[cfg(test)]
mod tests {
    use crate::definition::BeanDefinition;

    use super::*;

    struct Widget;
    struct Gadget;

    fn widget(id: &str) -> BeanDefinition {
        BeanDefinition::builder(TypeKey::of::<Widget>()).id(id).build()
    }

    #[test]
    fn register_fails_when_id_is_duplicated() {
        let mut registry = DefinitionRegistry::new();
        let first = registry.register(widget("w")).unwrap();

        assert!(matches!(
            registry.register(widget("w")),
            Err(DefinitionError::DuplicateId { .. })
        ));
        // The first registration stays in place.
        assert!(Arc::ptr_eq(&registry.lookup_id("w").unwrap(), &first));
        assert_eq!(registry.definitions_of(TypeKey::of::<Widget>()).len(), 1);
    }

    #[test]
    fn register_fails_when_type_name_pair_is_duplicated() {
        let mut registry = DefinitionRegistry::new();
        registry
            .register(
                BeanDefinition::builder(TypeKey::of::<Widget>())
                    .name("left")
                    .build(),
            )
            .unwrap();

        assert!(matches!(
            registry.register(
                BeanDefinition::builder(TypeKey::of::<Widget>())
                    .name("left")
                    .build()
            ),
            Err(DefinitionError::DuplicateName { .. })
        ));
    }

    #[test]
    fn register_fails_when_primary_is_duplicated() {
        let mut registry = DefinitionRegistry::new();
        registry
            .register(
                BeanDefinition::builder(TypeKey::of::<Widget>())
                    .id("a")
                    .primary()
                    .build(),
            )
            .unwrap();

        assert!(matches!(
            registry.register(
                BeanDefinition::builder(TypeKey::of::<Widget>())
                    .id("b")
                    .primary()
                    .build()
            ),
            Err(DefinitionError::DuplicatePrimary { .. })
        ));
    }

    #[test]
    fn register_succeeds_when_overriding_replaces_the_collision() {
        let mut registry = DefinitionRegistry::new();
        registry.register(widget("w")).unwrap();

        let replacement = registry
            .register(
                BeanDefinition::builder(TypeKey::of::<Widget>())
                    .id("w")
                    .overriding()
                    .build(),
            )
            .unwrap();

        assert!(Arc::ptr_eq(&registry.lookup_id("w").unwrap(), &replacement));
        assert_eq!(registry.definitions_of(TypeKey::of::<Widget>()).len(), 1);
        assert_eq!(registry.ordered().len(), 1);
    }

    #[test]
    fn register_fails_when_registry_is_frozen() {
        let mut registry = DefinitionRegistry::new();
        registry.freeze();

        assert!(matches!(
            registry.register(widget("w")),
            Err(DefinitionError::RegistryFrozen)
        ));
    }

    #[test]
    fn lookup_type_returns_the_unique_candidate_or_the_primary() {
        let mut registry = DefinitionRegistry::new();
        let only = registry.register(widget("a")).unwrap();
        assert!(Arc::ptr_eq(
            &registry.lookup_type(TypeKey::of::<Widget>()).unwrap(),
            &only
        ));

        registry.register(widget("b")).unwrap();
        // Two candidates, no primary: ambiguous.
        assert!(registry.lookup_type(TypeKey::of::<Widget>()).is_none());

        let primary = registry
            .register(
                BeanDefinition::builder(TypeKey::of::<Widget>())
                    .id("c")
                    .primary()
                    .build(),
            )
            .unwrap();
        assert!(Arc::ptr_eq(
            &registry.lookup_type(TypeKey::of::<Widget>()).unwrap(),
            &primary
        ));
    }

    #[test]
    fn lookup_id_falls_through_aliases() {
        let mut registry = DefinitionRegistry::new();
        let definition = registry.register(widget("w")).unwrap();
        registry
            .register_alias(AliasDefinition::new("shortcut", RefTarget::Id("w".into())))
            .unwrap();

        assert!(Arc::ptr_eq(
            &registry.lookup_id("shortcut").unwrap(),
            &definition
        ));
    }

    #[test]
    fn lookup_type_named_covers_secondary_types() {
        let mut registry = DefinitionRegistry::new();
        let definition = registry
            .register(
                BeanDefinition::builder(TypeKey::of::<Widget>())
                    .id("w")
                    .secondary_type(TypeKey::of::<Gadget>(), Some("as-gadget"))
                    .build(),
            )
            .unwrap();

        assert!(Arc::ptr_eq(
            &registry
                .lookup_type_named(TypeKey::of::<Gadget>(), "as-gadget")
                .unwrap(),
            &definition
        ));
        assert_eq!(registry.definitions_of(TypeKey::of::<Gadget>()).len(), 1);
    }

    #[test]
    fn validate_aliases_fails_when_target_is_dangling() {
        let mut registry = DefinitionRegistry::new();
        registry
            .register_alias(AliasDefinition::new("x", RefTarget::Id("missing".into())))
            .unwrap();

        assert!(matches!(
            registry.validate_aliases(),
            Err(DefinitionError::DanglingAlias { .. })
        ));
    }

    #[test]
    fn validate_aliases_fails_when_alias_shadows_a_definition() {
        let mut registry = DefinitionRegistry::new();
        registry.register(widget("w")).unwrap();
        registry
            .register_alias(AliasDefinition::new("w", RefTarget::Id("w".into())))
            .unwrap();

        assert!(matches!(
            registry.validate_aliases(),
            Err(DefinitionError::AliasCollision { .. })
        ));
    }

    #[test]
    fn register_alias_fails_when_alias_is_duplicated() {
        let mut registry = DefinitionRegistry::new();
        registry
            .register_alias(AliasDefinition::new("x", RefTarget::Id("a".into())))
            .unwrap();

        assert!(matches!(
            registry.register_alias(AliasDefinition::new("x", RefTarget::Id("b".into()))),
            Err(DefinitionError::DuplicateAlias { .. })
        ));
    }

    #[test]
    fn definitions_of_orders_by_sort_order_then_insertion() {
        let mut registry = DefinitionRegistry::new();
        registry
            .register(
                BeanDefinition::builder(TypeKey::of::<Widget>())
                    .id("late")
                    .sort_order(10)
                    .build(),
            )
            .unwrap();
        registry
            .register(
                BeanDefinition::builder(TypeKey::of::<Widget>())
                    .id("early")
                    .sort_order(-10)
                    .build(),
            )
            .unwrap();
        registry
            .register(
                BeanDefinition::builder(TypeKey::of::<Widget>())
                    .id("middle")
                    .build(),
            )
            .unwrap();

        let ids: Vec<_> = registry
            .definitions_of(TypeKey::of::<Widget>())
            .iter()
            .map(|def| def.id().unwrap().to_owned())
            .collect();
        assert_eq!(ids, ["early", "middle", "late"]);
    }
}
