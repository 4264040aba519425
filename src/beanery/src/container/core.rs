use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use oneshot::Sender;
use parking_lot::{Mutex, RwLock, RwLockWriteGuard};
use tracing::{debug, info, warn};

use crate::capability::{BindContext, Factories, PostProcessor};
use crate::class::{BeanClass, InjectMetadata, Slot, SlotKind};
use crate::config::ConfigSource;
use crate::container::handle::BeanContainer;
use crate::container::lazy::{LazyBean, LazyBeanList, LazySpec};
use crate::container::registry::{DefinitionError, DefinitionRegistry};
use crate::container::resolver::ValueResolver;
use crate::container::{Bean, ContainerError};
use crate::convert::{Converter, TargetType};
use crate::definition::{
    definition_id, AliasDefinition, BeanDefinition, BeanListDefinition, BeanReference,
    DefinitionId, InitHook, RefTarget,
};
use crate::key::TypeKey;
use crate::value::BeanValue;

thread_local! {
    /// Definitions currently being created on this thread, mapped to the
    /// partially built instance once construction has produced one. A
    /// re-entrant request for a definition present here either observes
    /// the placeholder or fails as an unresolvable cycle.
    static IN_CREATION: RefCell<HashMap<DefinitionId, Option<Bean>>> =
        RefCell::new(HashMap::new());
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Loading,
    Initializing,
    Ready,
    Closed,
}

pub(crate) struct ContainerCore {
    registry: RwLock<DefinitionRegistry>,
    config: Arc<dyn ConfigSource>,
    converter: Arc<dyn Converter>,
    managed: RwLock<ManagedData>,
    lists: RwLock<HashMap<(TypeId, Option<String>), Arc<Vec<Bean>>>>,
    post_processors: RwLock<Vec<Arc<dyn PostProcessor>>>,
    factories: RwLock<Factories>,
    phase: Mutex<Phase>,
}

impl ContainerCore {
    pub(crate) fn new(config: Arc<dyn ConfigSource>, converter: Arc<dyn Converter>) -> Self {
        Self {
            registry: RwLock::new(DefinitionRegistry::new()),
            config,
            converter,
            managed: RwLock::new(ManagedData::new()),
            lists: RwLock::new(HashMap::new()),
            post_processors: RwLock::new(Vec::new()),
            factories: RwLock::new(Factories::default()),
            phase: Mutex::new(Phase::Loading),
        }
    }

    pub(crate) fn config(&self) -> &Arc<dyn ConfigSource> {
        &self.config
    }

    pub(crate) fn converter(&self) -> &Arc<dyn Converter> {
        &self.converter
    }

    fn ensure_usable(&self) -> Result<(), ContainerError> {
        if *self.phase.lock() == Phase::Closed {
            Err(ContainerError::Closed)
        } else {
            Ok(())
        }
    }

    pub(crate) fn register(&self, definition: BeanDefinition) -> Result<(), DefinitionError> {
        self.registry.write().register(definition).map(|_| ())
    }

    pub(crate) fn register_alias(&self, alias: AliasDefinition) -> Result<(), DefinitionError> {
        self.registry.write().register_alias(alias)
    }

    pub(crate) fn register_bean_list(
        &self,
        list: BeanListDefinition,
    ) -> Result<(), DefinitionError> {
        self.registry.write().register_bean_list(list)
    }

    pub(crate) fn register_init_hook(&self, hook: InitHook) -> Result<(), DefinitionError> {
        self.registry.write().register_init_hook(hook)
    }

    pub(crate) fn get_bean_by_id(self: &Arc<Self>, id: &str) -> Result<Bean, ContainerError> {
        self.ensure_usable()?;
        let found = { self.registry.read().lookup_id(id) };
        match found {
            Some(definition) => self.get_or_create(&definition),
            None => Err(ContainerError::NoSuchBean {
                selector: id.to_owned(),
            }),
        }
    }

    pub(crate) fn get_bean_by_type(self: &Arc<Self>, key: TypeKey) -> Result<Bean, ContainerError> {
        self.ensure_usable()?;
        match self.resolve_by_type(key)? {
            Some(bean) => Ok(bean),
            None => Err(ContainerError::NoSuchBean {
                selector: key.to_string(),
            }),
        }
    }

    pub(crate) fn get_bean_named(
        self: &Arc<Self>,
        key: TypeKey,
        name: &str,
    ) -> Result<Bean, ContainerError> {
        self.ensure_usable()?;
        let found = { self.registry.read().lookup_type_named(key, name) };
        match found {
            Some(definition) => self.get_or_create(&definition),
            None => Err(ContainerError::NoSuchBean {
                selector: format!("{key}@{name}"),
            }),
        }
    }

    /// Always constructs a fresh instance, bypassing the singleton cache.
    pub(crate) fn create_bean_by_id(self: &Arc<Self>, id: &str) -> Result<Bean, ContainerError> {
        self.ensure_usable()?;
        let found = { self.registry.read().lookup_id(id) };
        match found {
            Some(definition) => self.create_guarded(&definition),
            None => Err(ContainerError::NoSuchBean {
                selector: id.to_owned(),
            }),
        }
    }

    pub(crate) fn create_bean_by_type(
        self: &Arc<Self>,
        key: TypeKey,
    ) -> Result<Bean, ContainerError> {
        self.ensure_usable()?;
        let found = { self.registry.read().lookup_type(key) };
        match found {
            Some(definition) => self.create_guarded(&definition),
            None => Err(ContainerError::NoSuchBean {
                selector: key.to_string(),
            }),
        }
    }

    pub(crate) fn is_singleton_id(&self, id: &str) -> Result<bool, ContainerError> {
        match self.registry.read().lookup_id(id) {
            Some(definition) => Ok(definition.is_singleton()),
            None => Err(ContainerError::NoSuchBean {
                selector: id.to_owned(),
            }),
        }
    }

    pub(crate) fn is_singleton_named(
        &self,
        key: TypeKey,
        name: Option<&str>,
    ) -> Result<bool, ContainerError> {
        let registry = self.registry.read();
        let found = match name {
            Some(name) => registry.lookup_type_named(key, name),
            None => registry.lookup_type(key),
        };
        match found {
            Some(definition) => Ok(definition.is_singleton()),
            None => Err(ContainerError::NoSuchBean {
                selector: key.to_string(),
            }),
        }
    }

    /// All instances of the type, optionally narrowed to a qualifier.
    ///
    /// The result is memoized per key. A registered bean list for the key
    /// takes precedence over the per-definition sweep; its null elements
    /// are skipped. Assembly may race on first access, but instance
    /// construction stays exactly-once behind the creation guard and the
    /// first stored list wins.
    pub(crate) fn beans_of(
        self: &Arc<Self>,
        key: TypeKey,
        qualifier: Option<&str>,
    ) -> Result<Arc<Vec<Bean>>, ContainerError> {
        self.ensure_usable()?;
        let cache_key = (key.id(), qualifier.map(str::to_owned));
        if let Some(cached) = self.lists.read().get(&cache_key) {
            return Ok(Arc::clone(cached));
        }
        let beans = self.collect_beans(key, qualifier)?;
        let mut lists = self.lists.write();
        let entry = lists.entry(cache_key).or_insert(beans);
        Ok(Arc::clone(entry))
    }

    fn collect_beans(
        self: &Arc<Self>,
        key: TypeKey,
        qualifier: Option<&str>,
    ) -> Result<Arc<Vec<Bean>>, ContainerError> {
        let list = { self.registry.read().bean_list(key, qualifier) };
        if let Some(list) = list {
            let resolver = ValueResolver::new(self);
            let mut beans = Vec::with_capacity(list.elements().len());
            for element in list.elements() {
                if let Some(bean) = resolver.resolve(element, None)?.into_bean() {
                    beans.push(bean);
                }
            }
            return Ok(Arc::new(beans));
        }
        let definitions = { self.registry.read().definitions_of(key) };
        let mut beans = Vec::new();
        for definition in definitions
            .iter()
            .filter(|definition| qualifier.map_or(true, |q| definition.has_qualifier(q)))
        {
            beans.push(self.get_or_create(definition)?);
        }
        Ok(Arc::new(beans))
    }

    pub(crate) fn named_beans(
        self: &Arc<Self>,
        key: TypeKey,
    ) -> Result<Vec<(String, Bean)>, ContainerError> {
        self.ensure_usable()?;
        let named = { self.registry.read().named_of_type(key) };
        let mut beans = Vec::with_capacity(named.len());
        for (name, definition) in named {
            beans.push((name, self.get_or_create(&definition)?));
        }
        Ok(beans)
    }

    pub(crate) fn lookup_lazy(
        self: &Arc<Self>,
        spec: &LazySpec,
    ) -> Result<Option<Bean>, ContainerError> {
        self.ensure_usable()?;
        let metadata = InjectMetadata {
            qualifier: spec.qualifier.clone(),
            name: spec.name.clone(),
            named_or_primary: spec.named_or_primary,
            ..InjectMetadata::default()
        };
        self.resolve_typed(spec.type_key, &metadata)
    }

    pub(crate) fn bind_reference(
        &self,
        reference: &BeanReference,
    ) -> Result<Arc<BeanDefinition>, ContainerError> {
        let registry = self.registry.read();
        reference
            .bind_with(|| match reference.target() {
                RefTarget::Id(id) => registry.lookup_id(id),
                RefTarget::TypeNamed(type_key, name) => {
                    registry.lookup_type_named(*type_key, name)
                }
            })
            .ok_or_else(|| ContainerError::MissingReference {
                reference: reference.target().to_string(),
            })
    }

    /// Lookup by type: explicit primary, else unique candidate, else a
    /// registered factory producing the type.
    fn resolve_by_type(self: &Arc<Self>, key: TypeKey) -> Result<Option<Bean>, ContainerError> {
        let found = { self.registry.read().lookup_type(key) };
        if let Some(definition) = found {
            return self.get_or_create(&definition).map(Some);
        }
        let factories = self.factories.read().clone();
        if let Some(result) = factories.produce(key, &BeanContainer::from_core(Arc::clone(self))) {
            return result
                .map(Some)
                .map_err(|source| ContainerError::Creation {
                    bean: key.to_string(),
                    source: Arc::from(source),
                });
        }
        Ok(None)
    }

    fn resolve_typed(
        self: &Arc<Self>,
        key: TypeKey,
        metadata: &InjectMetadata,
    ) -> Result<Option<Bean>, ContainerError> {
        if let Some(qualifier) = &metadata.qualifier {
            let candidates: Vec<_> = { self.registry.read().definitions_of(key) }
                .into_iter()
                .filter(|definition| definition.has_qualifier(qualifier))
                .collect();
            return match candidates.as_slice() {
                [single] => self.get_or_create(single).map(Some),
                _ => Ok(None),
            };
        }
        if let Some(name) = &metadata.name {
            let found = { self.registry.read().lookup_type_named(key, name) };
            if let Some(definition) = found {
                return self.get_or_create(&definition).map(Some);
            }
            if !metadata.named_or_primary {
                return Ok(None);
            }
        }
        self.resolve_by_type(key)
    }

    fn reentrant_outcome(
        &self,
        definition: &Arc<BeanDefinition>,
    ) -> Option<Result<Bean, ContainerError>> {
        let id = definition_id(definition);
        IN_CREATION
            .with(|map| map.borrow().get(&id).cloned())
            .map(|placeholder| match placeholder {
                Some(partial) => Ok(partial),
                None => Err(ContainerError::UnresolvableCycle {
                    bean: definition.diagnostic_name(),
                }),
            })
    }

    /// Returns the instance for the definition, constructing it if needed.
    ///
    /// Singletons are cached; a second thread requesting a singleton that
    /// is being constructed blocks until the builder publishes it. A
    /// re-entrant request on the same thread observes the in-creation
    /// placeholder instead, which lets property-injection cycles close
    /// once one side has an instance.
    pub(crate) fn get_or_create(
        self: &Arc<Self>,
        definition: &Arc<BeanDefinition>,
    ) -> Result<Bean, ContainerError> {
        if let Some(outcome) = self.reentrant_outcome(definition) {
            return outcome;
        }
        if !definition.is_singleton() {
            return self.create_guarded(definition);
        }
        let id = definition_id(definition);
        if let Some(bean) = self.managed.read().cached.get(&id) {
            return Ok(Arc::clone(bean));
        }
        let mut managed = self.managed.write();
        if let Some(bean) = managed.cached.get(&id) {
            return Ok(Arc::clone(bean));
        }
        if managed.constructing.contains_key(&id) {
            // The same-thread case was handled above, so another thread
            // owns the construction.
            return self.wait_for_constructed(managed, id);
        }
        managed.constructing.insert(id, ConstructingContext::new());
        drop(managed);

        match self.create_guarded(definition) {
            Ok(bean) => {
                let mut managed = self.managed.write();
                managed.cached.insert(id, Arc::clone(&bean));
                managed.order.push(Arc::clone(definition));
                Self::notify_waiters(managed, id, WaitOutcome::Constructed);
                Ok(bean)
            }
            Err(err) => {
                let managed = self.managed.write();
                Self::notify_waiters(managed, id, WaitOutcome::Failed(err.clone()));
                Err(err)
            }
        }
    }

    fn wait_for_constructed(
        &self,
        mut managed: RwLockWriteGuard<'_, ManagedData>,
        id: DefinitionId,
    ) -> Result<Bean, ContainerError> {
        let (sender, receiver) = oneshot::channel();
        match managed.constructing.get_mut(&id) {
            Some(context) => context.register_waiter(sender),
            None => unreachable!("presence is checked before registering a waiter"),
        }
        drop(managed);

        match receiver.recv() {
            Ok(WaitOutcome::Constructed) => {
                let managed = self.managed.read();
                match managed.cached.get(&id) {
                    Some(bean) => Ok(Arc::clone(bean)),
                    None => unreachable!("a constructed singleton should be cached"),
                }
            }
            Ok(WaitOutcome::Failed(err)) => Err(err),
            Err(_) => unreachable!("the constructing thread should send an outcome"),
        }
    }

    fn notify_waiters(
        mut managed: RwLockWriteGuard<'_, ManagedData>,
        id: DefinitionId,
        outcome: WaitOutcome,
    ) {
        if let Some(context) = managed.constructing.remove(&id) {
            drop(managed);
            context.notify(outcome);
        }
    }

    /// Runs one creation under the thread-local cycle guard. The marker is
    /// always cleared, also when creation fails.
    fn create_guarded(
        self: &Arc<Self>,
        definition: &Arc<BeanDefinition>,
    ) -> Result<Bean, ContainerError> {
        if let Some(outcome) = self.reentrant_outcome(definition) {
            return outcome;
        }
        let id = definition_id(definition);
        IN_CREATION.with(|map| map.borrow_mut().insert(id, None));
        let result = self.run_creation(definition);
        IN_CREATION.with(|map| {
            map.borrow_mut().remove(&id);
        });
        result
    }

    fn run_creation(
        self: &Arc<Self>,
        definition: &Arc<BeanDefinition>,
    ) -> Result<Bean, ContainerError> {
        debug!(bean = %definition.diagnostic_name(), "creating bean");
        let bean = self
            .construct_and_configure(definition)
            .map_err(|err| ContainerError::Creation {
                bean: definition.diagnostic_name(),
                source: Arc::new(err),
            })?;

        if let Some(class) = definition.class() {
            if let Some(load) = class.load_check() {
                if !load(&bean) {
                    return Err(ContainerError::BeanNotLoadable {
                        bean: definition.diagnostic_name(),
                    });
                }
            }
        }
        self.validate_slots(definition, &bean)?;
        definition.mark_inited();
        Ok(bean)
    }

    fn construct_and_configure(
        self: &Arc<Self>,
        definition: &Arc<BeanDefinition>,
    ) -> Result<Bean, ContainerError> {
        let id = definition_id(definition);
        let resolver = ValueResolver::new(self);

        let bean: Bean = if let Some(value) = definition.value() {
            match resolver.resolve(value, None)?.into_bean() {
                Some(bean) => bean,
                None => {
                    return Err(ContainerError::callback(
                        "construction",
                        "the defined value resolved to null".into(),
                    ))
                }
            }
        } else if let Some(class) = definition.class() {
            let Some(construct) = class.constructor() else {
                return Err(ContainerError::callback(
                    "construction",
                    "the definition has neither a value nor a constructor".into(),
                ));
            };
            let mut args = Vec::with_capacity(definition.constructor_args().len());
            for arg in definition.constructor_args() {
                args.push(resolver.resolve(arg, None)?);
            }
            construct(&args).map_err(|source| ContainerError::callback("construction", source))?
        } else {
            return Err(ContainerError::callback(
                "construction",
                "the definition has neither a value nor an implementation class".into(),
            ));
        };

        // Publish the partial instance so same-thread re-entrant lookups
        // during wiring can observe it.
        IN_CREATION.with(|map| map.borrow_mut().insert(id, Some(Arc::clone(&bean))));

        if let Some(class) = definition.class() {
            let handle = BeanContainer::from_core(Arc::clone(self));
            let factories = self.factories.read().clone();
            let context = BindContext {
                container: &handle,
                definition: definition.as_ref(),
                config: &self.config,
                factories: &factories,
            };
            for capability in class.capabilities() {
                (capability.bind)(&bean, &context)
                    .map_err(|source| ContainerError::callback(capability.name, source))?;
            }

            self.apply_config_bindings(class, &bean)?;

            if let Some(hook) = class.post_configure_hook() {
                hook(&bean)
                    .map_err(|source| ContainerError::callback("post-configure hook", source))?;
            }

            for property in definition.properties() {
                let Some(slot) = class.slot(&property.name) else {
                    return Err(ContainerError::callback(
                        format!("assigning property {}", property.name),
                        format!("no slot {} on {}", property.name, class.type_key()).into(),
                    ));
                };
                let mut value = resolver.resolve(&property.value, None)?;
                if slot.value_type() != TargetType::Any {
                    value = self
                        .converter
                        .convert(value, &slot.value_type())
                        .map_err(|source| ContainerError::Conversion { source })?;
                }
                slot.set(bean.as_ref(), value).map_err(|source| {
                    ContainerError::callback(format!("assigning property {}", property.name), source)
                })?;
            }

            for invocation in definition.invocations() {
                let mut args = Vec::with_capacity(invocation.args.len());
                for arg in &invocation.args {
                    args.push(resolver.resolve(arg, None)?);
                }
                class
                    .invoke(bean.as_ref(), &invocation.method, &args)
                    .map_err(|source| {
                        ContainerError::callback(format!("invoking {}", invocation.method), source)
                    })?;
            }

            self.inject_slots(class, &bean)?;

            if let Some(init) = definition.init_method() {
                class
                    .invoke(bean.as_ref(), init, &[])
                    .map_err(|source| {
                        ContainerError::callback(format!("invoking init method {init}"), source)
                    })?;
            }
        }

        let processors = self.post_processors.read().clone();
        for processor in &processors {
            processor
                .post_process(&bean, definition)
                .map_err(|source| ContainerError::callback("post-processing", source))?;
        }

        if let Some(class) = definition.class() {
            if let Some(hook) = class.post_create_hook() {
                hook(&bean).map_err(|source| ContainerError::callback("post-create hook", source))?;
            }
        }

        Ok(bean)
    }

    fn apply_config_bindings(&self, class: &BeanClass, bean: &Bean) -> Result<(), ContainerError> {
        for slot in class.slots() {
            let Some(binding) = slot.config_binding() else {
                continue;
            };
            let mut keys = binding.keys.clone();
            if keys.is_empty() {
                keys.push(slot.name().to_owned());
                keys.push(slot.name().replace('_', "-"));
            }
            let Some(raw) = keys.iter().find_map(|key| self.config.get_property(key)) else {
                continue;
            };
            let value = self
                .converter
                .convert(BeanValue::Str(raw), &slot.value_type())
                .map_err(|source| ContainerError::Conversion { source })?;
            slot.set(bean.as_ref(), value).map_err(|source| {
                ContainerError::callback(format!("configuring slot {}", slot.name()), source)
            })?;
        }
        Ok(())
    }

    fn inject_slots(
        self: &Arc<Self>,
        class: &BeanClass,
        bean: &Bean,
    ) -> Result<(), ContainerError> {
        for slot in class.slots() {
            let Some(metadata) = slot.inject_metadata() else {
                continue;
            };
            if matches!(slot.kind(), SlotKind::Simple) {
                continue;
            }
            if slot
                .get(bean.as_ref())
                .is_some_and(|value| !value.is_null())
            {
                continue;
            }
            let Some(value) = self.injection_candidate(slot, metadata)? else {
                continue;
            };
            slot.set(bean.as_ref(), value).map_err(|source| {
                ContainerError::callback(format!("injecting slot {}", slot.name()), source)
            })?;
        }
        Ok(())
    }

    fn injection_candidate(
        self: &Arc<Self>,
        slot: &Slot,
        metadata: &InjectMetadata,
    ) -> Result<Option<BeanValue>, ContainerError> {
        match slot.kind() {
            SlotKind::Simple => Ok(None),
            SlotKind::Bean(declared) => {
                let key = metadata.type_key.unwrap_or(declared);
                if let Some(name) = &metadata.name {
                    let found = { self.registry.read().lookup_id(name) };
                    if let Some(target) = found {
                        return self
                            .get_or_create(&target)
                            .map(|bean| Some(BeanValue::Bean(bean)));
                    }
                }
                Ok(self.resolve_typed(key, metadata)?.map(BeanValue::Bean))
            }
            SlotKind::Lazy(declared) => {
                let key = metadata.type_key.unwrap_or(declared);
                let spec = LazySpec {
                    type_key: key,
                    name: metadata.name.clone(),
                    qualifier: metadata.qualifier.clone(),
                    required: metadata.required,
                    nullable: metadata.nullable,
                    named_or_primary: metadata.named_or_primary,
                };
                let handle = LazyBean::new(Arc::clone(self), spec);
                Ok(Some(BeanValue::Bean(Arc::new(handle))))
            }
            SlotKind::LazyList(declared) => {
                let key = metadata.type_key.unwrap_or(declared);
                let handle = LazyBeanList::new(
                    Arc::clone(self),
                    key,
                    metadata.qualifier.clone(),
                    metadata.required,
                );
                Ok(Some(BeanValue::Bean(Arc::new(handle))))
            }
            SlotKind::BeanList(declared) => {
                let key = metadata.type_key.unwrap_or(declared);
                let beans = self.beans_of(key, metadata.qualifier.as_deref())?;
                Ok(Some(BeanValue::List(
                    beans.iter().cloned().map(BeanValue::Bean).collect(),
                )))
            }
        }
    }

    fn validate_slots(
        &self,
        definition: &Arc<BeanDefinition>,
        bean: &Bean,
    ) -> Result<(), ContainerError> {
        let Some(class) = definition.class() else {
            return Ok(());
        };
        for slot in class.slots() {
            let Some(metadata) = slot.inject_metadata() else {
                continue;
            };
            match slot.get(bean.as_ref()) {
                None | Some(BeanValue::Null) if metadata.required => {
                    return Err(ContainerError::RequiredSlot {
                        bean: definition.diagnostic_name(),
                        slot: slot.name().to_owned(),
                    });
                }
                Some(BeanValue::Null) if !metadata.nullable => {
                    return Err(ContainerError::NullSlot {
                        bean: definition.diagnostic_name(),
                        slot: slot.name().to_owned(),
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub(crate) fn init(self: &Arc<Self>) -> Result<(), ContainerError> {
        {
            let mut phase = self.phase.lock();
            match *phase {
                Phase::Loading => *phase = Phase::Initializing,
                _ => {
                    return Err(ContainerError::Definition {
                        source: DefinitionError::AlreadyInitialized,
                    })
                }
            }
        }
        info!("initializing bean container");

        let hooks = {
            let mut registry = self.registry.write();
            registry.freeze();
            registry.take_init_hooks()
        };
        self.registry
            .read()
            .validate_aliases()
            .map_err(|source| ContainerError::Definition { source })?;

        for hook in &hooks {
            hook.run().map_err(|source| {
                ContainerError::callback(format!("init hook {}", hook.name()), source)
            })?;
        }

        let definitions = self.registry.read().ordered().to_vec();

        let mut processors = Vec::new();
        for definition in &definitions {
            let Some(class) = definition.class() else {
                continue;
            };
            if !class.is_post_processor() {
                continue;
            }
            let bean = self.get_or_create(definition)?;
            if let Some(processor) = class.as_post_processor(&bean) {
                processors.push(processor);
            }
        }
        *self.post_processors.write() = processors;

        let mut factory_entries = Vec::new();
        for definition in &definitions {
            if definition.factory_for().is_empty() {
                continue;
            }
            let Some(class) = definition.class() else {
                continue;
            };
            let bean = self.get_or_create(definition)?;
            if let Some(factory) = class.as_factory(&bean) {
                for target in definition.factory_for() {
                    factory_entries.push((*target, Arc::clone(&factory)));
                }
            }
        }
        *self.factories.write() = Factories::new(factory_entries);

        for definition in &definitions {
            if !definition.is_singleton() || definition.is_lazy_init() {
                continue;
            }
            match self.get_or_create(definition) {
                Ok(_) => {}
                Err(ContainerError::BeanNotLoadable { bean }) => {
                    warn!(%bean, "skipping bean that reported a failed load during eager initialization");
                }
                Err(err) => return Err(err),
            }
        }

        *self.phase.lock() = Phase::Ready;
        info!("bean container ready");
        Ok(())
    }

    /// Destroys every live singleton, newest first. Per-bean failures are
    /// logged and never abort the sweep; a second call is a no-op.
    pub(crate) fn close(&self) {
        {
            let mut phase = self.phase.lock();
            if *phase == Phase::Closed {
                return;
            }
            *phase = Phase::Closed;
        }
        info!("closing bean container");

        let retained: Vec<(Arc<BeanDefinition>, Bean)> = {
            let mut managed = self.managed.write();
            let order = std::mem::take(&mut managed.order);
            let entries = order
                .iter()
                .rev()
                .filter_map(|definition| {
                    managed
                        .cached
                        .get(&definition_id(definition))
                        .map(|bean| (Arc::clone(definition), Arc::clone(bean)))
                })
                .collect();
            managed.cached.clear();
            entries
        };
        for (definition, bean) in &retained {
            self.destroy_bean(definition, bean);
        }

        self.lists.write().clear();
        self.post_processors.write().clear();
        *self.factories.write() = Factories::default();
    }

    fn destroy_bean(&self, definition: &Arc<BeanDefinition>, bean: &Bean) {
        debug!(bean = %definition.diagnostic_name(), "destroying bean");
        let Some(class) = definition.class() else {
            return;
        };
        if let Some(method) = definition.destroy_method() {
            if let Err(error) = class.invoke(bean.as_ref(), method, &[]) {
                warn!(bean = %definition.diagnostic_name(), %error, "destroy method failed");
            }
        } else if let Some(dispose) = class.dispose_hook() {
            if let Err(error) = dispose(bean) {
                warn!(bean = %definition.diagnostic_name(), %error, "dispose failed");
            }
        } else if let Some(close) = class.close_hook() {
            if let Err(error) = close(bean) {
                warn!(bean = %definition.diagnostic_name(), %error, "close failed");
            }
        }
    }
}

struct ManagedData {
    cached: HashMap<DefinitionId, Bean>,
    order: Vec<Arc<BeanDefinition>>,
    constructing: HashMap<DefinitionId, ConstructingContext>,
}

impl ManagedData {
    fn new() -> Self {
        Self {
            cached: HashMap::new(),
            order: Vec::new(),
            constructing: HashMap::new(),
        }
    }
}

struct ConstructingContext {
    waiters: Vec<Sender<WaitOutcome>>,
}

impl ConstructingContext {
    fn new() -> Self {
        Self {
            waiters: Vec::new(),
        }
    }

    fn register_waiter(&mut self, sender: Sender<WaitOutcome>) {
        self.waiters.push(sender);
    }

    fn notify(self, outcome: WaitOutcome) {
        for sender in self.waiters {
            let _ = sender.send(outcome.clone());
        }
    }
}

#[derive(Debug, Clone)]
enum WaitOutcome {
    Constructed,
    Failed(ContainerError),
}
