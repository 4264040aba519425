use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::capability::{
    BeanFactory, BeanNameAware, BindContext, Closeable, ConfigAware, ContextAware, Disposable,
    FactoryAware, Loadable, PostConfigure, PostCreate, PostProcessor,
};
use crate::container::{Bean, Managed};
use crate::convert::TargetType;
use crate::key::TypeKey;
use crate::util::any::{downcast_arc, DowncastRef};
use crate::value::BeanValue;

/// How a slot participates in creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Plain data slot; configured or set explicitly, never injected.
    Simple,
    /// A single collaborator of the given type.
    Bean(TypeKey),
    /// Every instance of the given element type, as a list.
    BeanList(TypeKey),
    /// A deferred handle to a single collaborator.
    Lazy(TypeKey),
    /// A deferred handle to every instance of the element type.
    LazyList(TypeKey),
}

/// Injection contract attached to a slot by the loader.
#[derive(Debug, Clone)]
pub struct InjectMetadata {
    pub required: bool,
    pub nullable: bool,
    pub qualifier: Option<String>,
    pub name: Option<String>,
    pub type_key: Option<TypeKey>,
    pub named_or_primary: bool,
}

impl Default for InjectMetadata {
    fn default() -> Self {
        Self {
            required: false,
            nullable: true,
            qualifier: None,
            name: None,
            type_key: None,
            named_or_primary: false,
        }
    }
}

impl InjectMetadata {
    pub fn required() -> Self {
        Self {
            required: true,
            nullable: false,
            ..Self::default()
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn qualified(qualifier: impl Into<String>) -> Self {
        Self {
            qualifier: Some(qualifier.into()),
            ..Self::default()
        }
    }
}

/// Configuration keys tried for a slot, in order. An empty list falls back
/// to the slot's own name and its hyphenated form.
#[derive(Debug, Clone, Default)]
pub struct ConfigBinding {
    pub keys: Vec<String>,
}

type GetterFn = Box<dyn Fn(&dyn Managed) -> Option<BeanValue> + Send + Sync>;
type SetterFn =
    Box<dyn Fn(&dyn Managed, BeanValue) -> Result<(), Box<dyn Error + Send + Sync>> + Send + Sync>;

/// A named, typed slot of a bean class, read and written through closures
/// the loader supplies for the concrete type.
pub struct Slot {
    name: &'static str,
    kind: SlotKind,
    value_type: TargetType,
    inject: Option<InjectMetadata>,
    config: Option<ConfigBinding>,
    getter: GetterFn,
    setter: SetterFn,
}

impl Slot {
    pub fn new<T, G, S>(name: &'static str, kind: SlotKind, getter: G, setter: S) -> Self
    where
        T: Managed,
        G: Fn(&T) -> Option<BeanValue> + Send + Sync + 'static,
        S: Fn(&T, BeanValue) -> Result<(), Box<dyn Error + Send + Sync>> + Send + Sync + 'static,
    {
        Self {
            name,
            kind,
            value_type: TargetType::Any,
            inject: None,
            config: None,
            getter: Box::new(move |instance| instance.downcast_ref::<T>().and_then(&getter)),
            setter: Box::new(move |instance, value| match instance.downcast_ref::<T>() {
                Some(typed) => setter(typed, value),
                None => Err(format!("slot {name} applied to a foreign instance").into()),
            }),
        }
    }

    pub fn with_inject(mut self, metadata: InjectMetadata) -> Self {
        self.inject = Some(metadata);
        self
    }

    pub fn with_config(mut self, keys: &[&str]) -> Self {
        self.config = Some(ConfigBinding {
            keys: keys.iter().map(|key| (*key).to_owned()).collect(),
        });
        self
    }

    pub fn with_value_type(mut self, value_type: TargetType) -> Self {
        self.value_type = value_type;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> SlotKind {
        self.kind
    }

    pub fn value_type(&self) -> TargetType {
        self.value_type
    }

    pub fn inject_metadata(&self) -> Option<&InjectMetadata> {
        self.inject.as_ref()
    }

    pub fn config_binding(&self) -> Option<&ConfigBinding> {
        self.config.as_ref()
    }

    pub(crate) fn get(&self, instance: &dyn Managed) -> Option<BeanValue> {
        (self.getter)(instance)
    }

    pub(crate) fn set(
        &self,
        instance: &dyn Managed,
        value: BeanValue,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        (self.setter)(instance, value)
    }
}

impl Debug for Slot {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Slot")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

type ConstructorFn =
    Box<dyn Fn(&[BeanValue]) -> Result<Bean, Box<dyn Error + Send + Sync>> + Send + Sync>;
type MethodFn = Box<
    dyn Fn(&dyn Managed, &[BeanValue]) -> Result<(), Box<dyn Error + Send + Sync>> + Send + Sync,
>;
type BinderFn =
    Box<dyn Fn(&Bean, &BindContext<'_>) -> Result<(), Box<dyn Error + Send + Sync>> + Send + Sync>;
type HookFn = Box<dyn Fn(&Bean) -> Result<(), Box<dyn Error + Send + Sync>> + Send + Sync>;
type LoadFn = Box<dyn Fn(&Bean) -> bool + Send + Sync>;
type PostProcessorCast = Box<dyn Fn(&Bean) -> Option<Arc<dyn PostProcessor>> + Send + Sync>;
type FactoryCast = Box<dyn Fn(&Bean) -> Option<Arc<dyn BeanFactory>> + Send + Sync>;

/// One entry of a class's ordered capability table.
pub(crate) struct CapabilityBinding {
    pub(crate) name: &'static str,
    pub(crate) bind: BinderFn,
}

/// Everything the container may do with instances of one bean type:
/// construct them, read and write named slots, invoke named methods and
/// walk the capability table. Stands in for the reflective accessor the
/// container itself never performs; loaders build one per bean type
/// through [`BeanClassBuilder`].
pub struct BeanClass {
    type_key: TypeKey,
    constructor: Option<ConstructorFn>,
    slots: Vec<Slot>,
    methods: HashMap<&'static str, MethodFn>,
    capabilities: Vec<CapabilityBinding>,
    post_configure: Option<HookFn>,
    post_create: Option<HookFn>,
    load: Option<LoadFn>,
    dispose: Option<HookFn>,
    close: Option<HookFn>,
    post_processor: Option<PostProcessorCast>,
    factory: Option<FactoryCast>,
}

impl BeanClass {
    pub fn builder<T: Managed>() -> BeanClassBuilder<T> {
        BeanClassBuilder::new()
    }

    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot(&self, name: &str) -> Option<&Slot> {
        self.slots.iter().find(|slot| slot.name == name)
    }

    pub fn is_post_processor(&self) -> bool {
        self.post_processor.is_some()
    }

    pub fn is_factory(&self) -> bool {
        self.factory.is_some()
    }

    pub(crate) fn constructor(&self) -> Option<&ConstructorFn> {
        self.constructor.as_ref()
    }

    pub(crate) fn invoke(
        &self,
        instance: &dyn Managed,
        method: &str,
        args: &[BeanValue],
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        match self.methods.get(method) {
            Some(invoke) => invoke(instance, args),
            None => Err(format!("no method {method} on {}", self.type_key).into()),
        }
    }

    pub(crate) fn capabilities(&self) -> &[CapabilityBinding] {
        &self.capabilities
    }

    pub(crate) fn post_configure_hook(&self) -> Option<&HookFn> {
        self.post_configure.as_ref()
    }

    pub(crate) fn post_create_hook(&self) -> Option<&HookFn> {
        self.post_create.as_ref()
    }

    pub(crate) fn load_check(&self) -> Option<&LoadFn> {
        self.load.as_ref()
    }

    pub(crate) fn dispose_hook(&self) -> Option<&HookFn> {
        self.dispose.as_ref()
    }

    pub(crate) fn close_hook(&self) -> Option<&HookFn> {
        self.close.as_ref()
    }

    pub(crate) fn as_post_processor(&self, bean: &Bean) -> Option<Arc<dyn PostProcessor>> {
        self.post_processor.as_ref().and_then(|cast| cast(bean))
    }

    pub(crate) fn as_factory(&self, bean: &Bean) -> Option<Arc<dyn BeanFactory>> {
        self.factory.as_ref().and_then(|cast| cast(bean))
    }
}

impl Debug for BeanClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("BeanClass")
            .field("type_key", &self.type_key)
            .field("slots", &self.slots)
            .finish_non_exhaustive()
    }
}

/// Typed builder assembling a [`BeanClass`] for a concrete bean type.
///
/// Capability registrations append monomorphized downcast-and-call entries,
/// so the creation engine itself stays ignorant of concrete types.
pub struct BeanClassBuilder<T: Managed> {
    class: BeanClass,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Managed> BeanClassBuilder<T> {
    pub fn new() -> Self {
        Self {
            class: BeanClass {
                type_key: TypeKey::of::<T>(),
                constructor: None,
                slots: Vec::new(),
                methods: HashMap::new(),
                capabilities: Vec::new(),
                post_configure: None,
                post_create: None,
                load: None,
                dispose: None,
                close: None,
                post_processor: None,
                factory: None,
            },
            _marker: PhantomData,
        }
    }

    pub fn constructor<F>(mut self, construct: F) -> Self
    where
        F: Fn(&[BeanValue]) -> Result<T, Box<dyn Error + Send + Sync>> + Send + Sync + 'static,
    {
        self.class.constructor = Some(Box::new(move |args| {
            construct(args).map(|instance| Arc::new(instance) as Bean)
        }));
        self
    }

    pub fn slot(mut self, slot: Slot) -> Self {
        self.class.slots.push(slot);
        self
    }

    pub fn method<F>(mut self, name: &'static str, invoke: F) -> Self
    where
        F: Fn(&T, &[BeanValue]) -> Result<(), Box<dyn Error + Send + Sync>>
            + Send
            + Sync
            + 'static,
    {
        self.class.methods.insert(
            name,
            Box::new(move |instance, args| match instance.downcast_ref::<T>() {
                Some(typed) => invoke(typed, args),
                None => Err(format!("method {name} applied to a foreign instance").into()),
            }),
        );
        self
    }

    pub fn context_aware(mut self) -> Self
    where
        T: ContextAware,
    {
        self.class.capabilities.push(CapabilityBinding {
            name: "context binding",
            bind: Box::new(|bean, context| {
                if let Some(aware) = bean.as_ref().downcast_ref::<T>() {
                    aware.set_context(context.container);
                }
                Ok(())
            }),
        });
        self
    }

    pub fn bean_name_aware(mut self) -> Self
    where
        T: BeanNameAware,
    {
        self.class.capabilities.push(CapabilityBinding {
            name: "bean name binding",
            bind: Box::new(|bean, context| {
                if let Some(aware) = bean.as_ref().downcast_ref::<T>() {
                    aware.set_bean_name(&context.definition.diagnostic_name());
                }
                Ok(())
            }),
        });
        self
    }

    pub fn config_aware(mut self) -> Self
    where
        T: ConfigAware,
    {
        self.class.capabilities.push(CapabilityBinding {
            name: "config binding",
            bind: Box::new(|bean, context| {
                if let Some(aware) = bean.as_ref().downcast_ref::<T>() {
                    aware.set_config(context.config);
                }
                Ok(())
            }),
        });
        self
    }

    pub fn factory_aware(mut self) -> Self
    where
        T: FactoryAware,
    {
        self.class.capabilities.push(CapabilityBinding {
            name: "factory binding",
            bind: Box::new(|bean, context| {
                if let Some(aware) = bean.as_ref().downcast_ref::<T>() {
                    aware.set_factories(context.factories);
                }
                Ok(())
            }),
        });
        self
    }

    pub fn post_configure(mut self) -> Self
    where
        T: PostConfigure,
    {
        self.class.post_configure = Some(Box::new(|bean| {
            match bean.as_ref().downcast_ref::<T>() {
                Some(instance) => instance.post_configure(),
                None => Ok(()),
            }
        }));
        self
    }

    pub fn post_create(mut self) -> Self
    where
        T: PostCreate,
    {
        self.class.post_create = Some(Box::new(|bean| match bean.as_ref().downcast_ref::<T>() {
            Some(instance) => instance.post_create(),
            None => Ok(()),
        }));
        self
    }

    pub fn loadable(mut self) -> Self
    where
        T: Loadable,
    {
        self.class.load = Some(Box::new(|bean| {
            bean.as_ref()
                .downcast_ref::<T>()
                .map_or(true, Loadable::load)
        }));
        self
    }

    pub fn disposable(mut self) -> Self
    where
        T: Disposable,
    {
        self.class.dispose = Some(Box::new(|bean| match bean.as_ref().downcast_ref::<T>() {
            Some(instance) => instance.dispose(),
            None => Ok(()),
        }));
        self
    }

    pub fn closeable(mut self) -> Self
    where
        T: Closeable,
    {
        self.class.close = Some(Box::new(|bean| match bean.as_ref().downcast_ref::<T>() {
            Some(instance) => instance.close(),
            None => Ok(()),
        }));
        self
    }

    pub fn post_processor(mut self) -> Self
    where
        T: PostProcessor,
    {
        self.class.post_processor = Some(Box::new(|bean| {
            downcast_arc::<T>(bean).map(|instance| instance as Arc<dyn PostProcessor>)
        }));
        self
    }

    pub fn factory(mut self) -> Self
    where
        T: BeanFactory,
    {
        self.class.factory = Some(Box::new(|bean| {
            downcast_arc::<T>(bean).map(|instance| instance as Arc<dyn BeanFactory>)
        }));
        self
    }

    pub fn build(self) -> Arc<BeanClass> {
        Arc::new(self.class)
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;

    struct Counter {
        count: Mutex<i64>,
    }

    impl Counter {
        fn class() -> Arc<BeanClass> {
            BeanClass::builder::<Counter>()
                .constructor(|_| Ok(Counter { count: Mutex::new(0) }))
                .slot(
                    Slot::new(
                        "count",
                        SlotKind::Simple,
                        |counter: &Counter| Some(BeanValue::Int(*counter.count.lock())),
                        |counter: &Counter, value| match value {
                            BeanValue::Int(value) => {
                                *counter.count.lock() = value;
                                Ok(())
                            }
                            other => Err(format!("expected an int, got {other:?}").into()),
                        },
                    )
                    .with_value_type(TargetType::Int),
                )
                .method("bump", |counter, _| {
                    *counter.count.lock() += 1;
                    Ok(())
                })
                .build()
        }
    }

    #[test]
    fn bean_class_constructs_and_accesses_slots() {
        let class = Counter::class();
        let constructor = class.constructor().unwrap();
        let bean = constructor(&[]).unwrap();

        let slot = class.slot("count").unwrap();
        assert_eq!(slot.get(bean.as_ref()), Some(BeanValue::Int(0)));

        slot.set(bean.as_ref(), BeanValue::Int(3)).unwrap();
        assert_eq!(slot.get(bean.as_ref()), Some(BeanValue::Int(3)));
    }

    #[test]
    fn bean_class_invoke_succeeds_for_known_methods() {
        let class = Counter::class();
        let constructor = class.constructor().unwrap();
        let bean = constructor(&[]).unwrap();

        class.invoke(bean.as_ref(), "bump", &[]).unwrap();
        class.invoke(bean.as_ref(), "bump", &[]).unwrap();

        let slot = class.slot("count").unwrap();
        assert_eq!(slot.get(bean.as_ref()), Some(BeanValue::Int(2)));
    }

    #[test]
    fn bean_class_invoke_fails_when_method_is_unknown() {
        let class = Counter::class();
        let constructor = class.constructor().unwrap();
        let bean = constructor(&[]).unwrap();

        assert!(class.invoke(bean.as_ref(), "missing", &[]).is_err());
    }

    #[test]
    fn slot_set_fails_when_instance_type_is_foreign() {
        let class = Counter::class();
        let slot = class.slot("count").unwrap();
        let foreign: Bean = Arc::new(17i32);

        assert!(slot.set(foreign.as_ref(), BeanValue::Int(0)).is_err());
    }

    #[test]
    fn loadable_check_consults_the_instance() {
        struct Broken;

        impl Loadable for Broken {
            fn load(&self) -> bool {
                false
            }
        }

        let class = BeanClass::builder::<Broken>()
            .constructor(|_| Ok(Broken))
            .loadable()
            .build();
        let bean = class.constructor().unwrap()(&[]).unwrap();

        let load = class.load_check().unwrap();
        assert!(!load(&bean));
    }
}
