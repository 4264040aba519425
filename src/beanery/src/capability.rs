use std::error::Error;
use std::sync::Arc;

use crate::config::ConfigSource;
use crate::container::{Bean, BeanContainer};
use crate::definition::BeanDefinition;
use crate::key::TypeKey;

/// Receives the owning container while the instance is being created.
pub trait ContextAware: Send + Sync {
    fn set_context(&self, container: &BeanContainer);
}

/// Receives the identifier its definition is registered under.
pub trait BeanNameAware: Send + Sync {
    fn set_bean_name(&self, name: &str);
}

/// Receives the configuration store the container binds against.
pub trait ConfigAware: Send + Sync {
    fn set_config(&self, config: &Arc<dyn ConfigSource>);
}

/// Receives the factories discovered during container initialization.
pub trait FactoryAware: Send + Sync {
    fn set_factories(&self, factories: &Factories);
}

/// Invoked after configuration binding, before declared properties are set.
pub trait PostConfigure: Send + Sync {
    fn post_configure(&self) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Invoked after the whole creation sequence, before the instance is exposed.
pub trait PostCreate: Send + Sync {
    fn post_create(&self) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// A bean that decides at creation time whether it is usable at all.
///
/// Returning `false` keeps the instance out of the container entirely.
pub trait Loadable: Send + Sync {
    fn load(&self) -> bool;
}

/// Teardown callback preferred over [`Closeable`] during shutdown.
pub trait Disposable: Send + Sync {
    fn dispose(&self) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Teardown callback of last resort during shutdown.
pub trait Closeable: Send + Sync {
    fn close(&self) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Hook invoked against every instance the container creates, in
/// registration order, after declared wiring is complete.
pub trait PostProcessor: Send + Sync {
    fn post_process(
        &self,
        bean: &Bean,
        definition: &BeanDefinition,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Produces instances of the types its definition is registered for,
/// consulted when no definition of a requested type exists.
pub trait BeanFactory: Send + Sync {
    fn produce(
        &self,
        target: TypeKey,
        container: &BeanContainer,
    ) -> Result<Bean, Box<dyn Error + Send + Sync>>;
}

/// Ambient objects offered to awareness capabilities during creation.
pub struct BindContext<'a> {
    pub container: &'a BeanContainer,
    pub definition: &'a BeanDefinition,
    pub config: &'a Arc<dyn ConfigSource>,
    pub factories: &'a Factories,
}

/// Read-only index of the factories discovered during initialization,
/// keyed by the type each one produces.
#[derive(Clone, Default)]
pub struct Factories {
    entries: Arc<Vec<(TypeKey, Arc<dyn BeanFactory>)>>,
}

impl Factories {
    pub(crate) fn new(entries: Vec<(TypeKey, Arc<dyn BeanFactory>)>) -> Self {
        Self {
            entries: Arc::new(entries),
        }
    }

    pub fn produces(&self, target: TypeKey) -> bool {
        self.entries.iter().any(|(key, _)| *key == target)
    }

    pub fn produce(
        &self,
        target: TypeKey,
        container: &BeanContainer,
    ) -> Option<Result<Bean, Box<dyn Error + Send + Sync>>> {
        self.entries
            .iter()
            .find(|(key, _)| *key == target)
            .map(|(_, factory)| factory.produce(target, container))
    }
}
