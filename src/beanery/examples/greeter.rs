use std::error::Error;
use std::sync::Arc;

use parking_lot::Mutex;

use beanery::prelude::*;

fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = MapConfig::new().with("app.name", "greeter");
    let container = BeanContainer::with_capabilities(Arc::new(config), Arc::new(DefaultConverter));

    register_beans(&container)?;
    container.init()?;
    let _guard = container.shutdown_guard();

    let app = container.get::<App>()?;
    app.run();
    Ok(())
}

fn register_beans(container: &BeanContainer) -> Result<(), DefinitionError> {
    container.register(
        BeanDefinition::builder(TypeKey::of::<ConsoleLogger>())
            .id("logger")
            .class(ConsoleLogger::bean_class())
            .build(),
    )?;
    container.register(
        BeanDefinition::builder(TypeKey::of::<Greeter>())
            .id("english")
            .qualifier("greeter")
            .sort_order(1)
            .class(Greeter::bean_class())
            .property("message", ValueDefinition::literal("Hello World!"))
            .build(),
    )?;
    container.register(
        BeanDefinition::builder(TypeKey::of::<Greeter>())
            .id("chinese")
            .qualifier("greeter")
            .sort_order(2)
            .class(Greeter::bean_class())
            .property("message", ValueDefinition::literal("你好世界!"))
            .build(),
    )?;
    container.register(
        BeanDefinition::builder(TypeKey::of::<App>())
            .id("app")
            .class(App::bean_class())
            .build(),
    )
}

struct ConsoleLogger {
    app_name: Mutex<String>,
}

impl ConsoleLogger {
    fn bean_class() -> Arc<BeanClass> {
        BeanClass::builder::<ConsoleLogger>()
            .constructor(|_| {
                Ok(ConsoleLogger {
                    app_name: Mutex::new("unnamed".into()),
                })
            })
            .slot(
                Slot::new(
                    "app_name",
                    SlotKind::Simple,
                    |logger: &ConsoleLogger| Some(BeanValue::Str(logger.app_name.lock().clone())),
                    |logger: &ConsoleLogger, value| match value {
                        BeanValue::Str(name) => {
                            *logger.app_name.lock() = name;
                            Ok(())
                        }
                        other => Err(format!("expected a string, got {other:?}").into()),
                    },
                )
                .with_value_type(TargetType::Str)
                .with_config(&["app.name"]),
            )
            .build()
    }

    fn log(&self, message: &str) {
        eprintln!("[{}] {}", self.app_name.lock(), message);
    }
}

struct Greeter {
    logger: Mutex<Option<Bean>>,
    message: Mutex<String>,
}

impl Greeter {
    fn bean_class() -> Arc<BeanClass> {
        BeanClass::builder::<Greeter>()
            .constructor(|_| {
                Ok(Greeter {
                    logger: Mutex::new(None),
                    message: Mutex::new(String::new()),
                })
            })
            .slot(
                Slot::new(
                    "logger",
                    SlotKind::Bean(TypeKey::of::<ConsoleLogger>()),
                    |greeter: &Greeter| greeter.logger.lock().clone().map(BeanValue::Bean),
                    |greeter: &Greeter, value| match value {
                        BeanValue::Bean(logger) => {
                            *greeter.logger.lock() = Some(logger);
                            Ok(())
                        }
                        other => Err(format!("expected a bean, got {other:?}").into()),
                    },
                )
                .with_inject(InjectMetadata::required()),
            )
            .slot(
                Slot::new(
                    "message",
                    SlotKind::Simple,
                    |greeter: &Greeter| Some(BeanValue::Str(greeter.message.lock().clone())),
                    |greeter: &Greeter, value| match value {
                        BeanValue::Str(message) => {
                            *greeter.message.lock() = message;
                            Ok(())
                        }
                        other => Err(format!("expected a string, got {other:?}").into()),
                    },
                )
                .with_value_type(TargetType::Str),
            )
            .build()
    }

    fn greet(&self) {
        if let Some(logger) = self.logger.lock().clone() {
            if let Some(logger) = logger.as_ref().as_any().downcast_ref::<ConsoleLogger>() {
                logger.log(&self.message.lock());
            }
        }
    }
}

struct App {
    greeters: Mutex<Vec<Bean>>,
}

impl App {
    fn bean_class() -> Arc<BeanClass> {
        BeanClass::builder::<App>()
            .constructor(|_| {
                Ok(App {
                    greeters: Mutex::new(Vec::new()),
                })
            })
            .slot(
                Slot::new(
                    "greeters",
                    SlotKind::BeanList(TypeKey::of::<Greeter>()),
                    |app: &App| {
                        let greeters = app.greeters.lock();
                        if greeters.is_empty() {
                            None
                        } else {
                            Some(BeanValue::List(
                                greeters.iter().cloned().map(BeanValue::Bean).collect(),
                            ))
                        }
                    },
                    |app: &App, value| match value {
                        BeanValue::List(values) => {
                            let mut greeters = app.greeters.lock();
                            for value in values {
                                match value {
                                    BeanValue::Bean(bean) => greeters.push(bean),
                                    other => {
                                        return Err(
                                            format!("expected a bean, got {other:?}").into()
                                        )
                                    }
                                }
                            }
                            Ok(())
                        }
                        other => Err(format!("expected a list, got {other:?}").into()),
                    },
                )
                .with_inject(InjectMetadata::qualified("greeter")),
            )
            .build()
    }

    fn run(&self) {
        for greeter in self.greeters.lock().iter() {
            if let Some(greeter) = greeter.as_ref().as_any().downcast_ref::<Greeter>() {
                greeter.greet();
            }
        }
    }
}
