use std::collections::HashMap;

use snafu::prelude::*;

/// Read-only view of the application configuration store.
///
/// The container never parses configuration itself; it only asks this
/// capability for named properties, both for `${...}` placeholder
/// substitution and for declarative slot binding.
#[cfg_attr(test, mockall::automock)]
pub trait ConfigSource: Send + Sync {
    fn get_property(&self, name: &str) -> Option<String>;

    fn has_property(&self, name: &str) -> bool;
}

/// In-memory [`ConfigSource`] backed by a plain map.
#[derive(Debug, Default)]
pub struct MapConfig {
    properties: HashMap<String, String>,
}

impl MapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(name.into(), value.into());
    }
}

impl ConfigSource for MapConfig {
    fn get_property(&self, name: &str) -> Option<String> {
        self.properties.get(name).cloned()
    }

    fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }
}

#[derive(Debug, Clone, Snafu)]
#[non_exhaustive]
pub enum ConfigError {
    #[snafu(display("configuration property {name} is not defined"))]
    #[non_exhaustive]
    MissingProperty { name: String },
    #[snafu(display("unterminated placeholder in {template:?}"))]
    #[non_exhaustive]
    UnterminatedPlaceholder { template: String },
}

/// Substitutes every `${name}` token in `template` against `config`.
///
/// A token may carry an inline fallback as `${name:default}`, used when the
/// property is absent. A template without tokens passes through untouched.
pub fn resolve_placeholders(
    template: &str,
    config: &dyn ConfigSource,
) -> Result<String, ConfigError> {
    if !template.contains("${") {
        return Ok(template.to_owned());
    }

    let mut output = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            return Err(ConfigError::UnterminatedPlaceholder {
                template: template.to_owned(),
            });
        };
        let token = &after[..end];
        let (name, default) = match token.split_once(':') {
            Some((name, default)) => (name, Some(default)),
            None => (token, None),
        };
        match config.get_property(name) {
            Some(value) => output.push_str(&value),
            None => match default {
                Some(default) => output.push_str(default),
                None => {
                    return Err(ConfigError::MissingProperty {
                        name: name.to_owned(),
                    })
                }
            },
        }
        rest = &after[end + 1..];
    }
    output.push_str(rest);
    Ok(output)
}
