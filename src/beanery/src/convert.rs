use std::fmt::{Display, Formatter, Result as FmtResult};

use snafu::prelude::*;

use crate::key::TypeKey;
use crate::value::BeanValue;

/// Conversion target declared by a value definition or a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetType {
    /// No conversion requested; the value passes through as resolved.
    Any,
    Bool,
    Int,
    Float,
    Str,
    List,
    Map,
    Bean(TypeKey),
}

impl Display for TargetType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Any => write!(f, "any"),
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::Str => write!(f, "string"),
            Self::List => write!(f, "list"),
            Self::Map => write!(f, "map"),
            Self::Bean(key) => write!(f, "bean {key}"),
        }
    }
}

/// Turns a resolved value into the declared target representation.
#[cfg_attr(test, mockall::automock)]
pub trait Converter: Send + Sync {
    fn convert(&self, value: BeanValue, target: &TargetType) -> Result<BeanValue, ConvertError>;
}

/// Conversions between the literal kinds a [`BeanValue`] can carry.
///
/// Null converts to null regardless of target; bean instances pass through
/// unchanged since their typing is enforced by the slot accessor instead.
#[derive(Debug, Default)]
pub struct DefaultConverter;

impl Converter for DefaultConverter {
    fn convert(&self, value: BeanValue, target: &TargetType) -> Result<BeanValue, ConvertError> {
        match (value, target) {
            (value, TargetType::Any) => Ok(value),
            (BeanValue::Null, _) => Ok(BeanValue::Null),
            (value @ BeanValue::Bool(_), TargetType::Bool) => Ok(value),
            (BeanValue::Str(text), TargetType::Bool) => match text.trim() {
                "true" => Ok(BeanValue::Bool(true)),
                "false" => Ok(BeanValue::Bool(false)),
                _ => Err(ConvertError::Parse {
                    input: text,
                    target: "bool",
                }),
            },
            (value @ BeanValue::Int(_), TargetType::Int) => Ok(value),
            (BeanValue::Str(text), TargetType::Int) => {
                text.trim()
                    .parse::<i64>()
                    .map(BeanValue::Int)
                    .map_err(|_| ConvertError::Parse {
                        input: text,
                        target: "int",
                    })
            }
            (value @ BeanValue::Float(_), TargetType::Float) => Ok(value),
            (BeanValue::Int(value), TargetType::Float) => Ok(BeanValue::Float(value as f64)),
            (BeanValue::Str(text), TargetType::Float) => {
                text.trim()
                    .parse::<f64>()
                    .map(BeanValue::Float)
                    .map_err(|_| ConvertError::Parse {
                        input: text,
                        target: "float",
                    })
            }
            (value @ BeanValue::Str(_), TargetType::Str) => Ok(value),
            (BeanValue::Bool(value), TargetType::Str) => Ok(BeanValue::Str(value.to_string())),
            (BeanValue::Int(value), TargetType::Str) => Ok(BeanValue::Str(value.to_string())),
            (BeanValue::Float(value), TargetType::Str) => Ok(BeanValue::Str(value.to_string())),
            (value @ BeanValue::List(_), TargetType::List) => Ok(value),
            (value @ BeanValue::Map(_), TargetType::Map) => Ok(value),
            (value @ BeanValue::Bean(_), TargetType::Bean(_)) => Ok(value),
            (value, target) => Err(ConvertError::Unsupported {
                from: value.kind_name(),
                target: target.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Snafu)]
#[non_exhaustive]
pub enum ConvertError {
    #[snafu(display("cannot convert a {from} value to {target}"))]
    #[non_exhaustive]
    Unsupported { from: &'static str, target: String },
    #[snafu(display("cannot parse {input:?} as {target}"))]
    #[non_exhaustive]
    Parse {
        input: String,
        target: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_converter_parses_literals() {
        let converter = DefaultConverter;

        let value = converter
            .convert(BeanValue::Str(" 42 ".into()), &TargetType::Int)
            .unwrap();
        assert_eq!(value, BeanValue::Int(42));

        let value = converter
            .convert(BeanValue::Str("true".into()), &TargetType::Bool)
            .unwrap();
        assert_eq!(value, BeanValue::Bool(true));

        let value = converter
            .convert(BeanValue::Str("2.5".into()), &TargetType::Float)
            .unwrap();
        assert_eq!(value, BeanValue::Float(2.5));
    }

    #[test]
    fn default_converter_widens_int_to_float() {
        let converter = DefaultConverter;

        let value = converter
            .convert(BeanValue::Int(3), &TargetType::Float)
            .unwrap();
        assert_eq!(value, BeanValue::Float(3.0));
    }

    #[test]
    fn default_converter_passes_through_for_any_target() {
        let converter = DefaultConverter;

        let value = converter
            .convert(BeanValue::Str("unchanged".into()), &TargetType::Any)
            .unwrap();
        assert_eq!(value, BeanValue::Str("unchanged".into()));
    }

    #[test]
    fn default_converter_fails_when_conversion_is_unsupported() {
        let converter = DefaultConverter;

        assert!(matches!(
            converter.convert(BeanValue::Bool(true), &TargetType::List),
            Err(ConvertError::Unsupported { .. })
        ));
        assert!(matches!(
            converter.convert(BeanValue::Str("nope".into()), &TargetType::Int),
            Err(ConvertError::Parse { .. })
        ));
    }
}
