//! Typed parameter values for elements and attributes.
//!
//! Schema descriptions declare a type per value; instance parameters parse
//! their XML text into one of these variants. A failed parse of a typed
//! `get` is recoverable (the schema default is returned).

use nalgebra::{Vector3, Vector4};

use crate::pose::{self, Pose, RotationFormat};

/// The declared type of an element value or attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueType {
    /// Free-form string (also the namespaced-passthrough type).
    #[default]
    String,
    /// Boolean: `true`/`false`/`1`/`0`.
    Bool,
    /// Signed integer.
    Int,
    /// Unsigned integer.
    UInt,
    /// Double-precision float.
    Double,
    /// Whitespace-separated 3-vector.
    Vector3,
    /// Six-tuple pose (see [`crate::pose`]).
    Pose,
    /// RGBA color with components in [0, 1].
    Color,
}

impl ValueType {
    /// Parse a schema type name.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "string" => Some(Self::String),
            "bool" => Some(Self::Bool),
            "int" => Some(Self::Int),
            "unsigned int" => Some(Self::UInt),
            "double" | "float" => Some(Self::Double),
            "vector3" => Some(Self::Vector3),
            "pose" => Some(Self::Pose),
            "color" => Some(Self::Color),
            _ => None,
        }
    }

    /// The schema type name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::UInt => "unsigned int",
            Self::Double => "double",
            Self::Vector3 => "vector3",
            Self::Pose => "pose",
            Self::Color => "color",
        }
    }
}

/// A parsed, typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// String value.
    String(String),
    /// Boolean value.
    Bool(bool),
    /// Signed integer value.
    Int(i64),
    /// Unsigned integer value.
    UInt(u64),
    /// Double value.
    Double(f64),
    /// 3-vector value.
    Vector3(Vector3<f64>),
    /// Pose value.
    Pose(Pose),
    /// RGBA color value.
    Color(Vector4<f64>),
}

impl Value {
    /// Parse `text` as the given type.
    ///
    /// # Errors
    ///
    /// Returns a message naming the expected type on mismatch.
    pub fn parse(ty: ValueType, text: &str) -> Result<Self, String> {
        let text = text.trim();
        match ty {
            ValueType::String => Ok(Self::String(text.to_string())),
            ValueType::Bool => match text {
                "true" | "1" => Ok(Self::Bool(true)),
                "false" | "0" | "" => Ok(Self::Bool(false)),
                other => Err(format!("expected bool, got '{other}'")),
            },
            ValueType::Int => text
                .parse::<i64>()
                .map(Self::Int)
                .map_err(|_| format!("expected int, got '{text}'")),
            ValueType::UInt => text
                .parse::<u64>()
                .map(Self::UInt)
                .map_err(|_| format!("expected unsigned int, got '{text}'")),
            ValueType::Double => text
                .parse::<f64>()
                .map(Self::Double)
                .map_err(|_| format!("expected double, got '{text}'")),
            ValueType::Vector3 => pose::parse_vector3(text).map(Self::Vector3),
            ValueType::Pose => {
                pose::parse_pose(text, false, RotationFormat::EulerRpy).map(Self::Pose)
            }
            ValueType::Color => {
                let parts: Vec<f64> = text
                    .split_whitespace()
                    .map(|tok| {
                        tok.parse::<f64>()
                            .map_err(|_| format!("invalid number '{tok}' in color"))
                    })
                    .collect::<Result<_, _>>()?;
                match parts.len() {
                    3 => Ok(Self::Color(Vector4::new(parts[0], parts[1], parts[2], 1.0))),
                    4 => Ok(Self::Color(Vector4::new(
                        parts[0], parts[1], parts[2], parts[3],
                    ))),
                    n => Err(format!("color expects 3 or 4 values, got {n}")),
                }
            }
        }
    }

    /// The type this value carries.
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::String(_) => ValueType::String,
            Self::Bool(_) => ValueType::Bool,
            Self::Int(_) => ValueType::Int,
            Self::UInt(_) => ValueType::UInt,
            Self::Double(_) => ValueType::Double,
            Self::Vector3(_) => ValueType::Vector3,
            Self::Pose(_) => ValueType::Pose,
            Self::Color(_) => ValueType::Color,
        }
    }

    /// Render the value back as SDF text.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Bool(b) => if *b { "true" } else { "false" }.to_string(),
            Self::Int(i) => i.to_string(),
            Self::UInt(u) => u.to_string(),
            Self::Double(d) => d.to_string(),
            Self::Vector3(v) => format!("{} {} {}", v.x, v.y, v.z),
            Self::Pose(p) => pose::pose_to_string(p),
            Self::Color(c) => format!("{} {} {} {}", c.x, c.y, c.z, c.w),
        }
    }
}

/// Conversion from a [`Value`] into a concrete Rust type, used by the
/// element tree's typed `get`.
pub trait FromValue: Sized {
    /// Extract `Self` if the variant matches.
    fn from_value(value: &Value) -> Option<Self>;
    /// Wrap `Self` into a [`Value`].
    fn into_value(self) -> Value;
}

macro_rules! impl_from_value {
    ($ty:ty, $variant:ident) => {
        impl FromValue for $ty {
            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
            fn into_value(self) -> Value {
                Value::$variant(self)
            }
        }
    };
}

impl_from_value!(String, String);
impl_from_value!(bool, Bool);
impl_from_value!(i64, Int);
impl_from_value!(u64, UInt);
impl_from_value!(f64, Double);
impl_from_value!(Vector3<f64>, Vector3);
impl_from_value!(Pose, Pose);
impl_from_value!(Vector4<f64>, Color);

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names_round_trip() {
        for ty in [
            ValueType::String,
            ValueType::Bool,
            ValueType::Int,
            ValueType::UInt,
            ValueType::Double,
            ValueType::Vector3,
            ValueType::Pose,
            ValueType::Color,
        ] {
            assert_eq!(ValueType::from_str(ty.as_str()), Some(ty));
        }
        assert_eq!(ValueType::from_str("float"), Some(ValueType::Double));
        assert!(ValueType::from_str("quaternion").is_none());
    }

    #[test]
    fn test_parse_bool_forms() {
        assert_eq!(Value::parse(ValueType::Bool, "1").unwrap(), Value::Bool(true));
        assert_eq!(
            Value::parse(ValueType::Bool, "false").unwrap(),
            Value::Bool(false)
        );
        assert!(Value::parse(ValueType::Bool, "yes").is_err());
    }

    #[test]
    fn test_parse_mismatch_is_error() {
        assert!(Value::parse(ValueType::Double, "fast").is_err());
        assert!(Value::parse(ValueType::UInt, "-3").is_err());
    }

    #[test]
    fn test_color_default_alpha() {
        let c = Value::parse(ValueType::Color, "0.1 0.2 0.3").unwrap();
        assert_eq!(c, Value::Color(Vector4::new(0.1, 0.2, 0.3, 1.0)));
    }

    #[test]
    fn test_text_round_trip() {
        let v = Value::parse(ValueType::Vector3, "1 2 3").unwrap();
        assert_eq!(Value::parse(ValueType::Vector3, &v.to_text()).unwrap(), v);
    }
}
