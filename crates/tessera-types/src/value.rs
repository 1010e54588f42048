use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::shape::element_count;

/// Element type of a dataset, attribute, or committed datatype.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    /// Variable-length UTF-8 string.
    Text,
}

impl ElementType {
    /// The fill value for freshly allocated elements.
    pub fn zero(&self) -> Scalar {
        match self {
            Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64 => Scalar::Int(0),
            Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64 => Scalar::UInt(0),
            Self::Float32 | Self::Float64 => Scalar::Float(0.0),
            Self::Text => Scalar::Text(String::new()),
        }
    }

    /// Inclusive range of a signed integer type.
    fn signed_range(&self) -> Option<(i64, i64)> {
        match self {
            Self::Int8 => Some((i8::MIN as i64, i8::MAX as i64)),
            Self::Int16 => Some((i16::MIN as i64, i16::MAX as i64)),
            Self::Int32 => Some((i32::MIN as i64, i32::MAX as i64)),
            Self::Int64 => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }

    /// Upper bound of an unsigned integer type.
    fn unsigned_max(&self) -> Option<u64> {
        match self {
            Self::UInt8 => Some(u8::MAX as u64),
            Self::UInt16 => Some(u16::MAX as u64),
            Self::UInt32 => Some(u32::MAX as u64),
            Self::UInt64 => Some(u64::MAX),
            _ => None,
        }
    }

    /// Convert `value` into this type's canonical scalar representation.
    ///
    /// Integers must fit the target width; integers widen to floats; floats
    /// never narrow to integers; text only matches [`ElementType::Text`].
    pub fn coerce(&self, value: &Scalar) -> Result<Scalar, TypeError> {
        let mismatch = || TypeError::TypeMismatch {
            expected: self.to_string(),
            value: value.to_string(),
        };

        if let Some((min, max)) = self.signed_range() {
            let v = match value {
                Scalar::Int(i) => *i,
                Scalar::UInt(u) => i64::try_from(*u).map_err(|_| mismatch())?,
                _ => return Err(mismatch()),
            };
            return if (min..=max).contains(&v) {
                Ok(Scalar::Int(v))
            } else {
                Err(mismatch())
            };
        }

        if let Some(max) = self.unsigned_max() {
            let v = match value {
                Scalar::UInt(u) => *u,
                Scalar::Int(i) => u64::try_from(*i).map_err(|_| mismatch())?,
                _ => return Err(mismatch()),
            };
            return if v <= max {
                Ok(Scalar::UInt(v))
            } else {
                Err(mismatch())
            };
        }

        match (self, value) {
            (Self::Float32, Scalar::Int(i)) => Ok(Scalar::Float(*i as f32 as f64)),
            (Self::Float32, Scalar::UInt(u)) => Ok(Scalar::Float(*u as f32 as f64)),
            (Self::Float32, Scalar::Float(f)) => Ok(Scalar::Float(*f as f32 as f64)),
            (Self::Float64, Scalar::Int(i)) => Ok(Scalar::Float(*i as f64)),
            (Self::Float64, Scalar::UInt(u)) => Ok(Scalar::Float(*u as f64)),
            (Self::Float64, Scalar::Float(f)) => Ok(Scalar::Float(*f)),
            (Self::Text, Scalar::Text(s)) => Ok(Scalar::Text(s.clone())),
            _ => Err(mismatch()),
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Text => "text",
        };
        write!(f, "{name}")
    }
}

/// A single element value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// JSON representation used by tooling output.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Int(i) => serde_json::Value::from(*i),
            Self::UInt(u) => serde_json::Value::from(*u),
            Self::Float(f) => serde_json::Value::from(*f),
            Self::Text(s) => serde_json::Value::from(s.as_str()),
        }
    }

    /// Parse a JSON scalar (number or string).
    pub fn from_json(value: &serde_json::Value) -> Result<Self, TypeError> {
        let mismatch = || TypeError::TypeMismatch {
            expected: "scalar".into(),
            value: value.to_string(),
        };
        match value {
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Self::Int(i))
                } else if let Some(u) = n.as_u64() {
                    Ok(Self::UInt(u))
                } else {
                    n.as_f64().map(Self::Float).ok_or_else(mismatch)
                }
            }
            serde_json::Value::String(s) => Ok(Self::Text(s.clone())),
            _ => Err(mismatch()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::UInt(u) => write!(f, "{u}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u64> for Scalar {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// A typed attribute value: a scalar (empty shape) or a small array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttributeValue {
    pub dtype: ElementType,
    /// Extents; empty for a scalar attribute.
    pub shape: Vec<u64>,
    /// Row-major values, already coerced to `dtype`.
    pub values: Vec<Scalar>,
}

impl AttributeValue {
    /// A scalar attribute.
    pub fn scalar(dtype: ElementType, value: impl Into<Scalar>) -> Result<Self, TypeError> {
        Self::array(dtype, Vec::new(), vec![value.into()])
    }

    /// An array attribute; `values.len()` must equal the product of `shape`.
    pub fn array(dtype: ElementType, shape: Vec<u64>, values: Vec<Scalar>) -> Result<Self, TypeError> {
        // An overflowing shape can never match the supplied values.
        let expected = element_count(&shape).unwrap_or(u64::MAX);
        if expected != values.len() as u64 {
            return Err(TypeError::CountMismatch {
                expected,
                actual: values.len() as u64,
            });
        }
        let values = values
            .iter()
            .map(|v| dtype.coerce(v))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { dtype, shape, values })
    }

    /// Returns `true` for a scalar (rank 0) attribute.
    pub fn is_scalar(&self) -> bool {
        self.shape.is_empty()
    }

    /// JSON rendering of the values: a bare value for scalars, a flat list otherwise.
    pub fn values_json(&self) -> serde_json::Value {
        if self.is_scalar() {
            self.values
                .first()
                .map(Scalar::to_json)
                .unwrap_or(serde_json::Value::Null)
        } else {
            serde_json::Value::Array(self.values.iter().map(Scalar::to_json).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_values_match_type() {
        assert_eq!(ElementType::Int32.zero(), Scalar::Int(0));
        assert_eq!(ElementType::UInt8.zero(), Scalar::UInt(0));
        assert_eq!(ElementType::Float64.zero(), Scalar::Float(0.0));
        assert_eq!(ElementType::Text.zero(), Scalar::Text(String::new()));
    }

    #[test]
    fn coerce_checks_integer_range() {
        assert_eq!(ElementType::Int8.coerce(&Scalar::Int(127)), Ok(Scalar::Int(127)));
        assert!(ElementType::Int8.coerce(&Scalar::Int(128)).is_err());
        assert!(ElementType::UInt16.coerce(&Scalar::Int(-1)).is_err());
        assert_eq!(ElementType::UInt16.coerce(&Scalar::Int(9)), Ok(Scalar::UInt(9)));
    }

    #[test]
    fn coerce_widens_integers_to_float() {
        assert_eq!(ElementType::Float64.coerce(&Scalar::Int(3)), Ok(Scalar::Float(3.0)));
    }

    #[test]
    fn coerce_refuses_float_to_integer() {
        assert!(ElementType::Int64.coerce(&Scalar::Float(1.0)).is_err());
    }

    #[test]
    fn coerce_text_only_into_text() {
        assert!(ElementType::Int32.coerce(&Scalar::from("7")).is_err());
        assert_eq!(ElementType::Text.coerce(&Scalar::from("a")), Ok(Scalar::from("a")));
        assert!(ElementType::Text.coerce(&Scalar::Int(1)).is_err());
    }

    #[test]
    fn attribute_array_requires_matching_count() {
        let err = AttributeValue::array(ElementType::Int32, vec![2, 2], vec![Scalar::Int(1)]);
        assert_eq!(
            err,
            Err(TypeError::CountMismatch {
                expected: 4,
                actual: 1
            })
        );
    }

    #[test]
    fn attribute_scalar_json() {
        let attr = AttributeValue::scalar(ElementType::Float32, 2i64).unwrap();
        assert!(attr.is_scalar());
        assert_eq!(attr.values_json(), serde_json::json!(2.0));
    }

    #[test]
    fn attribute_array_json() {
        let attr = AttributeValue::array(
            ElementType::Int16,
            vec![3],
            vec![Scalar::Int(1), Scalar::Int(2), Scalar::Int(3)],
        )
        .unwrap();
        assert_eq!(attr.values_json(), serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn scalar_json_parsing() {
        assert_eq!(Scalar::from_json(&serde_json::json!(5)), Ok(Scalar::Int(5)));
        assert_eq!(Scalar::from_json(&serde_json::json!(1.5)), Ok(Scalar::Float(1.5)));
        assert_eq!(Scalar::from_json(&serde_json::json!("x")), Ok(Scalar::from("x")));
        assert!(Scalar::from_json(&serde_json::json!([1])).is_err());
    }

    mod props {
        use super::super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn int8_accepts_exactly_its_range(v in any::<i64>()) {
                let fits = (i8::MIN as i64..=i8::MAX as i64).contains(&v);
                prop_assert_eq!(ElementType::Int8.coerce(&Scalar::Int(v)).is_ok(), fits);
            }

            #[test]
            fn uint32_accepts_exactly_its_range(v in any::<u64>()) {
                let fits = v <= u32::MAX as u64;
                prop_assert_eq!(ElementType::UInt32.coerce(&Scalar::UInt(v)).is_ok(), fits);
            }
        }
    }
}
