use std::{cmp::Ordering, fmt};

use rust_decimal::{Decimal, prelude::FromPrimitive};
use serde_json::Value as Json;

/// An operand held by a comparison or membership operator.
///
/// Operands are a closed set of scalar kinds. Records on the other hand are
/// arbitrary JSON, so every comparison in this module is between a record
/// value (`serde_json::Value`) and a `Scalar`.
///
/// # Type Preservation
///
/// Integers and floats are kept apart, exactly as they were written in the
/// filter document. Comparisons across the two kinds are numeric:
/// `{"$eq": 1}` matches a record value of `1.0`.
///
/// # Examples
///
/// ```
/// use querymatch::Scalar;
/// use serde_json::json;
///
/// let n = Scalar::from_json(&json!(42)).unwrap();
/// assert_eq!(n, Scalar::Integer(42));
///
/// assert!(n.equals(&json!(42.0)));
/// assert!(Scalar::from_json(&json!(null)).is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// JSON boolean (true/false)
    Boolean(bool),

    /// Floating-point number
    Float(f64),

    /// Integer number (preserved separately from floats)
    Integer(i64),

    /// UTF-8 string
    String(String),
}

impl Scalar {
    /// Converts a JSON value into a scalar operand.
    ///
    /// Returns `None` for `null`, arrays and objects. Integers outside the
    /// `i64` range are kept as floats.
    pub fn from_json(value: &Json) -> Option<Self> {
        match value {
            Json::Bool(b) => Some(Scalar::Boolean(*b)),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Some(Scalar::Integer(i)),
                None => n.as_f64().map(Scalar::Float),
            },
            Json::String(s) => Some(Scalar::String(s.clone())),
            Json::Null | Json::Array(_) | Json::Object(_) => None,
        }
    }

    /// Converts the scalar back into JSON.
    ///
    /// Non-finite floats have no JSON representation and become `null`.
    pub fn to_json(&self) -> Json {
        match self {
            Scalar::Boolean(b) => Json::Bool(*b),
            Scalar::Integer(i) => Json::Number((*i).into()),
            Scalar::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Scalar::String(s) => Json::String(s.clone()),
        }
    }

    /// Human-readable kind name, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Boolean(_) => "boolean",
            Scalar::Integer(_) => "integer",
            Scalar::Float(_) => "float",
            Scalar::String(_) => "string",
        }
    }

    /// Structural equality between a record value and this operand.
    ///
    /// Numbers compare numerically across integer/float kinds; every other
    /// kind only equals the same kind.
    pub fn equals(&self, actual: &Json) -> bool {
        match (actual, self) {
            (Json::Bool(a), Scalar::Boolean(b)) => a == b,
            (Json::String(a), Scalar::String(b)) => a == b,
            (Json::Number(_), Scalar::Integer(_) | Scalar::Float(_)) => {
                self.compare(actual) == Some(Ordering::Equal)
            }
            _ => false,
        }
    }

    /// Orders a record value relative to this operand.
    ///
    /// Returns `None` when the two are not comparable (different kinds,
    /// `null`, arrays, objects, or NaN).
    pub fn compare(&self, actual: &Json) -> Option<Ordering> {
        match (actual, self) {
            (Json::Bool(a), Scalar::Boolean(b)) => Some(a.cmp(b)),
            (Json::String(a), Scalar::String(b)) => Some(a.as_str().cmp(b.as_str())),
            (Json::Number(n), Scalar::Integer(b)) => match n.as_i64() {
                Some(a) => Some(a.cmp(b)),
                None => compare_mixed(n.as_f64()?, *b).map(Ordering::reverse),
            },
            (Json::Number(n), Scalar::Float(b)) => match n.as_i64() {
                Some(a) => compare_mixed(*b, a),
                None => n.as_f64()?.partial_cmp(b),
            },
            _ => None,
        }
    }
}

/// Compares an integer against a float, returning the ordering of the
/// integer relative to the float.
///
/// Goes through `Decimal` so that large integers are not rounded on the way
/// to `f64`; falls back to `f64` when the float is outside decimal range.
fn compare_mixed(float: f64, integer: i64) -> Option<Ordering> {
    if let Some(fd) = Decimal::from_f64(float)
        && let Some(id) = Decimal::from_i64(integer)
    {
        return Some(id.cmp(&fd));
    }
    (integer as f64).partial_cmp(&float)
}

/// Returns a human-readable type name for a JSON value
pub fn type_name(v: &Json) -> &'static str {
    match v {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(n) if n.is_i64() => "integer",
        Json::Number(_) => "float",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Boolean(b) => write!(f, "{b}"),
            Scalar::Integer(i) => write!(f, "{i}"),
            Scalar::Float(n) => write!(f, "{n}"),
            Scalar::String(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Integer(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Boolean(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::String(value)
    }
}
