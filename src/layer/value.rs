use std::{borrow::Cow, collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single attribute value. Attribute tables are open-ended, but values are
/// restricted to this closed set of kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

/// Attribute name -> value, ordered by name.
pub type Attributes = BTreeMap<String, AttrValue>;

impl AttrValue {
    /// Convert a JSON property value. Nulls, arrays and objects have no attribute value.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => n.as_f64().map(Self::Number),
            Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number),
            Self::Text(s) => Value::String(s.clone()),
        }
    }

    /// Numeric view: numbers as-is, text when it parses as a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Bool(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Categorical label of the value. Integral numbers render without a
    /// fractional part, so `1.0` and `"1"` name the same category.
    pub fn label(&self) -> Cow<'_, str> {
        match self {
            Self::Text(s) => Cow::Borrowed(s.trim()),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Cow::Owned(format!("{}", *n as i64)),
            Self::Number(n) => Cow::Owned(n.to_string()),
            Self::Bool(b) => Cow::Owned(b.to_string()),
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self { Self::Text(s.to_string()) }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self { Self::Text(s) }
}

impl From<f64> for AttrValue {
    fn from(n: f64) -> Self { Self::Number(n) }
}

impl From<i64> for AttrValue {
    fn from(n: i64) -> Self { Self::Number(n as f64) }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self { Self::Bool(b) }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn labels_drop_integral_fraction() {
        assert_eq!(AttrValue::Number(1.0).label(), "1");
        assert_eq!(AttrValue::Number(2.5).label(), "2.5");
        assert_eq!(AttrValue::from(" 12 ").label(), "12");
        assert_eq!(AttrValue::Bool(true).label(), "true");
    }

    #[test]
    fn json_conversion() {
        assert_eq!(AttrValue::from_json(&json!(5)), Some(AttrValue::Number(5.0)));
        assert_eq!(AttrValue::from_json(&json!("x")), Some(AttrValue::from("x")));
        assert_eq!(AttrValue::from_json(&json!(null)), None);
        assert_eq!(AttrValue::Number(2.0).to_json(), json!(2.0));
    }
}
