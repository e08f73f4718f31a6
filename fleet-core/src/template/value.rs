//! The dynamically-typed value the template engine evaluates
//! expressions over. `ResourceObject::data` (a `serde_json::Value`) is
//! converted into this once per `Execute` call via `From<&Value>`.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// "any zero-value of its type (empty string, 0, false, empty
    /// list/map, nil)" (spec.md §4.1 `default`).
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !*b,
            Value::Number(n) => *n == 0.0,
            Value::Str(s) => s.is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Map(map) => map.is_empty(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Str(s) => s.parse().ok(),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Null => false,
            Value::List(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Coerces to a display string the way `toString`/string
    /// concatenation in the function library expects.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::Str(s) => s.clone(),
            Value::List(items) => items
                .iter()
                .map(Value::to_display_string)
                .collect::<Vec<_>>()
                .join(","),
            Value::Map(_) => "{object}".to_string(),
        }
    }

    /// A field/path lookup into maps (and numeric indices into lists).
    pub fn get_path(&self, segments: &[String]) -> Value {
        let mut current = self.clone();
        for segment in segments {
            current = match current {
                Value::Map(map) => map.get(segment).cloned().unwrap_or(Value::Null),
                Value::List(items) => segment
                    .parse::<usize>()
                    .ok()
                    .and_then(|idx| items.get(idx).cloned())
                    .unwrap_or(Value::Null),
                _ => Value::Null,
            };
        }
        current
    }
}

pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl From<&serde_json::Value> for Value {
    fn from(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => Value::List(items.iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => {
                Value::Map(map.iter().map(|(k, v)| (k.clone(), Value::from(v))).collect())
            }
        }
    }
}

/// A stable structural hash of a `Value`, used as half of the result
/// cache key (spec.md §9(a) / SPEC_FULL.md §12): equal values hash
/// equal regardless of how they were constructed, and the hash is
/// computed without needing `Value` to implement `Hash` directly
/// (floats aren't `Hash`).
pub fn structural_hash(value: &Value) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    let mut hasher = DefaultHasher::new();
    hash_into(value, &mut hasher);
    hasher.finish()
}

fn hash_into<H: Hasher>(value: &Value, hasher: &mut H) {
    match value {
        Value::Null => 0u8.hash(hasher),
        Value::Bool(b) => {
            1u8.hash(hasher);
            b.hash(hasher);
        }
        Value::Number(n) => {
            2u8.hash(hasher);
            n.to_bits().hash(hasher);
        }
        Value::Str(s) => {
            3u8.hash(hasher);
            s.hash(hasher);
        }
        Value::List(items) => {
            4u8.hash(hasher);
            items.len().hash(hasher);
            for item in items {
                hash_into(item, hasher);
            }
        }
        Value::Map(map) => {
            5u8.hash(hasher);
            map.len().hash(hasher);
            for (k, v) in map {
                k.hash(hasher);
                hash_into(v, hasher);
            }
        }
    }
}
