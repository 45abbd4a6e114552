use std::fmt;

use indexmap::IndexMap;

use crate::objects::{ObjectHandle, objects_equal};

/// A DSL value. Lists and dicts are mutable only through explicit methods;
/// strings are immutable. Dict iteration order is insertion order.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Value>),
    Dict(IndexMap<String, Value>),
    Disabler,
    Object(ObjectHandle),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "void",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Disabler => "disabler",
            Value::Object(obj) => obj.kind(),
        }
    }

    /// Truthiness: `false`, `0`, `''`, empty containers, null and the
    /// disabler are falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null | Value::Disabler => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Dict(map) => !map.is_empty(),
            Value::Object(_) => true,
        }
    }

    pub fn is_disabler(&self) -> bool {
        matches!(self, Value::Disabler)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Dict(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectHandle> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Renders the value the way `message()` and `summary()` print it.
    pub fn stringify(&self) -> String {
        match self {
            Value::Null => "(null)".to_owned(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Str(s) => s.clone(),
            Value::List(items) => {
                let rendered: Vec<String> = items.iter().map(Value::stringify_quoted).collect();
                format!("[{}]", rendered.join(", "))
            }
            Value::Dict(map) => {
                let rendered: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("'{k}': {}", v.stringify_quoted()))
                    .collect();
                format!("{{{}}}", rendered.join(", "))
            }
            Value::Disabler => "disabler".to_owned(),
            Value::Object(obj) => format!("<{}>", obj.kind()),
        }
    }

    fn stringify_quoted(&self) -> String {
        match self {
            Value::Str(s) => format!("'{s}'"),
            other => other.stringify(),
        }
    }
}

pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(l), Value::Bool(r)) => l == r,
        (Value::Int(l), Value::Int(r)) => l == r,
        (Value::Str(l), Value::Str(r)) => l == r,
        (Value::List(l), Value::List(r)) => {
            l.len() == r.len() && l.iter().zip(r).all(|(a, b)| values_equal(a, b))
        }
        (Value::Dict(l), Value::Dict(r)) => {
            l.len() == r.len()
                && l.iter()
                    .all(|(k, v)| r.get(k).map(|o| values_equal(v, o)).unwrap_or(false))
        }
        (Value::Disabler, Value::Disabler) => true,
        (Value::Object(l), Value::Object(r)) => objects_equal(l, r),
        _ => false,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        values_equal(self, other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Dict(map) => {
                let entries: Vec<(&String, &Value)> = map.iter().collect();
                f.debug_tuple("Dict").field(&entries).finish()
            }
            Value::Disabler => write!(f, "Disabler"),
            Value::Object(obj) => write!(f, "Object({})", obj.kind()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_owned())
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_matches_language_rules() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::Str(String::new()).is_truthy());
        assert!(!Value::List(Vec::new()).is_truthy());
        assert!(!Value::Dict(IndexMap::new()).is_truthy());
        assert!(!Value::Disabler.is_truthy());

        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Int(-1).is_truthy());
        assert!(Value::Str("x".into()).is_truthy());
        assert!(Value::List(vec![Value::Null]).is_truthy());
    }

    #[test]
    fn structural_equality_for_containers() {
        let a = Value::List(vec![Value::Int(1), Value::Str("x".into())]);
        let b = Value::List(vec![Value::Int(1), Value::Str("x".into())]);
        assert_eq!(a, b);

        let mut m1 = IndexMap::new();
        m1.insert("k".to_owned(), Value::Int(1));
        let mut m2 = IndexMap::new();
        m2.insert("k".to_owned(), Value::Int(1));
        assert_eq!(Value::Dict(m1), Value::Dict(m2));
    }

    #[test]
    fn different_kinds_are_never_equal() {
        assert_ne!(Value::Int(1), Value::Str("1".into()));
        assert_ne!(Value::Bool(true), Value::Int(1));
    }

    #[test]
    fn stringify_quotes_nested_strings_only() {
        let value = Value::List(vec![Value::Str("a".into()), Value::Int(3)]);
        assert_eq!(value.stringify(), "['a', 3]");
        assert_eq!(Value::Str("a".into()).stringify(), "a");
    }
}
