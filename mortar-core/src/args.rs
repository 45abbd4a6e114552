use indexmap::IndexMap;

use mortar_dsl::diagnostics::Location;

use crate::errors::{IntpError, IntpResult};
use crate::value::Value;

/// Evaluated arguments of a function or method call, after list flattening
/// and Disabler screening have been applied by the dispatcher.
#[derive(Clone, Debug)]
pub struct Args {
    pub positional: Vec<Value>,
    pub kwargs: IndexMap<String, Value>,
    pub location: Location,
}

impl Args {
    pub fn empty(location: Location) -> Self {
        Self {
            positional: Vec::new(),
            kwargs: IndexMap::new(),
            location,
        }
    }

    pub fn has_disabler(&self) -> bool {
        fn contains(value: &Value) -> bool {
            match value {
                Value::Disabler => true,
                Value::List(items) => items.iter().any(contains),
                Value::Dict(map) => map.values().any(contains),
                _ => false,
            }
        }
        self.positional.iter().any(contains) || self.kwargs.values().any(contains)
    }

    pub fn check_no_positional(&self, what: &str) -> IntpResult<()> {
        if self.positional.is_empty() {
            Ok(())
        } else {
            Err(
                IntpError::invalid_arguments(format!("{what} takes no positional arguments"))
                    .at(&self.location),
            )
        }
    }

    pub fn check_no_kwargs(&self, what: &str) -> IntpResult<()> {
        if self.kwargs.is_empty() {
            Ok(())
        } else {
            Err(
                IntpError::invalid_arguments(format!("{what} takes no keyword arguments"))
                    .at(&self.location),
            )
        }
    }

    pub fn check_pos_count(&self, what: &str, min: usize, max: Option<usize>) -> IntpResult<()> {
        let count = self.positional.len();
        if count < min {
            return Err(IntpError::invalid_arguments(format!(
                "{what} requires at least {min} positional argument(s), got {count}"
            ))
            .at(&self.location));
        }
        if let Some(max) = max
            && count > max
        {
            return Err(IntpError::invalid_arguments(format!(
                "{what} takes at most {max} positional argument(s), got {count}"
            ))
            .at(&self.location));
        }
        Ok(())
    }

    pub fn pos(&self, index: usize, what: &str) -> IntpResult<&Value> {
        self.positional.get(index).ok_or_else(|| {
            IntpError::invalid_arguments(format!("{what} is missing positional argument {index}"))
                .at(&self.location)
        })
    }

    pub fn pos_str(&self, index: usize, what: &str) -> IntpResult<&str> {
        let value = self.pos(index, what)?;
        value.as_str().ok_or_else(|| {
            IntpError::invalid_arguments(format!(
                "{what} argument {index} must be a string, got {}",
                value.type_name()
            ))
            .at(&self.location)
        })
    }

    /// All positional arguments coerced to strings, rejecting anything else.
    pub fn pos_strings(&self, what: &str) -> IntpResult<Vec<String>> {
        self.positional
            .iter()
            .map(|value| {
                value.as_str().map(str::to_owned).ok_or_else(|| {
                    IntpError::invalid_arguments(format!(
                        "{what} arguments must be strings, got {}",
                        value.type_name()
                    ))
                    .at(&self.location)
                })
            })
            .collect()
    }

    pub fn kw(&self, name: &str) -> Option<&Value> {
        self.kwargs.get(name)
    }

    pub fn kw_str(&self, name: &str) -> IntpResult<Option<String>> {
        match self.kwargs.get(name) {
            None => Ok(None),
            Some(Value::Str(s)) => Ok(Some(s.clone())),
            Some(other) => Err(IntpError::invalid_arguments(format!(
                "keyword argument \"{name}\" must be a string, got {}",
                other.type_name()
            ))
            .at(&self.location)),
        }
    }

    pub fn kw_str_or(&self, name: &str, default: &str) -> IntpResult<String> {
        Ok(self.kw_str(name)?.unwrap_or_else(|| default.to_owned()))
    }

    pub fn kw_bool(&self, name: &str, default: bool) -> IntpResult<bool> {
        match self.kwargs.get(name) {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(IntpError::invalid_arguments(format!(
                "keyword argument \"{name}\" must be a boolean, got {}",
                other.type_name()
            ))
            .at(&self.location)),
        }
    }

    pub fn kw_int(&self, name: &str, default: i64) -> IntpResult<i64> {
        match self.kwargs.get(name) {
            None => Ok(default),
            Some(Value::Int(i)) => Ok(*i),
            Some(other) => Err(IntpError::invalid_arguments(format!(
                "keyword argument \"{name}\" must be an integer, got {}",
                other.type_name()
            ))
            .at(&self.location)),
        }
    }

    /// A kwarg that accepts a string or a list of strings, flattened.
    pub fn kw_string_list(&self, name: &str) -> IntpResult<Vec<String>> {
        match self.kwargs.get(name) {
            None => Ok(Vec::new()),
            Some(value) => value_to_string_list(value).map_err(|got| {
                IntpError::invalid_arguments(format!(
                    "keyword argument \"{name}\" must be a string or a list of strings, got {got}"
                ))
                .at(&self.location)
            }),
        }
    }

    pub fn kw_list(&self, name: &str) -> Vec<Value> {
        match self.kwargs.get(name) {
            None => Vec::new(),
            Some(Value::List(items)) => items.clone(),
            Some(other) => vec![other.clone()],
        }
    }
}

pub fn value_to_string_list(value: &Value) -> Result<Vec<String>, &'static str> {
    match value {
        Value::Str(s) => Ok(vec![s.clone()]),
        Value::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in flatten(items.clone()) {
                match item {
                    Value::Str(s) => out.push(s),
                    other => return Err(other.type_name()),
                }
            }
            Ok(out)
        }
        other => Err(other.type_name()),
    }
}

/// Recursively expands nested lists, the default preprocessing for
/// positional arguments.
pub fn flatten(values: Vec<Value>) -> Vec<Value> {
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        match value {
            Value::List(items) => out.extend(flatten(items)),
            other => out.push(other),
        }
    }
    out
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KwType {
    Any,
    Str,
    Bool,
    Int,
    StrOrList,
    List,
    Dict,
    /// Boolean or a feature-option handle; resolved by
    /// `extract_required_kwarg`.
    Requirement,
    Object,
}

impl KwType {
    fn accepts(self, value: &Value) -> bool {
        match self {
            KwType::Any => true,
            KwType::Str => matches!(value, Value::Str(_)),
            KwType::Bool => matches!(value, Value::Bool(_)),
            KwType::Int => matches!(value, Value::Int(_)),
            KwType::StrOrList => matches!(value, Value::Str(_) | Value::List(_)),
            KwType::List => matches!(value, Value::List(_)),
            KwType::Dict => matches!(value, Value::Dict(_)),
            KwType::Requirement => matches!(value, Value::Bool(_) | Value::Object(_)),
            KwType::Object => matches!(value, Value::Object(_)),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct KwSpec {
    pub name: &'static str,
    pub ty: KwType,
    /// DSL version that introduced this kwarg, if gated.
    pub since: Option<&'static str>,
    /// DSL version that deprecated this kwarg, if any.
    pub deprecated: Option<&'static str>,
}

impl KwSpec {
    pub const fn new(name: &'static str, ty: KwType) -> Self {
        Self {
            name,
            ty,
            since: None,
            deprecated: None,
        }
    }

    pub const fn since(name: &'static str, ty: KwType, version: &'static str) -> Self {
        Self {
            name,
            ty,
            since: Some(version),
            deprecated: None,
        }
    }

    pub const fn deprecated(name: &'static str, ty: KwType, version: &'static str) -> Self {
        Self {
            name,
            ty,
            since: None,
            deprecated: Some(version),
        }
    }
}

/// Declarative call contract of one built-in function. A single central
/// checker consults these instead of each function hand-rolling validation.
#[derive(Clone, Copy, Debug)]
pub struct FnSpec {
    pub name: &'static str,
    pub min_pos: usize,
    pub max_pos: Option<usize>,
    pub kwargs: &'static [KwSpec],
    /// Skip recursive list flattening of positional arguments.
    pub no_flatten: bool,
    /// DSL version that introduced the function itself, if gated.
    pub since: Option<&'static str>,
}

impl FnSpec {
    /// Validates arity, kwarg whitelist and kwarg value types. Feature
    /// gating on `since`/`deprecated` entries is the dispatcher's job, since
    /// it owns the per-subproject version state.
    pub fn check(&self, args: &Args) -> IntpResult<()> {
        args.check_pos_count(self.name, self.min_pos, self.max_pos)?;
        for (name, value) in &args.kwargs {
            let spec = self.kwargs.iter().find(|spec| spec.name == name);
            let Some(spec) = spec else {
                return Err(IntpError::invalid_arguments(format!(
                    "{}() got unknown keyword argument \"{name}\"",
                    self.name
                ))
                .at(&args.location));
            };
            if !spec.ty.accepts(value) {
                return Err(IntpError::invalid_arguments(format!(
                    "{}() keyword argument \"{name}\" has invalid type {}",
                    self.name,
                    value.type_name()
                ))
                .at(&args.location));
            }
        }
        Ok(())
    }
}
