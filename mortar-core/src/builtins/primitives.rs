use indexmap::IndexMap;

use mortar_kernel::version::version_compare;

use crate::args::Args;
use crate::errors::{IntpError, IntpResult};
use crate::format::format_placeholders;
use crate::interpreter::Interpreter;
use crate::value::Value;

/// Method dispatch for the elementary value kinds. Object methods live on
/// the objects themselves; this is everything else.
pub fn call_method(
    _interp: &mut Interpreter,
    receiver: Value,
    name: &str,
    args: &Args,
) -> IntpResult<Value> {
    match receiver {
        Value::Str(s) => string_method(&s, name, args),
        Value::Int(i) => int_method(i, name, args),
        Value::Bool(b) => bool_method(b, name, args),
        Value::List(items) => list_method(&items, name, args),
        Value::Dict(map) => dict_method(&map, name, args),
        other => Err(IntpError::invalid_arguments(format!(
            "values of type {} have no methods",
            other.type_name()
        ))
        .at(&args.location)),
    }
}

fn string_method(s: &str, name: &str, args: &Args) -> IntpResult<Value> {
    match name {
        "format" => {
            let out = format_placeholders(s, &args.positional, &args.location)?;
            Ok(Value::Str(out))
        }
        "join" => {
            let parts = args.pos_strings("join")?;
            Ok(Value::Str(parts.join(s)))
        }
        "split" => {
            args.check_pos_count("split", 0, Some(1))?;
            let parts: Vec<Value> = match args.positional.first() {
                Some(sep) => {
                    let sep = sep.as_str().ok_or_else(|| {
                        IntpError::invalid_arguments("split separator must be a string")
                            .at(&args.location)
                    })?;
                    s.split(sep).map(|p| Value::Str(p.to_owned())).collect()
                }
                None => s
                    .split_whitespace()
                    .map(|p| Value::Str(p.to_owned()))
                    .collect(),
            };
            Ok(Value::List(parts))
        }
        "strip" => {
            args.check_pos_count("strip", 0, Some(1))?;
            let out = match args.positional.first() {
                Some(chars) => {
                    let chars = chars.as_str().ok_or_else(|| {
                        IntpError::invalid_arguments("strip characters must be a string")
                            .at(&args.location)
                    })?;
                    let set: Vec<char> = chars.chars().collect();
                    s.trim_matches(|c| set.contains(&c)).to_owned()
                }
                None => s.trim().to_owned(),
            };
            Ok(Value::Str(out))
        }
        "to_upper" => Ok(Value::Str(s.to_uppercase())),
        "to_lower" => Ok(Value::Str(s.to_lowercase())),
        "underscorify" => Ok(Value::Str(
            s.chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
                .collect(),
        )),
        "startswith" => {
            let prefix = args.pos_str(0, "startswith")?;
            Ok(Value::Bool(s.starts_with(prefix)))
        }
        "endswith" => {
            let suffix = args.pos_str(0, "endswith")?;
            Ok(Value::Bool(s.ends_with(suffix)))
        }
        "contains" => {
            let needle = args.pos_str(0, "contains")?;
            Ok(Value::Bool(s.contains(needle)))
        }
        "replace" => {
            let old = args.pos_str(0, "replace")?;
            let new = args.pos_str(1, "replace")?;
            Ok(Value::Str(s.replace(old, new)))
        }
        "substring" => {
            args.check_pos_count("substring", 0, Some(2))?;
            let len = s.chars().count() as i64;
            let clamp = |raw: i64| -> usize {
                let resolved = if raw < 0 { raw + len } else { raw };
                resolved.clamp(0, len) as usize
            };
            let start = clamp(args.positional.first().and_then(Value::as_int).unwrap_or(0));
            let end = clamp(args.positional.get(1).and_then(Value::as_int).unwrap_or(len));
            let out: String = s
                .chars()
                .skip(start)
                .take(end.saturating_sub(start))
                .collect();
            Ok(Value::Str(out))
        }
        "to_int" => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
            IntpError::invalid_arguments(format!("string \"{s}\" cannot be converted to an integer"))
                .at(&args.location)
        }),
        "version_compare" => {
            let constraint = args.pos_str(0, "version_compare")?;
            Ok(Value::Bool(version_compare(s, constraint)))
        }
        _ => Err(IntpError::invalid_arguments(format!(
            "string has no method \"{name}\""
        ))
        .at(&args.location)),
    }
}

fn int_method(i: i64, name: &str, args: &Args) -> IntpResult<Value> {
    args.check_no_positional(name)?;
    args.check_no_kwargs(name)?;
    match name {
        "is_even" => Ok(Value::Bool(i % 2 == 0)),
        "is_odd" => Ok(Value::Bool(i % 2 != 0)),
        "to_string" => Ok(Value::Str(i.to_string())),
        _ => Err(IntpError::invalid_arguments(format!(
            "int has no method \"{name}\""
        ))
        .at(&args.location)),
    }
}

fn bool_method(b: bool, name: &str, args: &Args) -> IntpResult<Value> {
    match name {
        "to_int" => Ok(Value::Int(if b { 1 } else { 0 })),
        "to_string" => {
            args.check_pos_count("to_string", 0, Some(2))?;
            let when_true = match args.positional.first() {
                Some(v) => v
                    .as_str()
                    .ok_or_else(|| {
                        IntpError::invalid_arguments("to_string arguments must be strings")
                            .at(&args.location)
                    })?
                    .to_owned(),
                None => "true".to_owned(),
            };
            let when_false = match args.positional.get(1) {
                Some(v) => v
                    .as_str()
                    .ok_or_else(|| {
                        IntpError::invalid_arguments("to_string arguments must be strings")
                            .at(&args.location)
                    })?
                    .to_owned(),
                None => "false".to_owned(),
            };
            Ok(Value::Str(if b { when_true } else { when_false }))
        }
        _ => Err(IntpError::invalid_arguments(format!(
            "bool has no method \"{name}\""
        ))
        .at(&args.location)),
    }
}

fn list_method(items: &[Value], name: &str, args: &Args) -> IntpResult<Value> {
    match name {
        "length" => Ok(Value::Int(items.len() as i64)),
        "contains" => {
            let needle = args.pos(0, "contains")?;
            fn contained(items: &[Value], needle: &Value) -> bool {
                items.iter().any(|item| match item {
                    Value::List(nested) => contained(nested, needle),
                    other => other == needle,
                })
            }
            Ok(Value::Bool(contained(items, needle)))
        }
        "get" => {
            args.check_pos_count("get", 1, Some(2))?;
            let raw = args.pos(0, "get")?.as_int().ok_or_else(|| {
                IntpError::invalid_arguments("list get index must be an integer").at(&args.location)
            })?;
            let index = if raw < 0 { raw + items.len() as i64 } else { raw };
            if index >= 0 && (index as usize) < items.len() {
                Ok(items[index as usize].clone())
            } else {
                match args.positional.get(1) {
                    Some(fallback) => Ok(fallback.clone()),
                    None => Err(IntpError::invalid_arguments(format!(
                        "list index {raw} is out of bounds (length {})",
                        items.len()
                    ))
                    .at(&args.location)),
                }
            }
        }
        _ => Err(IntpError::invalid_arguments(format!(
            "list has no method \"{name}\""
        ))
        .at(&args.location)),
    }
}

fn dict_method(map: &IndexMap<String, Value>, name: &str, args: &Args) -> IntpResult<Value> {
    match name {
        "has_key" => {
            let key = args.pos_str(0, "has_key")?;
            Ok(Value::Bool(map.contains_key(key)))
        }
        "keys" => {
            args.check_no_positional("keys")?;
            Ok(Value::List(
                map.keys().map(|k| Value::Str(k.clone())).collect(),
            ))
        }
        "get" => {
            args.check_pos_count("get", 1, Some(2))?;
            let key = args.pos_str(0, "get")?;
            match map.get(key) {
                Some(value) => Ok(value.clone()),
                None => match args.positional.get(1) {
                    Some(fallback) => Ok(fallback.clone()),
                    None => Err(IntpError::invalid_arguments(format!(
                        "key \"{key}\" is not in the dictionary"
                    ))
                    .at(&args.location)),
                },
            }
        }
        _ => Err(IntpError::invalid_arguments(format!(
            "dict has no method \"{name}\""
        ))
        .at(&args.location)),
    }
}
