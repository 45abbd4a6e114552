use mortar_dsl::ast::{ArithmeticOp, ComparisonOp};
use mortar_dsl::diagnostics::Location;

use crate::errors::{IntpError, IntpResult};
use crate::value::{Value, values_equal};

/// `+ - * / %`. Addition is overloaded per the language rules; the rest are
/// integer-only. Any Disabler operand short-circuits the whole expression.
pub fn arithmetic(
    op: ArithmeticOp,
    left: Value,
    right: Value,
    location: &Location,
) -> IntpResult<Value> {
    if left.is_disabler() || right.is_disabler() {
        return Ok(Value::Disabler);
    }

    if op == ArithmeticOp::Add {
        return add(left, right, location);
    }

    let (Value::Int(l), Value::Int(r)) = (&left, &right) else {
        return Err(IntpError::invalid_arguments(format!(
            "operator \"{}\" requires integer operands, got {} and {}",
            op.symbol(),
            left.type_name(),
            right.type_name()
        ))
        .at(location));
    };

    let result = match op {
        ArithmeticOp::Sub => l - r,
        ArithmeticOp::Mul => l * r,
        ArithmeticOp::Div => {
            if *r == 0 {
                return Err(IntpError::invalid_arguments("division by zero").at(location));
            }
            l / r
        }
        ArithmeticOp::Mod => {
            if *r == 0 {
                return Err(IntpError::invalid_arguments("modulo by zero").at(location));
            }
            l % r
        }
        ArithmeticOp::Add => unreachable!(),
    };
    Ok(Value::Int(result))
}

fn add(left: Value, right: Value, location: &Location) -> IntpResult<Value> {
    match (left, right) {
        (Value::Int(l), Value::Int(r)) => Ok(Value::Int(l + r)),
        (Value::Str(l), Value::Str(r)) => Ok(Value::Str(l + &r)),
        (Value::List(mut l), Value::List(r)) => {
            l.extend(r);
            Ok(Value::List(l))
        }
        // list + anything appends the right operand.
        (Value::List(mut l), r) => {
            l.push(r);
            Ok(Value::List(l))
        }
        (Value::Dict(mut l), Value::Dict(r)) => {
            for (k, v) in r {
                l.insert(k, v);
            }
            Ok(Value::Dict(l))
        }
        (l, r) => Err(IntpError::invalid_arguments(format!(
            "operator \"+\" cannot combine {} and {}",
            l.type_name(),
            r.type_name()
        ))
        .at(location)),
    }
}

pub fn comparison(
    op: ComparisonOp,
    left: Value,
    right: Value,
    location: &Location,
) -> IntpResult<Value> {
    if left.is_disabler() || right.is_disabler() {
        return Ok(Value::Disabler);
    }

    match op {
        ComparisonOp::Eq | ComparisonOp::NotEq => {
            let equal = values_equal(&left, &right);
            Ok(Value::Bool(if op == ComparisonOp::Eq {
                equal
            } else {
                !equal
            }))
        }
        ComparisonOp::In | ComparisonOp::NotIn => {
            let contained = membership(&left, &right, location)?;
            Ok(Value::Bool(if op == ComparisonOp::In {
                contained
            } else {
                !contained
            }))
        }
        _ => ordering(op, left, right, location),
    }
}

fn ordering(op: ComparisonOp, left: Value, right: Value, location: &Location) -> IntpResult<Value> {
    let result = match (&left, &right) {
        (Value::Int(l), Value::Int(r)) => match op {
            ComparisonOp::Lt => l < r,
            ComparisonOp::LtEq => l <= r,
            ComparisonOp::Gt => l > r,
            ComparisonOp::GtEq => l >= r,
            _ => unreachable!(),
        },
        (Value::Str(l), Value::Str(r)) => match op {
            ComparisonOp::Lt => l < r,
            ComparisonOp::LtEq => l <= r,
            ComparisonOp::Gt => l > r,
            ComparisonOp::GtEq => l >= r,
            _ => unreachable!(),
        },
        _ => {
            return Err(IntpError::invalid_arguments(format!(
                "operator \"{}\" requires two integers or two strings, got {} and {}",
                op.symbol(),
                left.type_name(),
                right.type_name()
            ))
            .at(location));
        }
    };
    Ok(Value::Bool(result))
}

fn membership(left: &Value, right: &Value, location: &Location) -> IntpResult<bool> {
    match right {
        Value::List(items) => Ok(items.iter().any(|item| values_equal(item, left))),
        Value::Dict(map) => {
            let key = left.as_str().ok_or_else(|| {
                IntpError::invalid_arguments(format!(
                    "dict membership test requires a string key, got {}",
                    left.type_name()
                ))
                .at(location)
            })?;
            Ok(map.contains_key(key))
        }
        Value::Str(haystack) => {
            let needle = left.as_str().ok_or_else(|| {
                IntpError::invalid_arguments(format!(
                    "substring test requires a string, got {}",
                    left.type_name()
                ))
                .at(location)
            })?;
            Ok(haystack.contains(needle))
        }
        other => Err(IntpError::invalid_arguments(format!(
            "operator \"in\" requires a list, dict or string on the right, got {}",
            other.type_name()
        ))
        .at(location)),
    }
}

pub fn unary_not(value: Value, location: &Location) -> IntpResult<Value> {
    match value {
        Value::Disabler => Ok(Value::Disabler),
        Value::Bool(b) => Ok(Value::Bool(!b)),
        other => Err(IntpError::invalid_arguments(format!(
            "operator \"not\" requires a boolean, got {}",
            other.type_name()
        ))
        .at(location)),
    }
}

pub fn unary_minus(value: Value, location: &Location) -> IntpResult<Value> {
    match value {
        Value::Disabler => Ok(Value::Disabler),
        Value::Int(i) => Ok(Value::Int(-i)),
        other => Err(IntpError::invalid_arguments(format!(
            "operator \"-\" requires an integer, got {}",
            other.type_name()
        ))
        .at(location)),
    }
}

/// `container[index]`: 0-based list indexing with negative wrap-around,
/// dict key lookup failing on absence, and 1-char string indexing.
pub fn index(container: Value, index: Value, location: &Location) -> IntpResult<Value> {
    if container.is_disabler() || index.is_disabler() {
        return Ok(Value::Disabler);
    }

    match container {
        Value::List(items) => {
            let idx = resolve_index(&index, items.len(), location)?;
            Ok(items[idx].clone())
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let idx = resolve_index(&index, chars.len(), location)?;
            Ok(Value::Str(chars[idx].to_string()))
        }
        Value::Dict(map) => {
            let key = index.as_str().ok_or_else(|| {
                IntpError::invalid_arguments(format!(
                    "dict index must be a string, got {}",
                    index.type_name()
                ))
                .at(location)
            })?;
            map.get(key).cloned().ok_or_else(|| {
                IntpError::invalid_arguments(format!("key \"{key}\" is not in the dictionary"))
                    .at(location)
            })
        }
        other => Err(IntpError::invalid_arguments(format!(
            "type {} is not indexable",
            other.type_name()
        ))
        .at(location)),
    }
}

fn resolve_index(index: &Value, len: usize, location: &Location) -> IntpResult<usize> {
    let raw = index.as_int().ok_or_else(|| {
        IntpError::invalid_arguments(format!(
            "index must be an integer, got {}",
            index.type_name()
        ))
        .at(location)
    })?;

    let resolved = if raw < 0 { raw + len as i64 } else { raw };
    if resolved < 0 || resolved as usize >= len {
        return Err(
            IntpError::invalid_arguments(format!("index {raw} is out of bounds (length {len})"))
                .at(location),
        );
    }
    Ok(resolved as usize)
}
