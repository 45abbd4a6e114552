use std::rc::Rc;

use mortar_kernel::targets::{ConfValue, EnvOp};

use crate::args::Args;
use crate::errors::{IntpError, IntpResult};
use crate::objects::config_data::ConfigDataObject;
use crate::objects::envvars::EnvVarsObject;
use crate::value::Value;

pub fn configuration_data(args: &Args) -> IntpResult<Value> {
    let object = ConfigDataObject::new();
    if let Some(initial) = args.positional.first() {
        let Value::Dict(map) = initial else {
            return Err(IntpError::invalid_arguments(format!(
                "configuration_data takes a dict, got {}",
                initial.type_name()
            ))
            .at(&args.location));
        };
        let mut values = object.values.borrow_mut();
        for (key, value) in map {
            let conf = match value {
                Value::Str(s) => ConfValue::Str(s.clone()),
                Value::Int(i) => ConfValue::Int(*i),
                Value::Bool(b) => ConfValue::Bool(*b),
                other => {
                    return Err(IntpError::invalid_arguments(format!(
                        "configuration values must be strings, integers or booleans, got {}",
                        other.type_name()
                    ))
                    .at(&args.location));
                }
            };
            values.set(key.clone(), conf, None);
        }
    }
    Ok(Value::Object(Rc::new(object)))
}

pub fn environment(args: &Args) -> IntpResult<Value> {
    let object = EnvVarsObject::new();
    if let Some(initial) = args.positional.first() {
        let Value::Dict(map) = initial else {
            return Err(IntpError::invalid_arguments(format!(
                "environment takes a dict, got {}",
                initial.type_name()
            ))
            .at(&args.location));
        };
        let mut env = object.env.borrow_mut();
        for (key, value) in map {
            let text = value.as_str().ok_or_else(|| {
                IntpError::invalid_arguments("environment dict values must be strings")
                    .at(&args.location)
            })?;
            env.push(EnvOp::Set, key.clone(), vec![text.to_owned()], ":".to_owned());
        }
    }
    Ok(Value::Object(Rc::new(object)))
}
