use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use mortar_kernel::targets::{ConfValue, ConfigurationValues};

use crate::args::Args;
use crate::errors::{IntpError, IntpResult};
use crate::interpreter::Interpreter;
use crate::objects::{Object, rc_entity_id, unknown_method};
use crate::value::Value;

/// Holder of a `configuration_data()` record. The record freezes on its
/// first consuming use (configure-file); mutating it afterwards fails.
pub struct ConfigDataObject {
    pub values: Rc<RefCell<ConfigurationValues>>,
    pub frozen: Rc<Cell<bool>>,
}

impl ConfigDataObject {
    pub fn new() -> Self {
        Self {
            values: Rc::new(RefCell::new(ConfigurationValues::default())),
            frozen: Rc::new(Cell::new(false)),
        }
    }

    pub fn freeze(&self) {
        self.frozen.set(true);
    }

    fn check_mutable(&self, args: &Args) -> IntpResult<()> {
        if self.frozen.get() {
            Err(IntpError::invalid_code(
                "cannot modify a configuration object that has already been used",
            )
            .at(&args.location))
        } else {
            Ok(())
        }
    }

    fn set_args(args: &Args) -> IntpResult<(String, &Value)> {
        args.check_pos_count("set", 2, Some(2))?;
        let name = args.pos_str(0, "set")?.to_owned();
        Ok((name, args.pos(1, "set")?))
    }

    fn comment(args: &Args) -> IntpResult<Option<String>> {
        args.kw_str("description")
    }
}

impl Default for ConfigDataObject {
    fn default() -> Self {
        Self::new()
    }
}

impl Object for ConfigDataObject {
    fn kind(&self) -> &'static str {
        "configuration_data"
    }

    fn entity_id(&self) -> usize {
        rc_entity_id(&self.values)
    }

    fn as_any(&self) -> &dyn Any {
        &*self
    }

    fn call_method(&self, name: &str, args: &Args, _interp: &mut Interpreter) -> IntpResult<Value> {
        match name {
            "set" => {
                self.check_mutable(args)?;
                let (key, value) = Self::set_args(args)?;
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
                self.values
                    .borrow_mut()
                    .set(key, conf, Self::comment(args)?);
                Ok(Value::Null)
            }
            "set10" => {
                self.check_mutable(args)?;
                let (key, value) = Self::set_args(args)?;
                let truthy = match value {
                    Value::Bool(b) => *b,
                    Value::Int(i) => *i != 0,
                    other => {
                        return Err(IntpError::invalid_arguments(format!(
                            "set10 expects a boolean or integer, got {}",
                            other.type_name()
                        ))
                        .at(&args.location));
                    }
                };
                self.values.borrow_mut().set(
                    key,
                    ConfValue::Int(if truthy { 1 } else { 0 }),
                    Self::comment(args)?,
                );
                Ok(Value::Null)
            }
            "set_quoted" => {
                self.check_mutable(args)?;
                let (key, value) = Self::set_args(args)?;
                let Value::Str(s) = value else {
                    return Err(IntpError::invalid_arguments(format!(
                        "set_quoted expects a string value, got {}",
                        value.type_name()
                    ))
                    .at(&args.location));
                };
                let escaped = s.replace('\\', "\\\\").replace('"', "\\\"");
                self.values.borrow_mut().set(
                    key,
                    ConfValue::Str(format!("\"{escaped}\"")),
                    Self::comment(args)?,
                );
                Ok(Value::Null)
            }
            "get" => {
                args.check_pos_count("get", 1, Some(2))?;
                let key = args.pos_str(0, "get")?;
                match self.values.borrow().get(key) {
                    Some(entry) => Ok(conf_to_value(&entry.value)),
                    None => match args.positional.get(1) {
                        Some(default) => Ok(default.clone()),
                        None => Err(IntpError::invalid_arguments(format!(
                            "entry \"{key}\" not in configuration data"
                        ))
                        .at(&args.location)),
                    },
                }
            }
            "get_unquoted" => {
                args.check_pos_count("get_unquoted", 1, Some(2))?;
                let key = args.pos_str(0, "get_unquoted")?;
                let entry = self.values.borrow().get(key).cloned();
                match entry {
                    Some(entry) => {
                        let value = conf_to_value(&entry.value);
                        match value {
                            Value::Str(s) => {
                                let unquoted = s
                                    .strip_prefix('"')
                                    .and_then(|s| s.strip_suffix('"'))
                                    .map(str::to_owned)
                                    .unwrap_or(s);
                                Ok(Value::Str(unquoted))
                            }
                            other => Ok(other),
                        }
                    }
                    None => match args.positional.get(1) {
                        Some(default) => Ok(default.clone()),
                        None => Err(IntpError::invalid_arguments(format!(
                            "entry \"{key}\" not in configuration data"
                        ))
                        .at(&args.location)),
                    },
                }
            }
            "has" => {
                args.check_pos_count("has", 1, Some(1))?;
                let key = args.pos_str(0, "has")?;
                Ok(Value::Bool(self.values.borrow().get(key).is_some()))
            }
            "keys" => {
                args.check_no_positional("keys")?;
                let keys: Vec<Value> = self
                    .values
                    .borrow()
                    .values
                    .keys()
                    .map(|k| Value::Str(k.clone()))
                    .collect();
                Ok(Value::List(keys))
            }
            "merge_from" => {
                self.check_mutable(args)?;
                args.check_pos_count("merge_from", 1, Some(1))?;
                let other = args.pos(0, "merge_from")?;
                let other = other
                    .as_object()
                    .and_then(crate::objects::downcast::<ConfigDataObject>)
                    .ok_or_else(|| {
                        IntpError::invalid_arguments(
                            "merge_from expects a configuration_data object",
                        )
                        .at(&args.location)
                    })?;
                let imported = other.values.borrow().clone();
                let mut ours = self.values.borrow_mut();
                for (key, entry) in imported.values {
                    ours.values.insert(key, entry);
                }
                Ok(Value::Null)
            }
            _ => Err(unknown_method(self.kind(), name, args)),
        }
    }
}

fn conf_to_value(conf: &ConfValue) -> Value {
    match conf {
        ConfValue::Bool(b) => Value::Bool(*b),
        ConfValue::Int(i) => Value::Int(*i),
        ConfValue::Str(s) => Value::Str(s.clone()),
    }
}
