use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use mortar_kernel::targets::{EnvOp, EnvironmentVariables};

use crate::args::Args;
use crate::errors::{IntpError, IntpResult};
use crate::interpreter::Interpreter;
use crate::objects::{Object, rc_entity_id, unknown_method};
use crate::value::Value;

/// Holder of an `environment()` record: an ordered list of set/append/
/// prepend operations, replayed by consumers.
pub struct EnvVarsObject {
    pub env: Rc<RefCell<EnvironmentVariables>>,
}

impl EnvVarsObject {
    pub fn new() -> Self {
        Self {
            env: Rc::new(RefCell::new(EnvironmentVariables::default())),
        }
    }

    pub fn from_record(env: EnvironmentVariables) -> Self {
        Self {
            env: Rc::new(RefCell::new(env)),
        }
    }

    fn apply(&self, op: EnvOp, args: &Args) -> IntpResult<Value> {
        args.check_pos_count("environment method", 2, None)?;
        let name = args.pos_str(0, "environment method")?.to_owned();
        let values: Vec<String> = args.positional[1..]
            .iter()
            .map(|value| {
                value.as_str().map(str::to_owned).ok_or_else(|| {
                    IntpError::invalid_arguments(format!(
                        "environment values must be strings, got {}",
                        value.type_name()
                    ))
                    .at(&args.location)
                })
            })
            .collect::<IntpResult<_>>()?;
        let separator = args.kw_str_or("separator", ":")?;
        self.env.borrow_mut().push(op, name, values, separator);
        Ok(Value::Null)
    }
}

impl Default for EnvVarsObject {
    fn default() -> Self {
        Self::new()
    }
}

impl Object for EnvVarsObject {
    fn kind(&self) -> &'static str {
        "environment"
    }

    fn entity_id(&self) -> usize {
        rc_entity_id(&self.env)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn call_method(&self, name: &str, args: &Args, _interp: &mut Interpreter) -> IntpResult<Value> {
        match name {
            "set" => self.apply(EnvOp::Set, args),
            "append" => self.apply(EnvOp::Append, args),
            "prepend" => self.apply(EnvOp::Prepend, args),
            _ => Err(unknown_method(self.kind(), name, args)),
        }
    }
}
