use std::any::Any;
use std::rc::Rc;

use mortar_kernel::ports::CommandOutput;

use crate::args::Args;
use crate::errors::IntpResult;
use crate::interpreter::Interpreter;
use crate::objects::{Object, rc_entity_id, unknown_method};
use crate::value::Value;

/// Result of a `run_command()` invocation.
pub struct RunResultObject {
    pub output: Rc<CommandOutput>,
}

impl RunResultObject {
    pub fn new(output: CommandOutput) -> Self {
        Self {
            output: Rc::new(output),
        }
    }
}

/// Result of a compiler `run()` probe; also reports whether the snippet
/// compiled at all.
pub struct TryRunObject {
    pub result: Rc<mortar_kernel::ports::RunResult>,
}

impl TryRunObject {
    pub fn new(result: mortar_kernel::ports::RunResult) -> Self {
        Self {
            result: Rc::new(result),
        }
    }
}

impl Object for TryRunObject {
    fn kind(&self) -> &'static str {
        "run_result"
    }

    fn entity_id(&self) -> usize {
        rc_entity_id(&self.result)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn call_method(&self, name: &str, args: &Args, _interp: &mut Interpreter) -> IntpResult<Value> {
        args.check_no_positional(name)?;
        args.check_no_kwargs(name)?;
        match name {
            "compiled" => Ok(Value::Bool(self.result.compiled)),
            "returncode" => Ok(Value::Int(self.result.returncode as i64)),
            "stdout" => Ok(Value::Str(self.result.stdout.clone())),
            "stderr" => Ok(Value::Str(self.result.stderr.clone())),
            _ => Err(unknown_method(self.kind(), name, args)),
        }
    }
}

impl Object for RunResultObject {
    fn kind(&self) -> &'static str {
        "run_result"
    }

    fn entity_id(&self) -> usize {
        rc_entity_id(&self.output)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn call_method(&self, name: &str, args: &Args, _interp: &mut Interpreter) -> IntpResult<Value> {
        args.check_no_positional(name)?;
        args.check_no_kwargs(name)?;
        match name {
            "returncode" => Ok(Value::Int(self.output.returncode as i64)),
            "stdout" => Ok(Value::Str(self.output.stdout.clone())),
            "stderr" => Ok(Value::Str(self.output.stderr.clone())),
            _ => Err(unknown_method(self.kind(), name, args)),
        }
    }
}
