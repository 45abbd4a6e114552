use std::any::Any;
use std::rc::Rc;

use mortar_kernel::targets::ExternalProgram;
use mortar_kernel::version::UNDEFINED_VERSION;

use crate::args::Args;
use crate::errors::{IntpError, IntpResult};
use crate::interpreter::Interpreter;
use crate::objects::{Object, rc_entity_id, unknown_method};
use crate::value::Value;

/// Handle of an external program found by `find_program()` or registered
/// through `meson.override_find_program()`.
pub struct ProgramObject {
    pub program: Rc<ExternalProgram>,
}

impl ProgramObject {
    pub fn new(program: Rc<ExternalProgram>) -> Self {
        Self { program }
    }

    fn check_found(&self, args: &Args, what: &str) -> IntpResult<()> {
        if self.program.found() {
            Ok(())
        } else {
            Err(IntpError::runtime(format!(
                "program \"{}\" was not found, {what} is not available",
                self.program.name
            ))
            .at(&args.location))
        }
    }
}

impl Object for ProgramObject {
    fn kind(&self) -> &'static str {
        "external_program"
    }

    fn entity_id(&self) -> usize {
        rc_entity_id(&self.program)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn call_method(&self, name: &str, args: &Args, _interp: &mut Interpreter) -> IntpResult<Value> {
        match name {
            "found" => {
                args.check_no_positional("found")?;
                Ok(Value::Bool(self.program.found()))
            }
            "full_path" => {
                self.check_found(args, "full_path()")?;
                Ok(Value::Str(self.program.command[0].clone()))
            }
            "version" => {
                self.check_found(args, "version()")?;
                Ok(Value::Str(
                    self.program
                        .version
                        .clone()
                        .unwrap_or_else(|| UNDEFINED_VERSION.to_owned()),
                ))
            }
            _ => Err(unknown_method(self.kind(), name, args)),
        }
    }
}
