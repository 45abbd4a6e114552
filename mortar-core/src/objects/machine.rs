use std::any::Any;
use std::rc::Rc;

use mortar_kernel::machines::MachineInfo;

use crate::args::Args;
use crate::errors::IntpResult;
use crate::interpreter::Interpreter;
use crate::objects::{Object, rc_entity_id, unknown_method};
use crate::value::Value;

/// `build_machine` / `host_machine` / `target_machine`.
pub struct MachineObject {
    pub info: Rc<MachineInfo>,
}

impl MachineObject {
    pub fn new(info: Rc<MachineInfo>) -> Self {
        Self { info }
    }
}

impl Object for MachineObject {
    fn kind(&self) -> &'static str {
        "machine"
    }

    fn entity_id(&self) -> usize {
        rc_entity_id(&self.info)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn call_method(&self, name: &str, args: &Args, _interp: &mut Interpreter) -> IntpResult<Value> {
        args.check_no_positional(name)?;
        args.check_no_kwargs(name)?;
        match name {
            "system" => Ok(Value::Str(self.info.system.clone())),
            "cpu_family" => Ok(Value::Str(self.info.cpu_family.clone())),
            "cpu" => Ok(Value::Str(self.info.cpu.clone())),
            "endian" => Ok(Value::Str(self.info.endian.as_str().to_owned())),
            _ => Err(unknown_method(self.kind(), name, args)),
        }
    }
}
