use std::any::Any;
use std::rc::Rc;

use mortar_kernel::targets::IncludeDirs;

use crate::args::Args;
use crate::errors::IntpResult;
use crate::interpreter::Interpreter;
use crate::objects::{Object, rc_entity_id, unknown_method};
use crate::value::Value;

pub struct IncludeDirsObject {
    pub incdirs: Rc<IncludeDirs>,
}

impl IncludeDirsObject {
    pub fn new(incdirs: IncludeDirs) -> Self {
        Self {
            incdirs: Rc::new(incdirs),
        }
    }
}

impl Object for IncludeDirsObject {
    fn kind(&self) -> &'static str {
        "include_directories"
    }

    fn entity_id(&self) -> usize {
        rc_entity_id(&self.incdirs)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn call_method(&self, name: &str, args: &Args, _interp: &mut Interpreter) -> IntpResult<Value> {
        Err(unknown_method(self.kind(), name, args))
    }
}
