use std::any::Any;
use std::rc::Rc;

use crate::args::Args;
use crate::errors::IntpResult;
use crate::interpreter::Interpreter;
use crate::modules::{self, ExtModule};
use crate::objects::Object;
use crate::value::Value;

/// Handle of a loaded extension module, as returned by `import()`.
pub struct ModuleObject {
    pub module: Rc<dyn ExtModule>,
}

impl ModuleObject {
    pub fn new(module: Rc<dyn ExtModule>) -> Self {
        Self { module }
    }
}

impl Object for ModuleObject {
    fn kind(&self) -> &'static str {
        "module"
    }

    fn entity_id(&self) -> usize {
        Rc::as_ptr(&self.module) as *const () as usize
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn call_method(&self, name: &str, args: &Args, interp: &mut Interpreter) -> IntpResult<Value> {
        modules::dispatch(interp, &self.module, name, args)
    }
}
