use std::any::Any;
use std::rc::Rc;

use mortar_kernel::options::FeatureState;

use crate::args::Args;
use crate::errors::IntpResult;
use crate::interpreter::Interpreter;
use crate::objects::{Object, rc_entity_id, unknown_method};
use crate::value::Value;

/// Handle of a tri-state feature option as returned by `get_option()`.
pub struct FeatureObject {
    pub name: String,
    pub state: Rc<FeatureState>,
}

impl FeatureObject {
    pub fn new(name: impl Into<String>, state: FeatureState) -> Self {
        Self {
            name: name.into(),
            state: Rc::new(state),
        }
    }
}

impl Object for FeatureObject {
    fn kind(&self) -> &'static str {
        "feature"
    }

    fn entity_id(&self) -> usize {
        rc_entity_id(&self.state)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn call_method(&self, name: &str, args: &Args, _interp: &mut Interpreter) -> IntpResult<Value> {
        args.check_no_positional(name)?;
        args.check_no_kwargs(name)?;
        match name {
            "enabled" => Ok(Value::Bool(*self.state == FeatureState::Enabled)),
            "disabled" => Ok(Value::Bool(*self.state == FeatureState::Disabled)),
            "auto" => Ok(Value::Bool(*self.state == FeatureState::Auto)),
            "allowed" => Ok(Value::Bool(*self.state != FeatureState::Disabled)),
            _ => Err(unknown_method(self.kind(), name, args)),
        }
    }
}
