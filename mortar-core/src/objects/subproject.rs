use std::any::Any;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::args::Args;
use crate::errors::{IntpError, IntpResult};
use crate::interpreter::{Interpreter, SubprojectRecord};
use crate::objects::{Object, unknown_method};
use crate::value::Value;

/// Handle of a subproject as returned by `subproject()`. The record itself
/// lives in the shared run state; the handle carries only the name.
pub struct SubprojectObject {
    pub name: String,
}

impl SubprojectObject {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Object for SubprojectObject {
    fn kind(&self) -> &'static str {
        "subproject"
    }

    fn entity_id(&self) -> usize {
        let mut hasher = DefaultHasher::new();
        self.name.hash(&mut hasher);
        hasher.finish() as usize
    }

    fn call_method(&self, name: &str, args: &Args, interp: &mut Interpreter) -> IntpResult<Value> {
        match name {
            "found" => {
                args.check_no_positional("found")?;
                let shared = interp.shared.borrow();
                let found = matches!(
                    shared.subprojects.get(&self.name),
                    Some(SubprojectRecord::Resolved { .. })
                );
                Ok(Value::Bool(found))
            }
            "get_variable" => {
                args.check_pos_count("get_variable", 1, Some(2))?;
                let var_name = args.pos_str(0, "get_variable")?;
                let shared = interp.shared.borrow();
                match shared.subprojects.get(&self.name) {
                    Some(SubprojectRecord::Resolved { variables, .. }) => {
                        match variables.get(var_name) {
                            Some(value) => Ok(value.clone()),
                            None => match args.positional.get(1) {
                                Some(default) => Ok(default.clone()),
                                None => Err(IntpError::invalid_arguments(format!(
                                    "requested variable \"{var_name}\" not found in subproject \"{}\"",
                                    self.name
                                ))
                                .at(&args.location)),
                            },
                        }
                    }
                    _ => Err(IntpError::runtime(format!(
                        "subproject \"{}\" was not successfully configured, \
                         cannot read variables from it",
                        self.name
                    ))
                    .at(&args.location)),
                }
            }
            _ => Err(unknown_method(self.kind(), name, args)),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
