use std::any::Any;
use std::rc::Rc;

use mortar_kernel::deps::{DepOrigin, Dependency, IncludeType};

use crate::args::Args;
use crate::errors::{IntpError, IntpResult};
use crate::interpreter::Interpreter;
use crate::objects::{Object, rc_entity_id, unknown_method};
use crate::value::Value;

/// Handle of a dependency record owned by the build accumulator. Two
/// handles compare equal when they wrap the same record, which is what makes
/// repeated `dependency()` calls observably idempotent.
pub struct DependencyObject {
    pub dep: Rc<Dependency>,
}

impl DependencyObject {
    pub fn new(dep: Rc<Dependency>) -> Self {
        Self { dep }
    }
}

impl Object for DependencyObject {
    fn kind(&self) -> &'static str {
        "dependency"
    }

    fn entity_id(&self) -> usize {
        rc_entity_id(&self.dep)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn call_method(&self, name: &str, args: &Args, _interp: &mut Interpreter) -> IntpResult<Value> {
        match name {
            "found" => {
                args.check_no_positional("found")?;
                Ok(Value::Bool(self.dep.found()))
            }
            "name" => Ok(Value::Str(self.dep.name.clone())),
            "version" => Ok(Value::Str(self.dep.version_or_undefined().to_owned())),
            "type_name" => {
                let label = match &self.dep.origin {
                    DepOrigin::External => "external",
                    DepOrigin::Internal { .. } => "internal",
                    DepOrigin::NotFound => "not-found",
                };
                Ok(Value::Str(label.to_owned()))
            }
            "include_type" => Ok(Value::Str(self.dep.include_type.as_str().to_owned())),
            "get_variable" => {
                args.check_pos_count("get_variable", 0, Some(1))?;
                let mut candidates: Vec<String> = Vec::new();
                if let Some(positional) = args.positional.first() {
                    let name = positional.as_str().ok_or_else(|| {
                        IntpError::invalid_arguments("get_variable expects a string variable name")
                            .at(&args.location)
                    })?;
                    candidates.push(name.to_owned());
                }
                for key in ["internal", "pkgconfig", "cmake"] {
                    if let Some(name) = args.kw_str(key)? {
                        candidates.push(name);
                    }
                }
                for candidate in &candidates {
                    if let Some(value) = self.dep.get_variable(candidate) {
                        return Ok(Value::Str(value.to_owned()));
                    }
                }
                if let Some(default) = args.kw_str("default_value")? {
                    return Ok(Value::Str(default));
                }
                Err(IntpError::runtime(format!(
                    "could not get a variable from dependency \"{}\": tried [{}]",
                    self.dep.name,
                    candidates.join(", ")
                ))
                .at(&args.location))
            }
            "as_system" => {
                args.check_pos_count("as_system", 0, Some(1))?;
                let requested = match args.positional.first() {
                    None => IncludeType::System,
                    Some(value) => {
                        let text = value.as_str().ok_or_else(|| {
                            IntpError::invalid_arguments("as_system expects a string").at(&args.location)
                        })?;
                        IncludeType::parse(text).ok_or_else(|| {
                            IntpError::invalid_arguments(format!(
                                "unknown include type \"{text}\""
                            ))
                            .at(&args.location)
                        })?
                    }
                };
                let mut copy = (*self.dep).clone();
                copy.include_type = requested;
                Ok(Value::Object(Rc::new(DependencyObject::new(Rc::new(copy)))))
            }
            _ => Err(unknown_method(self.kind(), name, args)),
        }
    }
}
