use std::any::Any;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use mortar_kernel::ports::Backend;

use crate::args::Args;
use crate::errors::{IntpError, IntpResult};
use crate::interpreter::Interpreter;
use crate::objects::{Object, unknown_method};
use crate::value::Value;

fn id_hash(target_id: &str) -> usize {
    let mut hasher = DefaultHasher::new();
    target_id.hash(&mut hasher);
    hasher.finish() as usize
}

/// Handle of a target owned by the build accumulator, addressed by its
/// stable id. The entity lives in the accumulator; the handle only carries
/// the key, so re-wrapping preserves identity.
pub struct TargetObject {
    pub target_id: String,
    pub name: String,
    pub subproject: String,
    kind_tag: &'static str,
}

impl TargetObject {
    pub fn build(target_id: String, name: String, subproject: String) -> Self {
        Self {
            target_id,
            name,
            subproject,
            kind_tag: "build_target",
        }
    }

    pub fn custom(target_id: String, name: String, subproject: String) -> Self {
        Self {
            target_id,
            name,
            subproject,
            kind_tag: "custom_target",
        }
    }

    pub fn run(target_id: String, name: String, subproject: String) -> Self {
        Self {
            target_id,
            name,
            subproject,
            kind_tag: "run_target",
        }
    }

    pub fn alias(target_id: String, name: String, subproject: String) -> Self {
        Self {
            target_id,
            name,
            subproject,
            kind_tag: "alias_target",
        }
    }
}

impl Object for TargetObject {
    fn kind(&self) -> &'static str {
        self.kind_tag
    }

    fn entity_id(&self) -> usize {
        id_hash(&self.target_id)
    }

    fn origin_subproject(&self) -> Option<&str> {
        Some(&self.subproject)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn call_method(&self, name: &str, args: &Args, interp: &mut Interpreter) -> IntpResult<Value> {
        match name {
            "name" => Ok(Value::Str(self.name.clone())),
            "found" => Ok(Value::Bool(true)),
            "full_path" => {
                args.check_no_positional("full_path")?;
                let build = interp.build.borrow();
                let target = build.get_target(&self.target_id).ok_or_else(|| {
                    IntpError::runtime(format!(
                        "target \"{}\" vanished from the build accumulator",
                        self.target_id
                    ))
                    .at(&args.location)
                })?;
                let build_root = interp.env.build_root.to_string_lossy().into_owned();
                Ok(Value::Str(
                    interp.ports.backend.get_target_filename_abs(target, &build_root),
                ))
            }
            "private_dir" => {
                args.check_no_positional("private_dir")?;
                let build = interp.build.borrow();
                let target = build.get_target(&self.target_id).ok_or_else(|| {
                    IntpError::runtime(format!(
                        "target \"{}\" vanished from the build accumulator",
                        self.target_id
                    ))
                    .at(&args.location)
                })?;
                Ok(Value::Str(
                    interp.ports.backend.get_target_private_dir(target),
                ))
            }
            _ => Err(unknown_method(self.kind(), name, args)),
        }
    }
}

/// The pair returned by `both_libraries()`. Method dispatch lands on the
/// shared half; the static half is explicitly reachable.
pub struct BothLibsObject {
    pub shared: Rc<TargetObject>,
    pub static_lib: Rc<TargetObject>,
}

impl Object for BothLibsObject {
    fn kind(&self) -> &'static str {
        "both_libraries"
    }

    fn entity_id(&self) -> usize {
        self.shared.entity_id()
    }

    fn origin_subproject(&self) -> Option<&str> {
        self.shared.origin_subproject()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn call_method(&self, name: &str, args: &Args, interp: &mut Interpreter) -> IntpResult<Value> {
        match name {
            "get_shared_lib" => Ok(Value::Object(self.shared.clone())),
            "get_static_lib" => Ok(Value::Object(self.static_lib.clone())),
            other => self.shared.call_method(other, args, interp),
        }
    }
}
