use std::any::Any;
use std::rc::Rc;

use crate::args::Args;
use crate::errors::{IntpError, IntpResult};
use crate::interpreter::Interpreter;
use crate::value::Value;

pub mod compiler;
pub mod config_data;
pub mod dependency;
pub mod envvars;
pub mod feature;
pub mod file;
pub mod generator;
pub mod include_dirs;
pub mod machine;
pub mod meson;
pub mod module;
pub mod program;
pub mod run_result;
pub mod subproject;
pub mod target;

/// A DSL-visible object: a kind tag plus a method table realized as a
/// `call_method` match. Handles are reference-shared; two handles are equal
/// when they wrap the same underlying entity.
pub trait Object {
    fn kind(&self) -> &'static str;

    /// Address of the shared entity, used for handle equality. Re-wrapping
    /// the same entity must yield the same id.
    fn entity_id(&self) -> usize;

    /// Subproject the object originated in, when sandbox checks care.
    fn origin_subproject(&self) -> Option<&str> {
        None
    }

    fn as_any(&self) -> &dyn Any;

    fn call_method(&self, name: &str, args: &Args, interp: &mut Interpreter) -> IntpResult<Value>;
}

pub type ObjectHandle = Rc<dyn Object>;

pub fn objects_equal(a: &ObjectHandle, b: &ObjectHandle) -> bool {
    a.kind() == b.kind() && a.entity_id() == b.entity_id()
}

pub fn rc_entity_id<T: ?Sized>(rc: &Rc<T>) -> usize {
    Rc::as_ptr(rc) as *const () as usize
}

pub fn unknown_method(kind: &str, name: &str, args: &Args) -> IntpError {
    IntpError::invalid_arguments(format!("{kind} object has no method \"{name}\"")).at(&args.location)
}

/// Downcast helper for call sites that require a specific object kind.
pub fn downcast<'a, T: 'static>(handle: &'a ObjectHandle) -> Option<&'a T> {
    handle.as_any().downcast_ref::<T>()
}
