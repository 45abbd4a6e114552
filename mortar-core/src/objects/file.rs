use std::any::Any;
use std::rc::Rc;

use mortar_kernel::targets::FileRef;

use crate::args::Args;
use crate::errors::IntpResult;
use crate::interpreter::Interpreter;
use crate::objects::{Object, rc_entity_id, unknown_method};
use crate::value::Value;

/// A file in the source or build tree, produced by `files()` and accepted
/// everywhere sources are.
pub struct FileObject {
    pub file: Rc<FileRef>,
    subproject: String,
}

impl FileObject {
    pub fn new(file: FileRef, subproject: impl Into<String>) -> Self {
        Self {
            file: Rc::new(file),
            subproject: subproject.into(),
        }
    }
}

impl Object for FileObject {
    fn kind(&self) -> &'static str {
        "file"
    }

    fn entity_id(&self) -> usize {
        rc_entity_id(&self.file)
    }

    fn origin_subproject(&self) -> Option<&str> {
        Some(&self.subproject)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn call_method(&self, name: &str, args: &Args, interp: &mut Interpreter) -> IntpResult<Value> {
        match name {
            "full_path" => {
                args.check_no_positional("full_path")?;
                let path = self
                    .file
                    .absolute_path(&interp.env.source_root, &interp.env.build_root);
                Ok(Value::Str(path.to_string_lossy().into_owned()))
            }
            _ => Err(unknown_method(self.kind(), name, args)),
        }
    }
}
