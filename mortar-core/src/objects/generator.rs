use std::any::Any;
use std::path::Path;
use std::rc::Rc;

use mortar_kernel::targets::{FileRef, Generator};

use crate::args::Args;
use crate::errors::{IntpError, IntpResult};
use crate::interpreter::Interpreter;
use crate::objects::file::FileObject;
use crate::objects::{Object, downcast, rc_entity_id, unknown_method};
use crate::value::Value;

pub struct GeneratorObject {
    pub generator: Rc<Generator>,
}

impl GeneratorObject {
    pub fn new(generator: Generator) -> Self {
        Self {
            generator: Rc::new(generator),
        }
    }
}

impl Object for GeneratorObject {
    fn kind(&self) -> &'static str {
        "generator"
    }

    fn entity_id(&self) -> usize {
        rc_entity_id(&self.generator)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn call_method(&self, name: &str, args: &Args, interp: &mut Interpreter) -> IntpResult<Value> {
        match name {
            "process" => {
                args.check_pos_count("process", 1, None)?;
                let mut inputs = Vec::new();
                for value in &args.positional {
                    match value {
                        Value::Str(s) => {
                            inputs.push(FileRef::in_source(interp.subdir.clone(), s.clone()))
                        }
                        Value::Object(obj) => {
                            let file = downcast::<FileObject>(obj).ok_or_else(|| {
                                IntpError::invalid_arguments(format!(
                                    "generator process() accepts strings and files, got {}",
                                    obj.kind()
                                ))
                                .at(&args.location)
                            })?;
                            inputs.push((*file.file).clone());
                        }
                        other => {
                            return Err(IntpError::invalid_arguments(format!(
                                "generator process() accepts strings and files, got {}",
                                other.type_name()
                            ))
                            .at(&args.location));
                        }
                    }
                }
                Ok(Value::Object(Rc::new(GeneratedListObject {
                    generator: self.generator.clone(),
                    inputs: Rc::new(inputs),
                    subdir: interp.subdir.clone(),
                })))
            }
            _ => Err(unknown_method(self.kind(), name, args)),
        }
    }
}

/// Result of `generator.process(...)`: the input set bound to the generator
/// that will transform it. Targets consume it as a source list.
pub struct GeneratedListObject {
    pub generator: Rc<Generator>,
    pub inputs: Rc<Vec<FileRef>>,
    pub subdir: String,
}

impl GeneratedListObject {
    /// The build-tree files this list will materialize as, with `@BASENAME@`
    /// and `@PLAINNAME@` expanded per input.
    pub fn output_files(&self) -> Vec<FileRef> {
        let mut out = Vec::new();
        for input in self.inputs.iter() {
            let plain = input.fname.as_str();
            let base = Path::new(plain)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| plain.to_owned());
            let plain_name = Path::new(plain)
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| plain.to_owned());
            for template in &self.generator.outputs {
                let fname = template
                    .replace("@BASENAME@", &base)
                    .replace("@PLAINNAME@", &plain_name);
                out.push(FileRef::in_build(self.subdir.clone(), fname));
            }
        }
        out
    }
}

impl Object for GeneratedListObject {
    fn kind(&self) -> &'static str {
        "generated_list"
    }

    fn entity_id(&self) -> usize {
        rc_entity_id(&self.inputs)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn call_method(&self, name: &str, args: &Args, _interp: &mut Interpreter) -> IntpResult<Value> {
        Err(unknown_method(self.kind(), name, args))
    }
}
