use std::fs;

use indexmap::IndexMap;

use crate::args::Args;
use crate::errors::{IntpError, IntpResult};
use crate::interpreter::Interpreter;
use crate::modules::{ExtModule, ModuleReturnValue, ModuleState};
use crate::objects::downcast;
use crate::objects::file::FileObject;
use crate::value::Value;

/// Loads `KEY=VALUE` config fragments (kconfig-style) into a dict.
pub struct KeyvalModule;

impl KeyvalModule {
    fn parse(contents: &str) -> IndexMap<String, Value> {
        let mut out = IndexMap::new();
        for line in contents.lines() {
            let line = match line.find('#') {
                Some(idx) => &line[..idx],
                None => line,
            };
            let Some((name, value)) = line.split_once('=') else {
                continue;
            };
            out.insert(
                name.trim().to_owned(),
                Value::Str(value.trim().to_owned()),
            );
        }
        out
    }
}

impl ExtModule for KeyvalModule {
    fn name(&self) -> &'static str {
        "keyval"
    }

    fn call(
        &self,
        method: &str,
        state: &ModuleState,
        args: &Args,
        interp: &mut Interpreter,
    ) -> IntpResult<ModuleReturnValue> {
        if method != "load" {
            return Err(IntpError::invalid_arguments(format!(
                "keyval module has no method \"{method}\""
            ))
            .at(&args.location));
        }
        args.check_no_kwargs("keyval.load")?;
        args.check_pos_count("keyval.load", 1, Some(1))?;

        let (path, is_built) = match args.pos(0, "keyval.load")? {
            Value::Str(raw) => (state.source_root.join(&state.subdir).join(raw), false),
            Value::Object(obj) => {
                let file = downcast::<FileObject>(obj).ok_or_else(|| {
                    IntpError::invalid_arguments("keyval.load takes one file input")
                        .at(&args.location)
                })?;
                (
                    file.file.absolute_path(&state.source_root, &state.build_root),
                    file.file.is_built,
                )
            }
            other => {
                return Err(IntpError::invalid_arguments(format!(
                    "keyval.load takes a string or a file, got {}",
                    other.type_name()
                ))
                .at(&args.location));
            }
        };

        let contents = fs::read_to_string(&path).map_err(|e| {
            IntpError::runtime(format!("failed to load {}: {e}", path.display()))
                .at(&args.location)
        })?;

        // Generated inputs re-parse on every build anyway; source inputs
        // must trigger a reconfigure when edited.
        if !is_built {
            interp.build.borrow_mut().add_build_def_file(path);
        }

        Ok(ModuleReturnValue::plain(Value::Dict(Self::parse(&contents))))
    }
}
