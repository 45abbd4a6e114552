use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::args::Args;
use crate::errors::{IntpError, IntpResult};
use crate::interpreter::Interpreter;
use crate::modules::{ExtModule, ModuleReturnValue, ModuleState};
use crate::objects::downcast;
use crate::objects::file::FileObject;
use crate::sandbox;
use crate::value::Value;

/// Filesystem helpers for build definitions. Reads obey the subproject
/// sandbox like every other source reference.
pub struct FsModule;

impl FsModule {
    fn resolve(state: &ModuleState, arg: &str) -> PathBuf {
        let path = Path::new(arg);
        if path.is_absolute() {
            sandbox::normalize(path)
        } else {
            sandbox::normalize(&state.source_root.join(&state.subdir).join(path))
        }
    }

    fn one_path<'a>(args: &'a Args, what: &str) -> IntpResult<&'a str> {
        args.check_pos_count(what, 1, Some(1))?;
        args.pos_str(0, what)
    }
}

impl ExtModule for FsModule {
    fn name(&self) -> &'static str {
        "fs"
    }

    fn call(
        &self,
        method: &str,
        state: &ModuleState,
        args: &Args,
        interp: &mut Interpreter,
    ) -> IntpResult<ModuleReturnValue> {
        let value = match method {
            "exists" => {
                let path = Self::resolve(state, Self::one_path(args, "fs.exists")?);
                Value::Bool(path.exists())
            }
            "is_file" => {
                let path = Self::resolve(state, Self::one_path(args, "fs.is_file")?);
                Value::Bool(path.is_file())
            }
            "is_dir" => {
                let path = Self::resolve(state, Self::one_path(args, "fs.is_dir")?);
                Value::Bool(path.is_dir())
            }
            "is_symlink" => {
                let path = Self::resolve(state, Self::one_path(args, "fs.is_symlink")?);
                Value::Bool(path.is_symlink())
            }
            "is_absolute" => {
                let raw = Self::one_path(args, "fs.is_absolute")?;
                Value::Bool(Path::new(raw).is_absolute())
            }
            "parent" => {
                let raw = Self::one_path(args, "fs.parent")?;
                let parent = Path::new(raw)
                    .parent()
                    .map(|p| p.to_string_lossy().into_owned())
                    .unwrap_or_default();
                Value::Str(if parent.is_empty() { ".".to_owned() } else { parent })
            }
            "name" => {
                let raw = Self::one_path(args, "fs.name")?;
                Value::Str(
                    Path::new(raw)
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                )
            }
            "stem" => {
                let raw = Self::one_path(args, "fs.stem")?;
                Value::Str(
                    Path::new(raw)
                        .file_stem()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                )
            }
            "replace_suffix" => {
                args.check_pos_count("fs.replace_suffix", 2, Some(2))?;
                let raw = args.pos_str(0, "fs.replace_suffix")?;
                let suffix = args.pos_str(1, "fs.replace_suffix")?;
                let mut path = PathBuf::from(raw);
                path.set_extension(suffix.trim_start_matches('.'));
                Value::Str(path.to_string_lossy().into_owned())
            }
            "size" => {
                let raw = Self::one_path(args, "fs.size")?;
                let path = Self::resolve(state, raw);
                let metadata = fs::metadata(&path).map_err(|e| {
                    IntpError::runtime(format!("fs.size of \"{raw}\": {e}")).at(&args.location)
                })?;
                Value::Int(metadata.len() as i64)
            }
            "hash" => {
                args.check_pos_count("fs.hash", 2, Some(2))?;
                let raw = args.pos_str(0, "fs.hash")?;
                let algorithm = args.pos_str(1, "fs.hash")?;
                if algorithm != "sha256" {
                    return Err(IntpError::invalid_arguments(format!(
                        "hash algorithm \"{algorithm}\" is not available"
                    ))
                    .at(&args.location));
                }
                let path = Self::resolve(state, raw);
                let contents = fs::read(&path).map_err(|e| {
                    IntpError::runtime(format!("fs.hash of \"{raw}\": {e}")).at(&args.location)
                })?;
                let digest = Sha256::digest(&contents);
                Value::Str(format!("{digest:x}"))
            }
            "read" => {
                args.check_pos_count("fs.read", 1, Some(1))?;
                let path = match args.pos(0, "fs.read")? {
                    Value::Str(raw) => {
                        let candidate = Path::new(&state.subdir).join(raw);
                        sandbox::check_source_ref(
                            &state.source_root,
                            &interp.subproject_dir,
                            &state.subproject,
                            &candidate,
                            &args.location,
                        )?;
                        Self::resolve(state, raw)
                    }
                    Value::Object(obj) => {
                        let file = downcast::<FileObject>(obj).ok_or_else(|| {
                            IntpError::invalid_arguments("fs.read expects a string or a file")
                                .at(&args.location)
                        })?;
                        file.file.absolute_path(&state.source_root, &state.build_root)
                    }
                    other => {
                        return Err(IntpError::invalid_arguments(format!(
                            "fs.read expects a string or a file, got {}",
                            other.type_name()
                        ))
                        .at(&args.location));
                    }
                };
                let contents = fs::read_to_string(&path).map_err(|e| {
                    IntpError::runtime(format!("fs.read of \"{}\": {e}", path.display()))
                        .at(&args.location)
                })?;
                // Reading a file makes its content part of the
                // configuration; changing it must trigger a reconfigure.
                interp.build.borrow_mut().add_build_def_file(path);
                Value::Str(contents)
            }
            _ => {
                return Err(IntpError::invalid_arguments(format!(
                    "fs module has no method \"{method}\""
                ))
                .at(&args.location));
            }
        };
        Ok(ModuleReturnValue::plain(value))
    }
}
