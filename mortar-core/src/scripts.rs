use std::path::{Component, Path, PathBuf};

use mortar_kernel::ports::Backend;
use mortar_kernel::targets::{AnyTarget, RunScript};

use crate::args::Args;
use crate::errors::{IntpError, IntpResult};
use crate::interpreter::Interpreter;
use crate::objects::downcast;
use crate::objects::file::FileObject;
use crate::objects::program::ProgramObject;
use crate::objects::target::TargetObject;
use crate::value::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScriptPhase {
    Install,
    Postconf,
    Dist,
}

/// Lexical relative path from `base` to `target`, both absolute. Install
/// scripts run from the build root, so stored paths are anchored there.
fn relative_to(base: &Path, target: &Path) -> PathBuf {
    let base_components: Vec<Component> = base.components().collect();
    let target_components: Vec<Component> = target.components().collect();

    let common = base_components
        .iter()
        .zip(&target_components)
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in common..base_components.len() {
        out.push("..");
    }
    for component in &target_components[common..] {
        out.push(component);
    }
    out
}

/// Normalizes one script argument to its stored string form: strings stay
/// literal, files become build-root-relative paths, targets point at their
/// outputs (and are forced into the default build set), programs inline
/// their command.
fn normalize_arg(
    interp: &mut Interpreter,
    value: &Value,
    out: &mut Vec<String>,
    args: &Args,
) -> IntpResult<()> {
    match value {
        Value::Str(s) => {
            out.push(s.clone());
            Ok(())
        }
        Value::Object(obj) => {
            if let Some(file) = downcast::<FileObject>(obj) {
                let absolute = file
                    .file
                    .absolute_path(&interp.env.source_root, &interp.env.build_root);
                out.push(
                    relative_to(&interp.env.build_root, &absolute)
                        .to_string_lossy()
                        .into_owned(),
                );
                return Ok(());
            }
            if let Some(target) = downcast::<TargetObject>(obj) {
                let mut build = interp.build.borrow_mut();
                let filename = {
                    let entity = build.get_target(&target.target_id).ok_or_else(|| {
                        IntpError::runtime(format!(
                            "target \"{}\" vanished from the build accumulator",
                            target.target_id
                        ))
                        .at(&args.location)
                    })?;
                    interp.ports.backend.get_target_filename(entity)
                };
                // A script referencing a target needs it to exist even when
                // nothing else pulls it in.
                match build.get_target_mut(&target.target_id) {
                    Some(AnyTarget::Build(t)) => t.build_by_default = true,
                    Some(AnyTarget::Custom(t)) => t.build_by_default = true,
                    _ => {}
                }
                out.push(filename);
                return Ok(());
            }
            if let Some(program) = downcast::<ProgramObject>(obj) {
                if !program.program.found() {
                    return Err(IntpError::runtime(format!(
                        "program \"{}\" was not found, cannot use it in a script",
                        program.program.name
                    ))
                    .at(&args.location));
                }
                out.extend(program.program.command.iter().cloned());
                return Ok(());
            }
            Err(IntpError::invalid_arguments(format!(
                "script arguments must be strings, files, targets or programs, got {}",
                obj.kind()
            ))
            .at(&args.location))
        }
        other => Err(IntpError::invalid_arguments(format!(
            "script arguments must be strings, files, targets or programs, got {}",
            other.type_name()
        ))
        .at(&args.location)),
    }
}

pub fn add_script(interp: &mut Interpreter, phase: ScriptPhase, args: &Args) -> IntpResult<Value> {
    args.check_pos_count("script", 1, None)?;

    let mut cmd = Vec::new();
    // The first element names the script: a bare string is a path relative
    // to the current subdir.
    match &args.positional[0] {
        Value::Str(s) if !Path::new(s).is_absolute() => {
            let absolute = interp.env.source_root.join(&interp.subdir).join(s);
            cmd.push(
                relative_to(&interp.env.build_root, &absolute)
                    .to_string_lossy()
                    .into_owned(),
            );
        }
        other => normalize_arg(interp, other, &mut cmd, args)?,
    }
    for value in &args.positional[1..] {
        normalize_arg(interp, value, &mut cmd, args)?;
    }

    let script = RunScript {
        cmd,
        subproject: interp.subproject.clone(),
    };
    let mut build = interp.build.borrow_mut();
    match phase {
        ScriptPhase::Install => build.install_scripts.push(script),
        ScriptPhase::Postconf => build.postconf_scripts.push(script),
        ScriptPhase::Dist => build.dist_scripts.push(script),
    }
    Ok(Value::Null)
}
