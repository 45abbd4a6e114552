use std::path::Path;
use std::rc::Rc;

use indexmap::IndexMap;

use mortar_dsl::ast::FunctionCallNode;
use mortar_kernel::ports::CommandRunner;
use mortar_kernel::targets::FileRef;

use crate::args::Args;
use crate::errors::{IntpError, IntpResult};
use crate::format;
use crate::interpreter::Interpreter;
use crate::logger;
use crate::objects::downcast;
use crate::objects::envvars::EnvVarsObject;
use crate::objects::file::FileObject;
use crate::objects::program::ProgramObject;
use crate::objects::run_result::RunResultObject;
use crate::sandbox;
use crate::value::Value;

pub fn assert_fn(args: &Args, node: &FunctionCallNode) -> IntpResult<Value> {
    let condition = args.pos(0, "assert")?;
    let Value::Bool(ok) = condition else {
        return Err(IntpError::invalid_arguments(format!(
            "assert condition must be a boolean, got {}",
            condition.type_name()
        ))
        .at(&args.location));
    };
    if *ok {
        return Ok(Value::Null);
    }

    let message = match args.positional.get(1) {
        Some(Value::Str(message)) => message.clone(),
        Some(other) => {
            return Err(IntpError::invalid_arguments(format!(
                "assert message must be a string, got {}",
                other.type_name()
            ))
            .at(&args.location));
        }
        // Reconstruct the condition from the AST when no message was given.
        None => node
            .args
            .positional
            .first()
            .and_then(|expr| expr.as_source_text())
            .map(str::to_owned)
            .unwrap_or_else(|| "condition evaluated to false".to_owned()),
    };
    Err(IntpError::runtime(format!("assert failed: {message}")).at(&args.location))
}

pub fn error_fn(args: &Args) -> IntpResult<Value> {
    let text: Vec<String> = args.positional.iter().map(Value::stringify).collect();
    Err(IntpError::runtime(format!("error: {}", text.join(" "))).at(&args.location))
}

pub fn warning_fn(interp: &mut Interpreter, args: &Args) -> IntpResult<Value> {
    let text: Vec<String> = args.positional.iter().map(Value::stringify).collect();
    logger::warning(&interp.subproject, Some(&args.location), &text.join(" "));
    Ok(Value::Null)
}

pub fn message_fn(args: &Args) -> IntpResult<Value> {
    let text: Vec<String> = args.positional.iter().map(Value::stringify).collect();
    logger::message(&text.join(" "));
    Ok(Value::Null)
}

pub fn summary(interp: &mut Interpreter, args: &Args) -> IntpResult<Value> {
    let section = args.kw_str_or("section", "")?;
    let bool_yn = args.kw_bool("bool_yn", false)?;
    let list_sep = args.kw_str_or("list_sep", ", ")?;

    let mut entries: Vec<(String, Value)> = Vec::new();
    match (args.positional.first(), args.positional.get(1)) {
        (Some(Value::Dict(map)), None) => {
            for (key, value) in map {
                entries.push((key.clone(), value.clone()));
            }
        }
        (Some(Value::Str(key)), Some(value)) => {
            entries.push((key.clone(), value.clone()));
        }
        _ => {
            return Err(IntpError::invalid_arguments(
                "summary() takes a dict, or a key and a value",
            )
            .at(&args.location));
        }
    }

    let rendered: Vec<(String, String)> = entries
        .into_iter()
        .map(|(key, value)| {
            let text = match &value {
                Value::Bool(b) if bool_yn => {
                    if *b { "YES".to_owned() } else { "NO".to_owned() }
                }
                Value::List(items) => items
                    .iter()
                    .map(Value::stringify)
                    .collect::<Vec<_>>()
                    .join(&list_sep),
                other => other.stringify(),
            };
            (key, text)
        })
        .collect();

    let mut shared = interp.shared.borrow_mut();
    let project_summaries = shared
        .summaries
        .entry(interp.subproject.clone())
        .or_default();
    project_summaries
        .entry(section)
        .or_default()
        .extend(rendered);
    Ok(Value::Null)
}

/// Builds a validated source-tree file reference relative to the current
/// subdir. The sandbox check runs before the existence check so boundary
/// violations are reported as such.
pub(crate) fn file_from_string(
    interp: &Interpreter,
    name: &str,
    args: &Args,
) -> IntpResult<FileObject> {
    let candidate = Path::new(&interp.subdir).join(name);
    sandbox::check_source_ref(
        &interp.env.source_root,
        &interp.subproject_dir,
        &interp.subproject,
        &candidate,
        &args.location,
    )?;

    let file = if Path::new(name).is_absolute() {
        let normalized = sandbox::normalize(Path::new(name));
        match normalized.strip_prefix(&interp.env.source_root) {
            Ok(relative) => FileRef::in_source("", relative.to_string_lossy()),
            Err(_) => FileRef::in_source("", normalized.to_string_lossy()),
        }
    } else {
        FileRef::in_source(interp.subdir.clone(), name)
    };

    let absolute = file.absolute_path(&interp.env.source_root, &interp.env.build_root);
    if !absolute.is_file() {
        return Err(IntpError::invalid_arguments(format!(
            "file \"{name}\" does not exist"
        ))
        .at(&args.location));
    }
    Ok(FileObject::new(file, interp.subproject.clone()))
}

pub fn files(interp: &mut Interpreter, args: &Args) -> IntpResult<Value> {
    let names = args.pos_strings("files")?;
    let mut out = Vec::with_capacity(names.len());
    for name in &names {
        out.push(Value::Object(Rc::new(file_from_string(interp, name, args)?)));
    }
    Ok(Value::List(out))
}

pub fn get_variable(interp: &mut Interpreter, args: &Args) -> IntpResult<Value> {
    let name = args.pos(0, "get_variable")?;
    if name.is_disabler() {
        return Ok(Value::Disabler);
    }
    let name = name.as_str().ok_or_else(|| {
        IntpError::invalid_arguments("get_variable expects a string name").at(&args.location)
    })?;
    match interp.variables.get(name) {
        Some(value) => Ok(value.clone()),
        None => match args.positional.get(1) {
            Some(default) => Ok(default.clone()),
            None => Err(IntpError::invalid_code(format!("unknown variable \"{name}\""))
                .at(&args.location)),
        },
    }
}

pub fn set_variable(interp: &mut Interpreter, args: &Args) -> IntpResult<Value> {
    let name = args.pos_str(0, "set_variable")?.to_owned();
    let value = args.pos(1, "set_variable")?.clone();
    interp.assign_variable(&name, value, &args.location)?;
    Ok(Value::Null)
}

pub fn is_variable(interp: &mut Interpreter, args: &Args) -> IntpResult<Value> {
    let name = args.pos_str(0, "is_variable")?;
    Ok(Value::Bool(interp.variables.contains_key(name)))
}

pub fn unset_variable(interp: &mut Interpreter, args: &Args) -> IntpResult<Value> {
    let name = args.pos_str(0, "unset_variable")?;
    interp.variables.shift_remove(name);
    Ok(Value::Null)
}

pub fn run_command(interp: &mut Interpreter, args: &Args) -> IntpResult<Value> {
    let mut command: Vec<String> = Vec::new();
    for value in &args.positional {
        match value {
            Value::Str(s) => command.push(s.clone()),
            Value::Object(obj) => {
                if let Some(file) = downcast::<FileObject>(obj) {
                    command.push(
                        file.file
                            .absolute_path(&interp.env.source_root, &interp.env.build_root)
                            .to_string_lossy()
                            .into_owned(),
                    );
                } else if let Some(program) = downcast::<ProgramObject>(obj) {
                    if !program.program.found() {
                        return Err(IntpError::runtime(format!(
                            "program \"{}\" was not found, cannot run it",
                            program.program.name
                        ))
                        .at(&args.location));
                    }
                    command.extend(program.program.command.iter().cloned());
                } else {
                    return Err(IntpError::invalid_arguments(format!(
                        "run_command arguments must be strings, files or programs, got {}",
                        obj.kind()
                    ))
                    .at(&args.location));
                }
            }
            other => {
                return Err(IntpError::invalid_arguments(format!(
                    "run_command arguments must be strings, files or programs, got {}",
                    other.type_name()
                ))
                .at(&args.location));
            }
        }
    }
    if command.is_empty() {
        return Err(IntpError::invalid_arguments("run_command needs a command").at(&args.location));
    }

    let env = match args.kw("env") {
        None => IndexMap::new(),
        Some(Value::Object(obj)) => {
            let env_obj = downcast::<EnvVarsObject>(obj).ok_or_else(|| {
                IntpError::invalid_arguments("\"env\" must be an environment object or a dict")
                    .at(&args.location)
            })?;
            env_obj.env.borrow().resolve(&IndexMap::new())
        }
        Some(Value::Dict(map)) => {
            let mut out = IndexMap::new();
            for (key, value) in map {
                let text = value.as_str().ok_or_else(|| {
                    IntpError::invalid_arguments("\"env\" dict values must be strings")
                        .at(&args.location)
                })?;
                out.insert(key.clone(), text.to_owned());
            }
            out
        }
        Some(other) => {
            return Err(IntpError::invalid_arguments(format!(
                "\"env\" must be an environment object or a dict, got {}",
                other.type_name()
            ))
            .at(&args.location));
        }
    };

    let workdir = interp.env.source_root.join(&interp.subdir);
    let output = interp
        .ports
        .runner
        .run(&command, &workdir, &env)
        .map_err(|e| IntpError::from(e).at(&args.location))?;

    if args.kw_bool("check", false)? && output.returncode != 0 {
        return Err(IntpError::runtime(format!(
            "command \"{}\" failed with status {}",
            command.join(" "),
            output.returncode
        ))
        .at(&args.location));
    }

    Ok(Value::Object(Rc::new(RunResultObject::new(output))))
}

pub fn join_paths_fn(args: &Args) -> IntpResult<Value> {
    let parts = args.pos_strings("join_paths")?;
    Ok(Value::Str(format::join_paths(&parts)))
}
