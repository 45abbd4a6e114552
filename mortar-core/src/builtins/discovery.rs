use std::path::PathBuf;
use std::rc::Rc;

use indexmap::IndexMap;

use mortar_kernel::deps::{DepOrigin, Dependency, IncludeType};
use mortar_kernel::machines::MachineChoice;
use mortar_kernel::ports::ProgramFinder;
use mortar_kernel::targets::IncludeDirs;
use mortar_kernel::version::version_compare_many;

use crate::args::Args;
use crate::errors::{IntpError, IntpResult};
use crate::interpreter::Interpreter;
use crate::logger;
use crate::objects::dependency::DependencyObject;
use crate::objects::downcast;
use crate::objects::include_dirs::IncludeDirsObject;
use crate::objects::program::ProgramObject;
use crate::value::Value;

pub fn find_program(interp: &mut Interpreter, args: &Args) -> IntpResult<Value> {
    let names = args.pos_strings("find_program")?;
    let (disabled, required, feature) = interp.extract_required_kwarg(args, true)?;
    let return_disabler = args.kw_bool("disabler", false)?;

    if disabled {
        if let Some(feature) = feature {
            logger::message(&format!(
                "program {} skipped: feature {feature} disabled",
                names.first().map(String::as_str).unwrap_or("?")
            ));
        }
        return Ok(not_found_program(names.first().cloned(), return_disabler));
    }

    let machine = MachineChoice::from_native_flag(args.kw_bool("native", false)?);
    let search_dirs: Vec<PathBuf> = args
        .kw_string_list("dirs")?
        .into_iter()
        .map(|d| interp.env.source_root.join(&interp.subdir).join(d))
        .collect();
    let constraints = args.kw_string_list("version")?;

    for name in &names {
        if let Some(overridden) = interp.build.borrow().find_override(name) {
            return Ok(Value::Object(Rc::new(ProgramObject::new(overridden))));
        }
    }

    for name in &names {
        interp.build.borrow_mut().note_program_searched(name);
        let found = interp
            .ports
            .prog_finder
            .find_program(name, &search_dirs, machine);
        let Some(program) = found else {
            continue;
        };
        if !constraints.is_empty() {
            let version = program.version.clone().unwrap_or_default();
            if let Err(failed) = version_compare_many(&version, &constraints) {
                logger::message(&format!(
                    "program {name} found but version {version} does not satisfy [{}]",
                    failed.join(", ")
                ));
                continue;
            }
        }
        return Ok(Value::Object(Rc::new(ProgramObject::new(Rc::new(program)))));
    }

    if required {
        return Err(IntpError::runtime(format!(
            "program \"{}\" not found",
            names.join("\", \"")
        ))
        .at(&args.location));
    }
    Ok(not_found_program(names.first().cloned(), return_disabler))
}

fn not_found_program(name: Option<String>, return_disabler: bool) -> Value {
    if return_disabler {
        return Value::Disabler;
    }
    let program = mortar_kernel::targets::ExternalProgram::not_found(
        name.unwrap_or_else(|| "unknown".to_owned()),
    );
    Value::Object(Rc::new(ProgramObject::new(Rc::new(program))))
}

pub fn declare_dependency(interp: &mut Interpreter, args: &Args) -> IntpResult<Value> {
    let mut compile_args = args.kw_string_list("compile_args")?;
    let link_args = args.kw_string_list("link_args")?;

    // Include directories become compile flags against both trees, so the
    // record stays self-contained for consumers outside this evaluator.
    for value in args.kw_list("include_directories") {
        match value {
            Value::Str(dir) => {
                let source_side = interp
                    .env
                    .source_root
                    .join(&interp.subdir)
                    .join(&dir);
                compile_args.push(format!("-I{}", source_side.to_string_lossy()));
            }
            Value::Object(obj) => {
                let incdirs = downcast::<IncludeDirsObject>(&obj).ok_or_else(|| {
                    IntpError::invalid_arguments(format!(
                        "include_directories entries must be strings or include_directories \
                         objects, got {}",
                        obj.kind()
                    ))
                    .at(&args.location)
                })?;
                for dir in &incdirs.incdirs.dirs {
                    let source_side = interp
                        .env
                        .source_root
                        .join(&incdirs.incdirs.subdir)
                        .join(dir);
                    compile_args.push(format!("-I{}", source_side.to_string_lossy()));
                }
            }
            other => {
                return Err(IntpError::invalid_arguments(format!(
                    "include_directories entries must be strings or include_directories \
                     objects, got {}",
                    other.type_name()
                ))
                .at(&args.location));
            }
        }
    }

    let mut variables = IndexMap::new();
    match args.kw("variables") {
        None => {}
        Some(Value::Dict(map)) => {
            for (key, value) in map {
                let text = value.as_str().ok_or_else(|| {
                    IntpError::invalid_arguments("\"variables\" dict values must be strings")
                        .at(&args.location)
                })?;
                variables.insert(key.clone(), text.to_owned());
            }
        }
        Some(Value::List(items)) => {
            for item in items {
                let text = item.as_str().ok_or_else(|| {
                    IntpError::invalid_arguments("\"variables\" list entries must be strings")
                        .at(&args.location)
                })?;
                let (key, value) = text.split_once('=').ok_or_else(|| {
                    IntpError::invalid_arguments(format!(
                        "\"variables\" entry \"{text}\" is not in key=value form"
                    ))
                    .at(&args.location)
                })?;
                variables.insert(key.to_owned(), value.to_owned());
            }
        }
        Some(other) => {
            return Err(IntpError::invalid_arguments(format!(
                "\"variables\" must be a dict or a list of key=value strings, got {}",
                other.type_name()
            ))
            .at(&args.location));
        }
    }

    let version = args
        .kw_str("version")?
        .unwrap_or_else(|| interp.project_version.clone());

    let dep = Dependency {
        name: format!("{}:declared", interp.project_name),
        version: Some(version),
        machine: MachineChoice::Host,
        compile_args,
        link_args,
        include_type: IncludeType::Preserve,
        variables,
        origin: DepOrigin::Internal {
            subproject: interp.subproject.clone(),
        },
    };
    Ok(Value::Object(Rc::new(DependencyObject::new(Rc::new(dep)))))
}

pub fn include_directories(interp: &mut Interpreter, args: &Args) -> IntpResult<Value> {
    let dirs = args.pos_strings("include_directories")?;
    for dir in &dirs {
        if PathBuf::from(dir).is_absolute() {
            continue;
        }
        let candidate = interp.env.source_root.join(&interp.subdir).join(dir);
        if !candidate.is_dir() {
            return Err(IntpError::invalid_arguments(format!(
                "include directory \"{dir}\" does not exist"
            ))
            .at(&args.location));
        }
    }

    Ok(Value::Object(Rc::new(IncludeDirsObject::new(IncludeDirs {
        subdir: interp.subdir.clone(),
        dirs,
        is_system: args.kw_bool("is_system", false)?,
    }))))
}
