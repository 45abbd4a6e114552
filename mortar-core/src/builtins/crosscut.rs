use std::rc::Rc;

use mortar_kernel::machines::MachineChoice;
use mortar_kernel::ports::{Compiler, CompilerDetector};
use mortar_kernel::targets::{EnvironmentVariables, TestSetup};

use crate::args::Args;
use crate::errors::{IntpError, IntpResult};
use crate::interpreter::Interpreter;
use crate::logger;
use crate::objects::compiler::CompilerObject;
use crate::objects::downcast;
use crate::objects::envvars::EnvVarsObject;
use crate::value::Value;

pub fn add_arguments(
    interp: &mut Interpreter,
    args: &Args,
    global: bool,
    link: bool,
) -> IntpResult<Value> {
    let flags = args.pos_strings("argument")?;
    let languages = args.kw_string_list("language")?;
    if languages.is_empty() {
        return Err(
            IntpError::invalid_arguments("missing \"language\" keyword argument")
                .at(&args.location),
        );
    }
    let machine = MachineChoice::from_native_flag(args.kw_bool("native", false)?);

    if global && !interp.subproject.is_empty() {
        return Err(IntpError::invalid_code(
            "global arguments can not be set in subprojects because \
             there is no way to make sure that they are only used in dependent targets",
        )
        .at(&args.location));
    }

    let mut build = interp.build.borrow_mut();
    for language in &languages {
        let result = if global {
            build.add_global_args(machine, language, &flags, link)
        } else {
            build.add_project_args(machine, &interp.subproject, language, &flags, link)
        };
        result.map_err(|e| IntpError::from(e).at(&args.location))?;
    }
    Ok(Value::Null)
}

pub fn add_test_setup(interp: &mut Interpreter, args: &Args) -> IntpResult<Value> {
    let name = args.pos_str(0, "add_test_setup")?.to_owned();
    if name.contains(':') || name.is_empty() {
        return Err(IntpError::invalid_arguments(format!(
            "invalid test setup name \"{name}\""
        ))
        .at(&args.location));
    }

    let env = match args.kw("env") {
        None => EnvironmentVariables::default(),
        Some(Value::Object(obj)) => {
            let env_obj = downcast::<EnvVarsObject>(obj).ok_or_else(|| {
                IntpError::invalid_arguments("\"env\" must be an environment object")
                    .at(&args.location)
            })?;
            env_obj.env.borrow().clone()
        }
        Some(other) => {
            return Err(IntpError::invalid_arguments(format!(
                "\"env\" must be an environment object, got {}",
                other.type_name()
            ))
            .at(&args.location));
        }
    };

    let setup = TestSetup {
        name: name.clone(),
        exe_wrapper: args.kw_string_list("exe_wrapper")?,
        gdb: args.kw_bool("gdb", false)?,
        timeout_multiplier: args.kw_int("timeout_multiplier", 1)?,
        env,
        exclude_suites: args.kw_string_list("exclude_suites")?,
    };
    let is_default = args.kw_bool("is_default", false)?;
    interp
        .build
        .borrow_mut()
        .add_test_setup(setup, is_default)
        .map_err(|e| IntpError::from(e).at(&args.location))?;
    Ok(Value::Null)
}

pub fn add_languages(interp: &mut Interpreter, args: &Args) -> IntpResult<Value> {
    let languages = args.pos_strings("add_languages")?;
    let (disabled, required, feature) = interp.extract_required_kwarg(args, true)?;
    if disabled {
        if let Some(feature) = feature {
            logger::message(&format!(
                "languages [{}] skipped: feature {feature} disabled",
                languages.join(", ")
            ));
        }
        return Ok(Value::Bool(false));
    }

    let native = args.kw("native").is_some();
    let machines: &[MachineChoice] = if native {
        if args.kw_bool("native", false)? {
            &[MachineChoice::Build]
        } else {
            &[MachineChoice::Host]
        }
    } else {
        &[MachineChoice::Build, MachineChoice::Host]
    };

    let mut success = true;
    for language in &languages {
        for machine in machines {
            success &= add_language(interp, language, *machine, required, &args.location)?;
        }
    }
    Ok(Value::Bool(success))
}

/// Detects a compiler for one language/machine pair and records it in the
/// per-machine compiler table. Failure is soft unless required.
pub(crate) fn add_language(
    interp: &mut Interpreter,
    language: &str,
    machine: MachineChoice,
    required: bool,
    location: &mortar_dsl::diagnostics::Location,
) -> IntpResult<bool> {
    let language = language.to_lowercase();
    if interp
        .build
        .borrow()
        .compilers
        .get(machine)
        .contains_key(&language)
    {
        return Ok(true);
    }

    let detected = interp
        .ports
        .compiler_detector
        .detect(&language, machine)
        .map_err(|e| IntpError::from(e).at(location))?;

    match detected {
        Some(compiler) => {
            logger::message(&format!(
                "{} compiler for the {} machine: {} ({})",
                language,
                machine.as_str(),
                compiler.id(),
                compiler.version()
            ));
            interp
                .build
                .borrow_mut()
                .compilers
                .get_mut(machine)
                .insert(language, compiler);
            Ok(true)
        }
        None if required => Err(IntpError::runtime(format!(
            "compiler for language \"{language}\" ({} machine) not found",
            machine.as_str()
        ))
        .at(location)),
        None => {
            logger::message(&format!(
                "compiler for language \"{language}\" ({} machine) not found",
                machine.as_str()
            ));
            Ok(false)
        }
    }
}

/// `meson.get_compiler(lang)` and target creation share this lookup.
pub(crate) fn lookup_compiler(
    interp: &Interpreter,
    language: &str,
    machine: MachineChoice,
    location: &mortar_dsl::diagnostics::Location,
) -> IntpResult<Value> {
    let build = interp.build.borrow();
    let compiler = build.compilers.get(machine).get(language).cloned();
    match compiler {
        Some(compiler) => Ok(Value::Object(Rc::new(CompilerObject::new(compiler)))),
        None => Err(IntpError::invalid_arguments(format!(
            "tried to use compiler for language \"{language}\" ({} machine), \
             but that language is not in the project declaration",
            machine.as_str()
        ))
        .at(location)),
    }
}
