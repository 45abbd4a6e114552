use std::rc::Rc;

use mortar_kernel::machines::MachineChoice;
use mortar_kernel::options::OptionValue;
use mortar_kernel::ports::Backend;
use mortar_kernel::targets::{
    AliasTarget, AnyTarget, BuildTarget, CustomTarget, EnvironmentVariables, FileRef, Generator,
    RunTarget, Source, TargetKind, TestCase, TestExecutable,
};

use crate::args::Args;
use crate::errors::{IntpError, IntpResult};
use crate::interpreter::Interpreter;
use crate::objects::dependency::DependencyObject;
use crate::objects::downcast;
use crate::objects::envvars::EnvVarsObject;
use crate::objects::file::FileObject;
use crate::objects::generator::{GeneratedListObject, GeneratorObject};
use crate::objects::include_dirs::IncludeDirsObject;
use crate::objects::program::ProgramObject;
use crate::objects::target::{BothLibsObject, TargetObject};
use crate::value::Value;

fn target_name(args: &Args, what: &str) -> IntpResult<String> {
    let name = args.pos_str(0, what)?;
    if name.is_empty() || name.contains('/') || name.contains('\\') {
        return Err(IntpError::invalid_arguments(format!(
            "invalid target name \"{name}\""
        ))
        .at(&args.location));
    }
    Ok(name.to_owned())
}

/// Coerces one source value. Strings are tree-relative paths; generated
/// lists expand to their build-tree outputs.
fn push_source(
    interp: &Interpreter,
    value: &Value,
    sources: &mut Vec<Source>,
    args: &Args,
) -> IntpResult<()> {
    match value {
        Value::Str(name) => {
            sources.push(Source::File(FileRef::in_source(
                interp.subdir.clone(),
                name.clone(),
            )));
            Ok(())
        }
        Value::Object(obj) => {
            if let Some(file) = downcast::<FileObject>(obj) {
                sources.push(Source::File((*file.file).clone()));
                return Ok(());
            }
            if let Some(target) = downcast::<TargetObject>(obj) {
                sources.push(Source::TargetOutput {
                    target_id: target.target_id.clone(),
                });
                return Ok(());
            }
            if let Some(generated) = downcast::<GeneratedListObject>(obj) {
                for file in generated.output_files() {
                    sources.push(Source::File(file));
                }
                return Ok(());
            }
            Err(IntpError::invalid_arguments(format!(
                "invalid source of type {}",
                obj.kind()
            ))
            .at(&args.location))
        }
        other => Err(IntpError::invalid_arguments(format!(
            "invalid source of type {}",
            other.type_name()
        ))
        .at(&args.location)),
    }
}

fn resolve_kind(interp: &Interpreter, fn_name: &str, args: &Args) -> IntpResult<Vec<TargetKind>> {
    let kind_of = |label: &str| -> IntpResult<Vec<TargetKind>> {
        Ok(match label {
            "executable" => vec![TargetKind::Executable],
            "static_library" => vec![TargetKind::StaticLibrary],
            "shared_library" => vec![TargetKind::SharedLibrary],
            "shared_module" => vec![TargetKind::SharedModule],
            "jar" => vec![TargetKind::Jar],
            "both_libraries" => vec![TargetKind::SharedLibrary, TargetKind::StaticLibrary],
            "library" => {
                let default_library = interp
                    .env
                    .options
                    .borrow()
                    .lookup(&interp.subproject, "default_library")
                    .map(|l| l.option().value.clone());
                match default_library {
                    Some(OptionValue::Str(s)) if s == "static" => {
                        vec![TargetKind::StaticLibrary]
                    }
                    Some(OptionValue::Str(s)) if s == "both" => {
                        vec![TargetKind::SharedLibrary, TargetKind::StaticLibrary]
                    }
                    _ => vec![TargetKind::SharedLibrary],
                }
            }
            other => {
                return Err(IntpError::invalid_arguments(format!(
                    "unknown target type \"{other}\""
                ))
                .at(&args.location));
            }
        })
    };

    if fn_name == "build_target" {
        let target_type = args.kw_str("target_type")?.ok_or_else(|| {
            IntpError::invalid_arguments("build_target requires \"target_type\"")
                .at(&args.location)
        })?;
        kind_of(&target_type)
    } else {
        kind_of(fn_name)
    }
}

pub fn build_target(interp: &mut Interpreter, fn_name: &str, args: &Args) -> IntpResult<Value> {
    let name = target_name(args, fn_name)?;
    let kinds = resolve_kind(interp, fn_name, args)?;
    let machine = MachineChoice::from_native_flag(args.kw_bool("native", false)?);

    let mut sources = Vec::new();
    for value in &args.positional[1..] {
        push_source(interp, value, &mut sources, args)?;
    }
    for value in args.kw_list("sources") {
        push_source(interp, &value, &mut sources, args)?;
    }

    let mut link_with = Vec::new();
    for value in args.kw_list("link_with") {
        match &value {
            Value::Object(obj) => {
                if let Some(target) = downcast::<TargetObject>(obj) {
                    link_with.push(target.target_id.clone());
                    continue;
                }
                if let Some(both) = downcast::<BothLibsObject>(obj) {
                    link_with.push(both.shared.target_id.clone());
                    continue;
                }
                return Err(IntpError::invalid_arguments(format!(
                    "link_with accepts library targets, got {}",
                    obj.kind()
                ))
                .at(&args.location));
            }
            other => {
                return Err(IntpError::invalid_arguments(format!(
                    "link_with accepts library targets, got {}",
                    other.type_name()
                ))
                .at(&args.location));
            }
        }
    }

    let mut include_dirs = Vec::new();
    for value in args.kw_list("include_directories") {
        match &value {
            Value::Str(dir) => include_dirs.push(mortar_kernel::targets::IncludeDirs {
                subdir: interp.subdir.clone(),
                dirs: vec![dir.clone()],
                is_system: false,
            }),
            Value::Object(obj) => {
                let incdirs = downcast::<IncludeDirsObject>(obj).ok_or_else(|| {
                    IntpError::invalid_arguments(format!(
                        "include_directories accepts strings and include_directories objects, \
                         got {}",
                        obj.kind()
                    ))
                    .at(&args.location)
                })?;
                include_dirs.push((*incdirs.incdirs).clone());
            }
            other => {
                return Err(IntpError::invalid_arguments(format!(
                    "include_directories accepts strings and include_directories objects, got {}",
                    other.type_name()
                ))
                .at(&args.location));
            }
        }
    }

    let mut dep_compile_args: Vec<String> = Vec::new();
    let mut dep_link_args: Vec<String> = Vec::new();
    let mut dep_names = Vec::new();
    for value in args.kw_list("dependencies") {
        let Value::Object(obj) = &value else {
            return Err(IntpError::invalid_arguments(format!(
                "dependencies must be dependency objects, got {}",
                value.type_name()
            ))
            .at(&args.location));
        };
        let dep = downcast::<DependencyObject>(obj).ok_or_else(|| {
            IntpError::invalid_arguments(format!(
                "dependencies must be dependency objects, got {}",
                obj.kind()
            ))
            .at(&args.location)
        })?;
        if !dep.dep.found() {
            return Err(IntpError::invalid_arguments(format!(
                "tried to use the not-found dependency \"{}\"",
                dep.dep.name
            ))
            .at(&args.location));
        }
        dep_compile_args.extend(dep.dep.compile_args.iter().cloned());
        dep_link_args.extend(dep.dep.link_args.iter().cloned());
        dep_names.push(dep.dep.name.clone());
    }

    let install = args.kw_bool("install", false)?;
    let build_by_default = args.kw_bool("build_by_default", true)?;
    let version = args.kw_str("version")?;
    let soversion = match args.kw("soversion") {
        None => None,
        Some(Value::Str(s)) => Some(s.clone()),
        Some(Value::Int(i)) => Some(i.to_string()),
        Some(other) => {
            return Err(IntpError::invalid_arguments(format!(
                "soversion must be a string or an integer, got {}",
                other.type_name()
            ))
            .at(&args.location));
        }
    };

    let mut handles: Vec<Rc<TargetObject>> = Vec::new();
    for kind in &kinds {
        let mut target = BuildTarget::new(
            name.clone(),
            interp.subdir.clone(),
            interp.subproject.clone(),
            *kind,
            machine,
        );
        target.sources = sources.clone();
        target.link_with = link_with.clone();
        target.include_dirs = include_dirs.clone();
        target.structured_dep_names = dep_names.clone();
        target.link_args = {
            let mut link_args = args.kw_string_list("link_args")?;
            link_args.extend(dep_link_args.iter().cloned());
            link_args
        };
        for lang_args_kw in ["c_args", "cpp_args"] {
            let mut lang_args = args.kw_string_list(lang_args_kw)?;
            if !lang_args.is_empty() || !dep_compile_args.is_empty() {
                lang_args.extend(dep_compile_args.iter().cloned());
                let language = lang_args_kw.trim_end_matches("_args").to_owned();
                target.extra_args.insert(language, lang_args);
            }
        }
        target.install = install;
        target.install_dir = args.kw_str("install_dir")?;
        target.build_by_default = build_by_default;
        target.gui_app = args.kw_bool("gui_app", false)?;
        target.pic = args.kw_bool("pic", *kind == TargetKind::SharedLibrary)?;
        target.version = version.clone();
        target.soversion = soversion.clone();

        let id = interp
            .build
            .borrow_mut()
            .add_target(AnyTarget::Build(target))
            .map_err(|e| IntpError::from(e).at(&args.location))?;
        handles.push(Rc::new(TargetObject::build(
            id,
            name.clone(),
            interp.subproject.clone(),
        )));
    }

    if handles.len() == 2 {
        Ok(Value::Object(Rc::new(BothLibsObject {
            shared: handles[0].clone(),
            static_lib: handles[1].clone(),
        })))
    } else {
        Ok(Value::Object(handles.remove(0)))
    }
}

/// Normalizes a command list: strings stay, files become absolute paths,
/// programs are inlined, targets contribute their output placeholder.
pub(crate) fn normalize_command(
    interp: &Interpreter,
    values: &[Value],
    args: &Args,
) -> IntpResult<Vec<String>> {
    let mut command = Vec::new();
    for value in values {
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
                            "program \"{}\" was not found, cannot use it in a command",
                            program.program.name
                        ))
                        .at(&args.location));
                    }
                    command.extend(program.program.command.iter().cloned());
                } else if let Some(target) = downcast::<TargetObject>(obj) {
                    let build = interp.build.borrow();
                    let entity = build.get_target(&target.target_id).ok_or_else(|| {
                        IntpError::runtime(format!(
                            "target \"{}\" vanished from the build accumulator",
                            target.target_id
                        ))
                        .at(&args.location)
                    })?;
                    command.push(interp.ports.backend.get_target_filename(entity));
                } else {
                    return Err(IntpError::invalid_arguments(format!(
                        "invalid command element of type {}",
                        obj.kind()
                    ))
                    .at(&args.location));
                }
            }
            other => {
                return Err(IntpError::invalid_arguments(format!(
                    "invalid command element of type {}",
                    other.type_name()
                ))
                .at(&args.location));
            }
        }
    }
    Ok(command)
}

pub fn custom_target(interp: &mut Interpreter, args: &Args) -> IntpResult<Value> {
    let name = target_name(args, "custom_target")?;

    let outputs = args.kw_string_list("output")?;
    if outputs.is_empty() {
        return Err(
            IntpError::invalid_arguments("custom_target requires \"output\"").at(&args.location)
        );
    }
    for output in &outputs {
        if output.contains('/') {
            return Err(IntpError::invalid_arguments(format!(
                "output \"{output}\" must not contain a path segment"
            ))
            .at(&args.location));
        }
    }

    let command_values = args.kw_list("command");
    if command_values.is_empty() {
        return Err(
            IntpError::invalid_arguments("custom_target requires \"command\"").at(&args.location)
        );
    }
    let command = normalize_command(interp, &command_values, args)?;

    let mut inputs = Vec::new();
    for value in args.kw_list("input") {
        push_source(interp, &value, &mut inputs, args)?;
    }

    let mut depends = Vec::new();
    for value in args.kw_list("depends") {
        let target = value
            .as_object()
            .and_then(|obj| downcast::<TargetObject>(obj))
            .ok_or_else(|| {
                IntpError::invalid_arguments("\"depends\" entries must be targets")
                    .at(&args.location)
            })?;
        depends.push(target.target_id.clone());
    }

    let install = args.kw_bool("install", false)?;
    let install_dir = match args.kw("install_dir") {
        None => None,
        Some(Value::Str(s)) => Some(s.clone()),
        Some(Value::List(items)) => items
            .first()
            .and_then(|v| v.as_str())
            .map(str::to_owned),
        Some(other) => {
            return Err(IntpError::invalid_arguments(format!(
                "install_dir must be a string, got {}",
                other.type_name()
            ))
            .at(&args.location));
        }
    };

    let target = CustomTarget {
        name: name.clone(),
        subdir: interp.subdir.clone(),
        subproject: interp.subproject.clone(),
        command,
        inputs,
        outputs,
        capture: args.kw_bool("capture", false)?,
        depfile: args.kw_str("depfile")?,
        install,
        install_dir,
        build_by_default: args.kw_bool("build_by_default", install)?,
        build_always_stale: args.kw_bool("build_always_stale", false)?,
        depends,
    };
    let id = interp
        .build
        .borrow_mut()
        .add_target(AnyTarget::Custom(target))
        .map_err(|e| IntpError::from(e).at(&args.location))?;
    Ok(Value::Object(Rc::new(TargetObject::custom(
        id,
        name,
        interp.subproject.clone(),
    ))))
}

pub fn run_target(interp: &mut Interpreter, args: &Args) -> IntpResult<Value> {
    let name = target_name(args, "run_target")?;
    let command_values = args.kw_list("command");
    if command_values.is_empty() {
        return Err(
            IntpError::invalid_arguments("run_target requires \"command\"").at(&args.location)
        );
    }
    let command = normalize_command(interp, &command_values, args)?;

    let mut depends = Vec::new();
    for value in args.kw_list("depends") {
        let target = value
            .as_object()
            .and_then(|obj| downcast::<TargetObject>(obj))
            .ok_or_else(|| {
                IntpError::invalid_arguments("\"depends\" entries must be targets")
                    .at(&args.location)
            })?;
        depends.push(target.target_id.clone());
    }

    let env = match args.kw("env") {
        None => EnvironmentVariables::default(),
        Some(Value::Object(obj)) => downcast::<EnvVarsObject>(obj)
            .map(|env| env.env.borrow().clone())
            .ok_or_else(|| {
                IntpError::invalid_arguments("\"env\" must be an environment object")
                    .at(&args.location)
            })?,
        Some(other) => {
            return Err(IntpError::invalid_arguments(format!(
                "\"env\" must be an environment object, got {}",
                other.type_name()
            ))
            .at(&args.location));
        }
    };

    let target = RunTarget {
        name: name.clone(),
        subdir: interp.subdir.clone(),
        subproject: interp.subproject.clone(),
        command,
        depends,
        env,
    };
    let id = interp
        .build
        .borrow_mut()
        .add_target(AnyTarget::Run(target))
        .map_err(|e| IntpError::from(e).at(&args.location))?;
    Ok(Value::Object(Rc::new(TargetObject::run(
        id,
        name,
        interp.subproject.clone(),
    ))))
}

pub fn alias_target(interp: &mut Interpreter, args: &Args) -> IntpResult<Value> {
    let name = target_name(args, "alias_target")?;
    let mut depends = Vec::new();
    for value in &args.positional[1..] {
        let target = value
            .as_object()
            .and_then(|obj| downcast::<TargetObject>(obj))
            .ok_or_else(|| {
                IntpError::invalid_arguments("alias_target dependencies must be targets")
                    .at(&args.location)
            })?;
        depends.push(target.target_id.clone());
    }

    let target = AliasTarget {
        name: name.clone(),
        subdir: interp.subdir.clone(),
        subproject: interp.subproject.clone(),
        depends,
    };
    let id = interp
        .build
        .borrow_mut()
        .add_target(AnyTarget::Alias(target))
        .map_err(|e| IntpError::from(e).at(&args.location))?;
    Ok(Value::Object(Rc::new(TargetObject::alias(
        id,
        name,
        interp.subproject.clone(),
    ))))
}

pub fn generator(interp: &mut Interpreter, args: &Args) -> IntpResult<Value> {
    let command = normalize_command(interp, &args.positional[..1], args)?;
    let outputs = args.kw_string_list("output")?;
    if outputs.is_empty() {
        return Err(
            IntpError::invalid_arguments("generator requires \"output\"").at(&args.location)
        );
    }
    for output in &outputs {
        if !output.contains("@BASENAME@") && !output.contains("@PLAINNAME@") {
            return Err(IntpError::invalid_arguments(format!(
                "generator output \"{output}\" must contain @BASENAME@ or @PLAINNAME@"
            ))
            .at(&args.location));
        }
    }

    Ok(Value::Object(Rc::new(GeneratorObject::new(Generator {
        command,
        arguments: args.kw_string_list("arguments")?,
        outputs,
        depfile: args.kw_str("depfile")?,
        capture: args.kw_bool("capture", false)?,
    }))))
}

pub fn test(interp: &mut Interpreter, args: &Args, is_benchmark: bool) -> IntpResult<Value> {
    let what = if is_benchmark { "benchmark" } else { "test" };
    let name = args.pos_str(0, what)?.to_owned();
    if name.contains(':') {
        return Err(IntpError::invalid_arguments(format!(
            "{what} name must not contain \":\", got \"{name}\""
        ))
        .at(&args.location));
    }

    let exe_value = args.pos(1, what)?;
    let exe = match exe_value {
        Value::Object(obj) => {
            if let Some(target) = downcast::<TargetObject>(obj) {
                TestExecutable::Target {
                    target_id: target.target_id.clone(),
                }
            } else if let Some(program) = downcast::<ProgramObject>(obj) {
                if !program.program.found() {
                    return Err(IntpError::invalid_arguments(format!(
                        "{what} executable program \"{}\" was not found",
                        program.program.name
                    ))
                    .at(&args.location));
                }
                TestExecutable::Program {
                    command: program.program.command.clone(),
                }
            } else if let Some(file) = downcast::<FileObject>(obj) {
                TestExecutable::Program {
                    command: vec![
                        file.file
                            .absolute_path(&interp.env.source_root, &interp.env.build_root)
                            .to_string_lossy()
                            .into_owned(),
                    ],
                }
            } else {
                return Err(IntpError::invalid_arguments(format!(
                    "{what} executable must be a target, a program or a file, got {}",
                    obj.kind()
                ))
                .at(&args.location));
            }
        }
        other => {
            return Err(IntpError::invalid_arguments(format!(
                "{what} executable must be a target, a program or a file, got {}",
                other.type_name()
            ))
            .at(&args.location));
        }
    };

    let test_args = normalize_command(interp, &args.kw_list("args"), args)?;

    let env = match args.kw("env") {
        None => EnvironmentVariables::default(),
        Some(Value::Object(obj)) => downcast::<EnvVarsObject>(obj)
            .map(|env| env.env.borrow().clone())
            .ok_or_else(|| {
                IntpError::invalid_arguments("\"env\" must be an environment object")
                    .at(&args.location)
            })?,
        Some(other) => {
            return Err(IntpError::invalid_arguments(format!(
                "\"env\" must be an environment object, got {}",
                other.type_name()
            ))
            .at(&args.location));
        }
    };

    let base_suite = if interp.subproject.is_empty() {
        interp.project_name.clone()
    } else {
        interp.subproject.clone()
    };
    let mut suites = vec![base_suite.clone()];
    for suite in args.kw_string_list("suite")? {
        suites.push(format!("{base_suite}:{suite}"));
    }

    let mut depends = Vec::new();
    for value in args.kw_list("depends") {
        let target = value
            .as_object()
            .and_then(|obj| downcast::<TargetObject>(obj))
            .ok_or_else(|| {
                IntpError::invalid_arguments("\"depends\" entries must be targets")
                    .at(&args.location)
            })?;
        depends.push(target.target_id.clone());
    }

    let case = TestCase {
        name,
        subproject: interp.subproject.clone(),
        exe,
        args: test_args,
        env,
        should_fail: args.kw_bool("should_fail", false)?,
        timeout: args.kw_int("timeout", 30)?,
        workdir: args.kw_str("workdir")?,
        is_parallel: args.kw_bool("is_parallel", true)?,
        priority: args.kw_int("priority", 0)?,
        suites,
        depends,
    };

    let mut build = interp.build.borrow_mut();
    if is_benchmark {
        build.benchmarks.push(case);
    } else {
        build.tests.push(case);
    }
    Ok(Value::Null)
}

pub fn vcs_tag(interp: &mut Interpreter, args: &Args) -> IntpResult<Value> {
    let output = args.kw_str("output")?.ok_or_else(|| {
        IntpError::invalid_arguments("vcs_tag requires \"output\"").at(&args.location)
    })?;
    let fallback = args
        .kw_str("fallback")?
        .unwrap_or_else(|| interp.project_version.clone());
    let replace_string = args.kw_str_or("replace_string", "@VCS_TAG@")?;

    let mut inputs = Vec::new();
    for value in args.kw_list("input") {
        push_source(interp, &value, &mut inputs, args)?;
    }

    let command_values = args.kw_list("command");
    let command = if command_values.is_empty() {
        // No version-control probe given; bake the fallback in directly.
        vec![
            "internal-vcs-tag".to_owned(),
            replace_string.clone(),
            fallback.clone(),
        ]
    } else {
        let mut command = normalize_command(interp, &command_values, args)?;
        command.insert(0, "internal-vcs-tag".to_owned());
        command.push(replace_string.clone());
        command.push(fallback.clone());
        command
    };

    let target = CustomTarget {
        name: output.clone(),
        subdir: interp.subdir.clone(),
        subproject: interp.subproject.clone(),
        command,
        inputs,
        outputs: vec![output.clone()],
        capture: false,
        depfile: None,
        install: false,
        install_dir: None,
        build_by_default: true,
        // Version control state is invisible to the dependency graph, so
        // the tag file must be refreshed on every build.
        build_always_stale: true,
        depends: Vec::new(),
    };
    let id = interp
        .build
        .borrow_mut()
        .add_target(AnyTarget::Custom(target))
        .map_err(|e| IntpError::from(e).at(&args.location))?;
    Ok(Value::Object(Rc::new(TargetObject::custom(
        id,
        output,
        interp.subproject.clone(),
    ))))
}
