use std::fs;
use std::path::Path;
use std::rc::Rc;

use indexmap::IndexMap;

use mortar_kernel::ports::CommandRunner;
use mortar_kernel::targets::{ConfValue, ConfigurationValues, FileRef, InstallData};

use crate::args::Args;
use crate::builtins::targets::normalize_command;
use crate::environment::atomic_write;
use crate::errors::{IntpError, IntpResult};
use crate::format::substitute_vars;
use crate::interpreter::Interpreter;
use crate::logger;
use crate::objects::config_data::ConfigDataObject;
use crate::objects::downcast;
use crate::objects::file::FileObject;
use crate::value::Value;

enum Mode {
    Configuration(ConfigurationValues),
    Command(Vec<Value>),
    Copy,
}

/// `configure_file()`: exactly one of `configuration`, `command` and `copy`
/// drives the call; mixing them is rejected up front.
pub fn configure_file(interp: &mut Interpreter, args: &Args) -> IntpResult<Value> {
    let output = args.kw_str("output")?.ok_or_else(|| {
        IntpError::invalid_arguments("configure_file requires \"output\"").at(&args.location)
    })?;
    if output.contains('/') || output.contains('\\') {
        return Err(IntpError::invalid_arguments(format!(
            "output \"{output}\" must not contain a path segment"
        ))
        .at(&args.location));
    }

    let mode_count = [
        args.kw("configuration").is_some(),
        args.kw("command").is_some(),
        args.kw("copy").map(|_| true).unwrap_or(false),
    ]
    .iter()
    .filter(|present| **present)
    .count();
    if mode_count != 1 {
        return Err(IntpError::invalid_arguments(
            "configure_file must receive exactly one of \"configuration\", \"command\" or \"copy\"",
        )
        .at(&args.location));
    }

    let inputs = collect_inputs(interp, args)?;

    let mode = if let Some(configuration) = args.kw("configuration") {
        let values = match configuration {
            Value::Object(obj) => {
                let data = downcast::<ConfigDataObject>(obj).ok_or_else(|| {
                    IntpError::invalid_arguments(
                        "\"configuration\" must be a configuration_data object or a dict",
                    )
                    .at(&args.location)
                })?;
                // First consuming use freezes the object (spec: freeze on use).
                data.freeze();
                data.values.borrow().clone()
            }
            Value::Dict(map) => {
                let mut values = ConfigurationValues::default();
                for (key, value) in map {
                    let conf = match value {
                        Value::Str(s) => ConfValue::Str(s.clone()),
                        Value::Int(i) => ConfValue::Int(*i),
                        Value::Bool(b) => ConfValue::Bool(*b),
                        other => {
                            return Err(IntpError::invalid_arguments(format!(
                                "configuration values must be strings, integers or booleans, \
                                 got {}",
                                other.type_name()
                            ))
                            .at(&args.location));
                        }
                    };
                    values.set(key.clone(), conf, None);
                }
                values
            }
            other => {
                return Err(IntpError::invalid_arguments(format!(
                    "\"configuration\" must be a configuration_data object or a dict, got {}",
                    other.type_name()
                ))
                .at(&args.location));
            }
        };
        Mode::Configuration(values)
    } else if args.kw("command").is_some() {
        Mode::Command(args.kw_list("command"))
    } else {
        if !args.kw_bool("copy", false)? {
            return Err(
                IntpError::invalid_arguments("\"copy\" must be true when given").at(&args.location)
            );
        }
        Mode::Copy
    };

    let output_subdir = interp.subdir.clone();
    let output_path = interp
        .env
        .build_root
        .join(&output_subdir)
        .join(&output);

    // Duplicate outputs are legal but suspicious; name both call sites.
    {
        let mut shared = interp.shared.borrow_mut();
        if let Some(first) = shared.configure_outputs.get(&output_path) {
            logger::warning(
                &interp.subproject,
                Some(&args.location),
                &format!(
                    "output \"{output}\" for configure_file was already declared at {first}, \
                     overwriting it"
                ),
            );
        } else {
            shared
                .configure_outputs
                .insert(output_path.clone(), args.location.clone());
        }
    }

    match mode {
        Mode::Configuration(values) => {
            run_configuration_mode(interp, args, &inputs, &values, &output, &output_path)?
        }
        Mode::Command(command_values) => {
            run_command_mode(interp, args, &inputs, &command_values, &output_path)?
        }
        Mode::Copy => {
            let input = match inputs.as_slice() {
                [single] => single,
                _ => {
                    return Err(IntpError::invalid_arguments(
                        "configure_file in copy mode needs exactly one input",
                    )
                    .at(&args.location));
                }
            };
            let source = input.absolute_path(&interp.env.source_root, &interp.env.build_root);
            let contents = fs::read(&source).map_err(|e| {
                IntpError::runtime(format!("could not read {}: {e}", source.display()))
                    .at(&args.location)
            })?;
            atomic_write(&output_path, &contents).map_err(|e| {
                IntpError::runtime(format!("could not write {}: {e}", output_path.display()))
                    .at(&args.location)
            })?;
        }
    }

    if args.kw_bool("install", false)? || args.kw("install_dir").is_some() {
        let install_dir = args.kw_str("install_dir")?.unwrap_or_default();
        if !install_dir.is_empty() {
            interp.build.borrow_mut().data.push(InstallData {
                sources: vec![FileRef::in_build(output_subdir.clone(), output.clone())],
                install_dir,
                install_mode: None,
                rename: Vec::new(),
                subproject: interp.subproject.clone(),
            });
        }
    }

    Ok(Value::Object(Rc::new(FileObject::new(
        FileRef::in_build(output_subdir, output),
        interp.subproject.clone(),
    ))))
}

fn collect_inputs(interp: &Interpreter, args: &Args) -> IntpResult<Vec<FileRef>> {
    let mut inputs = Vec::new();
    for value in args.kw_list("input") {
        match value {
            Value::Str(name) => {
                inputs.push(
                    (*crate::builtins::meta::file_from_string(interp, &name, args)?.file).clone(),
                );
            }
            Value::Object(obj) => {
                let file = downcast::<FileObject>(&obj).ok_or_else(|| {
                    IntpError::invalid_arguments(format!(
                        "configure_file input must be strings or files, got {}",
                        obj.kind()
                    ))
                    .at(&args.location)
                })?;
                inputs.push((*file.file).clone());
            }
            other => {
                return Err(IntpError::invalid_arguments(format!(
                    "configure_file input must be strings or files, got {}",
                    other.type_name()
                ))
                .at(&args.location));
            }
        }
    }
    Ok(inputs)
}

fn render_conf_value(value: &ConfValue) -> String {
    match value {
        ConfValue::Bool(b) => b.to_string(),
        ConfValue::Int(i) => i.to_string(),
        ConfValue::Str(s) => s.clone(),
    }
}

fn run_configuration_mode(
    interp: &mut Interpreter,
    args: &Args,
    inputs: &[FileRef],
    values: &ConfigurationValues,
    output: &str,
    output_path: &Path,
) -> IntpResult<()> {
    let rendered = match inputs {
        [] => synthesize_header(args, values)?,
        [input] => {
            let source = input.absolute_path(&interp.env.source_root, &interp.env.build_root);
            let template = fs::read_to_string(&source).map_err(|e| {
                IntpError::runtime(format!("could not read {}: {e}", source.display()))
                    .at(&args.location)
            })?;
            substitute_template(interp, args, &template, values)?
        }
        _ => {
            return Err(IntpError::invalid_arguments(
                "configure_file in configuration mode takes at most one input",
            )
            .at(&args.location));
        }
    };

    atomic_write(output_path, rendered.as_bytes()).map_err(|e| {
        IntpError::runtime(format!("could not write {}: {e}", output_path.display()))
            .at(&args.location)
    })
}

fn substitute_template(
    interp: &Interpreter,
    args: &Args,
    template: &str,
    values: &ConfigurationValues,
) -> IntpResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut missing: Vec<String> = Vec::new();
    let mut substitutions = 0usize;

    for line in template.lines() {
        if let Some(rest) = line.trim_start().strip_prefix("#mesondefine") {
            let tokens: Vec<&str> = rest.split_whitespace().collect();
            let [name] = tokens.as_slice() else {
                return Err(IntpError::invalid_arguments(format!(
                    "#mesondefine does not contain exactly two tokens: \"{line}\""
                ))
                .at(&args.location));
            };
            substitutions += 1;
            match values.get(name) {
                Some(entry) => match &entry.value {
                    ConfValue::Bool(true) => out.push_str(&format!("#define {name}")),
                    ConfValue::Bool(false) => out.push_str(&format!("#undef {name}")),
                    other => {
                        out.push_str(&format!("#define {name} {}", render_conf_value(other)))
                    }
                },
                None => out.push_str(&format!("/* #undef {name} */")),
            }
            out.push('\n');
            continue;
        }

        let (line_out, line_missing) = substitute_vars(line, |name| {
            values.get(name).map(|entry| render_conf_value(&entry.value))
        });
        substitutions += usize::from(!line_out.eq(line));
        missing.extend(line_missing);
        out.push_str(&line_out);
        out.push('\n');
    }

    if !missing.is_empty() {
        missing.sort();
        missing.dedup();
        logger::warning(
            &interp.subproject,
            Some(&args.location),
            &format!(
                "the variable(s) [{}] in the input file are not present in the given \
                 configuration data",
                missing.join(", ")
            ),
        );
    }
    if values.is_empty() && substitutions == 0 {
        logger::warning(
            &interp.subproject,
            Some(&args.location),
            "got an empty configuration_data() object and found no substitutions in the input \
             file; this is probably not what was intended",
        );
    }

    Ok(out)
}

/// No input template: the configuration data itself becomes a header, in the
/// requested output format.
fn synthesize_header(args: &Args, values: &ConfigurationValues) -> IntpResult<String> {
    let format = args.kw_str_or("output_format", "c")?;
    let (define, comment_open, comment_close) = match format.as_str() {
        "c" => ("#define", "/*", "*/"),
        "nasm" => ("%define", ";", ""),
        other => {
            return Err(IntpError::invalid_arguments(format!(
                "output_format must be \"c\" or \"nasm\", got \"{other}\""
            ))
            .at(&args.location));
        }
    };

    let mut out = format!(
        "{comment_open} Autogenerated by the build system; do not edit. {comment_close}\n\n"
    );
    for (name, entry) in &values.values {
        if let Some(comment) = &entry.comment {
            out.push_str(&format!("{comment_open} {comment} {comment_close}\n"));
        }
        match &entry.value {
            ConfValue::Bool(true) => out.push_str(&format!("{define} {name}\n")),
            ConfValue::Bool(false) => {
                out.push_str(&format!("{comment_open} undef {name} {comment_close}\n"))
            }
            other => out.push_str(&format!("{define} {name} {}\n", render_conf_value(other))),
        }
        out.push('\n');
    }
    Ok(out)
}

fn run_command_mode(
    interp: &mut Interpreter,
    args: &Args,
    inputs: &[FileRef],
    command_values: &[Value],
    output_path: &Path,
) -> IntpResult<()> {
    let raw_command = normalize_command(interp, command_values, args)?;
    if raw_command.is_empty() {
        return Err(
            IntpError::invalid_arguments("configure_file command must not be empty")
                .at(&args.location),
        );
    }

    let input_paths: Vec<String> = inputs
        .iter()
        .map(|input| {
            input
                .absolute_path(&interp.env.source_root, &interp.env.build_root)
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    let output_str = output_path.to_string_lossy().into_owned();
    let basename = inputs.first().map(|input| {
        Path::new(&input.fname)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| input.fname.clone())
    });
    let plainname = inputs.first().map(|input| input.fname.clone());
    let depfile = format!("{output_str}.d");

    let mut command = Vec::with_capacity(raw_command.len());
    for element in raw_command {
        if element == "@INPUT@" {
            if input_paths.is_empty() {
                return Err(IntpError::invalid_arguments(
                    "@INPUT@ used in command but no input given",
                )
                .at(&args.location));
            }
            command.extend(input_paths.iter().cloned());
            continue;
        }
        let mut element = element.replace("@OUTPUT@", &output_str).replace("@DEPFILE@", &depfile);
        if element.contains("@INPUT@") {
            let [single] = input_paths.as_slice() else {
                return Err(IntpError::invalid_arguments(
                    "@INPUT@ inside an argument requires exactly one input",
                )
                .at(&args.location));
            };
            element = element.replace("@INPUT@", single);
        }
        if let Some(basename) = &basename {
            element = element.replace("@BASENAME@", basename);
        }
        if let Some(plainname) = &plainname {
            element = element.replace("@PLAINNAME@", plainname);
        }
        command.push(element);
    }

    let workdir = interp.env.build_root.clone();
    fs::create_dir_all(&workdir).map_err(|e| {
        IntpError::runtime(format!("could not create build directory: {e}")).at(&args.location)
    })?;
    let result = interp
        .ports
        .runner
        .run(&command, &workdir, &IndexMap::new())
        .map_err(|e| IntpError::from(e).at(&args.location))?;
    if result.returncode != 0 {
        return Err(IntpError::runtime(format!(
            "running configure command \"{}\" failed with status {}",
            command.join(" "),
            result.returncode
        ))
        .at(&args.location));
    }

    if args.kw_bool("capture", false)? {
        let mut stdout = result.stdout;
        if !stdout.ends_with('\n') {
            stdout.push('\n');
        }
        atomic_write(output_path, stdout.as_bytes()).map_err(|e| {
            IntpError::runtime(format!("could not write {}: {e}", output_path.display()))
                .at(&args.location)
        })?;
    }
    Ok(())
}
