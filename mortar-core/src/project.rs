use std::path::Path;
use std::rc::Rc;

use indexmap::IndexMap;

use mortar_kernel::machines::MachineChoice;
use mortar_kernel::manifest::DepManifestEntry;
use mortar_kernel::options::OptionKey;
use mortar_kernel::ports::SubprojectResolver;
use mortar_kernel::version::{version_compare, version_compare_many};

use crate::args::Args;
use crate::builtins::crosscut::add_language;
use crate::errors::{IntpError, IntpResult};
use crate::interpreter::{
    BUILD_FILE_NAME, DSL_VERSION, Interpreter, OPTIONS_FILE_NAME, SubprojectRecord,
};
use crate::logger;
use crate::objects::subproject::SubprojectObject;
use crate::optinterp;
use crate::value::Value;

/// `project()`: the only function legal as the first statement of a root
/// build file. Ordering matters: the DSL-version gate runs before anything
/// else so that even option handling is version-checked.
pub fn project(interp: &mut Interpreter, args: &Args) -> IntpResult<Value> {
    if interp.project_declared {
        return Err(IntpError::invalid_code("second call to project()").at(&args.location));
    }

    let name = args.pos_str(0, "project")?.to_owned();
    if name.contains(':') {
        return Err(IntpError::invalid_arguments(format!(
            "project name \"{name}\" must not contain \":\""
        ))
        .at(&args.location));
    }

    if let Some(wanted) = args.kw_str("meson_version")? {
        if !version_compare(DSL_VERSION, &wanted) {
            return Err(IntpError::runtime(format!(
                "build DSL version is {DSL_VERSION} but project requires {wanted}"
            ))
            .at(&args.location));
        }
        interp
            .features
            .borrow_mut()
            .set_minimum(&interp.subproject, &wanted);
    }

    let options_file = Path::new(&interp.root_subdir).join(OPTIONS_FILE_NAME);
    optinterp::process_options_file(interp, &options_file, &args.location)?;

    // Project defaults only fill slots the user did not set explicitly.
    let mut defaults = args.kw_string_list("default_options")?;
    defaults.extend(interp.pending_default_options.drain(..));
    apply_default_options(interp, &defaults, &args.location)?;

    interp.project_name = name.clone();
    interp.project_version = match args.kw("version") {
        None => "undefined".to_owned(),
        Some(Value::Str(version)) => version.clone(),
        Some(other) => {
            return Err(IntpError::invalid_arguments(format!(
                "project version must be a string, got {}",
                other.type_name()
            ))
            .at(&args.location));
        }
    };
    interp.project_license = {
        let license = args.kw_string_list("license")?;
        if license.is_empty() {
            vec!["unknown".to_owned()]
        } else {
            license
        }
    };
    interp.project_declared = true;

    {
        let mut build = interp.build.borrow_mut();
        if interp.subproject.is_empty() {
            build.project_name = name.clone();
        }
        if build.project_version.is_empty() {
            build.project_version = interp.project_version.clone();
        }
        build.dep_manifest.insert(
            name.clone(),
            DepManifestEntry::new(interp.project_version.clone(), interp.project_license.clone()),
        );
    }

    if let Some(spdir) = args.kw_str("subproject_dir")? {
        if Path::new(&spdir).is_absolute() {
            return Err(
                IntpError::invalid_arguments("subproject_dir must not be an absolute path")
                    .at(&args.location),
            );
        }
        if spdir.starts_with('.') || spdir.contains("..") {
            return Err(IntpError::invalid_arguments(
                "subproject_dir must not begin with a period or contain \"..\"",
            )
            .at(&args.location));
        }
        if interp.subproject.is_empty() {
            interp.subproject_dir = spdir;
        }
    }

    logger::message(&format!("Project name: {name}"));
    logger::message(&format!("Project version: {}", interp.project_version));

    let languages = args.pos_strings("project")?[1..].to_vec();
    for language in &languages {
        add_language(interp, language, MachineChoice::Host, true, &args.location)?;
        add_language(interp, language, MachineChoice::Build, true, &args.location)?;
    }

    let mut shared = interp.shared.borrow_mut();
    if !shared.backend_initialized {
        shared.backend_initialized = true;
        logger::message(&format!("Backend: {}", interp.ports.backend.name()));
    }

    Ok(Value::Null)
}

fn apply_default_options(
    interp: &mut Interpreter,
    defaults: &[String],
    location: &mortar_dsl::diagnostics::Location,
) -> IntpResult<()> {
    for entry in defaults {
        let (raw_key, value) = entry.split_once('=').ok_or_else(|| {
            IntpError::invalid_arguments(format!(
                "default option \"{entry}\" is not in key=value form"
            ))
            .at(location)
        })?;

        // `subp:key=value` targets a subproject's scope, otherwise the
        // current one.
        let key = match raw_key.split_once(':') {
            Some((sub, name)) => OptionKey::scoped(sub, name),
            None if interp.subproject.is_empty() => OptionKey::top_level(raw_key),
            None => OptionKey::scoped(interp.subproject.clone(), raw_key),
        };

        let env = interp.env.clone();
        let mut options = env.options.borrow_mut();
        let Some(existing) = options.get(&key) else {
            // Unknown keys may belong to options declared later (or to a
            // subproject not yet configured); remember them for that moment.
            interp
                .deferred_default_options
                .push((key, value.to_owned()));
            continue;
        };
        if existing.value == existing.default {
            options
                .set_from_string(&key, value)
                .map_err(|e| IntpError::from(e).at(location))?;
        }
    }
    Ok(())
}

/// `subdir()`: evaluates a nested build file in the same evaluator scope.
pub fn subdir(interp: &mut Interpreter, args: &Args) -> IntpResult<Value> {
    let name = args.pos_str(0, "subdir")?.to_owned();
    if name.contains("..") {
        return Err(IntpError::invalid_arguments("subdir must not contain \"..\"").at(&args.location));
    }
    if Path::new(&name).is_absolute() {
        return Err(
            IntpError::invalid_arguments("subdir argument must be a relative path")
                .at(&args.location),
        );
    }
    if interp.subdir == interp.root_subdir && name == interp.subproject_dir {
        return Err(IntpError::invalid_arguments(
            "must not go into the subprojects dir with subdir(); use subproject() instead",
        )
        .at(&args.location));
    }
    if interp.subdir.is_empty() && name.starts_with("mortar-") {
        return Err(IntpError::invalid_arguments(
            "the \"mortar-\" prefix is reserved for generated directories",
        )
        .at(&args.location));
    }

    for value in args.kw_list("if_found") {
        let Value::Object(obj) = &value else {
            return Err(IntpError::invalid_arguments(
                "object used in if_found does not have a found() method",
            )
            .at(&args.location));
        };
        let found = obj
            .call_method("found", &Args::empty(args.location.clone()), interp)
            .map_err(|_| {
                IntpError::invalid_arguments(
                    "object used in if_found does not have a found() method",
                )
                .at(&args.location)
            })?;
        if !found.is_truthy() {
            return Ok(Value::Null);
        }
    }

    let prev_subdir = interp.subdir.clone();
    let new_subdir = if prev_subdir.is_empty() {
        name.clone()
    } else {
        format!("{prev_subdir}/{name}")
    };
    interp.subdir = new_subdir.clone();

    let result = interp.eval_build_file(&Path::new(&new_subdir).join(BUILD_FILE_NAME));
    interp.subdir = prev_subdir;
    result?;
    Ok(Value::Null)
}

/// `subproject()`: spawns a child evaluator sharing the build accumulator
/// and merges its results back into the caller.
pub fn subproject(interp: &mut Interpreter, args: &Args) -> IntpResult<Value> {
    let name = args.pos_str(0, "subproject")?.to_owned();
    let (disabled, required, feature) = interp.extract_required_kwarg(args, true)?;
    let wanted_version = args.kw_string_list("version")?;
    let default_options = args.kw_string_list("default_options")?;

    if disabled {
        if let Some(feature) = &feature {
            logger::message(&format!(
                "subproject {name} skipped: feature {feature} disabled"
            ));
        }
        interp.shared.borrow_mut().subprojects.insert(
            name.clone(),
            SubprojectRecord::Disabled {
                reason: format!(
                    "feature {} disabled",
                    feature.as_deref().unwrap_or("(unnamed)")
                ),
            },
        );
        return Ok(Value::Object(Rc::new(SubprojectObject::new(name))));
    }

    do_subproject(
        interp,
        &name,
        required,
        &wanted_version,
        default_options,
        args,
    )
}

pub(crate) fn do_subproject(
    interp: &mut Interpreter,
    name: &str,
    required: bool,
    wanted_version: &[String],
    default_options: Vec<String>,
    args: &Args,
) -> IntpResult<Value> {
    if name.is_empty() {
        return Err(
            IntpError::invalid_arguments("subproject name must not be empty").at(&args.location)
        );
    }
    if name.starts_with('.') {
        return Err(
            IntpError::invalid_arguments("subproject name must not start with a period")
                .at(&args.location),
        );
    }
    if name.contains("..") {
        return Err(IntpError::invalid_arguments(
            "subproject name must not contain a \"..\" path segment",
        )
        .at(&args.location));
    }
    if Path::new(name).is_absolute() {
        return Err(
            IntpError::invalid_arguments("subproject name must not be an absolute path")
                .at(&args.location),
        );
    }
    if interp.subproject_stack.iter().any(|entry| entry == name) {
        let mut stack = interp.subproject_stack.clone();
        stack.push(name.to_owned());
        return Err(IntpError::invalid_code(format!(
            "recursive include of subprojects: {}",
            stack.join(" => ")
        ))
        .at(&args.location));
    }

    // A name resolves at most once per run; later calls see the recorded
    // outcome, with the version re-checked against the new constraints.
    {
        let shared = interp.shared.borrow();
        if let Some(record) = shared.subprojects.get(name) {
            match record {
                SubprojectRecord::Resolved { version, .. } => {
                    check_subproject_version(name, version, wanted_version, args)?;
                    return Ok(Value::Object(Rc::new(SubprojectObject::new(name))));
                }
                SubprojectRecord::Disabled { reason } => {
                    if required {
                        return Err(IntpError::runtime(format!(
                            "subproject \"{name}\" required but disabled: {reason}"
                        ))
                        .at(&args.location));
                    }
                    return Ok(Value::Object(Rc::new(SubprojectObject::new(name))));
                }
            }
        }
    }

    let resolved = interp.ports.resolver.resolve(name, None);
    let source_dir = match resolved {
        Ok(dir) => dir,
        Err(e) => {
            let err = IntpError::wrap(e.to_string()).at(&args.location);
            if required {
                return Err(err);
            }
            logger::message(&format!("subproject {name} is buildable: NO (disabling)"));
            interp.shared.borrow_mut().subprojects.insert(
                name.to_owned(),
                SubprojectRecord::Disabled {
                    reason: err.message.clone(),
                },
            );
            return Ok(Value::Object(Rc::new(SubprojectObject::new(name))));
        }
    };

    let subdir = match source_dir.strip_prefix(&interp.env.source_root) {
        Ok(relative) => relative.to_string_lossy().into_owned(),
        Err(_) => source_dir.to_string_lossy().into_owned(),
    };

    interp.build.borrow_mut().freeze_global_args();
    logger::message(&format!("Executing subproject {name}"));

    let mut stack = interp.subproject_stack.clone();
    stack.push(name.to_owned());
    let mut child = Interpreter::with_state(
        interp.env.clone(),
        interp.build.clone(),
        interp.ports.clone(),
        interp.shared.clone(),
        interp.features.clone(),
        name.to_owned(),
        stack,
        subdir,
    );
    child.subproject_dir = interp.subproject_dir.clone();
    child.pending_default_options = default_options;

    match child.run() {
        Ok(()) => {}
        Err(err) => {
            let err = child.annotate_error(err);
            if required || !err.is_trappable() {
                return Err(err);
            }
            logger::message(&format!(
                "subproject {name} is buildable: NO (disabling)\n  {err}"
            ));
            interp.shared.borrow_mut().subprojects.insert(
                name.to_owned(),
                SubprojectRecord::Disabled {
                    reason: err.message.clone(),
                },
            );
            return Ok(Value::Object(Rc::new(SubprojectObject::new(name))));
        }
    }

    let child_version = child.project_version.clone();
    check_subproject_version(name, &child_version, wanted_version, args)?;

    let variables: IndexMap<String, Value> = child
        .variables
        .iter()
        .filter(|(key, _)| {
            !matches!(
                key.as_str(),
                "meson" | "build_machine" | "host_machine" | "target_machine"
            )
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    let warnings = logger::warning_count(name);
    logger::message(&format!("Subproject {name} finished."));

    // Deferred defaults that named this subproject can now be applied by
    // later siblings; drop the ones this child consumed.
    interp
        .deferred_default_options
        .retain(|(key, _)| key.subproject != name);

    interp.shared.borrow_mut().subprojects.insert(
        name.to_owned(),
        SubprojectRecord::Resolved {
            variables,
            version: child_version,
            warnings,
        },
    );
    Ok(Value::Object(Rc::new(SubprojectObject::new(name))))
}

fn check_subproject_version(
    name: &str,
    actual: &str,
    wanted: &[String],
    args: &Args,
) -> IntpResult<()> {
    if wanted.is_empty() {
        return Ok(());
    }
    if let Err(failed) = version_compare_many(actual, wanted) {
        return Err(IntpError::runtime(format!(
            "subproject \"{name}\" version is {actual} but [{}] required",
            failed.join(", ")
        ))
        .at(&args.location));
    }
    Ok(())
}
