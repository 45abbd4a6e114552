use mortar_dsl::ast::FunctionCallNode;

use crate::args::{FnSpec, KwSpec, KwType};
use crate::errors::{IntpError, IntpResult};
use crate::features::FeatureKind;
use crate::interpreter::Interpreter;
use crate::value::Value;

pub mod config;
pub mod crosscut;
pub mod discovery;
pub mod install;
pub mod meta;
pub mod options;
pub mod primitives;
pub mod targets;

const TARGET_KWARGS: &[KwSpec] = &[
    KwSpec::new("sources", KwType::Any),
    KwSpec::new("objects", KwType::Any),
    KwSpec::new("link_with", KwType::Any),
    KwSpec::new("link_args", KwType::StrOrList),
    KwSpec::new("include_directories", KwType::Any),
    KwSpec::new("dependencies", KwType::Any),
    KwSpec::new("install", KwType::Bool),
    KwSpec::new("install_dir", KwType::Str),
    KwSpec::new("build_by_default", KwType::Bool),
    KwSpec::new("native", KwType::Bool),
    KwSpec::new("c_args", KwType::StrOrList),
    KwSpec::new("cpp_args", KwType::StrOrList),
    KwSpec::new("gui_app", KwType::Bool),
    KwSpec::new("pic", KwType::Bool),
    KwSpec::new("version", KwType::Str),
    KwSpec::new("soversion", KwType::Any),
];

const FN_SPECS: &[FnSpec] = &[
    FnSpec {
        name: "project",
        min_pos: 1,
        max_pos: None,
        kwargs: &[
            KwSpec::new("version", KwType::Any),
            KwSpec::new("license", KwType::StrOrList),
            KwSpec::new("meson_version", KwType::Str),
            KwSpec::new("default_options", KwType::StrOrList),
            KwSpec::since("subproject_dir", KwType::Str, "0.35.0"),
        ],
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "subproject",
        min_pos: 1,
        max_pos: Some(1),
        kwargs: &[
            KwSpec::new("version", KwType::StrOrList),
            KwSpec::new("default_options", KwType::StrOrList),
            KwSpec::new("required", KwType::Requirement),
        ],
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "subdir",
        min_pos: 1,
        max_pos: Some(1),
        kwargs: &[KwSpec::since("if_found", KwType::Any, "0.44.0")],
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "subdir_done",
        min_pos: 0,
        max_pos: Some(0),
        kwargs: &[],
        no_flatten: false,
        since: Some("0.46.0"),
    },
    FnSpec {
        name: "assert",
        min_pos: 1,
        max_pos: Some(2),
        kwargs: &[],
        no_flatten: true,
        since: None,
    },
    FnSpec {
        name: "error",
        min_pos: 0,
        max_pos: None,
        kwargs: &[],
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "warning",
        min_pos: 0,
        max_pos: None,
        kwargs: &[],
        no_flatten: false,
        since: Some("0.44.0"),
    },
    FnSpec {
        name: "message",
        min_pos: 0,
        max_pos: None,
        kwargs: &[],
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "summary",
        min_pos: 1,
        max_pos: Some(2),
        kwargs: &[
            KwSpec::new("section", KwType::Str),
            KwSpec::new("bool_yn", KwType::Bool),
            KwSpec::new("list_sep", KwType::Str),
        ],
        no_flatten: true,
        since: Some("0.53.0"),
    },
    FnSpec {
        name: "import",
        min_pos: 1,
        max_pos: Some(1),
        kwargs: &[KwSpec::new("required", KwType::Requirement)],
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "files",
        min_pos: 0,
        max_pos: None,
        kwargs: &[],
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "get_variable",
        min_pos: 1,
        max_pos: Some(2),
        kwargs: &[],
        no_flatten: true,
        since: None,
    },
    FnSpec {
        name: "set_variable",
        min_pos: 2,
        max_pos: Some(2),
        kwargs: &[],
        no_flatten: true,
        since: None,
    },
    FnSpec {
        name: "is_variable",
        min_pos: 1,
        max_pos: Some(1),
        kwargs: &[],
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "unset_variable",
        min_pos: 1,
        max_pos: Some(1),
        kwargs: &[],
        no_flatten: false,
        since: Some("0.60.0"),
    },
    FnSpec {
        name: "is_disabler",
        min_pos: 1,
        max_pos: Some(1),
        kwargs: &[],
        no_flatten: true,
        since: Some("0.52.0"),
    },
    FnSpec {
        name: "disabler",
        min_pos: 0,
        max_pos: Some(0),
        kwargs: &[],
        no_flatten: false,
        since: Some("0.44.0"),
    },
    FnSpec {
        name: "get_option",
        min_pos: 1,
        max_pos: Some(1),
        kwargs: &[],
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "run_command",
        min_pos: 1,
        max_pos: None,
        kwargs: &[
            KwSpec::new("check", KwType::Bool),
            KwSpec::new("env", KwType::Any),
            KwSpec::new("capture", KwType::Bool),
        ],
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "join_paths",
        min_pos: 1,
        max_pos: None,
        kwargs: &[],
        no_flatten: false,
        since: Some("0.36.0"),
    },
    FnSpec {
        name: "executable",
        min_pos: 1,
        max_pos: None,
        kwargs: TARGET_KWARGS,
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "static_library",
        min_pos: 1,
        max_pos: None,
        kwargs: TARGET_KWARGS,
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "shared_library",
        min_pos: 1,
        max_pos: None,
        kwargs: TARGET_KWARGS,
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "shared_module",
        min_pos: 1,
        max_pos: None,
        kwargs: TARGET_KWARGS,
        no_flatten: false,
        since: Some("0.37.0"),
    },
    FnSpec {
        name: "both_libraries",
        min_pos: 1,
        max_pos: None,
        kwargs: TARGET_KWARGS,
        no_flatten: false,
        since: Some("0.46.0"),
    },
    FnSpec {
        name: "library",
        min_pos: 1,
        max_pos: None,
        kwargs: TARGET_KWARGS,
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "jar",
        min_pos: 1,
        max_pos: None,
        kwargs: TARGET_KWARGS,
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "build_target",
        min_pos: 1,
        max_pos: None,
        kwargs: &[
            KwSpec::new("target_type", KwType::Str),
            KwSpec::new("sources", KwType::Any),
            KwSpec::new("objects", KwType::Any),
            KwSpec::new("link_with", KwType::Any),
            KwSpec::new("link_args", KwType::StrOrList),
            KwSpec::new("include_directories", KwType::Any),
            KwSpec::new("dependencies", KwType::Any),
            KwSpec::new("install", KwType::Bool),
            KwSpec::new("install_dir", KwType::Str),
            KwSpec::new("build_by_default", KwType::Bool),
            KwSpec::new("native", KwType::Bool),
            KwSpec::new("c_args", KwType::StrOrList),
            KwSpec::new("cpp_args", KwType::StrOrList),
            KwSpec::new("gui_app", KwType::Bool),
            KwSpec::new("pic", KwType::Bool),
            KwSpec::new("version", KwType::Str),
            KwSpec::new("soversion", KwType::Any),
        ],
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "custom_target",
        min_pos: 1,
        max_pos: Some(1),
        kwargs: &[
            KwSpec::new("input", KwType::Any),
            KwSpec::new("output", KwType::StrOrList),
            KwSpec::new("command", KwType::Any),
            KwSpec::new("capture", KwType::Bool),
            KwSpec::new("depfile", KwType::Str),
            KwSpec::new("install", KwType::Bool),
            KwSpec::new("install_dir", KwType::Any),
            KwSpec::new("build_by_default", KwType::Bool),
            KwSpec::new("build_always_stale", KwType::Bool),
            KwSpec::new("depends", KwType::Any),
        ],
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "run_target",
        min_pos: 1,
        max_pos: Some(1),
        kwargs: &[
            KwSpec::new("command", KwType::Any),
            KwSpec::new("depends", KwType::Any),
            KwSpec::since("env", KwType::Any, "0.57.0"),
        ],
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "alias_target",
        min_pos: 2,
        max_pos: None,
        kwargs: &[],
        no_flatten: false,
        since: Some("0.52.0"),
    },
    FnSpec {
        name: "generator",
        min_pos: 1,
        max_pos: Some(1),
        kwargs: &[
            KwSpec::new("arguments", KwType::StrOrList),
            KwSpec::new("output", KwType::StrOrList),
            KwSpec::new("depfile", KwType::Str),
            KwSpec::since("capture", KwType::Bool, "0.43.0"),
        ],
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "test",
        min_pos: 2,
        max_pos: Some(2),
        kwargs: &[
            KwSpec::new("args", KwType::Any),
            KwSpec::new("env", KwType::Any),
            KwSpec::new("should_fail", KwType::Bool),
            KwSpec::new("timeout", KwType::Int),
            KwSpec::new("workdir", KwType::Str),
            KwSpec::new("is_parallel", KwType::Bool),
            KwSpec::since("priority", KwType::Int, "0.52.0"),
            KwSpec::new("suite", KwType::StrOrList),
            KwSpec::since("depends", KwType::Any, "0.46.0"),
        ],
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "benchmark",
        min_pos: 2,
        max_pos: Some(2),
        kwargs: &[
            KwSpec::new("args", KwType::Any),
            KwSpec::new("env", KwType::Any),
            KwSpec::new("should_fail", KwType::Bool),
            KwSpec::new("timeout", KwType::Int),
            KwSpec::new("workdir", KwType::Str),
            KwSpec::new("suite", KwType::StrOrList),
        ],
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "vcs_tag",
        min_pos: 0,
        max_pos: Some(0),
        kwargs: &[
            KwSpec::new("input", KwType::Any),
            KwSpec::new("output", KwType::Str),
            KwSpec::new("command", KwType::Any),
            KwSpec::new("fallback", KwType::Str),
            KwSpec::new("replace_string", KwType::Str),
        ],
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "configuration_data",
        min_pos: 0,
        max_pos: Some(1),
        kwargs: &[],
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "configure_file",
        min_pos: 0,
        max_pos: Some(0),
        kwargs: &[
            KwSpec::new("input", KwType::Any),
            KwSpec::new("output", KwType::Str),
            KwSpec::new("configuration", KwType::Any),
            KwSpec::new("command", KwType::Any),
            KwSpec::since("copy", KwType::Bool, "0.47.0"),
            KwSpec::new("capture", KwType::Bool),
            KwSpec::since("output_format", KwType::Str, "0.47.0"),
            KwSpec::new("install_dir", KwType::Str),
            KwSpec::new("install", KwType::Bool),
        ],
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "environment",
        min_pos: 0,
        max_pos: Some(1),
        kwargs: &[],
        no_flatten: false,
        since: Some("0.35.0"),
    },
    FnSpec {
        name: "install_data",
        min_pos: 0,
        max_pos: None,
        kwargs: &[
            KwSpec::new("sources", KwType::Any),
            KwSpec::new("install_dir", KwType::Str),
            KwSpec::new("install_mode", KwType::Any),
            KwSpec::new("rename", KwType::StrOrList),
        ],
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "install_headers",
        min_pos: 0,
        max_pos: None,
        kwargs: &[
            KwSpec::new("subdir", KwType::Str),
            KwSpec::new("install_dir", KwType::Str),
        ],
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "install_man",
        min_pos: 0,
        max_pos: None,
        kwargs: &[
            KwSpec::new("install_dir", KwType::Str),
            KwSpec::since("locale", KwType::Str, "0.58.0"),
        ],
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "install_subdir",
        min_pos: 1,
        max_pos: Some(1),
        kwargs: &[
            KwSpec::new("install_dir", KwType::Str),
            KwSpec::new("exclude_files", KwType::StrOrList),
            KwSpec::new("exclude_directories", KwType::StrOrList),
            KwSpec::new("strip_directory", KwType::Bool),
        ],
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "dependency",
        min_pos: 1,
        max_pos: None,
        kwargs: &[
            KwSpec::new("version", KwType::StrOrList),
            KwSpec::new("required", KwType::Requirement),
            KwSpec::new("native", KwType::Bool),
            KwSpec::new("static", KwType::Bool),
            KwSpec::new("method", KwType::Str),
            KwSpec::new("fallback", KwType::StrOrList),
            KwSpec::since("allow_fallback", KwType::Bool, "0.56.0"),
            KwSpec::new("default_options", KwType::StrOrList),
            KwSpec::since("include_type", KwType::Str, "0.52.0"),
            KwSpec::new("modules", KwType::StrOrList),
            KwSpec::since("not_found_message", KwType::Str, "0.50.0"),
            KwSpec::since("disabler", KwType::Bool, "0.49.0"),
        ],
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "find_program",
        min_pos: 1,
        max_pos: None,
        kwargs: &[
            KwSpec::new("required", KwType::Requirement),
            KwSpec::new("native", KwType::Bool),
            KwSpec::since("dirs", KwType::StrOrList, "0.53.0"),
            KwSpec::since("version", KwType::StrOrList, "0.52.0"),
            KwSpec::since("disabler", KwType::Bool, "0.49.0"),
        ],
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "declare_dependency",
        min_pos: 0,
        max_pos: Some(0),
        kwargs: &[
            KwSpec::new("compile_args", KwType::StrOrList),
            KwSpec::new("link_args", KwType::StrOrList),
            KwSpec::new("link_with", KwType::Any),
            KwSpec::new("include_directories", KwType::Any),
            KwSpec::new("dependencies", KwType::Any),
            KwSpec::new("sources", KwType::Any),
            KwSpec::new("version", KwType::Str),
            KwSpec::since("variables", KwType::Any, "0.54.0"),
        ],
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "include_directories",
        min_pos: 0,
        max_pos: None,
        kwargs: &[KwSpec::new("is_system", KwType::Bool)],
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "add_global_arguments",
        min_pos: 0,
        max_pos: None,
        kwargs: &[
            KwSpec::new("language", KwType::StrOrList),
            KwSpec::new("native", KwType::Bool),
        ],
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "add_project_arguments",
        min_pos: 0,
        max_pos: None,
        kwargs: &[
            KwSpec::new("language", KwType::StrOrList),
            KwSpec::new("native", KwType::Bool),
        ],
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "add_global_link_arguments",
        min_pos: 0,
        max_pos: None,
        kwargs: &[
            KwSpec::new("language", KwType::StrOrList),
            KwSpec::new("native", KwType::Bool),
        ],
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "add_project_link_arguments",
        min_pos: 0,
        max_pos: None,
        kwargs: &[
            KwSpec::new("language", KwType::StrOrList),
            KwSpec::new("native", KwType::Bool),
        ],
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "add_test_setup",
        min_pos: 1,
        max_pos: Some(1),
        kwargs: &[
            KwSpec::new("exe_wrapper", KwType::Any),
            KwSpec::new("gdb", KwType::Bool),
            KwSpec::new("timeout_multiplier", KwType::Int),
            KwSpec::since("env", KwType::Any, "0.57.0"),
            KwSpec::since("is_default", KwType::Bool, "0.49.0"),
            KwSpec::since("exclude_suites", KwType::StrOrList, "0.57.0"),
        ],
        no_flatten: false,
        since: None,
    },
    FnSpec {
        name: "add_languages",
        min_pos: 0,
        max_pos: None,
        kwargs: &[
            KwSpec::new("required", KwType::Requirement),
            KwSpec::since("native", KwType::Bool, "0.54.0"),
        ],
        no_flatten: false,
        since: None,
    },
];

fn find_spec(name: &str) -> Option<&'static FnSpec> {
    FN_SPECS.iter().find(|spec| spec.name == name)
}

/// Functions that must see Disabler arguments instead of being absorbed.
const DISABLER_EXEMPT: &[&str] = &["set_variable", "get_variable", "is_disabler", "unset_variable"];

/// Central entry for every DSL function call: schema validation, Disabler
/// screening and feature gating happen here, then the per-function
/// implementation runs.
pub fn call_builtin(interp: &mut Interpreter, node: &FunctionCallNode) -> IntpResult<Value> {
    let name = node.name.as_str();
    let Some(spec) = find_spec(name) else {
        return Err(
            IntpError::invalid_code(format!("unknown function \"{name}\"")).at(&node.location),
        );
    };

    let args = interp.eval_args(&node.args, !spec.no_flatten)?;
    if args.has_disabler() && !DISABLER_EXEMPT.contains(&name) {
        return Ok(Value::Disabler);
    }
    spec.check(&args)?;

    let subproject = interp.subproject.clone();
    if let Some(version) = spec.since {
        interp.features.borrow_mut().check(
            FeatureKind::New,
            &subproject,
            &format!("{name}()"),
            version,
            Some(&node.location),
        );
    }
    for kw in spec.kwargs {
        if !args.kwargs.contains_key(kw.name) {
            continue;
        }
        if let Some(version) = kw.since {
            interp.features.borrow_mut().check(
                FeatureKind::New,
                &subproject,
                &format!("{name}() kwarg \"{}\"", kw.name),
                version,
                Some(&node.location),
            );
        }
        if let Some(version) = kw.deprecated {
            interp.features.borrow_mut().check(
                FeatureKind::Deprecated,
                &subproject,
                &format!("{name}() kwarg \"{}\"", kw.name),
                version,
                Some(&node.location),
            );
        }
    }

    match name {
        "project" => crate::project::project(interp, &args),
        "subproject" => crate::project::subproject(interp, &args),
        "subdir" => crate::project::subdir(interp, &args),
        "subdir_done" => Err(IntpError::invalid_code(
            "subdir_done() is only valid as a direct statement",
        )
        .at(&node.location)),
        "assert" => meta::assert_fn(&args, node),
        "error" => meta::error_fn(&args),
        "warning" => meta::warning_fn(interp, &args),
        "message" => meta::message_fn(&args),
        "summary" => meta::summary(interp, &args),
        "import" => crate::modules::import(interp, &args),
        "files" => meta::files(interp, &args),
        "get_variable" => meta::get_variable(interp, &args),
        "set_variable" => meta::set_variable(interp, &args),
        "is_variable" => meta::is_variable(interp, &args),
        "unset_variable" => meta::unset_variable(interp, &args),
        "is_disabler" => Ok(Value::Bool(
            args.positional.first().map(Value::is_disabler).unwrap_or(false),
        )),
        "disabler" => Ok(Value::Disabler),
        "get_option" => options::get_option(interp, &args),
        "run_command" => meta::run_command(interp, &args),
        "join_paths" => meta::join_paths_fn(&args),
        "executable" | "static_library" | "shared_library" | "shared_module" | "library"
        | "jar" | "build_target" | "both_libraries" => targets::build_target(interp, name, &args),
        "custom_target" => targets::custom_target(interp, &args),
        "run_target" => targets::run_target(interp, &args),
        "alias_target" => targets::alias_target(interp, &args),
        "generator" => targets::generator(interp, &args),
        "test" => targets::test(interp, &args, false),
        "benchmark" => targets::test(interp, &args, true),
        "vcs_tag" => targets::vcs_tag(interp, &args),
        "configuration_data" => config::configuration_data(&args),
        "configure_file" => crate::configfile::configure_file(interp, &args),
        "environment" => config::environment(&args),
        "install_data" => install::install_data(interp, &args),
        "install_headers" => install::install_headers(interp, &args),
        "install_man" => install::install_man(interp, &args),
        "install_subdir" => install::install_subdir(interp, &args),
        "dependency" => crate::depresolver::dependency(interp, &args),
        "find_program" => discovery::find_program(interp, &args),
        "declare_dependency" => discovery::declare_dependency(interp, &args),
        "include_directories" => discovery::include_directories(interp, &args),
        "add_global_arguments" => crosscut::add_arguments(interp, &args, true, false),
        "add_project_arguments" => crosscut::add_arguments(interp, &args, false, false),
        "add_global_link_arguments" => crosscut::add_arguments(interp, &args, true, true),
        "add_project_link_arguments" => crosscut::add_arguments(interp, &args, false, true),
        "add_test_setup" => crosscut::add_test_setup(interp, &args),
        "add_languages" => crosscut::add_languages(interp, &args),
        other => Err(
            IntpError::invalid_code(format!("unknown function \"{other}\"")).at(&node.location),
        ),
    }
}
