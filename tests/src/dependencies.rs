use mortar_core::value::Value;
use mortar_kernel::deps::DependencyId;
use mortar_kernel::machines::MachineChoice;

use crate::fixtures::*;

fn fallback_project() -> TestProject {
    let project = TestProject::new();
    project
        .resolver
        .register("foo_wrap", project.source_root.join("subprojects/foo_wrap"));
    project.set_build_file(
        "subprojects/foo_wrap",
        block(vec![
            project_stmt("foo_wrap", None),
            assign(
                "foo_dep",
                call("declare_dependency", vec![], vec![("version", s("2.0"))]),
            ),
        ]),
    );
    project
}

#[test]
fn fallback_dependency_is_cached_under_its_identifier() {
    let project = fallback_project();
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", Some("1.0")),
            assign(
                "d1",
                call(
                    "dependency",
                    vec![s("libfoo")],
                    vec![("fallback", arr(vec![s("foo_wrap"), s("foo_dep")]))],
                ),
            ),
            assign(
                "d2",
                call(
                    "dependency",
                    vec![s("libfoo")],
                    vec![("fallback", arr(vec![s("foo_wrap"), s("foo_dep")]))],
                ),
            ),
            assign("v", method(id("d1"), "version", vec![], vec![])),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");

    // Same record behind both handles, no second subproject instantiation.
    assert_eq!(interp.variables.get("d1"), interp.variables.get("d2"));
    assert_eq!(project.resolver.resolution_count("foo_wrap"), 1);
    assert_eq!(interp.variables.get("v"), Some(&Value::Str("2.0".into())));

    let id = DependencyId::new("libfoo", MachineChoice::Host);
    let cached = interp
        .build
        .borrow()
        .cached_dependency(&id)
        .expect("dependency recorded in the cache");
    assert_eq!(cached.version_or_undefined(), "2.0");
}

#[test]
fn system_dependency_lookup_is_idempotent() {
    let project = TestProject::new();
    project.deps.provide("zlib", "1.2.11");
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            assign("d1", call("dependency", vec![s("zlib")], vec![])),
            assign("d2", call("dependency", vec![s("zlib")], vec![])),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    assert_eq!(interp.variables.get("d1"), interp.variables.get("d2"));
    assert_eq!(
        project.deps.search_count("zlib"),
        1,
        "the provider must be consulted exactly once"
    );
}

#[test]
fn version_constraint_rejects_system_dependency() {
    let project = TestProject::new();
    project.deps.provide("zlib", "1.0");
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            assign(
                "d",
                call(
                    "dependency",
                    vec![s("zlib")],
                    vec![("version", s(">=1.2")), ("required", boolean(false))],
                ),
            ),
            assign("found", method(id("d"), "found", vec![], vec![])),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    assert_eq!(interp.variables.get("found"), Some(&Value::Bool(false)));
}

#[test]
fn required_missing_dependency_fails_with_not_found_message() {
    let project = TestProject::new();
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            expr_stmt(call(
                "dependency",
                vec![s("nope")],
                vec![("not_found_message", s("install libnope-dev"))],
            )),
        ]),
    );

    let err = project.run().unwrap_err();
    assert!(err.message.contains("\"nope\" not found"));
    assert!(err.message.contains("install libnope-dev"));
}

#[test]
fn disabled_subproject_blocks_fallback_without_instantiation() {
    let project = TestProject::new();
    project
        .resolver
        .register("xsub", project.source_root.join("subprojects/xsub"));
    project.set_build_file(
        "subprojects/xsub",
        block(vec![project_stmt("xsub", None)]),
    );
    project.set_options_file(
        "",
        block(vec![expr_stmt(call(
            "option",
            vec![s("feat")],
            vec![("type", s("feature")), ("value", s("disabled"))],
        ))]),
    );
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            assign(
                "sp",
                call(
                    "subproject",
                    vec![s("xsub")],
                    vec![("required", call("get_option", vec![s("feat")], vec![]))],
                ),
            ),
            assign("sp_found", method(id("sp"), "found", vec![], vec![])),
            assign(
                "dep",
                call(
                    "dependency",
                    vec![s("whatever")],
                    vec![
                        ("fallback", arr(vec![s("xsub"), s("some_dep")])),
                        ("required", boolean(false)),
                    ],
                ),
            ),
            assign("dep_found", method(id("dep"), "found", vec![], vec![])),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    assert_eq!(interp.variables.get("sp_found"), Some(&Value::Bool(false)));
    assert_eq!(interp.variables.get("dep_found"), Some(&Value::Bool(false)));
    assert_eq!(
        project.resolver.resolution_count("xsub"),
        0,
        "a feature-disabled subproject must never be instantiated"
    );
}

#[test]
fn get_variable_on_disabled_subproject_fails() {
    let project = TestProject::new();
    project.set_options_file(
        "",
        block(vec![expr_stmt(call(
            "option",
            vec![s("feat")],
            vec![("type", s("feature")), ("value", s("disabled"))],
        ))]),
    );
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            assign(
                "sp",
                call(
                    "subproject",
                    vec![s("xsub")],
                    vec![("required", call("get_option", vec![s("feat")], vec![]))],
                ),
            ),
            expr_stmt(method(id("sp"), "get_variable", vec![s("v")], vec![])),
        ]),
    );

    let err = project.run().unwrap_err();
    assert!(err.message.contains("not successfully configured"), "{err}");
}

#[test]
fn explicit_override_wins_over_provider() {
    let project = TestProject::new();
    project.deps.provide("tool", "9.9");
    project
        .resolver
        .register("toolsub", project.source_root.join("subprojects/toolsub"));
    project.set_build_file(
        "subprojects/toolsub",
        block(vec![
            project_stmt("toolsub", None),
            assign(
                "tool_dep",
                call("declare_dependency", vec![], vec![("version", s("3.0"))]),
            ),
            expr_stmt(method(
                id("meson"),
                "override_dependency",
                vec![s("tool"), id("tool_dep")],
                vec![],
            )),
        ]),
    );
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            expr_stmt(call("subproject", vec![s("toolsub")], vec![])),
            assign("d", call("dependency", vec![s("tool")], vec![])),
            assign("v", method(id("d"), "version", vec![], vec![])),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    assert_eq!(interp.variables.get("v"), Some(&Value::Str("3.0".into())));
    assert_eq!(
        project.deps.search_count("tool"),
        0,
        "an overridden dependency must not hit the system provider"
    );
}
