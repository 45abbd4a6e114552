use mortar_core::errors::ErrorKind;
use mortar_core::interpreter::SubprojectRecord;
use mortar_core::value::Value;

use crate::fixtures::*;

#[test]
fn missing_optional_subproject_becomes_a_disabled_record() {
    let project = TestProject::new();
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            assign(
                "sp",
                call(
                    "subproject",
                    vec![s("absent")],
                    vec![("required", boolean(false))],
                ),
            ),
            assign("found", method(id("sp"), "found", vec![], vec![])),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    assert_eq!(interp.variables.get("found"), Some(&Value::Bool(false)));
    let shared = interp.shared.borrow();
    assert!(matches!(
        shared.subprojects.get("absent"),
        Some(SubprojectRecord::Disabled { .. })
    ));
}

#[test]
fn missing_required_subproject_is_a_wrap_error() {
    let project = TestProject::new();
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            expr_stmt(call("subproject", vec![s("absent")], vec![])),
        ]),
    );

    let err = project.run().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Wrap);
}

#[test]
fn subproject_version_requirement_is_checked() {
    let project = TestProject::new();
    project
        .resolver
        .register("lib", project.source_root.join("subprojects/lib"));
    project.set_build_file(
        "subprojects/lib",
        block(vec![project_stmt("lib", Some("0.9"))]),
    );
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            expr_stmt(call(
                "subproject",
                vec![s("lib")],
                vec![("version", s(">=1.0"))],
            )),
        ]),
    );

    let err = project.run().unwrap_err();
    assert!(err.message.contains("version is 0.9"), "{err}");
}

#[test]
fn recursive_subproject_inclusion_is_invalid_code() {
    let project = TestProject::new();
    project
        .resolver
        .register("a", project.source_root.join("subprojects/a"));
    project
        .resolver
        .register("b", project.source_root.join("subprojects/b"));
    project.set_build_file(
        "subprojects/a",
        block(vec![
            project_stmt("a", None),
            expr_stmt(call("subproject", vec![s("b")], vec![])),
        ]),
    );
    project.set_build_file(
        "subprojects/b",
        block(vec![
            project_stmt("b", None),
            expr_stmt(call("subproject", vec![s("a")], vec![])),
        ]),
    );
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            expr_stmt(call("subproject", vec![s("a")], vec![])),
        ]),
    );

    let err = project.run().unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidCode);
    assert!(err.message.contains("a => b => a"), "{err}");
}

#[test]
fn subproject_name_validation() {
    for bad in [".hidden", "a/../b", "/abs"] {
        let project = TestProject::new();
        project.set_build_file(
            "",
            block(vec![
                project_stmt("p", None),
                expr_stmt(call("subproject", vec![s(bad)], vec![])),
            ]),
        );
        let err = project.run().unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::InvalidArguments,
            "name {bad:?} must be rejected"
        );
    }
}

#[test]
fn failing_optional_subproject_is_trapped_at_the_boundary() {
    let project = TestProject::new();
    project
        .resolver
        .register("broken", project.source_root.join("subprojects/broken"));
    project.set_build_file(
        "subprojects/broken",
        block(vec![
            project_stmt("broken", None),
            expr_stmt(call("error", vec![s("boom")], vec![])),
        ]),
    );
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            assign(
                "sp",
                call(
                    "subproject",
                    vec![s("broken")],
                    vec![("required", boolean(false))],
                ),
            ),
            assign("found", method(id("sp"), "found", vec![], vec![])),
            assign("after", boolean(true)),
        ]),
    );

    let interp = project.run().expect("the failure is trapped");
    assert_eq!(interp.variables.get("found"), Some(&Value::Bool(false)));
    assert_eq!(interp.variables.get("after"), Some(&Value::Bool(true)));
}

#[test]
fn child_warning_count_lands_in_the_record() {
    // Warning counters are process-wide; hold the capture guard so no other
    // capturing test resets them mid-run.
    let _guard = mortar_core::logger::CaptureGuard::start();
    let project = TestProject::new();
    project
        .resolver
        .register("warnsub", project.source_root.join("subprojects/warnsub"));
    project.set_build_file(
        "subprojects/warnsub",
        block(vec![
            project_stmt("warnsub", None),
            expr_stmt(call("warning", vec![s("careful")], vec![])),
        ]),
    );
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            expr_stmt(call("subproject", vec![s("warnsub")], vec![])),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    let shared = interp.shared.borrow();
    match shared.subprojects.get("warnsub") {
        Some(SubprojectRecord::Resolved { warnings, .. }) => assert_eq!(*warnings, 1),
        other => panic!("expected resolved record, got found={:?}", other.map(|r| r.found())),
    }
}

#[test]
fn global_arguments_freeze_when_a_subproject_runs() {
    let project = TestProject::new();
    project
        .resolver
        .register("lib", project.source_root.join("subprojects/lib"));
    project.set_build_file("subprojects/lib", block(vec![project_stmt("lib", None)]));
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            expr_stmt(call("subproject", vec![s("lib")], vec![])),
            expr_stmt(call(
                "add_global_arguments",
                vec![s("-DX")],
                vec![("language", s("c"))],
            )),
        ]),
    );

    let err = project.run().unwrap_err();
    assert!(err.message.contains("global arguments"), "{err}");
}

#[test]
fn subproject_variables_are_reachable_through_the_handle() {
    let project = TestProject::new();
    project
        .resolver
        .register("lib", project.source_root.join("subprojects/lib"));
    project.set_build_file(
        "subprojects/lib",
        block(vec![
            project_stmt("lib", None),
            assign("exported", s("from-lib")),
        ]),
    );
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            assign("sp", call("subproject", vec![s("lib")], vec![])),
            assign(
                "value",
                method(id("sp"), "get_variable", vec![s("exported")], vec![]),
            ),
            assign(
                "fallback",
                method(
                    id("sp"),
                    "get_variable",
                    vec![s("missing"), s("default")],
                    vec![],
                ),
            ),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    assert_eq!(
        interp.variables.get("value"),
        Some(&Value::Str("from-lib".into()))
    );
    assert_eq!(
        interp.variables.get("fallback"),
        Some(&Value::Str("default".into()))
    );
}
