use mortar_core::interpreter::SubprojectRecord;
use mortar_core::logger::CaptureGuard;
use mortar_core::value::Value;

use crate::fixtures::*;

fn option_stmt(name: &str, kwargs: Vec<(&str, mortar_dsl::ast::Expr)>) -> mortar_dsl::ast::Stmt {
    expr_stmt(call("option", vec![s(name)], kwargs))
}

fn child_project(project: &TestProject, child_options: mortar_dsl::ast::CodeBlock) {
    project
        .resolver
        .register("child", project.source_root.join("subprojects/child"));
    project.set_options_file("subprojects/child", child_options);
    project.set_build_file(
        "subprojects/child",
        block(vec![
            project_stmt("child", None),
            assign("v", call("get_option", vec![s("shared_opt")], vec![])),
        ]),
    );
}

fn subproject_variable(interp: &mortar_core::interpreter::Interpreter, name: &str) -> Value {
    let shared = interp.shared.borrow();
    match shared.subprojects.get("child") {
        Some(SubprojectRecord::Resolved { variables, .. }) => variables
            .get(name)
            .cloned()
            .unwrap_or_else(|| panic!("variable {name} missing from child record")),
        _ => panic!("child subproject not resolved"),
    }
}

#[test]
fn yielding_option_takes_the_parent_value() {
    let project = TestProject::new();
    project.set_options_file(
        "",
        block(vec![option_stmt(
            "shared_opt",
            vec![("type", s("string")), ("value", s("parent"))],
        )]),
    );
    child_project(
        &project,
        block(vec![option_stmt(
            "shared_opt",
            vec![("type", s("string")), ("value", s("child")), ("yield", boolean(true))],
        )]),
    );
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            expr_stmt(call("subproject", vec![s("child")], vec![])),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    assert_eq!(subproject_variable(&interp, "v"), Value::Str("parent".into()));
}

#[test]
fn yielding_kind_mismatch_warns_and_keeps_child_value() {
    let guard = CaptureGuard::start();
    let project = TestProject::new();
    project.set_options_file(
        "",
        block(vec![option_stmt(
            "shared_opt",
            vec![("type", s("string")), ("value", s("parent"))],
        )]),
    );
    child_project(
        &project,
        block(vec![option_stmt(
            "shared_opt",
            vec![("type", s("integer")), ("value", num(1)), ("yield", boolean(true))],
        )]),
    );
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            expr_stmt(call("subproject", vec![s("child")], vec![])),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    assert_eq!(subproject_variable(&interp, "v"), Value::Int(1));
    let output = guard.take();
    assert!(output.contains("different type"), "{output}");
    drop(guard);
}

#[test]
fn subproject_default_options_fill_unset_child_options() {
    let project = TestProject::new();
    project
        .resolver
        .register("child", project.source_root.join("subprojects/child"));
    project.set_options_file(
        "subprojects/child",
        block(vec![option_stmt(
            "tune",
            vec![("type", s("string")), ("value", s("slow"))],
        )]),
    );
    project.set_build_file(
        "subprojects/child",
        block(vec![
            project_stmt("child", None),
            assign("v", call("get_option", vec![s("tune")], vec![])),
        ]),
    );
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            expr_stmt(call(
                "subproject",
                vec![s("child")],
                vec![("default_options", arr(vec![s("tune=fast")]))],
            )),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    assert_eq!(subproject_variable(&interp, "v"), Value::Str("fast".into()));
}

#[test]
fn option_names_cannot_cross_subproject_boundaries() {
    let project = TestProject::new();
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            expr_stmt(call("get_option", vec![s("other:opt")], vec![])),
        ]),
    );

    let err = project.run().unwrap_err();
    assert!(err.message.contains("colon"), "{err}");
}

#[test]
fn option_files_reject_anything_but_option_calls() {
    let project = TestProject::new();
    project.set_options_file(
        "",
        block(vec![expr_stmt(call("message", vec![s("hi")], vec![]))]),
    );
    project.set_build_file("", block(vec![project_stmt("p", None)]));

    let err = project.run().unwrap_err();
    assert!(
        err.message.contains("only calls to option()"),
        "{err}"
    );
}

#[test]
fn feature_options_surface_as_tri_state_handles() {
    let project = TestProject::new();
    project.set_options_file(
        "",
        block(vec![option_stmt(
            "fancy",
            vec![("type", s("feature")), ("value", s("auto"))],
        )]),
    );
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            assign("feat", call("get_option", vec![s("fancy")], vec![])),
            assign("is_auto", method(id("feat"), "auto", vec![], vec![])),
            assign("allowed", method(id("feat"), "allowed", vec![], vec![])),
            assign("off", method(id("feat"), "disabled", vec![], vec![])),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    assert_eq!(interp.variables.get("is_auto"), Some(&Value::Bool(true)));
    assert_eq!(interp.variables.get("allowed"), Some(&Value::Bool(true)));
    assert_eq!(interp.variables.get("off"), Some(&Value::Bool(false)));
}
