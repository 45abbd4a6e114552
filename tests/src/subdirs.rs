use mortar_core::value::Value;
use mortar_dsl::ast::{BreakNode, ContinueNode, Stmt};

use crate::fixtures::*;

#[test]
fn subdir_done_skips_the_rest_of_that_file_only() {
    let project = TestProject::new();
    project.set_build_file(
        "sub",
        block(vec![
            assign("x", num(1)),
            if_stmt(
                boolean(true),
                vec![expr_stmt(call("subdir_done", vec![], vec![]))],
            ),
            assign("x", num(2)),
        ]),
    );
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            expr_stmt(call("subdir", vec![s("sub")], vec![])),
            assign("after", num(42)),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    // The guarded tail never ran, but the caller continued normally.
    assert_eq!(interp.variables.get("x"), Some(&Value::Int(1)));
    assert_eq!(interp.variables.get("after"), Some(&Value::Int(42)));
}

#[test]
fn subdir_done_with_false_guard_runs_everything() {
    let project = TestProject::new();
    project.set_build_file(
        "sub",
        block(vec![
            assign("x", num(1)),
            if_stmt(
                boolean(false),
                vec![expr_stmt(call("subdir_done", vec![], vec![]))],
            ),
            assign("x", num(2)),
        ]),
    );
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            expr_stmt(call("subdir", vec![s("sub")], vec![])),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    assert_eq!(interp.variables.get("x"), Some(&Value::Int(2)));
}

#[test]
fn subdir_shares_the_variable_scope() {
    let project = TestProject::new();
    project.set_build_file("sub", block(vec![assign("from_sub", add(id("base"), num(1)))]));
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            assign("base", num(10)),
            expr_stmt(call("subdir", vec![s("sub")], vec![])),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    assert_eq!(interp.variables.get("from_sub"), Some(&Value::Int(11)));
}

#[test]
fn subdir_rejects_escapes_and_reentry() {
    let project = TestProject::new();
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            expr_stmt(call("subdir", vec![s("../outside")], vec![])),
        ]),
    );
    let err = project.run().unwrap_err();
    assert!(err.message.contains(".."), "{err}");

    let project = TestProject::new();
    project.set_build_file("sub", block(vec![]));
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            expr_stmt(call("subdir", vec![s("sub")], vec![])),
            expr_stmt(call("subdir", vec![s("sub")], vec![])),
        ]),
    );
    let err = project.run().unwrap_err();
    assert!(err.message.contains("already been visited"), "{err}");
}

#[test]
fn subdir_if_found_short_circuits() {
    let project = TestProject::new();
    // No build file registered for "skipped": entering it would error.
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            assign(
                "dep",
                call("dependency", vec![s("gone")], vec![("required", boolean(false))]),
            ),
            expr_stmt(call(
                "subdir",
                vec![s("skipped")],
                vec![("if_found", id("dep"))],
            )),
            assign("after", boolean(true)),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    assert_eq!(interp.variables.get("after"), Some(&Value::Bool(true)));
}

#[test]
fn foreach_supports_break_continue_and_dict_iteration() {
    let project = TestProject::new();
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            assign("total", num(0)),
            foreach(
                vec!["item"],
                arr(vec![num(1), num(2), num(3), num(10)]),
                vec![
                    if_stmt(eq(id("item"), num(2)), vec![Stmt::Continue(ContinueNode {
                        location: loc(),
                    })]),
                    if_stmt(eq(id("item"), num(10)), vec![Stmt::Break(BreakNode {
                        location: loc(),
                    })]),
                    assign("total", add(id("total"), id("item"))),
                ],
            ),
            assign("keys", s("")),
            foreach(
                vec!["k", "v"],
                dict(vec![("a", num(1)), ("b", num(2))]),
                vec![assign("keys", add(id("keys"), id("k")))],
            ),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    assert_eq!(interp.variables.get("total"), Some(&Value::Int(4)));
    assert_eq!(interp.variables.get("keys"), Some(&Value::Str("ab".into())));
}
