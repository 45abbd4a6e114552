use mortar_core::errors::ErrorKind;
use mortar_core::value::Value;

use crate::fixtures::*;

#[test]
fn subproject_cannot_reference_files_outside_its_tree() {
    let project = TestProject::new();
    project.write_source("secret.c", "int s;\n");
    project
        .resolver
        .register("guard", project.source_root.join("subprojects/guard"));
    project.set_build_file(
        "subprojects/guard",
        block(vec![
            project_stmt("guard", None),
            expr_stmt(call("files", vec![s("../../secret.c")], vec![])),
        ]),
    );
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            expr_stmt(call("subproject", vec![s("guard")], vec![])),
        ]),
    );

    let err = project.run().unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidCode);
    assert!(err.message.contains("sandbox violation"), "{err}");
}

#[test]
fn parent_cannot_reference_subproject_files() {
    let project = TestProject::new();
    project.write_source("subprojects/dep/data.c", "int d;\n");
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            expr_stmt(call("files", vec![s("subprojects/dep/data.c")], vec![])),
        ]),
    );

    let err = project.run().unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidCode);
    assert!(err.message.contains("sandbox violation"), "{err}");
}

#[test]
fn files_within_the_project_are_allowed() {
    let project = TestProject::new();
    project.write_source("src/main.c", "int main(void) { return 0; }\n");
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            assign("sources", call("files", vec![s("src/main.c")], vec![])),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    match interp.variables.get("sources") {
        Some(Value::List(items)) => assert_eq!(items.len(), 1),
        other => panic!("expected a file list, got {other:?}"),
    }
}

#[test]
fn missing_files_are_rejected_after_the_sandbox_check() {
    let project = TestProject::new();
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            expr_stmt(call("files", vec![s("nope.c")], vec![])),
        ]),
    );

    let err = project.run().unwrap_err();
    assert!(err.message.contains("does not exist"), "{err}");
}
