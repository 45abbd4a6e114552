use mortar_core::value::Value;

use crate::fixtures::*;

#[test]
fn not_found_dependency_disables_library_without_error() {
    let project = TestProject::new();
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", Some("1.0")),
            assign(
                "dep",
                call("dependency", vec![s("x")], vec![("required", boolean(false))]),
            ),
            assign(
                "lib",
                call(
                    "library",
                    vec![s("y"), s("y.c")],
                    vec![(
                        "dependencies",
                        ternary(method(id("dep"), "found", vec![], vec![]), id("dep"), call("disabler", vec![], vec![])),
                    )],
                ),
            ),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    assert!(matches!(interp.variables.get("lib"), Some(Value::Disabler)));
    assert!(
        interp.build.borrow().targets().is_empty(),
        "no y target may be declared"
    );
}

#[test]
fn disabler_absorbs_operators_and_methods() {
    let project = TestProject::new();
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            assign("d", call("disabler", vec![], vec![])),
            assign("sum", add(id("d"), num(1))),
            assign("upper", method(id("d"), "to_upper", vec![], vec![])),
            assign("compared", eq(id("d"), num(3))),
            assign("flag", call("is_disabler", vec![id("sum")], vec![])),
            assign("taken", ternary(boolean(true), num(1), num(2))),
            if_stmt(id("d"), vec![assign("taken", num(99))]),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    assert!(matches!(interp.variables.get("sum"), Some(Value::Disabler)));
    assert!(matches!(interp.variables.get("upper"), Some(Value::Disabler)));
    assert!(matches!(
        interp.variables.get("compared"),
        Some(Value::Disabler)
    ));
    assert_eq!(interp.variables.get("flag"), Some(&Value::Bool(true)));
    // The disabler condition is falsy, so the branch must not run.
    assert_eq!(interp.variables.get("taken"), Some(&Value::Int(1)));
}

#[test]
fn function_call_with_disabler_argument_returns_disabler() {
    let project = TestProject::new();
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            assign(
                "joined",
                call("join_paths", vec![s("a"), call("disabler", vec![], vec![])], vec![]),
            ),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    assert!(matches!(
        interp.variables.get("joined"),
        Some(Value::Disabler)
    ));
}
