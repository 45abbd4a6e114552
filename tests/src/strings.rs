use mortar_dsl::ast::{Expr, FormatStringNode};

use mortar_core::value::Value;

use crate::fixtures::*;

fn fstring(template: &str) -> Expr {
    Expr::FormatStr(FormatStringNode {
        value: template.to_owned(),
        location: loc(),
    })
}

#[test]
fn format_strings_interpolate_from_the_scope() {
    let project = TestProject::new();
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            assign("name", s("world")),
            assign("count", num(3)),
            assign("greeting", fstring("hello @name@ x@count@")),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    assert_eq!(
        interp.variables.get("greeting"),
        Some(&Value::Str("hello world x3".into()))
    );
}

#[test]
fn format_strings_reject_unknown_variables() {
    let project = TestProject::new();
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            assign("oops", fstring("@who@")),
        ]),
    );

    let err = project.run().unwrap_err();
    assert!(err.message.contains("unknown variable"), "{err}");
}

#[test]
fn string_methods_compose_through_the_evaluator() {
    let project = TestProject::new();
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            assign(
                "v",
                method(s("@0@.@1@"), "format", vec![num(1), num(4)], vec![]),
            ),
            assign(
                "new_enough",
                method(id("v"), "version_compare", vec![s(">=1.2")], vec![]),
            ),
            assign("parts", method(s("a-b-c"), "split", vec![s("-")], vec![])),
            assign("upper", method(s("abc"), "to_upper", vec![], vec![])),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    assert_eq!(interp.variables.get("v"), Some(&Value::Str("1.4".into())));
    assert_eq!(interp.variables.get("new_enough"), Some(&Value::Bool(true)));
    assert_eq!(
        interp.variables.get("parts"),
        Some(&Value::List(vec![
            Value::Str("a".into()),
            Value::Str("b".into()),
            Value::Str("c".into()),
        ]))
    );
    assert_eq!(interp.variables.get("upper"), Some(&Value::Str("ABC".into())));
}

#[test]
fn compiler_probes_flow_through_the_port() {
    let project = TestProject::new();
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            assign("cc", method(id("meson"), "get_compiler", vec![s("c")], vec![])),
            assign("has_stdio", method(id("cc"), "has_header", vec![s("stdio.h")], vec![])),
            assign("int_size", method(id("cc"), "sizeof", vec![s("int")], vec![])),
            assign(
                "flags",
                method(
                    id("cc"),
                    "get_supported_arguments",
                    vec![s("-Wall"), s("-Wbogus-thing")],
                    vec![],
                ),
            ),
            assign(
                "libm",
                method(id("cc"), "find_library", vec![s("m")], vec![]),
            ),
            assign("libm_found", method(id("libm"), "found", vec![], vec![])),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    assert_eq!(interp.variables.get("has_stdio"), Some(&Value::Bool(true)));
    assert_eq!(interp.variables.get("int_size"), Some(&Value::Int(4)));
    assert_eq!(
        interp.variables.get("flags"),
        Some(&Value::List(vec![Value::Str("-Wall".into())]))
    );
    assert_eq!(interp.variables.get("libm_found"), Some(&Value::Bool(true)));
}

#[test]
fn environment_objects_replay_their_operations() {
    let project = TestProject::new();
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            assign("e", call("environment", vec![], vec![])),
            expr_stmt(method(id("e"), "set", vec![s("PATH"), s("/a")], vec![])),
            expr_stmt(method(id("e"), "append", vec![s("PATH"), s("/b")], vec![])),
            expr_stmt(method(id("e"), "prepend", vec![s("PATH"), s("/c")], vec![])),
            assign("exe", call("executable", vec![s("t"), s("t.c")], vec![])),
            expr_stmt(call(
                "test",
                vec![s("env-test"), id("exe")],
                vec![("env", id("e"))],
            )),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    let build = interp.build.borrow();
    let resolved = build.tests[0].env.resolve(&indexmap::IndexMap::new());
    assert_eq!(resolved.get("PATH").map(String::as_str), Some("/c:/a:/b"));
}
