use mortar_core::value::Value;

use crate::fixtures::*;

#[test]
fn keyval_load_parses_and_registers_reconfigure_trigger() {
    let project = TestProject::new();
    project.write_source(
        "defconfig",
        "# comment line\nCONFIG_FOO=y\nCONFIG_BAR=42 # trailing\nbroken line\n",
    );
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            assign("kv", call("import", vec![s("keyval")], vec![])),
            assign("conf", method(id("kv"), "load", vec![s("defconfig")], vec![])),
            assign(
                "foo",
                method(id("conf"), "get", vec![s("CONFIG_FOO")], vec![]),
            ),
            assign(
                "bar",
                method(id("conf"), "get", vec![s("CONFIG_BAR")], vec![]),
            ),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    assert_eq!(interp.variables.get("foo"), Some(&Value::Str("y".into())));
    assert_eq!(interp.variables.get("bar"), Some(&Value::Str("42".into())));

    let build = interp.build.borrow();
    assert!(
        build
            .build_def_files()
            .iter()
            .any(|path| path.ends_with("defconfig")),
        "the parsed file must trigger reconfiguration"
    );
}

#[test]
fn fs_module_answers_path_queries() {
    let project = TestProject::new();
    project.write_source("data/blob.bin", "12345678");
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            assign("fs", call("import", vec![s("fs")], vec![])),
            assign("there", method(id("fs"), "exists", vec![s("data/blob.bin")], vec![])),
            assign("missing", method(id("fs"), "is_file", vec![s("data/other")], vec![])),
            assign("size", method(id("fs"), "size", vec![s("data/blob.bin")], vec![])),
            assign("stem", method(id("fs"), "stem", vec![s("data/blob.bin")], vec![])),
            assign(
                "renamed",
                method(
                    id("fs"),
                    "replace_suffix",
                    vec![s("data/blob.bin"), s(".txt")],
                    vec![],
                ),
            ),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    assert_eq!(interp.variables.get("there"), Some(&Value::Bool(true)));
    assert_eq!(interp.variables.get("missing"), Some(&Value::Bool(false)));
    assert_eq!(interp.variables.get("size"), Some(&Value::Int(8)));
    assert_eq!(interp.variables.get("stem"), Some(&Value::Str("blob".into())));
    assert_eq!(
        interp.variables.get("renamed"),
        Some(&Value::Str("data/blob.txt".into()))
    );
}

#[test]
fn fs_read_obeys_the_sandbox() {
    let project = TestProject::new();
    project.write_source("subprojects/dep/notes.txt", "secret\n");
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            assign("fs", call("import", vec![s("fs")], vec![])),
            expr_stmt(method(
                id("fs"),
                "read",
                vec![s("subprojects/dep/notes.txt")],
                vec![],
            )),
        ]),
    );

    let err = project.run().unwrap_err();
    assert!(err.message.contains("sandbox violation"), "{err}");
}

#[test]
fn unknown_module_is_an_error_unless_optional() {
    let project = TestProject::new();
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            expr_stmt(call("import", vec![s("no_such_module")], vec![])),
        ]),
    );
    let err = project.run().unwrap_err();
    assert!(err.message.contains("does not exist"), "{err}");

    let project = TestProject::new();
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            assign(
                "maybe",
                call(
                    "import",
                    vec![s("no_such_module")],
                    vec![("required", boolean(false))],
                ),
            ),
        ]),
    );
    let interp = project.run().expect("optional import is soft");
    assert!(matches!(
        interp.variables.get("maybe"),
        Some(Value::Disabler)
    ));
}

#[test]
fn modules_instantiate_once_per_evaluator() {
    let project = TestProject::new();
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            assign("fs1", call("import", vec![s("fs")], vec![])),
            assign("fs2", call("import", vec![s("fs")], vec![])),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    // Same module instance behind both handles.
    assert_eq!(interp.variables.get("fs1"), interp.variables.get("fs2"));
}
