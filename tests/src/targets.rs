use mortar_core::value::Value;
use mortar_kernel::targets::{AnyTarget, TargetKind};

use crate::fixtures::*;

#[test]
fn duplicate_target_ids_are_a_hard_error() {
    let project = TestProject::new();
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            expr_stmt(call("executable", vec![s("hello"), s("a.c")], vec![])),
            expr_stmt(call("executable", vec![s("hello"), s("b.c")], vec![])),
        ]),
    );

    let err = project.run().unwrap_err();
    assert!(err.message.contains("same id"), "{err}");
}

#[test]
fn both_libraries_exposes_shared_and_static_halves() {
    let project = TestProject::new();
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            assign("bl", call("both_libraries", vec![s("mix"), s("m.c")], vec![])),
            assign("shared_half", method(id("bl"), "get_shared_lib", vec![], vec![])),
            assign("static_half", method(id("bl"), "get_static_lib", vec![], vec![])),
            // Anything else dispatches to the shared half.
            assign("bl_name", method(id("bl"), "name", vec![], vec![])),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    let build = interp.build.borrow();
    assert!(build.get_target("mix@sha").is_some());
    assert!(build.get_target("mix@sta").is_some());
    assert_eq!(interp.variables.get("bl_name"), Some(&Value::Str("mix".into())));
}

#[test]
fn library_kind_follows_default_library_option() {
    let project = TestProject::new();
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            expr_stmt(call("library", vec![s("util"), s("u.c")], vec![])),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    let build = interp.build.borrow();
    match build.get_target("util@sha").expect("shared by default") {
        AnyTarget::Build(t) => assert_eq!(t.kind, TargetKind::SharedLibrary),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn custom_target_records_command_and_outputs() {
    let project = TestProject::new();
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            expr_stmt(call(
                "custom_target",
                vec![s("gen-header")],
                vec![
                    ("output", s("gen.h")),
                    ("command", arr(vec![s("gen"), s("@OUTPUT@")])),
                    ("capture", boolean(true)),
                ],
            )),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    let build = interp.build.borrow();
    match build.get_target("gen-header@cus").expect("custom target") {
        AnyTarget::Custom(t) => {
            assert_eq!(t.outputs, vec!["gen.h".to_owned()]);
            assert_eq!(t.command[0], "gen");
            assert!(t.capture);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn tests_and_benchmarks_land_in_separate_lists() {
    let project = TestProject::new();
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            assign("exe", call("executable", vec![s("t"), s("t.c")], vec![])),
            expr_stmt(call(
                "test",
                vec![s("basic"), id("exe")],
                vec![("suite", s("unit")), ("timeout", num(10))],
            )),
            expr_stmt(call("benchmark", vec![s("speed"), id("exe")], vec![])),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    let build = interp.build.borrow();
    assert_eq!(build.tests.len(), 1);
    assert_eq!(build.benchmarks.len(), 1);
    let test = &build.tests[0];
    assert_eq!(test.name, "basic");
    assert_eq!(test.timeout, 10);
    assert_eq!(test.suites, vec!["p".to_owned(), "p:unit".to_owned()]);
}

#[test]
fn test_names_must_not_contain_colons() {
    let project = TestProject::new();
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            assign("exe", call("executable", vec![s("t"), s("t.c")], vec![])),
            expr_stmt(call("test", vec![s("bad:name"), id("exe")], vec![])),
        ]),
    );

    let err = project.run().unwrap_err();
    assert!(err.message.contains("must not contain"), "{err}");
}

#[test]
fn run_and_alias_targets_are_registered() {
    let project = TestProject::new();
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            assign("exe", call("executable", vec![s("app"), s("a.c")], vec![])),
            assign(
                "lint",
                call(
                    "run_target",
                    vec![s("lint")],
                    vec![("command", arr(vec![s("lint-tool")]))],
                ),
            ),
            expr_stmt(call("alias_target", vec![s("everything"), id("exe")], vec![])),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    let build = interp.build.borrow();
    assert!(build.get_target("lint@run").is_some());
    assert!(build.get_target("everything@al").is_some());
    assert!(build.run_target_names.contains(&(String::new(), "lint".to_owned())));
}

#[test]
fn generator_outputs_feed_target_sources() {
    let project = TestProject::new();
    project.programs.provide("lemon", "/usr/bin/lemon", None);
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            assign(
                "gen",
                call(
                    "generator",
                    vec![call("find_program", vec![s("lemon")], vec![])],
                    vec![
                        ("output", s("@BASENAME@.c")),
                        ("arguments", arr(vec![s("@INPUT@")])),
                    ],
                ),
            ),
            assign("parsed", method(id("gen"), "process", vec![s("grammar.y")], vec![])),
            expr_stmt(call("executable", vec![s("parser"), id("parsed")], vec![])),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    let build = interp.build.borrow();
    match build.get_target("parser@exe").expect("parser target") {
        AnyTarget::Build(t) => {
            assert_eq!(t.sources.len(), 1);
            match &t.sources[0] {
                mortar_kernel::targets::Source::File(file) => {
                    assert!(file.is_built);
                    assert_eq!(file.fname, "grammar.c");
                }
                other => panic!("unexpected source {other:?}"),
            }
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn vcs_tag_declares_an_always_stale_custom_target() {
    let project = TestProject::new();
    project.write_source("version.c.in", "const char *v = \"@VCS_TAG@\";\n");
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", Some("7.7")),
            expr_stmt(call(
                "vcs_tag",
                vec![],
                vec![("input", s("version.c.in")), ("output", s("version.c"))],
            )),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    let build = interp.build.borrow();
    match build.get_target("version.c@cus").expect("vcs tag target") {
        AnyTarget::Custom(t) => {
            assert!(t.build_always_stale);
            assert!(t.command.iter().any(|part| part == "7.7"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn using_a_not_found_dependency_in_a_target_fails() {
    let project = TestProject::new();
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            assign(
                "dep",
                call("dependency", vec![s("gone")], vec![("required", boolean(false))]),
            ),
            expr_stmt(call(
                "executable",
                vec![s("app"), s("a.c")],
                vec![("dependencies", id("dep"))],
            )),
        ]),
    );

    let err = project.run().unwrap_err();
    assert!(err.message.contains("not-found dependency"), "{err}");
}
