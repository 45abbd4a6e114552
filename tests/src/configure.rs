use std::fs;

use mortar_core::logger::CaptureGuard;

use crate::fixtures::*;

#[test]
fn command_mode_with_capture_writes_stdout_atomically() {
    let project = TestProject::new();
    project
        .runner
        .with_output("gen", EchoRunner::stdout(0, "#define X 1"));
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            expr_stmt(call(
                "configure_file",
                vec![],
                vec![
                    ("output", s("g.h")),
                    ("command", arr(vec![s("gen"), s("@OUTPUT@")])),
                    ("capture", boolean(true)),
                ],
            )),
        ]),
    );

    project.run().expect("evaluation succeeds");

    let generated = fs::read_to_string(project.build_root.join("g.h")).expect("g.h written");
    assert_eq!(generated, "#define X 1\n");

    let calls = project.runner.calls.borrow();
    let call_args = calls.iter().find(|c| c[0] == "gen").expect("gen invoked");
    assert_eq!(
        call_args[1],
        project.build_root.join("g.h").to_string_lossy()
    );
}

#[test]
fn duplicate_output_warns_naming_the_first_site() {
    let guard = CaptureGuard::start();
    let project = TestProject::new();
    project
        .runner
        .with_output("gen", EchoRunner::stdout(0, "x"));

    let first = call_at(
        "configure_file",
        vec![],
        vec![
            ("output", s("dup.h")),
            ("command", arr(vec![s("gen")])),
            ("capture", boolean(true)),
        ],
        at("meson.build", 2),
    );
    let second = call_at(
        "configure_file",
        vec![],
        vec![
            ("output", s("dup.h")),
            ("command", arr(vec![s("gen")])),
            ("capture", boolean(true)),
        ],
        at("meson.build", 5),
    );
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            expr_stmt(first),
            expr_stmt(second),
        ]),
    );

    project.run().expect("evaluation succeeds");
    let output = guard.take();
    assert!(
        output.contains("dup.h") && output.contains("meson.build:2:1"),
        "warning must name the first declaration site: {output}"
    );
    drop(guard);
}

#[test]
fn configuration_mode_substitutes_vars_and_mesondefines() {
    let project = TestProject::new();
    project.write_source(
        "config.h.in",
        "#define VERSION \"@VERSION@\"\n#mesondefine HAVE_FOO\n#mesondefine HAVE_BAR\n",
    );
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            assign("cfg", call("configuration_data", vec![], vec![])),
            expr_stmt(method(id("cfg"), "set", vec![s("VERSION"), s("1.0")], vec![])),
            expr_stmt(method(
                id("cfg"),
                "set",
                vec![s("HAVE_FOO"), boolean(true)],
                vec![],
            )),
            expr_stmt(call(
                "configure_file",
                vec![],
                vec![
                    ("input", s("config.h.in")),
                    ("output", s("config.h")),
                    ("configuration", id("cfg")),
                ],
            )),
        ]),
    );

    project.run().expect("evaluation succeeds");

    let generated =
        fs::read_to_string(project.build_root.join("config.h")).expect("config.h written");
    assert_eq!(
        generated,
        "#define VERSION \"1.0\"\n#define HAVE_FOO\n/* #undef HAVE_BAR */\n"
    );
}

#[test]
fn configuration_data_freezes_after_first_use() {
    let project = TestProject::new();
    project.write_source("t.in", "@A@\n");
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            assign("cfg", call("configuration_data", vec![], vec![])),
            expr_stmt(method(id("cfg"), "set", vec![s("A"), s("1")], vec![])),
            expr_stmt(call(
                "configure_file",
                vec![],
                vec![
                    ("input", s("t.in")),
                    ("output", s("t.h")),
                    ("configuration", id("cfg")),
                ],
            )),
            expr_stmt(method(id("cfg"), "set", vec![s("B"), s("2")], vec![])),
        ]),
    );

    let err = project.run().unwrap_err();
    assert!(
        err.message.contains("configuration object"),
        "mutating a consumed configuration object must fail: {err}"
    );
}

#[test]
fn mixed_modes_are_mutually_exclusive() {
    let project = TestProject::new();
    project.write_source("t.in", "x\n");
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            expr_stmt(call(
                "configure_file",
                vec![],
                vec![
                    ("input", s("t.in")),
                    ("output", s("t.h")),
                    ("configuration", call("configuration_data", vec![], vec![])),
                    ("command", arr(vec![s("gen")])),
                ],
            )),
        ]),
    );

    let err = project.run().unwrap_err();
    assert!(err.message.contains("exactly one of"), "{err}");
}

#[test]
fn copy_mode_duplicates_the_input() {
    let project = TestProject::new();
    project.write_source("notes.txt", "hello copy\n");
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            expr_stmt(call(
                "configure_file",
                vec![],
                vec![
                    ("input", s("notes.txt")),
                    ("output", s("notes-out.txt")),
                    ("copy", boolean(true)),
                ],
            )),
        ]),
    );

    project.run().expect("evaluation succeeds");
    let copied = fs::read_to_string(project.build_root.join("notes-out.txt")).expect("copied");
    assert_eq!(copied, "hello copy\n");
}

#[test]
fn synthesized_header_from_bare_configuration() {
    let project = TestProject::new();
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            assign("cfg", call("configuration_data", vec![], vec![])),
            expr_stmt(method(id("cfg"), "set10", vec![s("ENABLED"), boolean(true)], vec![])),
            expr_stmt(call(
                "configure_file",
                vec![],
                vec![("output", s("auto.h")), ("configuration", id("cfg"))],
            )),
        ]),
    );

    project.run().expect("evaluation succeeds");
    let generated = fs::read_to_string(project.build_root.join("auto.h")).expect("auto.h");
    assert!(generated.contains("#define ENABLED 1"), "{generated}");
}
