use mortar_dsl::ast::{Expr, IndexNode};
use mortar_kernel::targets::AnyTarget;

use crate::fixtures::*;

fn index(object: Expr, idx: Expr) -> Expr {
    Expr::Index(IndexNode {
        object: Box::new(object),
        index: Box::new(idx),
        location: loc(),
    })
}

#[test]
fn install_script_arguments_are_rewritten_and_force_build_by_default() {
    let project = TestProject::new();
    project.write_source("data.txt", "payload\n");
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            assign(
                "tool",
                call(
                    "executable",
                    vec![s("tool"), s("tool.c")],
                    vec![("build_by_default", boolean(false))],
                ),
            ),
            assign("payload", call("files", vec![s("data.txt")], vec![])),
            expr_stmt(method(
                id("meson"),
                "add_install_script",
                vec![s("install.sh"), index(id("payload"), num(0)), id("tool")],
                vec![],
            )),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    let build = interp.build.borrow();

    assert_eq!(build.install_scripts.len(), 1);
    let cmd = &build.install_scripts[0].cmd;
    assert_eq!(cmd[0], "../src/install.sh");
    assert_eq!(cmd[1], "../src/data.txt");
    assert_eq!(cmd[2], "tool");

    match build.get_target("tool@exe").expect("tool target") {
        AnyTarget::Build(t) => assert!(
            t.build_by_default,
            "a target referenced by an install script must be built by default"
        ),
        other => panic!("unexpected target {other:?}"),
    }
}

#[test]
fn postconf_and_dist_scripts_are_collected_separately() {
    let project = TestProject::new();
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            expr_stmt(method(
                id("meson"),
                "add_postconf_script",
                vec![s("postconf.sh"), s("arg")],
                vec![],
            )),
            expr_stmt(method(
                id("meson"),
                "add_dist_script",
                vec![s("dist.sh")],
                vec![],
            )),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    let build = interp.build.borrow();
    assert_eq!(build.postconf_scripts.len(), 1);
    assert_eq!(build.postconf_scripts[0].cmd[1], "arg");
    assert_eq!(build.dist_scripts.len(), 1);
    assert!(build.install_scripts.is_empty());
}

#[test]
fn run_command_goes_through_the_runner_port() {
    let project = TestProject::new();
    project
        .runner
        .with_output("probe", EchoRunner::stdout(0, "probed\n"));
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            assign("r", call("run_command", vec![s("probe"), s("--version")], vec![])),
            assign("out", method(id("r"), "stdout", vec![], vec![])),
            assign("code", method(id("r"), "returncode", vec![], vec![])),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    assert_eq!(
        interp.variables.get("out"),
        Some(&mortar_core::value::Value::Str("probed\n".into()))
    );
    assert_eq!(
        interp.variables.get("code"),
        Some(&mortar_core::value::Value::Int(0))
    );
}

#[test]
fn run_command_check_mode_fails_on_nonzero_exit() {
    let project = TestProject::new();
    project
        .runner
        .with_output("fail", EchoRunner::stdout(3, ""));
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            expr_stmt(call(
                "run_command",
                vec![s("fail")],
                vec![("check", boolean(true))],
            )),
        ]),
    );

    let err = project.run().unwrap_err();
    assert!(err.message.contains("status 3"), "{err}");
}
