use mortar_core::logger::CaptureGuard;
use mortar_core::value::Value;
use mortar_kernel::manifest::DepManifestEntry;
use mortar_kernel::targets::{AnyTarget, TargetKind};

use crate::fixtures::*;

#[test]
fn minimal_project_records_manifest_target_and_options() {
    let project = TestProject::new();
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", Some("1.0")),
            expr_stmt(call("executable", vec![s("hello"), s("hello.c")], vec![])),
            assign("bt", call("get_option", vec![s("buildtype")], vec![])),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");

    let build = interp.build.borrow();
    assert_eq!(
        build.dep_manifest.get("p"),
        Some(&DepManifestEntry::new("1.0", vec!["unknown".to_owned()]))
    );

    assert_eq!(build.targets().len(), 1);
    let target = build.get_target("hello@exe").expect("hello target");
    match target {
        AnyTarget::Build(t) => {
            assert_eq!(t.name, "hello");
            assert_eq!(t.kind, TargetKind::Executable);
        }
        other => panic!("expected build target, got {other:?}"),
    }

    assert_eq!(interp.variables.get("bt"), Some(&Value::Str("debug".into())));
    assert!(
        build
            .compilers
            .host
            .contains_key("c"),
        "project() must have added the c compiler"
    );
}

#[test]
fn run_persists_build_definition_state() {
    let project = TestProject::new();
    project.set_build_file("", block(vec![project_stmt("p", Some("1.0"))]));

    project.run().expect("evaluation succeeds");

    let listing = std::fs::read_to_string(
        project.build_root.join("mortar-private/build_def_files.json"),
    )
    .expect("build def file list written");
    assert!(listing.contains("meson.build"));
    assert!(
        project
            .build_root
            .join("mortar-private/dep_manifest.json")
            .exists()
    );
}

#[test]
fn non_project_first_statement_is_invalid_code() {
    let project = TestProject::new();
    project.set_build_file(
        "",
        block(vec![expr_stmt(call("message", vec![s("hi")], vec![]))]),
    );

    let err = project.run().unwrap_err();
    assert!(err.message.contains("first statement must be a call to project()"));
}

#[test]
fn second_project_call_is_rejected() {
    let project = TestProject::new();
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            project_stmt("again", None),
        ]),
    );

    let err = project.run().unwrap_err();
    assert!(err.message.contains("second call to project()"));
}

#[test]
fn deprecated_source_root_warns_once_per_site() {
    let guard = CaptureGuard::start();
    let project = TestProject::new();
    project.set_build_file(
        "",
        block(vec![
            expr_stmt(call(
                "project",
                vec![s("p"), s("c")],
                vec![("version", s("1.0")), ("meson_version", s(">=0.56"))],
            )),
            assign("root", method(id("meson"), "source_root", vec![], vec![])),
            assign("root2", method(id("meson"), "source_root", vec![], vec![])),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    assert_eq!(
        interp.variables.get("root"),
        Some(&Value::Str(
            project.source_root.to_string_lossy().into_owned()
        ))
    );

    let output = guard.take();
    assert_eq!(
        output.matches("meson.source_root").count(),
        1,
        "the deprecation must fire exactly once: {output}"
    );
    drop(guard);
}

#[test]
fn assert_reports_reconstructed_condition() {
    let project = TestProject::new();
    let mut condition = eq(num(1), num(2));
    if let mortar_dsl::ast::Expr::Comparison(node) = &mut condition {
        node.source_text = Some("1 == 2".to_owned());
    }
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            expr_stmt(call("assert", vec![condition], vec![])),
        ]),
    );

    let err = project.run().unwrap_err();
    assert!(err.message.contains("assert failed: 1 == 2"), "{err}");
}

#[test]
fn summary_entries_accumulate_per_section() {
    let project = TestProject::new();
    project.set_build_file(
        "",
        block(vec![
            project_stmt("p", None),
            expr_stmt(call(
                "summary",
                vec![s("has_foo"), boolean(true)],
                vec![("section", s("Features")), ("bool_yn", boolean(true))],
            )),
        ]),
    );

    let interp = project.run().expect("evaluation succeeds");
    let shared = interp.shared.borrow();
    let sections = shared.summaries.get("").expect("top-level summary");
    let entries = sections.get("Features").expect("section recorded");
    assert_eq!(entries[0], ("has_foo".to_owned(), "YES".to_owned()));
}
