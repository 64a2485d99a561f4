//! Rendering of type errors and their severities under the presets.
//!
//! Messages are pinned with inline insta snapshots; full ariadne reports
//! are checked for the parts that identify the error.

use std::sync::Arc;

use garnet_syntax::sexp;
use garnet_typeck::diagnostics::DiagnosticOptions;
use garnet_typeck::sig::{DefinitionBuilder, EnvironmentBuilder};
use garnet_typeck::{check, DiagnosticConfig, Severity, Typing};

// ── Helpers ────────────────────────────────────────────────────────────

fn check_source(src: &str) -> Typing {
    let env = EnvironmentBuilder::with_core()
        .class("C", |c| c.method("foo", "(String) -> Integer"))
        .build()
        .expect("signatures build");
    let tree = sexp::read(src).expect("dump reads");
    check(&tree, &DefinitionBuilder::new(Arc::new(env)))
}

/// The one-line message of the first error.
fn first_message(src: &str) -> String {
    let typing = check_source(src);
    assert!(typing.has_errors(), "expected at least one error for source: {:?}", src);
    typing.errors()[0].header_line()
}

// ── Messages ───────────────────────────────────────────────────────────

#[test]
fn incompatible_assignment_message() {
    let msg = first_message("(begin {@type var x: Integer?} (lvasgn :x (str \"x\")))");
    insta::assert_snapshot!(msg, @"Cannot assign a value of type `::String` to a variable of type `(::Integer | nil)`");
}

#[test]
fn codes_are_stable() {
    let typing = check_source("(send (send (const nil :C) :new) :foo (int 1))");
    let codes: Vec<&str> = typing.errors().iter().map(|e| e.code()).collect();
    assert_eq!(codes, vec!["Ruby::ArgumentTypeMismatch"]);

    let typing = check_source("(send (int 1) :+ (str \"2\"))");
    let codes: Vec<&str> = typing.errors().iter().map(|e| e.code()).collect();
    assert_eq!(codes, vec!["Ruby::UnresolvedOverloading"]);
}

#[test]
fn argument_mismatch_carries_a_trace() {
    let typing = check_source("(send (send (const nil :C) :new) :foo (int 1))");
    let trace: Vec<String> = typing.errors()[0].trace().iter().map(|r| r.to_string()).collect();
    assert_eq!(trace.first().map(String::as_str), Some("::Integer <: ::String"));
}

// ── Rendering ──────────────────────────────────────────────────────────

#[test]
fn rendered_report_names_code_and_message() {
    let src = "(send (send (const nil :C) :new) :foo (int 1))";
    let typing = check_source(src);
    let rendered = typing.render_errors(src, "test.rb", &DiagnosticOptions::colorless());
    assert_eq!(rendered.len(), 1);
    let report = &rendered[0];
    assert!(report.contains("Ruby::ArgumentTypeMismatch"), "{}", report);
    assert!(
        report.contains("Cannot pass a value of type `::Integer` as an argument of type `::String`"),
        "{}",
        report
    );
    assert!(report.contains("test.rb"), "{}", report);
}

#[test]
fn json_reports_point_at_the_argument() {
    let src = "(send (send (const nil :C) :new) :foo (int 1))";
    let typing = check_source(src);
    let rendered = typing.render_errors(src, "test.rb", &DiagnosticOptions::json_mode());
    let value: serde_json::Value = serde_json::from_str(&rendered[0]).expect("valid json");
    assert_eq!(value["code"], "Ruby::ArgumentTypeMismatch");
    let start = value["spans"][0]["start"].as_u64().unwrap() as usize;
    let end = value["spans"][0]["end"].as_u64().unwrap() as usize;
    assert_eq!(&src[start..end], "(int 1)");
}

// ── Severities ─────────────────────────────────────────────────────────

#[test]
fn presets_filter_and_grade() {
    let typing = check_source("(begin {@type var x: Integer} (if (send (lvar :x) :nil?) (int 1) (int 2)))");

    let default = typing.diagnostics(&DiagnosticConfig::default());
    assert_eq!(default.len(), 1);
    assert_eq!(default[0].error.code(), "Ruby::UnreachableBranch");
    assert_eq!(default[0].severity, Severity::Warning);

    let strict = typing.diagnostics(&DiagnosticConfig::strict());
    assert_eq!(strict[0].severity, Severity::Error);

    let lenient = typing.diagnostics(&DiagnosticConfig::lenient());
    assert_eq!(lenient[0].severity, Severity::Information);

    assert!(typing.diagnostics(&DiagnosticConfig::silent()).is_empty());
}

#[test]
fn configured_overrides_apply() {
    let typing = check_source("(send (int 1) :frobnicate)");
    let config = DiagnosticConfig::from_toml_str(
        r#"
        preset = "default"

        [severities]
        "Ruby::NoMethod" = "ignore"
        "#,
    )
    .expect("config parses");
    assert!(typing.diagnostics(&config).is_empty());

    let config = DiagnosticConfig::default().with("Ruby::NoMethod", Severity::Hint);
    let diagnostics = typing.diagnostics(&config);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, Severity::Hint);
}
