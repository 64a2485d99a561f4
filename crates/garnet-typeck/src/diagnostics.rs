//! Ariadne-based rendering of type errors.
//!
//! Each report labels the offending node with the error's header line and
//! lists the subtyping trace, outermost first, as notes. JSON mode emits
//! one line per error instead.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use serde::Serialize;

use crate::config::Severity;
use crate::error::TypeError;

/// Rendering options.
#[derive(Clone, Debug)]
pub struct DiagnosticOptions {
    pub color: bool,
    pub json: bool,
}

impl Default for DiagnosticOptions {
    fn default() -> Self {
        DiagnosticOptions { color: true, json: false }
    }
}

impl DiagnosticOptions {
    /// Plain text output, stable across terminals.
    pub fn colorless() -> Self {
        DiagnosticOptions { color: false, json: false }
    }

    pub fn json_mode() -> Self {
        DiagnosticOptions { color: false, json: true }
    }
}

// ── Span Helpers ───────────────────────────────────────────────────────

fn text_range_to_range(range: rowan::TextRange) -> Range<usize> {
    let start: usize = range.start().into();
    let end: usize = range.end().into();
    start..end
}

/// Clamp into `source`, never empty unless the source is.
fn clamp(r: Range<usize>, source_len: usize) -> Range<usize> {
    let s = r.start.min(source_len);
    let e = r.end.min(source_len).max(s);
    if s == e {
        s..e.saturating_add(1).min(source_len)
    } else {
        s..e
    }
}

fn severity_name(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Information => "information",
        Severity::Hint => "hint",
        Severity::Ignore => "ignore",
    }
}

// ── JSON ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct JsonSpan {
    start: usize,
    end: usize,
    line: u32,
    column: u32,
    label: String,
}

#[derive(Serialize)]
struct JsonDiagnostic<'a> {
    code: &'a str,
    severity: &'a str,
    message: String,
    file: &'a str,
    spans: Vec<JsonSpan>,
    trace: Vec<String>,
}

fn render_json(error: &TypeError, source: &str, filename: &str, severity: Severity) -> String {
    let range = text_range_to_range(error.range);
    let index = garnet_common::span::LineIndex::new(source);
    let pos = index.line_col(error.range.start());
    let diag = JsonDiagnostic {
        code: error.code(),
        severity: severity_name(severity),
        message: error.header_line(),
        file: filename,
        spans: vec![JsonSpan {
            start: range.start,
            end: range.end,
            line: pos.line,
            column: pos.col,
            label: error.header_line(),
        }],
        trace: error.trace().iter().map(|r| r.to_string()).collect(),
    };
    serde_json::to_string(&diag).unwrap_or_default()
}

// ── Main Rendering Function ────────────────────────────────────────────

/// Render one error.
///
/// `severity` picks the report kind; `None` renders as an error.
pub fn render_diagnostic(
    error: &TypeError,
    source: &str,
    filename: &str,
    options: &DiagnosticOptions,
    severity: Option<Severity>,
) -> String {
    let severity = severity.unwrap_or(Severity::Error);
    if options.json {
        return render_json(error, source, filename, severity);
    }

    let config = Config::default().with_color(options.color);
    let span = clamp(text_range_to_range(error.range), source.len());
    let (kind, color) = match severity {
        Severity::Error => (ReportKind::Error, Color::Red),
        Severity::Warning => (ReportKind::Warning, Color::Yellow),
        Severity::Information | Severity::Hint | Severity::Ignore => (ReportKind::Advice, Color::Blue),
    };

    let header = error.header_line();
    let mut builder = Report::build(kind, span.clone())
        .with_code(error.code())
        .with_message(&header)
        .with_config(config)
        .with_label(Label::new(span).with_message(&header).with_color(color));

    let trace = error.trace();
    if !trace.is_empty() {
        let lines: Vec<String> = trace
            .iter()
            .enumerate()
            .map(|(depth, relation)| format!("{}{}", "  ".repeat(depth), relation))
            .collect();
        builder = builder.with_note(lines.join("\n"));
    }

    let mut buf = Vec::new();
    if builder.finish().write(Source::from(source), &mut buf).is_err() {
        return format!("{}: {}", error.code(), header);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use garnet_syntax::NodeId;
    use rowan::TextRange;

    use super::*;
    use crate::error::TypeErrorKind;
    use crate::ty::Type;

    #[test]
    fn json_is_one_line() {
        let src = "x = 1";
        let err = TypeError::new(
            NodeId(0),
            TextRange::new(0.into(), 5.into()),
            TypeErrorKind::NoMethod {
                receiver: Type::integer(),
                method: "foo".into(),
            },
        );
        let out = render_diagnostic(&err, src, "a.rb", &DiagnosticOptions::json_mode(), Some(Severity::Warning));
        assert!(!out.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["code"], "Ruby::NoMethod");
        assert_eq!(value["severity"], "warning");
        assert_eq!(value["spans"][0]["start"], 0);
    }

    #[test]
    fn clamping() {
        assert_eq!(clamp(3..3, 10), 3..4);
        assert_eq!(clamp(8..20, 10), 8..10);
        assert_eq!(clamp(0..0, 0), 0..0);
    }
}
