//! Rust-style rendering of diagnostics.
//!
//! ```text
//! error: Cannot call .css() on string value
//!  --> books.json:12
//!      |
//!   12 |       "title": [{"css": "h1"}, "text", {"css": "a"}],
//!      |                                        ^^^^^
//!  = help: You forgot to extract text/attribute after selector. ...
//! ```
use colored::Colorize;

use super::Diagnostic;

const GUTTER_WIDTH: usize = 4;

fn paint(text: &str, color: bool, f: fn(&str) -> colored::ColoredString) -> String {
    if color { f(text).to_string() } else { text.to_string() }
}

/// Column range to underline in `line`.
fn marker_span(line: &str, method: Option<&str>) -> (usize, usize) {
    if let Some(method) = method {
        let call = format!(".{method}(");
        if let Some(pos) = line.find(&call) {
            return (pos + 1, pos + 1 + method.len());
        }
        let key = format!("\"{method}\"");
        if let Some(pos) = line.find(&key) {
            return (pos, pos + key.len());
        }
    }
    if let Some(pos) = line.find([':', '=']) {
        let rest = &line[pos + 1..];
        let start = pos + 1 + (rest.len() - rest.trim_start().len());
        if start < line.len() {
            return (start, line.len());
        }
    }
    let start = line.len() - line.trim_start().len();
    (start, line.len())
}

pub fn format_diagnostic(d: &Diagnostic, source: Option<&str>, color: bool) -> String {
    let mut lines = vec![format!("{} {}", paint("error:", color, |s| s.red().bold()), d.message)];
    let note = |s: &str| paint(s, color, |s| s.bright_black());

    if let (Some(filename), Some(lineno)) = (d.filename.as_deref(), d.lineno) {
        lines.push(format!(" {} {filename}:{lineno}", note("-->")));
        let code = source.and_then(|text| text.lines().nth(lineno.saturating_sub(1)));
        if let Some(code) = code.map(str::trim_end) {
            let empty = format!("{} |", " ".repeat(GUTTER_WIDTH));
            let (start, end) = marker_span(code, d.problem_method.as_deref());
            let marker = "^".repeat(end.saturating_sub(start).max(1));
            lines.push(note(&empty));
            lines.push(format!("{} {code}", note(&format!("{lineno:>GUTTER_WIDTH$} |"))));
            lines.push(format!("{} {}{}", note(&empty), " ".repeat(start), paint(&marker, color, |s| s.red())));
        }
    }
    if !d.tip.is_empty() {
        lines.push(format!(" {} {} {}", paint("=", color, |s| s.cyan()), paint("help:", color, |s| s.cyan()), d.tip));
    }
    lines.join("\n")
}

pub fn format_all(diagnostics: &[Diagnostic], source: Option<&str>, color: bool) -> String {
    diagnostics
        .iter()
        .map(|d| format_diagnostic(d, source, color))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "{\n  \"fields\": {\n    \"title\": [{\"css\": \"h1\"}, \"text\", {\"css\": \"a\"}]\n  }\n}";

    fn diagnostic() -> Diagnostic {
        Diagnostic {
            message: "Cannot call .css() on string value".into(),
            tip: "extract first".into(),
            field_name: Some("title".into()),
            filename: Some("books.json".into()),
            lineno: Some(3),
            problem_method: Some("css".into()),
        }
    }

    #[test]
    fn renders_gutter_and_marker() {
        let out = format_diagnostic(&diagnostic(), Some(SOURCE), false);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "error: Cannot call .css() on string value");
        assert_eq!(lines[1], " --> books.json:3");
        assert_eq!(lines[2], "     |");
        assert_eq!(lines[3], "   3 |     \"title\": [{\"css\": \"h1\"}, \"text\", {\"css\": \"a\"}]");
        assert_eq!(lines[4], format!("     |{}^^^^^", " ".repeat(16)));
        assert_eq!(lines[5], " = help: extract first");
    }

    #[test]
    fn marker_falls_back_to_value_then_line() {
        assert_eq!(marker_span("    title = D().text()", Some("css")), (12, 22));
        assert_eq!(marker_span("  abc", None), (2, 5));
        assert_eq!(marker_span("x = D().css('a')", Some("css")), (8, 11));
    }

    #[test]
    fn without_location_only_message_and_tip() {
        let d = Diagnostic { lineno: None, ..diagnostic() };
        assert_eq!(format_diagnostic(&d, Some(SOURCE), false), "error: Cannot call .css() on string value\n = help: extract first");
        let two = format_all(&[d.clone(), d], None, false);
        assert_eq!(two.matches("\n\nerror:").count(), 1);
    }
}
