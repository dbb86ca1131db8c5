//! Checks on a single field pipeline.
use serde_json::Value;

use super::{Diagnostic, FieldContext};
use crate::document::{DslError, Expr};
use crate::regex_utils::{self, GroupPolicy};
use crate::selector::{validate_css_query, validate_xpath_query};
use crate::tokens::{KEY, PRE_VALIDATE, SPLIT_DOC, TokenKind, VariableType};

const TIP_AFTER_DEFAULT: &str = "After `default()` you must extract text/attribute before calling string methods. \
Use `.text()`, `.attr('...')`, or pseudo selectors like `::text` first.";

const TIP_AFTER_SELECTOR: &str = "You forgot to extract text/attribute after selector. \
Use `.text()`, `.attr('...')`, or `::text` / `::attr(...)` in CSS.";

/// Walk the cursor through the chain; report the first step that cannot run.
pub fn check_type_flow(fx: &FieldContext<'_>) -> Vec<Diagnostic> {
    let stack = fx.document.stack();
    let mut cursor = VariableType::Document;
    for (i, expr) in stack.iter().enumerate() {
        if expr.accept_type.admits(cursor, &expr.exclude_types) {
            cursor = expr.ret_type;
            continue;
        }
        let method = expr.kind.method_name();
        let message = format!("Cannot call .{method}() on {} value", cursor.name().to_lowercase());
        let wants_string = matches!(expr.accept_type, VariableType::String | VariableType::ListString);
        let tip = if !(cursor.is_document() && wants_string) {
            ""
        } else if i > 0 && stack[i - 1].kind == TokenKind::Default {
            TIP_AFTER_DEFAULT
        } else {
            TIP_AFTER_SELECTOR
        };
        return vec![fx.error(message).with_tip(tip).with_method(method)];
    }
    Vec::new()
}

/// Builder errors other than type mismatches, which the flow check covers.
pub fn check_dsl_errors(fx: &FieldContext<'_>) -> Vec<Diagnostic> {
    fx.document
        .errors()
        .iter()
        .filter(|err| matches!(err, DslError::NotAllowed { .. } | DslError::BadArgument { .. }))
        .map(|err| fx.located(err))
        .collect()
}

pub fn check_default_value(fx: &FieldContext<'_>) -> Vec<Diagnostic> {
    let stack = fx.document.stack();
    let defaults: Vec<(usize, &Expr)> = stack.iter().enumerate().filter(|(_, e)| e.kind == TokenKind::Default).collect();
    let Some(&(position, first)) = defaults.first() else {
        return Vec::new();
    };
    let mut out = Vec::new();
    if defaults.len() > 1 {
        out.push(fx.located("multiple `default()` calls").with_method("default"));
    }
    if position != 0 {
        out.push(fx.located(format!("`default()` must be the first call, not at position {position}")).with_method("default"));
    }
    if fx.name == PRE_VALIDATE || fx.name == SPLIT_DOC {
        out.push(fx.located("`default()` is not allowed in magic fields").with_method("default"));
    }

    let value = first.kwargs.get("value").unwrap_or(&Value::Null);
    let final_type = fx.document.cursor();
    use VariableType::*;
    match value {
        Value::Null => {
            if matches!(final_type, Document | ListDocument | Bool) {
                out.push(fx.located(format!(
                    "Default value cannot be None for type(s) ({}, {}, {})",
                    Document, ListDocument, Bool
                )));
            }
        }
        Value::Array(items) => {
            let Some(item_type) = final_type.list_item().filter(|t| matches!(t, String | Int | Float)) else {
                out.push(fx.located(format!(
                    "default({value}) wrong last list return type expr (expected type(s) {}, {}, {}) got `{final_type}`",
                    ListString, ListInt, ListFloat
                )));
                return out;
            };
            if let Some(bad) = items.iter().find(|v| !literal_matches(v, item_type)) {
                out.push(fx.located(format!("default({value}) item {bad} does not match `{item_type}`")));
            }
        }
        Value::Object(_) => {
            out.push(fx.located(format!("Unsupported default value: `{value}`")));
        }
        _ if !literal_matches(value, final_type) => {
            out.push(fx.located(format!(
                "default({value}) wrong last return type expr (expected type `{}` got `{final_type}`)",
                literal_name(value)
            )));
        }
        _ => {}
    }
    out
}

fn literal_matches(value: &Value, ty: VariableType) -> bool {
    match ty {
        VariableType::String => value.is_string(),
        VariableType::Int => value.is_i64() || value.is_u64(),
        VariableType::Float => value.is_number(),
        VariableType::Bool => value.is_boolean(),
        _ => false,
    }
}

fn literal_name(value: &Value) -> &'static str {
    match value {
        Value::String(_) => "STRING",
        Value::Bool(_) => "BOOL",
        Value::Number(n) if n.is_f64() => "FLOAT",
        Value::Number(_) => "INT",
        _ => "ANY",
    }
}

pub fn check_html_queries(fx: &FieldContext<'_>) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for expr in fx.document.stack() {
        let (label, result) = if expr.kind.is_css_selector() {
            ("CSS", validate_css_query(expr.kwarg_str("query").unwrap_or_default()))
        } else if expr.kind.is_xpath_selector() {
            ("XPath", validate_xpath_query(expr.kwarg_str("query").unwrap_or_default()))
        } else {
            continue;
        };
        if let Err(err) = result {
            let method = expr.kind.method_name();
            let message = format!("Invalid {label} selector in .{method}()");
            out.push(fx.error(message).with_tip(err.to_string()).with_method(method));
        }
    }
    out
}

pub fn check_split_doc_ret_type(fx: &FieldContext<'_>) -> Vec<Diagnostic> {
    let ret = fx.document.cursor();
    if fx.name != SPLIT_DOC || ret == VariableType::ListDocument {
        return Vec::new();
    }
    vec![fx.located(format!("Expected type `{}`, got `{ret}`", VariableType::ListDocument))]
}

pub fn check_key_ret_type(fx: &FieldContext<'_>) -> Vec<Diagnostic> {
    if fx.name != KEY {
        return Vec::new();
    }
    let stack = fx.document.stack();
    if let Some(first) = stack.first().filter(|e| e.kind == TokenKind::Default) {
        let value = first.kwargs.get("value").unwrap_or(&Value::Null);
        if !value.is_string() {
            return vec![fx.located(format!("default value should be a string, not `{value}`")).with_method("default")];
        }
    }
    let ret = fx.document.cursor();
    if ret != VariableType::String {
        return vec![fx.located(format!("Expected type `{}`, got `{ret}`", VariableType::String))];
    }
    Vec::new()
}

pub fn check_other_field_type(fx: &FieldContext<'_>) -> Vec<Diagnostic> {
    if [KEY, SPLIT_DOC, PRE_VALIDATE].contains(&fx.name) {
        return Vec::new();
    }
    if !fx.document.cursor().is_document() {
        return Vec::new();
    }
    let message = format!("Not allowed type(s) `{}, {}`", VariableType::ListDocument, VariableType::Document);
    vec![fx.located(message).with_tip(TIP_AFTER_SELECTOR)]
}

pub fn check_regex(fx: &FieldContext<'_>) -> Vec<Diagnostic> {
    let mut exprs = Vec::new();
    collect(fx.document.stack(), &mut exprs);
    let mut out = Vec::new();
    for expr in exprs.into_iter().filter(|e| e.kind.is_regex()) {
        let pattern = expr.kwarg_str("pattern").unwrap_or_default();
        let result = match expr.kind {
            TokenKind::Regex => regex_utils::analyze(pattern, GroupPolicy::SINGLE).and_then(|_| {
                let group = expr.kwargs.get("group").and_then(Value::as_u64).unwrap_or(0) as usize;
                regex_utils::check_group(pattern, group)
            }),
            TokenKind::RegexAll => regex_utils::analyze(pattern, GroupPolicy::SINGLE).map(|_| ()),
            _ => regex_utils::analyze(pattern, GroupPolicy::ANY).map(|_| ()),
        };
        if let Err(err) = result {
            out.push(fx.located(&err).with_tip(err.tip()).with_method(expr.kind.method_name()));
        }
    }
    out
}

fn collect<'a>(exprs: &'a [Expr], out: &mut Vec<&'a Expr>) {
    for expr in exprs {
        out.push(expr);
        collect(&expr.body, out);
    }
}

pub fn check_jsonify(fx: &FieldContext<'_>) -> Vec<Diagnostic> {
    let stack = fx.document.stack();
    let has_json = stack.iter().any(|e| e.kind == TokenKind::Jsonify);
    let has_default = stack.iter().any(|e| e.kind == TokenKind::Default);
    if has_json && has_default {
        return vec![fx.located("jsonify not allowed with default expr").with_method("jsonify")];
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use crate::analyzer::{Diagnostic, analyze};
    use crate::document::{Document, Filter};
    use crate::schema::{Schema, SchemaRegistry};
    use crate::tokens::{KEY, SPLIT_DOC, StructType, VALUE};

    fn field(doc: Document) -> Vec<Diagnostic> {
        let mut reg = SchemaRegistry::new();
        reg.insert(Schema::new("S", StructType::Item).field("f", doc)).unwrap();
        analyze(&reg)
    }

    fn messages(doc: Document) -> Vec<String> {
        field(doc).into_iter().map(|d| d.message).collect()
    }

    #[test]
    fn type_flow_reports_first_failure() {
        assert!(field(Document::new().css("title").attr("href")).is_empty());
        let diags = field(Document::new().css("title").attr("href").text().css("a"));
        let flow: Vec<&Diagnostic> = diags.iter().filter(|d| d.message.starts_with("Cannot call")).collect();
        assert_eq!(flow.len(), 1);
        assert_eq!(flow[0].message, "Cannot call .text() on string value");
    }

    #[test]
    fn css_after_text_is_rejected() {
        let msgs = messages(Document::new().css("title").text().css("a"));
        assert!(msgs.contains(&"Cannot call .css() on string value".to_string()), "{msgs:?}");
    }

    #[test]
    fn tips_for_missing_extraction() {
        let diags = field(Document::new().css("p").trim());
        assert_eq!(diags[0].message, "Cannot call .trim() on document value");
        assert!(diags[0].tip.starts_with("You forgot to extract"));
        let diags = field(Document::new().default("x").trim());
        assert!(diags[0].tip.starts_with("After `default()`"));
    }

    #[test]
    fn default_values() {
        assert!(field(Document::new().default(Value::Null).css("p").text()).is_empty());
        let msgs = messages(Document::new().default(Value::Null).css("p").text().to_bool());
        assert!(msgs.iter().any(|m| m.starts_with("S.f: Default value cannot be None")), "{msgs:?}");
        let msgs = messages(Document::new().default(1).css("p").text());
        assert!(msgs.iter().any(|m| m.contains("expected type `INT` got `STRING`")), "{msgs:?}");
        assert!(field(Document::new().default(0).css("p").text().to_float()).is_empty());
        assert!(field(Document::new().default(Vec::<String>::new()).css_all("p").text()).is_empty());
        let msgs = messages(Document::new().default(serde_json::json!([1])).css_all("p").text());
        assert!(msgs.iter().any(|m| m.contains("does not match `STRING`")), "{msgs:?}");
        let msgs = messages(Document::new().css("p").text().default("x"));
        assert!(msgs.iter().any(|m| m.contains("must be the first call, not at position 2")), "{msgs:?}");
    }

    #[test]
    fn selector_syntax() {
        let diags = field(Document::new().css("//div").text());
        assert_eq!(diags[0].message, "Invalid CSS selector in .css()");
        assert!(diags[0].tip.contains("looks like XPATH"));
        let diags = field(Document::new().xpath("//div[").text());
        assert_eq!(diags[0].message, "Invalid XPath selector in .xpath()");
    }

    #[test]
    fn magic_field_types() {
        let mut reg = SchemaRegistry::new();
        reg.insert(
            Schema::new("D", StructType::Dict)
                .field(SPLIT_DOC, Document::new().css("a"))
                .field(KEY, Document::new().css_all("a").text())
                .field(VALUE, Document::new().css("a")),
        )
        .unwrap();
        let msgs: Vec<String> = analyze(&reg).into_iter().map(|d| d.message).collect();
        assert!(msgs.contains(&"D.__SPLIT_DOC__: Expected type `LIST_DOCUMENT`, got `DOCUMENT`".to_string()), "{msgs:?}");
        assert!(msgs.contains(&"D.__KEY__: Expected type `STRING`, got `LIST_STRING`".to_string()));
        assert!(msgs.contains(&"D.__VALUE__: Not allowed type(s) `LIST_DOCUMENT, DOCUMENT`".to_string()));
    }

    #[test]
    fn regex_groups() {
        assert!(field(Document::new().css("p").text().re(r"\d+")).is_empty());
        let msgs = messages(Document::new().css("p").text().re(r"(\d+)-(\d+)"));
        assert!(msgs.iter().any(|m| m.contains("expected at most 1 capture group(s), got 2")), "{msgs:?}");
        let msgs = messages(Document::new().css("p").text().re_with(r"(\d+)", 2, false, false));
        assert!(msgs.iter().any(|m| m.contains("group 2 does not exist")), "{msgs:?}");
        assert!(field(Document::new().css("p").text().re_sub(r"(a)(b)", "$2")).is_empty());
        let msgs = messages(Document::new().css_all("p").text().filter(Filter::re("(?<=a)b")));
        assert!(msgs.iter().any(|m| m.starts_with("S.f: invalid regex")), "{msgs:?}");
    }

    #[test]
    fn jsonify_with_default() {
        let mut reg = SchemaRegistry::new();
        reg.insert_json_struct(crate::schema::JsonStruct::new("J", false).field("a", "number"));
        reg.insert(Schema::new("S", StructType::Item).field("f", Document::new().default("{}").css("script").text().jsonify("J", "")))
            .unwrap();
        let msgs: Vec<String> = analyze(&reg).into_iter().map(|d| d.message).collect();
        assert!(msgs.contains(&"S.f: jsonify not allowed with default expr".to_string()), "{msgs:?}");
    }
}
