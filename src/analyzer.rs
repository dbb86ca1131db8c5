//! Static checks over a schema registry.
//!
//! Analysis never fails: every problem becomes a [`Diagnostic`], and the
//! caller decides whether to stop. Checks are plain functions collected in
//! two tables, one run per schema and one per field.
pub mod field_checks;
pub mod formatter;
pub mod schema_checks;

use crate::document::Document;
use crate::schema::{Schema, SchemaRegistry};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub tip: String,
    pub field_name: Option<String>,
    pub filename: Option<String>,
    /// 1-based line of the field in the schema file.
    pub lineno: Option<usize>,
    /// DSL method to underline in the source line.
    pub problem_method: Option<String>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), ..Self::default() }
    }

    pub fn with_tip(mut self, tip: impl Into<String>) -> Self {
        self.tip = tip.into();
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.problem_method = Some(method.into());
        self
    }
}

pub type SchemaCheck = fn(&SchemaContext<'_>) -> Vec<Diagnostic>;
pub type FieldCheck = fn(&FieldContext<'_>) -> Vec<Diagnostic>;

pub const SCHEMA_CHECKS: &[SchemaCheck] = &[
    schema_checks::check_dict_fields,
    schema_checks::check_flat_list_fields,
    schema_checks::check_acc_list,
    schema_checks::check_split_doc_field,
    schema_checks::check_key_field,
    schema_checks::check_value_field,
    schema_checks::check_item_field,
    schema_checks::check_classvar_refs,
    schema_checks::check_registry_refs,
];

pub const FIELD_CHECKS: &[FieldCheck] = &[
    field_checks::check_type_flow,
    field_checks::check_dsl_errors,
    field_checks::check_default_value,
    field_checks::check_html_queries,
    field_checks::check_split_doc_ret_type,
    field_checks::check_key_ret_type,
    field_checks::check_other_field_type,
    field_checks::check_regex,
    field_checks::check_jsonify,
];

pub struct SchemaContext<'a> {
    pub schema: &'a Schema,
    pub registry: &'a SchemaRegistry,
    /// Every schema after the inheritance merge.
    pub resolved: &'a [Schema],
    pub filename: Option<&'a str>,
}

impl<'a> SchemaContext<'a> {
    pub fn error(&self, message: impl Into<String>) -> Diagnostic {
        Diagnostic { filename: self.filename.map(str::to_string), ..Diagnostic::new(message) }
    }

    pub fn field_error(&self, field: &str, message: impl Into<String>) -> Diagnostic {
        Diagnostic {
            field_name: Some(field.to_string()),
            lineno: self.schema.line_of(field),
            ..self.error(message)
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&'a Schema> {
        self.resolved.iter().find(|s| s.name == name)
    }
}

pub struct FieldContext<'a> {
    pub cx: &'a SchemaContext<'a>,
    pub name: &'a str,
    pub document: &'a Document,
}

impl<'a> FieldContext<'a> {
    pub fn schema_name(&self) -> &'a str {
        &self.cx.schema.name
    }

    pub fn error(&self, message: impl Into<String>) -> Diagnostic {
        self.cx.field_error(self.name, message)
    }

    /// Error prefixed with `Schema.field: `.
    pub fn located(&self, message: impl std::fmt::Display) -> Diagnostic {
        self.error(format!("{}.{}: {message}", self.schema_name(), self.name))
    }
}

/// Run every check on every schema of the registry.
pub fn analyze(registry: &SchemaRegistry) -> Vec<Diagnostic> {
    let filename = registry.source.as_ref().map(|s| s.path.as_str());
    let resolved = match registry.resolved() {
        Ok(resolved) => resolved,
        Err(err) => {
            let diagnostic = Diagnostic { filename: filename.map(str::to_string), ..Diagnostic::new(err.to_string()) };
            return vec![diagnostic];
        }
    };
    let mut out = Vec::new();
    for schema in &resolved {
        let cx = SchemaContext { schema, registry, resolved: &resolved, filename };
        let before = out.len();
        out.extend(analyze_schema(&cx));
        log::info!("{}: found {} issue(s)", schema.name, out.len() - before);
    }
    out
}

pub fn analyze_schema(cx: &SchemaContext<'_>) -> Vec<Diagnostic> {
    let mut out: Vec<Diagnostic> = SCHEMA_CHECKS.iter().flat_map(|check| check(cx)).collect();
    for (name, document) in &cx.schema.fields {
        let fx = FieldContext { cx, name, document };
        out.extend(FIELD_CHECKS.iter().flat_map(|check| check(&fx)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::{KEY, SPLIT_DOC, StructType, VALUE};

    #[test]
    fn clean_schema_has_no_diagnostics() {
        let mut reg = SchemaRegistry::new();
        reg.insert(
            Schema::new("Books", StructType::List)
                .field(SPLIT_DOC, Document::new().css_all(".col-lg-3"))
                .field("name", Document::new().css(".thumbnail").attr("alt"))
                .field("price", Document::new().default("0").css(".price_color").text().re(r"\d+")),
        )
        .unwrap();
        assert_eq!(analyze(&reg), Vec::<Diagnostic>::new());
    }

    #[test]
    fn resolution_failure_is_reported() {
        let mut reg = SchemaRegistry::new();
        reg.insert(Schema::new("A", StructType::Item).extends("Missing")).unwrap();
        let diags = analyze(&reg);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("Missing"));
    }

    #[test]
    fn diagnostics_carry_file_and_line() {
        let mut reg = SchemaRegistry::new();
        reg.source = Some(crate::schema::registry::SourceFile { path: "books.json".into(), text: String::new() });
        let mut schema = Schema::new("Links", StructType::Dict)
            .field(SPLIT_DOC, Document::new().css_all("a"))
            .field(KEY, Document::new().text())
            .field(VALUE, Document::new().attr("href"))
            .field("extra", Document::new().css("b").text().css("a"));
        schema.field_lines.insert("extra".into(), 7);
        reg.insert(schema).unwrap();
        let diags = analyze(&reg);
        let flow = diags.iter().find(|d| d.message.starts_with("Cannot call")).unwrap();
        assert_eq!(flow.lineno, Some(7));
        assert_eq!(flow.filename.as_deref(), Some("books.json"));
        assert_eq!(flow.problem_method.as_deref(), Some("css"));
        assert!(diags.iter().any(|d| d.message.contains("unnecessary fields")));
    }
}
