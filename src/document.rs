//! Fluent extraction-pipeline builder.
//!
//! A `Document` is an ordered list of operation nodes plus the type of the
//! value currently flowing through the chain (the cursor). Type mismatches are
//! recorded and logged but never abort the chain, so the analyzer can later
//! report every problem of a schema file in one pass.
pub mod filter;

use std::fmt;

use indexmap::IndexMap;
use serde_json::{Value, json};
use thiserror::Error;

pub use filter::Filter;

use crate::regex_utils::{self, GroupPolicy};
use crate::selector::{PseudoAction, split_css_pseudo, split_xpath_pseudo};
use crate::tokens::{TokenKind, VariableType};

pub type Kwargs = IndexMap<String, Value>;

// ------------------------------ Operation --------------------------------- //

/// Reference to a class variable, written `Schema.FIELD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassVarRef(pub String);

impl ClassVarRef {
    pub fn new(target: impl Into<String>) -> Self {
        Self(target.into())
    }

    /// `(schema, field)` when the reference is qualified.
    pub fn split(&self) -> Option<(&str, &str)> {
        let (schema, field) = self.0.split_once('.')?;
        if schema.is_empty() || field.is_empty() || field.contains('.') {
            return None;
        }
        Some((schema, field))
    }
}

impl fmt::Display for ClassVarRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: TokenKind,
    pub kwargs: Kwargs,
    pub accept_type: VariableType,
    pub ret_type: VariableType,
    pub exclude_types: Vec<VariableType>,
    pub classvar_hooks: IndexMap<String, ClassVarRef>,
    /// Filter combinators only.
    pub body: Vec<Expr>,
}

impl Expr {
    pub fn new(kind: TokenKind, accept_type: VariableType, ret_type: VariableType) -> Self {
        Self {
            kind,
            kwargs: Kwargs::new(),
            accept_type,
            ret_type,
            exclude_types: Vec::new(),
            classvar_hooks: IndexMap::new(),
            body: Vec::new(),
        }
    }

    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.kwargs.insert(key.to_string(), value);
        self
    }

    pub fn kwarg_str(&self, key: &str) -> Option<&str> {
        self.kwargs.get(key).and_then(Value::as_str)
    }
}

// -------------------------------- Errors ---------------------------------- //

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DslError {
    #[error("{method}(): expected type(s) {expected}, got {got}")]
    TypeMismatch { method: String, expected: String, got: VariableType },
    #[error("{method}() is not allowed in a nested document")]
    NotAllowed { method: String },
    #[error("default() should be the first operation, not at position {position}")]
    DefaultPosition { position: usize },
    #[error("{method}(): {message}")]
    BadArgument { method: String, message: String },
}

// ------------------------------- Document --------------------------------- //

#[derive(Debug, Clone)]
pub struct Document {
    stack: Vec<Expr>,
    errors: Vec<DslError>,
    nested_only: bool,
}

const NESTED_METHODS: &[&str] = &["css", "xpath", "sub_parser"];

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self { stack: Vec::new(), errors: Vec::new(), nested_only: false }
    }

    /// Document accepting only `css`, `xpath` and `sub_parser`.
    pub fn nested() -> Self {
        Self { nested_only: true, ..Self::new() }
    }

    /// Shortcut for `Document::new().raw()`, handy for string-only pipelines.
    pub fn from_raw() -> Self {
        Self::new().raw()
    }

    pub fn from_stack(stack: Vec<Expr>) -> Self {
        Self { stack, ..Self::new() }
    }

    pub fn stack(&self) -> &[Expr] {
        &self.stack
    }

    pub fn errors(&self) -> &[DslError] {
        &self.errors
    }

    pub fn into_stack(self) -> Vec<Expr> {
        self.stack
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Type of the value at the end of the chain.
    pub fn cursor(&self) -> VariableType {
        self.stack.last().map(|e| e.ret_type).unwrap_or(VariableType::Document)
    }

    // ------------------------------ plumbing ------------------------------ //

    fn record(&mut self, err: DslError) {
        log::warn!("{err}");
        self.errors.push(err);
    }

    fn check_cursor(&mut self, method: &str, expected: &[VariableType]) {
        let got = self.cursor();
        if expected.contains(&got) || matches!(got, VariableType::Any | VariableType::ListAny) {
            return;
        }
        let expected = expected.iter().map(|t| t.name()).collect::<Vec<_>>().join(", ");
        self.record(DslError::TypeMismatch { method: method.to_string(), expected, got });
    }

    fn push(mut self, method: &str, expr: Expr) -> Self {
        if self.nested_only && !NESTED_METHODS.contains(&method) {
            self.record(DslError::NotAllowed { method: method.to_string() });
        }
        self.stack.push(expr);
        self
    }

    /// Single or list variant by cursor.
    fn by_cursor(&self, single: TokenKind, list: TokenKind, single_ty: VariableType, list_ty: VariableType) -> Expr {
        if self.cursor() == list_ty {
            Expr::new(list, list_ty, list_ty)
        } else {
            Expr::new(single, single_ty, single_ty)
        }
    }

    fn string_op(mut self, method: &str, single: TokenKind, list: TokenKind, kwargs: Kwargs) -> Self {
        use VariableType::*;
        self.check_cursor(method, &[String, ListString]);
        let mut expr = self.by_cursor(single, list, String, ListString);
        expr.kwargs = kwargs;
        self.push(method, expr)
    }

    // ------------------------------ selectors ----------------------------- //

    pub fn css(self, query: &str) -> Self {
        self.select("css", TokenKind::Css, query)
    }

    pub fn css_all(self, query: &str) -> Self {
        self.select("css_all", TokenKind::CssAll, query)
    }

    pub fn xpath(self, query: &str) -> Self {
        self.select("xpath", TokenKind::Xpath, query)
    }

    pub fn xpath_all(self, query: &str) -> Self {
        self.select("xpath_all", TokenKind::XpathAll, query)
    }

    fn select(mut self, method: &str, kind: TokenKind, query: &str) -> Self {
        self.check_cursor(method, &[VariableType::Document]);
        let query = normalize_query(query);
        let (base, action) = if kind.is_css_selector() {
            split_css_pseudo(&query)
        } else {
            split_xpath_pseudo(&query)
        };
        let ret = if matches!(kind, TokenKind::CssAll | TokenKind::XpathAll) {
            VariableType::ListDocument
        } else {
            VariableType::Document
        };
        let expr = Expr::new(kind, VariableType::Document, ret).with("query", json!(base));
        let doc = self.push(method, expr);
        match action {
            None => doc,
            Some(PseudoAction::Text) => doc.text(),
            Some(PseudoAction::Raw) => doc.raw(),
            Some(PseudoAction::Attr(keys)) => {
                let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
                doc.attrs(&keys)
            }
        }
    }

    // ----------------------------- extractors ----------------------------- //

    pub fn text(self) -> Self {
        self.extract("text", TokenKind::Text, TokenKind::TextAll)
    }

    pub fn raw(self) -> Self {
        self.extract("raw", TokenKind::Raw, TokenKind::RawAll)
    }

    fn extract(mut self, method: &str, single: TokenKind, list: TokenKind) -> Self {
        use VariableType::*;
        self.check_cursor(method, &[Document, ListDocument]);
        let expr = if self.cursor() == ListDocument {
            Expr::new(list, ListDocument, ListString)
        } else {
            Expr::new(single, Document, String)
        };
        self.push(method, expr)
    }

    pub fn attr(self, name: &str) -> Self {
        self.attrs(&[name])
    }

    /// Several attributes at once always yield LIST_STRING.
    pub fn attrs(mut self, keys: &[&str]) -> Self {
        use VariableType::*;
        self.check_cursor("attr", &[Document, ListDocument]);
        let expr = match self.cursor() {
            ListDocument => Expr::new(TokenKind::AttrAll, ListDocument, ListString),
            _ if keys.len() > 1 => Expr::new(TokenKind::Attr, Document, ListString),
            _ => Expr::new(TokenKind::Attr, Document, String),
        };
        self.push("attr", expr.with("key", json!(keys)))
    }

    // ------------------------------- strings ------------------------------ //

    pub fn trim(self) -> Self {
        self.string_op("trim", TokenKind::Trim, TokenKind::ListTrim, kw([("substr", Value::Null)]))
    }

    pub fn ltrim(self) -> Self {
        self.string_op("ltrim", TokenKind::LTrim, TokenKind::ListLTrim, kw([("substr", Value::Null)]))
    }

    pub fn rtrim(self) -> Self {
        self.string_op("rtrim", TokenKind::RTrim, TokenKind::ListRTrim, kw([("substr", Value::Null)]))
    }

    pub fn trim_chars(self, substr: &str) -> Self {
        self.string_op("trim", TokenKind::Trim, TokenKind::ListTrim, kw([("substr", json!(substr))]))
    }

    pub fn ltrim_chars(self, substr: &str) -> Self {
        self.string_op("ltrim", TokenKind::LTrim, TokenKind::ListLTrim, kw([("substr", json!(substr))]))
    }

    pub fn rtrim_chars(self, substr: &str) -> Self {
        self.string_op("rtrim", TokenKind::RTrim, TokenKind::ListRTrim, kw([("substr", json!(substr))]))
    }

    pub fn replace(self, old: &str, new: &str) -> Self {
        self.string_op(
            "replace",
            TokenKind::Replace,
            TokenKind::ListReplace,
            kw([("old", json!(old)), ("new", json!(new))]),
        )
    }

    pub fn map_replace(self, pairs: &[(&str, &str)]) -> Self {
        let old: Vec<&str> = pairs.iter().map(|(o, _)| *o).collect();
        let new: Vec<&str> = pairs.iter().map(|(_, n)| *n).collect();
        self.string_op(
            "map_replace",
            TokenKind::MapReplace,
            TokenKind::ListMapReplace,
            kw([("old", json!(old)), ("new", json!(new))]),
        )
    }

    /// `fmt` must hold a `{{}}` placeholder; one is appended when missing.
    pub fn format(self, fmt: &str) -> Self {
        let fmt = if fmt.contains("{{}}") {
            fmt.to_string()
        } else {
            log::warn!("format({fmt:?}) missing placeholder `{{{{}}}}`, appended to the end");
            format!("{fmt}{{{{}}}}")
        };
        self.string_op("format", TokenKind::Format, TokenKind::ListFormat, kw([("fmt", json!(fmt))]))
    }

    pub fn split(mut self, sep: &str) -> Self {
        self.check_cursor("split", &[VariableType::String]);
        let expr = Expr::new(TokenKind::Split, VariableType::String, VariableType::ListString).with("sep", json!(sep));
        self.push("split", expr)
    }

    pub fn rm_prefix(self, substr: &str) -> Self {
        self.string_op("rm_prefix", TokenKind::RmPrefix, TokenKind::ListRmPrefix, kw([("substr", json!(substr))]))
    }

    pub fn rm_suffix(self, substr: &str) -> Self {
        self.string_op("rm_suffix", TokenKind::RmSuffix, TokenKind::ListRmSuffix, kw([("substr", json!(substr))]))
    }

    pub fn rm_prefix_and_suffix(self, substr: &str) -> Self {
        self.string_op(
            "rm_prefix_and_suffix",
            TokenKind::RmPrefixAndSuffix,
            TokenKind::ListRmPrefixAndSuffix,
            kw([("substr", json!(substr))]),
        )
    }

    pub fn unescape(self) -> Self {
        self.string_op("unescape", TokenKind::Unescape, TokenKind::ListUnescape, Kwargs::new())
    }

    // -------------------------------- regex ------------------------------- //

    /// First match; group 1, or the whole match for a group-less pattern.
    pub fn re(self, pattern: &str) -> Self {
        let group = match regex_utils::analyze(pattern, GroupPolicy::ANY) {
            Ok(0) => 0,
            _ => 1,
        };
        self.re_with(pattern, group, false, false)
    }

    pub fn re_with(mut self, pattern: &str, group: usize, ignore_case: bool, dotall: bool) -> Self {
        self.check_cursor("re", &[VariableType::String]);
        self.warn_regex("re", pattern, GroupPolicy::SINGLE);
        let expr = Expr::new(TokenKind::Regex, VariableType::String, VariableType::String)
            .with("pattern", json!(pattern))
            .with("group", json!(group))
            .with("ignore_case", json!(ignore_case))
            .with("dotall", json!(dotall));
        self.push("re", expr)
    }

    pub fn re_all(self, pattern: &str) -> Self {
        self.re_all_with(pattern, false, false)
    }

    pub fn re_all_with(mut self, pattern: &str, ignore_case: bool, dotall: bool) -> Self {
        self.check_cursor("re_all", &[VariableType::String]);
        self.warn_regex("re_all", pattern, GroupPolicy::SINGLE);
        let expr = Expr::new(TokenKind::RegexAll, VariableType::String, VariableType::ListString)
            .with("pattern", json!(pattern))
            .with("ignore_case", json!(ignore_case))
            .with("dotall", json!(dotall));
        self.push("re_all", expr)
    }

    pub fn re_sub(self, pattern: &str, repl: &str) -> Self {
        self.re_sub_with(pattern, repl, false, false)
    }

    pub fn re_sub_with(self, pattern: &str, repl: &str, ignore_case: bool, dotall: bool) -> Self {
        self.warn_regex("re_sub", pattern, GroupPolicy::ANY);
        self.string_op(
            "re_sub",
            TokenKind::RegexSub,
            TokenKind::ListRegexSub,
            kw([
                ("pattern", json!(pattern)),
                ("repl", json!(repl)),
                ("ignore_case", json!(ignore_case)),
                ("dotall", json!(dotall)),
            ]),
        )
    }

    fn warn_regex(&self, method: &str, pattern: &str, policy: GroupPolicy) {
        if let Err(err) = regex_utils::analyze(pattern, policy) {
            log::warn!("{method}(): {err}");
        }
    }

    // -------------------------------- lists ------------------------------- //

    /// Negative indices count from the end.
    pub fn index(mut self, i: i64) -> Self {
        use VariableType::*;
        self.check_cursor("index", &[ListDocument, ListString, ListInt, ListFloat, OptionalListString, OptionalListInt, OptionalListFloat, ListAny]);
        let (accept, ret) = match self.cursor() {
            ListDocument => (ListDocument, Document),
            ListString | OptionalListString => (ListString, String),
            ListInt | OptionalListInt => (ListInt, Int),
            ListFloat | OptionalListFloat => (ListFloat, Float),
            _ => (ListAny, Any),
        };
        self.push("index", Expr::new(TokenKind::Index, accept, ret).with("index", json!(i)))
    }

    pub fn first(self) -> Self {
        self.index(0)
    }

    pub fn last(self) -> Self {
        self.index(-1)
    }

    pub fn join(mut self, sep: &str) -> Self {
        self.check_cursor("join", &[VariableType::ListString]);
        let expr = Expr::new(TokenKind::Join, VariableType::ListString, VariableType::String).with("sep", json!(sep));
        self.push("join", expr)
    }

    pub fn to_len(mut self) -> Self {
        use VariableType::*;
        self.check_cursor("to_len", &[ListString, ListDocument, ListInt, ListFloat]);
        let accept = if self.cursor().is_list() { self.cursor() } else { ListAny };
        self.push("to_len", Expr::new(TokenKind::Len, accept, Int))
    }

    pub fn unique(mut self, keep_order: bool) -> Self {
        self.check_cursor("unique", &[VariableType::ListString]);
        let expr = Expr::new(TokenKind::Unique, VariableType::ListString, VariableType::ListString)
            .with("keep_order", json!(keep_order));
        self.push("unique", expr)
    }

    pub fn filter(mut self, cond: Filter) -> Self {
        self.check_cursor("filter", &[VariableType::ListString]);
        let mut expr = Expr::new(TokenKind::Filter, VariableType::ListString, VariableType::ListString);
        expr.body.push(cond.into_expr());
        self.push("filter", expr)
    }

    // -------------------------------- casts ------------------------------- //

    pub fn to_int(self) -> Self {
        self.cast("to_int", TokenKind::ToInt, TokenKind::ListToInt, VariableType::Int, VariableType::ListInt)
    }

    pub fn to_float(self) -> Self {
        self.cast("to_float", TokenKind::ToFloat, TokenKind::ListToFloat, VariableType::Float, VariableType::ListFloat)
    }

    fn cast(mut self, method: &str, single: TokenKind, list: TokenKind, ret: VariableType, list_ret: VariableType) -> Self {
        use VariableType::*;
        self.check_cursor(method, &[String, ListString]);
        let expr = if self.cursor() == ListString {
            Expr::new(list, ListString, list_ret)
        } else {
            Expr::new(single, String, ret)
        };
        self.push(method, expr)
    }

    pub fn to_bool(self) -> Self {
        let mut expr = Expr::new(TokenKind::ToBool, VariableType::Any, VariableType::Bool);
        expr.exclude_types = vec![VariableType::Nested, VariableType::Json];
        self.push("to_bool", expr)
    }

    /// Parse the string as JSON into the named JSON struct; `query` is a
    /// dotted path (`data.items.0`) applied first.
    pub fn jsonify(mut self, json_struct: &str, query: &str) -> Self {
        self.check_cursor("jsonify", &[VariableType::String]);
        let expr = Expr::new(TokenKind::Jsonify, VariableType::String, VariableType::Json)
            .with("json_struct", json!(json_struct))
            .with("query", json!(query));
        self.push("jsonify", expr)
    }

    // ------------------------------ assertions ---------------------------- //

    pub fn is_css(self, query: &str, msg: &str) -> Self {
        self.selector_assert("is_css", TokenKind::IsCss, query, msg, false)
    }

    pub fn is_not_css(self, query: &str, msg: &str) -> Self {
        self.selector_assert("is_css", TokenKind::IsCss, query, msg, true)
    }

    pub fn is_xpath(self, query: &str, msg: &str) -> Self {
        self.selector_assert("is_xpath", TokenKind::IsXpath, query, msg, false)
    }

    pub fn is_not_xpath(self, query: &str, msg: &str) -> Self {
        self.selector_assert("is_xpath", TokenKind::IsXpath, query, msg, true)
    }

    fn selector_assert(mut self, method: &str, kind: TokenKind, query: &str, msg: &str, invert: bool) -> Self {
        self.check_cursor(method, &[VariableType::Document]);
        let query = normalize_query(query);
        let (base, action) = if kind == TokenKind::IsCss {
            split_css_pseudo(&query)
        } else {
            split_xpath_pseudo(&query)
        };
        if action.is_some() {
            log::warn!("{method}({query:?}) does not support pseudo selectors, skipped");
        }
        let expr = Expr::new(kind, VariableType::Document, VariableType::Document)
            .with("query", json!(base))
            .with("msg", json!(msg))
            .with("invert", json!(invert));
        self.push(method, expr)
    }

    pub fn is_equal(self, value: impl Into<Value>, msg: &str) -> Self {
        self.compare("is_equal", TokenKind::IsEqual, value.into(), msg)
    }

    pub fn is_not_equal(self, value: impl Into<Value>, msg: &str) -> Self {
        self.compare("is_not_equal", TokenKind::IsNotEqual, value.into(), msg)
    }

    fn compare(mut self, method: &str, kind: TokenKind, value: Value, msg: &str) -> Self {
        use VariableType::*;
        let expected = match &value {
            Value::String(_) => String,
            Value::Bool(_) => Bool,
            Value::Number(n) if n.is_f64() => Float,
            Value::Number(_) => Int,
            _ => Any,
        };
        if expected == Any {
            self.record(DslError::BadArgument {
                method: method.to_string(),
                message: format!("unsupported comparison value {value}"),
            });
        }
        // an INT cursor compared against a float literal stays INT
        let accept = if expected == Float && self.cursor() == Int { Int } else { expected };
        self.check_cursor(method, &[accept]);
        let mut expr = Expr::new(kind, accept, accept).with("item", value).with("msg", json!(msg));
        expr.exclude_types = vec![Document, ListDocument, Nested, Json];
        self.push(method, expr)
    }

    pub fn is_contains(mut self, item: impl Into<Value>, msg: &str) -> Self {
        use VariableType::*;
        self.check_cursor("is_contains", &[ListString, ListInt, ListFloat]);
        let ret = if self.cursor().is_list() { self.cursor() } else { ListAny };
        let mut expr = Expr::new(TokenKind::IsContains, ListAny, ret)
            .with("item", item.into())
            .with("msg", json!(msg));
        expr.exclude_types = vec![ListDocument];
        self.push("is_contains", expr)
    }

    pub fn is_regex(self, pattern: &str, msg: &str) -> Self {
        self.regex_assert("is_regex", TokenKind::IsRegex, VariableType::String, pattern, msg)
    }

    pub fn any_is_regex(self, pattern: &str, msg: &str) -> Self {
        self.regex_assert("any_is_regex", TokenKind::AnyIsRegex, VariableType::ListString, pattern, msg)
    }

    pub fn all_is_regex(self, pattern: &str, msg: &str) -> Self {
        self.regex_assert("all_is_regex", TokenKind::AllIsRegex, VariableType::ListString, pattern, msg)
    }

    fn regex_assert(mut self, method: &str, kind: TokenKind, ty: VariableType, pattern: &str, msg: &str) -> Self {
        self.check_cursor(method, &[ty]);
        self.warn_regex(method, pattern, GroupPolicy::ANY);
        let expr = Expr::new(kind, ty, ty)
            .with("pattern", json!(pattern))
            .with("ignore_case", json!(false))
            .with("msg", json!(msg));
        self.push(method, expr)
    }

    pub fn has_attr(self, key: &str, msg: &str) -> Self {
        self.attr_assert(key, msg, false)
    }

    pub fn has_no_attr(self, key: &str, msg: &str) -> Self {
        self.attr_assert(key, msg, true)
    }

    fn attr_assert(mut self, key: &str, msg: &str, invert: bool) -> Self {
        use VariableType::*;
        self.check_cursor("has_attr", &[Document, ListDocument]);
        let expr = if self.cursor() == ListDocument {
            Expr::new(TokenKind::ListHasAttr, ListDocument, ListDocument)
        } else {
            Expr::new(TokenKind::HasAttr, Document, Document)
        };
        let expr = expr.with("key", json!(key)).with("msg", json!(msg)).with("invert", json!(invert));
        self.push("has_attr", expr)
    }

    // -------------------------- nested and default ------------------------ //

    pub fn sub_parser(mut self, schema_name: &str) -> Self {
        self.check_cursor("sub_parser", &[VariableType::Document]);
        let expr = Expr::new(TokenKind::Nested, VariableType::Document, VariableType::Nested)
            .with("schema_name", json!(schema_name));
        self.push("sub_parser", expr)
    }

    /// Fail-silent region: any error in the rest of the chain yields `value`.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        if !self.stack.is_empty() {
            let position = self.stack.len();
            self.record(DslError::DefaultPosition { position });
        }
        let expr = Expr::new(TokenKind::Default, VariableType::Document, VariableType::Document)
            .with("value", value.into());
        self.push("default", expr)
    }

    /// Bind `param` of the last operation to the class variable `target`
    /// (`Schema.FIELD`); the literal value stays in kwargs.
    pub fn hook(mut self, param: &str, target: &str) -> Self {
        match self.stack.last_mut() {
            Some(expr) if expr.kwargs.contains_key(param) => {
                expr.classvar_hooks.insert(param.to_string(), ClassVarRef::new(target));
            }
            Some(expr) => {
                let message = format!("{} has no parameter `{param}`", expr.kind);
                self.record(DslError::BadArgument { method: "hook".to_string(), message });
            }
            None => {
                let message = "no operation to hook".to_string();
                self.record(DslError::BadArgument { method: "hook".to_string(), message });
            }
        }
        self
    }
}

fn normalize_query(query: &str) -> String {
    query.lines().map(str::trim).filter(|l| !l.is_empty()).collect::<Vec<_>>().join(" ")
}

fn kw<const N: usize>(pairs: [(&str, Value); N]) -> Kwargs {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(doc: &Document) -> Vec<TokenKind> {
        doc.stack().iter().map(|e| e.kind).collect()
    }

    #[test]
    fn cursor_follows_chain() {
        let doc = Document::new().css_all(".item").text().trim().join(", ");
        assert_eq!(
            kinds(&doc),
            vec![TokenKind::CssAll, TokenKind::TextAll, TokenKind::ListTrim, TokenKind::Join]
        );
        assert_eq!(doc.cursor(), VariableType::String);
        assert!(doc.errors().is_empty());
    }

    #[test]
    fn pseudo_selectors_become_extractors() {
        let doc = Document::new().css("a::attr(href)");
        assert_eq!(kinds(&doc), vec![TokenKind::Css, TokenKind::Attr]);
        assert_eq!(doc.stack()[0].kwarg_str("query"), Some("a"));
        assert_eq!(doc.stack()[1].kwargs["key"], json!(["href"]));

        let doc = Document::new().xpath_all("//p/text()");
        assert_eq!(kinds(&doc), vec![TokenKind::XpathAll, TokenKind::TextAll]);
        assert_eq!(doc.cursor(), VariableType::ListString);

        let doc = Document::new().css("img").attrs(&["src", "alt"]);
        assert_eq!(doc.cursor(), VariableType::ListString);
    }

    #[test]
    fn mismatch_is_recorded_and_chain_continues() {
        let doc = Document::new().css("p").trim().to_int();
        assert_eq!(doc.stack().len(), 3);
        assert!(matches!(
            &doc.errors()[0],
            DslError::TypeMismatch { method, got: VariableType::Document, .. } if method == "trim"
        ));
    }

    #[test]
    fn regex_group_defaults() {
        let doc = Document::from_raw().re(r"\d+");
        assert_eq!(doc.stack()[1].kwargs["group"], json!(0));
        let doc = Document::from_raw().re(r"(\d+)");
        assert_eq!(doc.stack()[1].kwargs["group"], json!(1));
    }

    #[test]
    fn index_dispatch() {
        let doc = Document::new().css_all("li").index(-1);
        assert_eq!(doc.cursor(), VariableType::Document);
        let doc = Document::from_raw().split(",").first().to_int();
        assert_eq!(doc.cursor(), VariableType::Int);
    }

    #[test]
    fn default_must_come_first() {
        let doc = Document::new().default(Value::Null).css("p").text();
        assert!(doc.errors().is_empty());
        let doc = Document::new().css("p").default("x");
        assert_eq!(doc.errors(), &[DslError::DefaultPosition { position: 1 }]);
    }

    #[test]
    fn nested_document_restrictions() {
        let ok = Document::nested().css("div.info").sub_parser("Info");
        assert!(ok.errors().is_empty());
        assert_eq!(ok.cursor(), VariableType::Nested);
        let bad = Document::nested().css("div").text();
        assert_eq!(bad.errors(), &[DslError::NotAllowed { method: "text".into() }]);
    }

    #[test]
    fn hooks_bind_existing_params() {
        let doc = Document::new().css("a").attr("href").format("https://x.test{{}}").hook("fmt", "Books.BASE");
        let last = doc.stack().last().unwrap();
        assert_eq!(last.classvar_hooks["fmt"], ClassVarRef::new("Books.BASE"));
        assert_eq!(ClassVarRef::new("Books.BASE").split(), Some(("Books", "BASE")));
        assert_eq!(ClassVarRef::new("BASE").split(), None);

        let doc = Document::new().css("a").hook("nope", "A.B");
        assert!(matches!(doc.errors()[0], DslError::BadArgument { .. }));
    }

    #[test]
    fn format_appends_placeholder() {
        let doc = Document::from_raw().format("x-");
        assert_eq!(doc.stack()[1].kwarg_str("fmt"), Some("x-{{}}"));
    }

    #[test]
    fn filter_wraps_single_root() {
        let doc = Document::new()
            .css_all("a")
            .attr("href")
            .filter(Filter::or(vec![Filter::starts_with(&["/"]), Filter::contains(&["example"])]));
        let f = doc.stack().last().unwrap();
        assert_eq!(f.kind, TokenKind::Filter);
        assert_eq!(f.body.len(), 1);
        assert_eq!(f.body[0].kind, TokenKind::FilterOr);
    }
}
