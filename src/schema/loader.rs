//! Declarative schema files.
//!
//! ```json
//! {"schemas": [{"name": "Book", "kind": "item", "fields": {
//!     "title": [{"css": "h3 a"}, {"attr": "title"}],
//!     "price": [{"default": 0}, {"css": ".price"}, "text", {"re": "\\d+"}, "to_int"]
//! }}]}
//! ```
//!
//! A step is a bare method name, or a single-key object whose value is the
//! positional argument, an array of positional arguments or an object of
//! named arguments. `{"$ref": "Schema.FIELD"}` in an argument position reads
//! the class variable and binds a hook on that parameter.
use std::path::Path;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::registry::SourceFile;
use super::{ClassVar, JsonStruct, LoadError, Schema, SchemaRegistry};
use crate::document::{Document, Filter};
use crate::path_de::from_str_with_path;
use crate::tokens::StructType;

// -------------------------------- File model ------------------------------ //

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaFile {
    #[serde(default)]
    docstring: Option<String>,
    #[serde(default)]
    json_structs: Vec<JsonStructDecl>,
    #[serde(default)]
    schemas: Vec<SchemaDecl>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct JsonStructDecl {
    name: String,
    #[serde(default)]
    is_array: bool,
    fields: IndexMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaDecl {
    name: String,
    #[serde(default = "default_kind")]
    kind: StructType,
    #[serde(default)]
    doc: String,
    #[serde(default)]
    extends: Vec<String>,
    #[serde(default)]
    classvars: IndexMap<String, ClassVarDecl>,
    #[serde(default)]
    fields: IndexMap<String, Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClassVarDecl {
    Full {
        value: Value,
        #[serde(default)]
        returned: bool,
    },
    Plain(Value),
}

fn default_kind() -> StructType {
    StructType::Item
}

// --------------------------------- Entry ---------------------------------- //

pub fn load_file(path: &Path) -> Result<SchemaRegistry, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    log::debug!("loading schemas from {}", path.display());
    let mut registry = load_str(&text)?;
    registry.source = Some(SourceFile { path: path.display().to_string(), text });
    Ok(registry)
}

pub fn load_str(text: &str) -> Result<SchemaRegistry, LoadError> {
    let file: SchemaFile = from_str_with_path(text)?;
    let mut registry = SchemaRegistry::new();
    registry.docstring = file.docstring.filter(|d| !d.trim().is_empty());

    for decl in &file.json_structs {
        let mut st = JsonStruct::new(&decl.name, decl.is_array);
        for (name, tag) in &decl.fields {
            st = st.field(name, tag);
        }
        registry.insert_json_struct(st);
    }

    let decls: IndexMap<&str, &SchemaDecl> = file.schemas.iter().map(|d| (d.name.as_str(), d)).collect();
    for decl in &file.schemas {
        let mut schema = Schema::new(&decl.name, decl.kind).doc(&decl.doc);
        schema.extends = decl.extends.clone();
        for (name, cv) in &decl.classvars {
            let (value, returned) = match cv {
                ClassVarDecl::Full { value, returned } => (value.clone(), *returned),
                ClassVarDecl::Plain(value) => (value.clone(), false),
            };
            schema.classvars.insert(name.clone(), ClassVar { value, returned });
        }
        let lines = locate_fields(text, &decl.name, decl.fields.keys().map(String::as_str));
        for (field, steps) in &decl.fields {
            let mut doc = Document::new();
            for (idx, step) in steps.iter().enumerate() {
                let ctx = StepCtx { schema: &decl.name, field, step: idx, decls: &decls };
                doc = apply_step(doc, step, &ctx)?;
            }
            schema.fields.insert(field.clone(), doc);
        }
        schema.field_lines = lines;
        registry.insert(schema)?;
    }
    log::debug!("loaded {} schema(s), {} json struct(s)", registry.len(), file.json_structs.len());
    Ok(registry)
}

// ---------------------------------- Steps --------------------------------- //

struct StepCtx<'a> {
    schema: &'a str,
    field: &'a str,
    step: usize,
    decls: &'a IndexMap<&'a str, &'a SchemaDecl>,
}

impl StepCtx<'_> {
    fn bad(&self, message: impl Into<String>) -> LoadError {
        LoadError::BadArgument {
            schema: self.schema.to_string(),
            field: self.field.to_string(),
            step: self.step,
            message: message.into(),
        }
    }

    /// Class variable value for `Schema.FIELD`, searching parents too.
    fn lookup(&self, target: &str) -> Result<Value, LoadError> {
        let (schema, name) = target
            .split_once('.')
            .ok_or_else(|| self.bad(format!("`{target}` must be written as `Schema.FIELD`")))?;
        let mut queue = vec![schema];
        let mut seen = 0;
        while let Some(current) = queue.pop() {
            seen += 1;
            if seen > self.decls.len() + 1 {
                break;
            }
            let Some(decl) = self.decls.get(current) else { continue };
            if let Some(cv) = decl.classvars.get(name) {
                return Ok(match cv {
                    ClassVarDecl::Full { value, .. } | ClassVarDecl::Plain(value) => value.clone(),
                });
            }
            queue.extend(decl.extends.iter().rev().map(String::as_str));
        }
        Err(self.bad(format!("unresolved class variable `{target}`")))
    }
}

/// Arguments of one step, with `$ref`s already resolved.
struct Args<'a> {
    ctx: &'a StepCtx<'a>,
    method: &'a str,
    positional: Vec<Value>,
    named: Map<String, Value>,
    refs: IndexMap<String, String>,
    hooks: Vec<(String, String)>,
}

impl<'a> Args<'a> {
    fn new(ctx: &'a StepCtx<'a>, method: &'a str, raw: Option<&Value>) -> Result<Self, LoadError> {
        let mut args = Args { ctx, method, positional: Vec::new(), named: Map::new(), refs: IndexMap::new(), hooks: Vec::new() };
        match raw {
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) => {
                for (i, item) in items.iter().enumerate() {
                    let v = args.resolve(&format!("#{i}"), item)?;
                    args.positional.push(v);
                }
            }
            Some(Value::Object(map)) if map.contains_key("$ref") => {
                let v = args.resolve("#0", &Value::Object(map.clone()))?;
                args.positional.push(v);
            }
            Some(Value::Object(map)) => {
                for (k, item) in map {
                    let v = args.resolve(k, item)?;
                    args.named.insert(k.clone(), v);
                }
            }
            Some(scalar) => args.positional.push(scalar.clone()),
        }
        Ok(args)
    }

    fn resolve(&mut self, slot: &str, v: &Value) -> Result<Value, LoadError> {
        if let Some(target) = v.get("$ref").and_then(Value::as_str) {
            self.refs.insert(slot.to_string(), target.to_string());
            return self.ctx.lookup(target);
        }
        Ok(v.clone())
    }

    /// Argument at position `idx` or named `param`; remembers hooks.
    fn get(&mut self, idx: usize, param: &str) -> Option<Value> {
        let (value, slot) = match self.named.get(param) {
            Some(v) => (v.clone(), param.to_string()),
            None => (self.positional.get(idx)?.clone(), format!("#{idx}")),
        };
        if let Some(target) = self.refs.get(&slot) {
            self.hooks.push((param.to_string(), target.clone()));
        }
        Some(value)
    }

    fn value(&mut self, idx: usize, param: &str) -> Result<Value, LoadError> {
        self.get(idx, param)
            .ok_or_else(|| self.ctx.bad(format!("{}() missing argument `{param}`", self.method)))
    }

    fn str(&mut self, idx: usize, param: &str) -> Result<String, LoadError> {
        match self.value(idx, param)? {
            Value::String(s) => Ok(s),
            other => Err(self.ctx.bad(format!("{}() `{param}` expects a string, got {other}", self.method))),
        }
    }

    fn opt_str(&mut self, idx: usize, param: &str) -> Result<Option<String>, LoadError> {
        match self.get(idx, param) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(self.ctx.bad(format!("{}() `{param}` expects a string, got {other}", self.method))),
        }
    }

    fn int(&mut self, idx: usize, param: &str) -> Result<i64, LoadError> {
        match self.value(idx, param)? {
            Value::Number(n) if n.is_i64() => n.as_i64().ok_or_else(|| self.ctx.bad("integer out of range")),
            other => Err(self.ctx.bad(format!("{}() `{param}` expects an integer, got {other}", self.method))),
        }
    }

    fn flag(&mut self, idx: usize, param: &str) -> Result<bool, LoadError> {
        match self.get(idx, param) {
            None => Ok(false),
            Some(Value::Bool(b)) => Ok(b),
            Some(other) => Err(self.ctx.bad(format!("{}() `{param}` expects a bool, got {other}", self.method))),
        }
    }

    fn strings(&mut self, idx: usize, param: &str) -> Result<Vec<String>, LoadError> {
        match self.value(idx, param)? {
            Value::String(s) => Ok(vec![s]),
            Value::Array(items) => items
                .into_iter()
                .map(|v| match v {
                    Value::String(s) => Ok(s),
                    other => Err(self.ctx.bad(format!("{}() expects strings, got {other}", self.method))),
                })
                .collect(),
            other => Err(self.ctx.bad(format!("{}() `{param}` expects strings, got {other}", self.method))),
        }
    }
}

fn apply_step(doc: Document, step: &Value, ctx: &StepCtx<'_>) -> Result<Document, LoadError> {
    let (method, raw) = match step {
        Value::String(method) => (method.as_str(), None),
        Value::Object(map) if map.len() == 1 => match map.iter().next() {
            Some((method, raw)) => (method.as_str(), Some(raw)),
            None => return Err(ctx.bad("empty step")),
        },
        other => return Err(ctx.bad(format!("step must be a method name or a single-key object, got {other}"))),
    };

    // arguments that are whole objects by nature
    match method {
        "filter" => {
            let raw = raw.ok_or_else(|| ctx.bad("filter() missing condition"))?;
            return Ok(doc.filter(parse_filter(raw, ctx)?));
        }
        "map_replace" => {
            let Some(Value::Object(table)) = raw else {
                return Err(ctx.bad("map_replace() expects an object of replacements"));
            };
            let mut pairs = Vec::with_capacity(table.len());
            for (old, new) in table {
                let new = new.as_str().ok_or_else(|| ctx.bad("map_replace() values must be strings"))?;
                pairs.push((old.as_str(), new));
            }
            return Ok(doc.map_replace(&pairs));
        }
        _ => {}
    }

    let mut a = Args::new(ctx, method, raw)?;
    let doc = match method {
        "css" => doc.css(&a.str(0, "query")?),
        "css_all" => doc.css_all(&a.str(0, "query")?),
        "xpath" => doc.xpath(&a.str(0, "query")?),
        "xpath_all" => doc.xpath_all(&a.str(0, "query")?),
        "text" => doc.text(),
        "raw" => doc.raw(),
        "attr" | "attrs" => {
            let keys = a.strings(0, "key")?;
            let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
            doc.attrs(&keys)
        }
        "trim" => match a.opt_str(0, "substr")? {
            Some(s) => doc.trim_chars(&s),
            None => doc.trim(),
        },
        "ltrim" => match a.opt_str(0, "substr")? {
            Some(s) => doc.ltrim_chars(&s),
            None => doc.ltrim(),
        },
        "rtrim" => match a.opt_str(0, "substr")? {
            Some(s) => doc.rtrim_chars(&s),
            None => doc.rtrim(),
        },
        "replace" => {
            let old = a.str(0, "old")?;
            let new = a.str(1, "new")?;
            doc.replace(&old, &new)
        }
        "format" | "fmt" => doc.format(&a.str(0, "fmt")?),
        "split" => doc.split(&a.str(0, "sep")?),
        "rm_prefix" => doc.rm_prefix(&a.str(0, "substr")?),
        "rm_suffix" => doc.rm_suffix(&a.str(0, "substr")?),
        "rm_prefix_and_suffix" => doc.rm_prefix_and_suffix(&a.str(0, "substr")?),
        "unescape" => doc.unescape(),
        "re" => {
            let pattern = a.str(0, "pattern")?;
            let ignore_case = a.flag(2, "ignore_case")?;
            let dotall = a.flag(3, "dotall")?;
            match a.get(1, "group") {
                Some(Value::Number(n)) => {
                    let group = n.as_u64().ok_or_else(|| ctx.bad("re() `group` must be a positive integer"))?;
                    doc.re_with(&pattern, group as usize, ignore_case, dotall)
                }
                Some(other) => return Err(ctx.bad(format!("re() `group` expects an integer, got {other}"))),
                None if ignore_case || dotall => {
                    let tmp = Document::from_raw().re(&pattern);
                    let group = tmp.stack().last().and_then(|e| e.kwargs.get("group")).and_then(Value::as_u64).unwrap_or(1);
                    doc.re_with(&pattern, group as usize, ignore_case, dotall)
                }
                None => doc.re(&pattern),
            }
        }
        "re_all" => {
            let pattern = a.str(0, "pattern")?;
            let ignore_case = a.flag(1, "ignore_case")?;
            let dotall = a.flag(2, "dotall")?;
            doc.re_all_with(&pattern, ignore_case, dotall)
        }
        "re_sub" => {
            let pattern = a.str(0, "pattern")?;
            let repl = a.opt_str(1, "repl")?.unwrap_or_default();
            let ignore_case = a.flag(2, "ignore_case")?;
            let dotall = a.flag(3, "dotall")?;
            doc.re_sub_with(&pattern, &repl, ignore_case, dotall)
        }
        "index" => doc.index(a.int(0, "index")?),
        "first" => doc.first(),
        "last" => doc.last(),
        "join" => doc.join(&a.str(0, "sep")?),
        "to_len" | "len" => doc.to_len(),
        "unique" => doc.unique(a.flag(0, "keep_order")?),
        "to_int" => doc.to_int(),
        "to_float" => doc.to_float(),
        "to_bool" => doc.to_bool(),
        "jsonify" => {
            let name = a.str(0, "struct")?;
            let query = a.opt_str(1, "query")?.unwrap_or_default();
            doc.jsonify(&name, &query)
        }
        "is_css" | "is_xpath" => {
            let query = a.str(0, "query")?;
            let msg = a.opt_str(1, "msg")?.unwrap_or_default();
            match (method, a.flag(2, "invert")?) {
                ("is_css", false) => doc.is_css(&query, &msg),
                ("is_css", true) => doc.is_not_css(&query, &msg),
                (_, false) => doc.is_xpath(&query, &msg),
                (_, true) => doc.is_not_xpath(&query, &msg),
            }
        }
        "is_equal" | "is_not_equal" => {
            let value = a.value(0, "item")?;
            let msg = a.opt_str(1, "msg")?.unwrap_or_default();
            if method == "is_equal" { doc.is_equal(value, &msg) } else { doc.is_not_equal(value, &msg) }
        }
        "is_contains" => {
            let value = a.value(0, "item")?;
            let msg = a.opt_str(1, "msg")?.unwrap_or_default();
            doc.is_contains(value, &msg)
        }
        "is_regex" | "any_is_regex" | "all_is_regex" => {
            let pattern = a.str(0, "pattern")?;
            let msg = a.opt_str(1, "msg")?.unwrap_or_default();
            match method {
                "is_regex" => doc.is_regex(&pattern, &msg),
                "any_is_regex" => doc.any_is_regex(&pattern, &msg),
                _ => doc.all_is_regex(&pattern, &msg),
            }
        }
        "has_attr" => {
            let key = a.str(0, "key")?;
            let msg = a.opt_str(1, "msg")?.unwrap_or_default();
            if a.flag(2, "invert")? { doc.has_no_attr(&key, &msg) } else { doc.has_attr(&key, &msg) }
        }
        "sub_parser" | "nested" => doc.sub_parser(&a.str(0, "schema")?),
        "default" => doc.default(a.get(0, "value").unwrap_or(Value::Null)),
        other => {
            return Err(LoadError::UnknownStep {
                schema: ctx.schema.to_string(),
                field: ctx.field.to_string(),
                step: ctx.step,
                method: other.to_string(),
            });
        }
    };
    Ok(a.hooks.drain(..).fold(doc, |doc, (param, target)| doc.hook(&param, &target)))
}

// --------------------------------- Filters -------------------------------- //

fn parse_filter(raw: &Value, ctx: &StepCtx<'_>) -> Result<Filter, LoadError> {
    let Value::Object(map) = raw else {
        return Err(ctx.bad(format!("filter condition must be an object, got {raw}")));
    };
    if map.len() != 1 {
        return Err(ctx.bad("filter condition takes exactly one root; combine with `and` / `or`"));
    }
    let Some((op, arg)) = map.iter().next() else {
        return Err(ctx.bad("empty filter condition"));
    };
    let strings = |arg: &Value| -> Result<Vec<String>, LoadError> {
        match arg {
            Value::String(s) => Ok(vec![s.clone()]),
            Value::Array(items) => items
                .iter()
                .map(|v| v.as_str().map(str::to_string).ok_or_else(|| ctx.bad(format!("`{op}` expects strings"))))
                .collect(),
            other => Err(ctx.bad(format!("`{op}` expects strings, got {other}"))),
        }
    };
    let length = |arg: &Value| -> Result<i64, LoadError> {
        arg.as_i64().ok_or_else(|| ctx.bad(format!("`{op}` expects an integer")))
    };
    let parts = |arg: &Value| -> Result<Vec<Filter>, LoadError> {
        match arg {
            Value::Array(items) => items.iter().map(|v| parse_filter(v, ctx)).collect(),
            other => Err(ctx.bad(format!("`{op}` expects an array of conditions, got {other}"))),
        }
    };
    let filter = match op.as_str() {
        "and" => Filter::and(parts(arg)?),
        "or" => Filter::or(parts(arg)?),
        "not" => Filter::not(parse_filter(arg, ctx)?),
        "eq" | "ne" | "contains" | "starts_with" | "ends_with" => {
            let values = strings(arg)?;
            let values: Vec<&str> = values.iter().map(String::as_str).collect();
            match op.as_str() {
                "eq" => Filter::eq(&values),
                "ne" => Filter::ne(&values),
                "contains" => Filter::contains(&values),
                "starts_with" => Filter::starts_with(&values),
                _ => Filter::ends_with(&values),
            }
        }
        "re" => match arg {
            Value::String(p) => Filter::re(p),
            Value::Object(o) => {
                let p = o.get("pattern").and_then(Value::as_str).ok_or_else(|| ctx.bad("`re` missing pattern"))?;
                let ic = o.get("ignore_case").and_then(Value::as_bool).unwrap_or(false);
                Filter::re_with(p, ic)
            }
            other => return Err(ctx.bad(format!("`re` expects a pattern, got {other}"))),
        },
        "len_eq" => Filter::len_eq(length(arg)?),
        "len_ne" => Filter::len_ne(length(arg)?),
        "len_lt" => Filter::len_lt(length(arg)?),
        "len_le" => Filter::len_le(length(arg)?),
        "len_gt" => Filter::len_gt(length(arg)?),
        "len_ge" => Filter::len_ge(length(arg)?),
        other => return Err(ctx.bad(format!("unknown filter condition `{other}`"))),
    };
    Ok(filter)
}

// ------------------------------ Line lookup ------------------------------- //

static NAME_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r#""name"\s*:\s*""#).expect("valid name regex"));

/// 1-based line of each field key, searched after the schema's `"name"`.
fn locate_fields<'a>(text: &str, schema: &str, fields: impl Iterator<Item = &'a str>) -> IndexMap<String, usize> {
    let anchor = NAME_KEY
        .find_iter(text)
        .find(|m| text[m.end()..].starts_with(&format!("{schema}\"")))
        .map(|m| m.end())
        .unwrap_or(0);
    let mut out = IndexMap::new();
    for field in fields {
        let needle = format!("\"{field}\"");
        let mut from = anchor;
        while let Some(off) = text[from..].find(&needle) {
            let at = from + off;
            let rest = text[at + needle.len()..].trim_start();
            if rest.starts_with(':') {
                out.insert(field.to_string(), text[..at].matches('\n').count() + 1);
                break;
            }
            from = at + needle.len();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::{TokenKind, VariableType};
    use serde_json::json;

    const BOOKS: &str = r##"{
  "docstring": "books.toscrape.com",
  "json_structs": [{"name": "Meta", "fields": {"id": "number", "tags": "array_string"}}],
  "schemas": [
    {
      "name": "Books",
      "kind": "list",
      "classvars": {"BASE": "https://books.toscrape.com/", "SRC": {"value": "books", "returned": true}},
      "fields": {
        "__SPLIT_DOC__": [{"css_all": ".col-lg-3"}],
        "name": [{"css": ".thumbnail"}, {"attr": "alt"}],
        "price": [{"default": "0"}, {"css": ".price_color"}, "text", {"re": "\\d+"}],
        "url": [{"css": "h3 a"}, {"attr": "href"}, {"format": {"$ref": "Books.BASE"}}],
        "tags": [{"css_all": "a"}, "text", {"filter": {"and": [{"starts_with": "#"}, {"len_gt": 2}]}}]
      }
    }
  ]
}"##;

    #[test]
    fn loads_full_file() {
        let reg = load_str(BOOKS).unwrap();
        assert_eq!(reg.docstring.as_deref(), Some("books.toscrape.com"));
        assert!(reg.json_struct("Meta").is_some());
        let books = reg.get("Books").unwrap();
        assert_eq!(books.kind, StructType::List);
        assert!(books.classvars["SRC"].returned);
        assert_eq!(books.fields["price"].cursor(), VariableType::String);
        assert_eq!(books.fields["price"].stack()[3].kwargs["group"], json!(0));
        assert_eq!(books.line_of("__SPLIT_DOC__"), Some(10));
        assert_eq!(books.line_of("tags"), Some(14));
    }

    #[test]
    fn refs_resolve_and_hook() {
        let reg = load_str(BOOKS).unwrap();
        let url = &reg.get("Books").unwrap().fields["url"];
        let fmt = url.stack().last().unwrap();
        assert_eq!(fmt.kind, TokenKind::Format);
        assert_eq!(fmt.kwarg_str("fmt"), Some("https://books.toscrape.com/{{}}"));
        assert_eq!(fmt.classvar_hooks["fmt"].0, "Books.BASE");
    }

    #[test]
    fn filter_steps() {
        let reg = load_str(BOOKS).unwrap();
        let tags = &reg.get("Books").unwrap().fields["tags"];
        let f = tags.stack().last().unwrap();
        assert_eq!(f.body[0].kind, TokenKind::FilterAnd);
        assert_eq!(f.body[0].body[1].kind, TokenKind::FilterLenGt);
    }

    #[test]
    fn reports_unknown_steps_and_paths() {
        let src = r#"{"schemas": [{"name": "A", "fields": {"x": [{"explode": 1}]}}]}"#;
        assert!(matches!(load_str(src), Err(LoadError::UnknownStep { step: 0, .. })));

        let src = r#"{"schemas": [{"name": "A", "kind": "tree"}]}"#;
        let err = load_str(src).unwrap_err();
        assert!(err.to_string().contains("schemas[0].kind"), "{err}");

        let src = r#"{"schemas": [{"name": "A", "fields": {"x": [{"filter": {"eq": "a", "ne": "b"}}]}}]}"#;
        assert!(matches!(load_str(src), Err(LoadError::BadArgument { .. })));
    }

    #[test]
    fn unresolved_ref_is_an_error() {
        let src = r#"{"schemas": [{"name": "A", "fields": {"x": [{"css": {"$ref": "A.NOPE"}}]}}]}"#;
        assert!(matches!(load_str(src), Err(LoadError::BadArgument { .. })));
    }
}
