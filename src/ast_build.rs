//! Schemas → linked module AST.
//!
//! Module children, in order: Docstring?, Imports, TransformImports,
//! Utilities, CodeStart, JsonStruct*, Typedef*, Struct*, CodeEnd.
use std::collections::HashSet;

use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::ast::{Module, NodeData, NodeId};
use crate::document::{Document, Expr};
use crate::schema::{JsonStruct, LoadError, Schema, SchemaRegistry, literal_type};
use crate::selector;
use crate::tokens::{PRE_VALIDATE, SPLIT_DOC, StructType, TokenKind, VariableType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Module doc and per-schema docs with a generated output signature.
    pub gen_docstring: bool,
    pub css_to_xpath: bool,
    pub xpath_to_css: bool,
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Resolve(#[from] LoadError),
    #[error("css_to_xpath and xpath_to_css are mutually exclusive")]
    ConflictingOptions,
}

/// Build the module for every schema of `registry`.
pub fn build(registry: &SchemaRegistry, opts: BuildOptions) -> Result<Module, BuildError> {
    if opts.css_to_xpath && opts.xpath_to_css {
        return Err(BuildError::ConflictingOptions);
    }
    let schemas = registry.resolved()?;
    let ctx = Ctx { registry, schemas: &schemas, opts };
    let mut module = Module::new();
    let root = Module::ROOT;

    if let Some(doc) = registry.docstring.as_deref().filter(|d| opts.gen_docstring && !d.is_empty()) {
        module.push(root, NodeData::new(TokenKind::Docstring).with("value", doc));
    }
    module.push(root, NodeData::new(TokenKind::Imports));
    module.push(root, NodeData::new(TokenKind::TransformImports).with("transforms", json!([])));
    module.push(root, NodeData::new(TokenKind::Utilities));
    module.push(root, NodeData::new(TokenKind::CodeStart));

    for st in registry.json_structs() {
        push_json_struct(&mut module, st);
    }

    let plans: Vec<StructPlan> = schemas.iter().map(|s| ctx.plan_struct(s)).collect();
    for plan in plans.iter().filter(|p| p.kind != StructType::ConfigClassvars) {
        push_typedef(&mut module, plan);
    }
    for plan in &plans {
        push_struct(&mut module, plan);
    }
    module.push(root, NodeData::new(TokenKind::CodeEnd));
    log::debug!("built module: {} schema(s), {} node(s)", plans.len(), module.len());
    Ok(module)
}

// ------------------------------- Planning --------------------------------- //

struct Ctx<'a> {
    registry: &'a SchemaRegistry,
    schemas: &'a [Schema],
    opts: BuildOptions,
}

struct StructPlan {
    name: String,
    kind: StructType,
    docstring: String,
    classvars: Vec<(String, Value, bool)>,
    pre_validate: Option<Vec<Expr>>,
    split_doc: Option<Vec<Expr>>,
    fields: Vec<FieldPlan>,
}

struct FieldPlan {
    name: String,
    exprs: Vec<Expr>,
    ret_type: VariableType,
    /// `(name, kind)` of the nested schema or JSON struct.
    nested: Option<(String, StructType)>,
}

impl<'a> Ctx<'a> {
    fn schema(&self, name: &str) -> Option<&'a Schema> {
        self.schemas.iter().find(|s| s.name == name)
    }

    fn plan_struct(&self, schema: &Schema) -> StructPlan {
        let docstring = if !self.opts.gen_docstring {
            String::new()
        } else if schema.kind == StructType::ConfigClassvars {
            schema.doc.clone()
        } else {
            let signature = self.signature(schema, &mut HashSet::new());
            let signature = pretty(&signature);
            if schema.doc.is_empty() { signature } else { format!("{}\n\n{signature}", schema.doc) }
        };
        let classvars = schema
            .classvars
            .iter()
            .map(|(name, cv)| (name.clone(), cv.value.clone(), cv.returned))
            .collect();
        if schema.kind == StructType::ConfigClassvars {
            return StructPlan {
                name: schema.name.clone(),
                kind: schema.kind,
                docstring,
                classvars,
                pre_validate: None,
                split_doc: None,
                fields: Vec::new(),
            };
        }
        let pre_validate = schema.fields.get(PRE_VALIDATE).map(|doc| {
            let mut exprs = self.prepare(doc);
            exprs.push(Expr::new(TokenKind::NoReturn, VariableType::Any, VariableType::Null));
            exprs
        });
        let split_doc = schema.fields.get(SPLIT_DOC).map(|doc| {
            let mut exprs = self.prepare(doc);
            let ret = last_ret(&exprs);
            exprs.push(Expr::new(TokenKind::Return, ret, ret));
            exprs
        });
        let fields = schema
            .fields
            .iter()
            .filter(|(name, _)| name.as_str() != PRE_VALIDATE && name.as_str() != SPLIT_DOC)
            .map(|(name, doc)| self.plan_field(name, doc))
            .collect();
        StructPlan { name: schema.name.clone(), kind: schema.kind, docstring, classvars, pre_validate, split_doc, fields }
    }

    fn plan_field(&self, name: &str, doc: &Document) -> FieldPlan {
        let mut exprs = self.prepare(doc);
        if !matches!(exprs.last().map(|e| e.kind), Some(TokenKind::Return | TokenKind::DefaultEnd)) {
            let ret = last_ret(&exprs);
            exprs.push(Expr::new(TokenKind::Return, ret, ret));
        }
        let chain_ret = last_ret(&exprs);
        let nested = match chain_ret {
            VariableType::Nested => exprs.iter().find(|e| e.kind == TokenKind::Nested).map(|e| {
                let kind = e.kwargs.get("schema_type").and_then(crate::ast::struct_type_kwarg);
                (e.kwarg_str("schema_name").unwrap_or_default().to_string(), kind.unwrap_or(StructType::Item))
            }),
            VariableType::Json => exprs.iter().find(|e| e.kind == TokenKind::Jsonify).map(|e| {
                let kind = if e.kwargs.get("is_array").and_then(Value::as_bool).unwrap_or(false) {
                    StructType::List
                } else {
                    StructType::Item
                };
                (e.kwarg_str("json_struct").unwrap_or_default().to_string(), kind)
            }),
            _ => None,
        };
        unfold_default(name, &mut exprs);
        let ret_type = last_ret(&exprs);
        FieldPlan { name: name.to_string(), exprs, ret_type, nested }
    }

    /// Copy the chain, translating selectors and resolving registry references.
    fn prepare(&self, doc: &Document) -> Vec<Expr> {
        doc.stack()
            .iter()
            .cloned()
            .map(|mut expr| {
                self.translate_selector(&mut expr);
                match expr.kind {
                    TokenKind::Nested => {
                        let target = expr.kwarg_str("schema_name").and_then(|n| self.schema(n));
                        let kind = target.map(|s| s.kind).unwrap_or(StructType::Item);
                        expr.kwargs.insert("schema_type".into(), json!(kind));
                    }
                    TokenKind::Jsonify => {
                        let target = expr.kwarg_str("json_struct").and_then(|n| self.registry.json_struct(n));
                        let is_array = target.map(|s| s.is_array).unwrap_or(false);
                        expr.kwargs.insert("is_array".into(), json!(is_array));
                    }
                    _ => {}
                }
                expr
            })
            .collect()
    }

    fn translate_selector(&self, expr: &mut Expr) {
        let Some(query) = expr.kwarg_str("query") else { return };
        let (kind, converted) = if self.opts.css_to_xpath {
            let Some(kind) = css_kind_to_xpath(expr.kind) else { return };
            (kind, selector::css_to_xpath(query))
        } else if self.opts.xpath_to_css {
            let Some(kind) = xpath_kind_to_css(expr.kind) else { return };
            (kind, selector::xpath_to_css(query))
        } else {
            return;
        };
        match converted {
            Ok(query) => {
                expr.kind = kind;
                expr.kwargs.insert("query".into(), json!(query));
            }
            Err(err) => log::warn!("{}: selector kept as is: {err}", expr.kind),
        }
    }

    // ----------------------------- signatures ----------------------------- //

    fn signature(&self, schema: &Schema, visiting: &mut HashSet<String>) -> Value {
        if !visiting.insert(schema.name.clone()) {
            return json!(format!("<{}>", schema.name));
        }
        let signature = match schema.kind {
            StructType::Item | StructType::List => {
                let mut obj = serde_json::Map::new();
                for (name, cv) in schema.returned_classvars() {
                    obj.insert(name.clone(), json!(signature_name(cv.value_type())));
                }
                for (name, doc) in schema.user_fields() {
                    obj.insert(name.clone(), self.field_signature(doc, visiting));
                }
                if schema.kind == StructType::List { json!([obj, "..."]) } else { Value::Object(obj) }
            }
            StructType::Dict => {
                let value = schema
                    .fields
                    .get(crate::tokens::VALUE)
                    .map(|doc| self.field_signature(doc, visiting))
                    .unwrap_or(json!("Any"));
                json!({"<K>": value, "<KN>": "..."})
            }
            StructType::FlatList => {
                let item = schema
                    .fields
                    .get(crate::tokens::ITEM)
                    .map(|doc| self.field_signature(doc, visiting))
                    .unwrap_or(json!("Any"));
                json!([item, "..."])
            }
            StructType::AccList => json!(["String", "..."]),
            StructType::ConfigClassvars => json!({}),
        };
        visiting.remove(&schema.name);
        signature
    }

    fn field_signature(&self, doc: &Document, visiting: &mut HashSet<String>) -> Value {
        let stack = doc.stack();
        match doc.cursor() {
            VariableType::Nested => {
                let nested = stack
                    .iter()
                    .find(|e| e.kind == TokenKind::Nested)
                    .and_then(|e| e.kwarg_str("schema_name"))
                    .and_then(|name| self.schema(name));
                match nested {
                    Some(schema) => self.signature(schema, visiting),
                    None => json!("Any"),
                }
            }
            VariableType::Json => {
                let st = stack
                    .iter()
                    .find(|e| e.kind == TokenKind::Jsonify)
                    .and_then(|e| e.kwarg_str("json_struct"))
                    .and_then(|name| self.registry.json_struct(name));
                match st {
                    Some(st) => json_signature(st),
                    None => json!("Any"),
                }
            }
            ty => {
                let ty = match stack.first() {
                    Some(first) if first.kind == TokenKind::Default => {
                        lift_default(ty, first.kwargs.get("value").unwrap_or(&Value::Null)).0
                    }
                    _ => ty,
                };
                json!(signature_name(ty))
            }
        }
    }
}

fn json_signature(st: &JsonStruct) -> Value {
    let obj: serde_json::Map<String, Value> =
        st.fields.iter().map(|(name, ty)| (name.clone(), json!(ty.tag()))).collect();
    if st.is_array { json!([obj, "..."]) } else { Value::Object(obj) }
}

fn signature_name(ty: VariableType) -> &'static str {
    use VariableType::*;
    match ty {
        String => "String",
        ListString => "Array<String>",
        Int => "Int",
        ListInt => "Array<Int>",
        Float => "Float",
        ListFloat => "Array<Float>",
        Bool => "Bool",
        Null => "null",
        OptionalString => "String | null",
        OptionalListString => "Array<String> | null",
        OptionalInt => "Int | null",
        OptionalListInt => "Array<Int> | null",
        OptionalFloat => "Float | null",
        OptionalListFloat => "Array<Float> | null",
        _ => "Any",
    }
}

fn pretty(value: &Value) -> String {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    match value.serialize(&mut ser) {
        Ok(()) => String::from_utf8(buf).unwrap_or_default(),
        Err(_) => value.to_string(),
    }
}

// ------------------------------- Defaults --------------------------------- //

/// Type a field returns when wrapped in `default(value)`; the flag is false
/// when the value cannot stand in for that type.
pub fn lift_default(ret: VariableType, value: &Value) -> (VariableType, bool) {
    use VariableType::*;
    match value {
        Value::Null => match ret.optional() {
            Some(optional) => (optional, true),
            None => (Any, false),
        },
        Value::Array(_) => match ret {
            ListString | ListInt | ListFloat => (ret, true),
            _ => (Any, false),
        },
        _ => (ret, true),
    }
}

/// Replace a leading `Default` by DefaultStart/DefaultEnd sentinels around
/// the chain and its return.
fn unfold_default(field: &str, exprs: &mut Vec<Expr>) {
    if exprs.first().map(|e| e.kind) != Some(TokenKind::Default) {
        return;
    }
    let default = exprs.remove(0);
    let value = default.kwargs.get("value").cloned().unwrap_or(Value::Null);
    let ret = last_ret(exprs);
    let (lifted, ok) = lift_default(ret, &value);
    if !ok {
        log::warn!("{field}: default {value} not allowed for return type {ret}, field typed as {lifted}");
    }
    let mut start = Expr::new(TokenKind::DefaultStart, VariableType::Document, VariableType::Document)
        .with("value", value.clone());
    start.classvar_hooks = default.classvar_hooks.clone();
    let mut end = Expr::new(TokenKind::DefaultEnd, ret, lifted).with("value", value);
    end.classvar_hooks = default.classvar_hooks;
    exprs.insert(0, start);
    exprs.push(end);
}

fn last_ret(exprs: &[Expr]) -> VariableType {
    exprs
        .iter()
        .rev()
        .find(|e| e.kind != TokenKind::Default)
        .map(|e| e.ret_type)
        .unwrap_or(VariableType::Document)
}

fn css_kind_to_xpath(kind: TokenKind) -> Option<TokenKind> {
    match kind {
        TokenKind::Css => Some(TokenKind::Xpath),
        TokenKind::CssAll => Some(TokenKind::XpathAll),
        TokenKind::IsCss => Some(TokenKind::IsXpath),
        _ => None,
    }
}

fn xpath_kind_to_css(kind: TokenKind) -> Option<TokenKind> {
    match kind {
        TokenKind::Xpath => Some(TokenKind::Css),
        TokenKind::XpathAll => Some(TokenKind::CssAll),
        TokenKind::IsXpath => Some(TokenKind::IsCss),
        _ => None,
    }
}

// ------------------------------- Emission --------------------------------- //

fn push_json_struct(module: &mut Module, st: &JsonStruct) {
    let node = NodeData::new(TokenKind::JsonStruct).with("name", st.name.as_str()).with("is_array", st.is_array);
    let id = module.push(Module::ROOT, node);
    for (name, ty) in &st.fields {
        let field = NodeData::new(TokenKind::JsonField)
            .with("name", name.as_str())
            .with("type", ty.tag())
            .with("json_type", ty.kind().name())
            .with("ref", ty.struct_ref().map(|r| json!(r)).unwrap_or(Value::Null));
        module.push(id, field);
    }
}

fn push_typedef(module: &mut Module, plan: &StructPlan) {
    let node = NodeData::new(TokenKind::Typedef)
        .with("name", plan.name.as_str())
        .with("struct_type", json!(plan.kind));
    let id = module.push(Module::ROOT, node);
    for (name, value, returned) in &plan.classvars {
        if !returned {
            continue;
        }
        let ty = literal_type(value);
        let field = NodeData::new(TokenKind::TypedefField)
            .with("name", name.as_str())
            .with("type", ty.name())
            .with("cls_nested", Value::Null)
            .with("cls_nested_type", Value::Null)
            .typed(ty, ty);
        module.push(id, field);
    }
    for field in &plan.fields {
        let (cls, cls_kind) = match &field.nested {
            Some((name, kind)) => (json!(name), json!(kind)),
            None => (Value::Null, Value::Null),
        };
        let node = NodeData::new(TokenKind::TypedefField)
            .with("name", field.name.as_str())
            .with("type", field.ret_type.name())
            .with("cls_nested", cls)
            .with("cls_nested_type", cls_kind)
            .typed(field.ret_type, field.ret_type);
        module.push(id, node);
    }
}

fn push_struct(module: &mut Module, plan: &StructPlan) {
    let node = NodeData::new(TokenKind::Struct)
        .with("name", plan.name.as_str())
        .with("struct_type", json!(plan.kind))
        .with("docstring", plan.docstring.as_str());
    let st = module.push(Module::ROOT, node);
    for (name, value, returned) in &plan.classvars {
        let ty = literal_type(value);
        let node = NodeData::new(TokenKind::Classvar)
            .with("struct_name", plan.name.as_str())
            .with("name", name.as_str())
            .with("value", value.clone())
            .with("returned", *returned)
            .typed(ty, ty);
        module.push(st, node);
    }
    if plan.kind == StructType::ConfigClassvars {
        return;
    }
    module.push(st, NodeData::new(TokenKind::StructInit).with("name", plan.name.as_str()));

    let mut calls: Vec<NodeData> = Vec::new();
    if let Some(exprs) = &plan.pre_validate {
        push_method(module, st, NodeData::new(TokenKind::StructPreValidate).with("name", PRE_VALIDATE), exprs);
        calls.push(call_method(PRE_VALIDATE, VariableType::Null));
    }
    if let Some(exprs) = &plan.split_doc {
        let method = NodeData::new(TokenKind::StructPartDoc)
            .with("name", SPLIT_DOC)
            .typed(VariableType::Document, VariableType::ListDocument);
        push_method(module, st, method, exprs);
        calls.push(call_method(SPLIT_DOC, VariableType::ListDocument));
    }
    for (name, value, returned) in &plan.classvars {
        if *returned {
            let ty = literal_type(value);
            calls.push(
                NodeData::new(TokenKind::CallStructClassvar)
                    .with("struct_name", plan.name.as_str())
                    .with("name", name.as_str())
                    .typed(ty, ty),
            );
        }
    }
    for field in &plan.fields {
        let method = NodeData::new(TokenKind::StructField)
            .with("name", field.name.as_str())
            .typed(VariableType::Document, field.ret_type);
        push_method(module, st, method, &field.exprs);
        calls.push(call_method(&field.name, field.ret_type));
    }

    let start = module.push(
        st,
        NodeData::new(TokenKind::StartParse)
            .with("name", plan.name.as_str())
            .with("struct_type", json!(plan.kind)),
    );
    for call in calls {
        module.push(start, call);
    }
}

fn push_method(module: &mut Module, st: NodeId, method: NodeData, exprs: &[Expr]) {
    let id = module.push(st, method);
    for expr in exprs {
        module.push_expr(id, expr);
    }
}

fn call_method(name: &str, ty: VariableType) -> NodeData {
    NodeData::new(TokenKind::CallStructMethod).with("name", name).with("type", ty.name()).typed(ty, ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Filter;
    use crate::tokens::{ITEM, KEY, VALUE};

    fn books() -> SchemaRegistry {
        let mut reg = SchemaRegistry::new();
        reg.docstring = Some("books to scrape".into());
        reg.insert(
            Schema::new("Books", StructType::List)
                .doc("Catalogue cards")
                .returned_classvar("SOURCE", "books")
                .field(SPLIT_DOC, Document::new().css_all(".col-lg-3"))
                .field("name", Document::new().css(".thumbnail").attr("alt"))
                .field("price", Document::new().default(Value::Null).css(".price_color").text().re(r"(\d+)")),
        )
        .unwrap();
        reg
    }

    fn kinds(module: &Module, id: NodeId) -> Vec<TokenKind> {
        module.node(id).children().map(|c| c.kind()).collect()
    }

    #[test]
    fn module_layout() {
        let module = build(&books(), BuildOptions { gen_docstring: true, ..BuildOptions::default() }).unwrap();
        use TokenKind::*;
        assert_eq!(
            kinds(&module, crate::ast::Module::ROOT),
            vec![Docstring, Imports, TransformImports, Utilities, CodeStart, Typedef, Struct, CodeEnd]
        );
        let st = module.root().find_child(Struct).unwrap();
        assert_eq!(kinds(&module, st.id()), vec![Classvar, StructInit, StructPartDoc, StructField, StructField, StartParse]);
        let docstring = st.kwarg_str("docstring").unwrap();
        assert!(docstring.starts_with("Catalogue cards\n\n["));
        assert!(docstring.contains("\"price\": \"String | null\""));
    }

    #[test]
    fn default_is_unfolded_and_lifted() {
        let module = build(&books(), BuildOptions::default()).unwrap();
        let st = module.root().find_child(TokenKind::Struct).unwrap();
        let price = st.children().find(|c| c.kwarg_str("name") == Some("price")).unwrap();
        let body: Vec<TokenKind> = price.children().map(|c| c.kind()).collect();
        use TokenKind::*;
        assert_eq!(body, vec![DefaultStart, Css, Text, Regex, Return, DefaultEnd]);
        assert_eq!(price.ret_type(), VariableType::OptionalString);
        assert_eq!(price.last_child().unwrap().ret_type(), VariableType::OptionalString);
        assert_eq!(price.child(4).unwrap().ret_type(), VariableType::String);
        assert_eq!(st.kwarg_str("docstring"), Some(""));
    }

    #[test]
    fn start_parse_call_order() {
        let mut reg = books();
        reg.insert(
            Schema::new("Guarded", StructType::Item)
                .field("title", Document::new().css("h1").text())
                .field(PRE_VALIDATE, Document::new().is_css("h1", "no title")),
        )
        .unwrap();
        let module = build(&reg, BuildOptions::default()).unwrap();
        let guarded = module.root().children().find(|c| c.kind() == TokenKind::Struct && c.kwarg_str("name") == Some("Guarded")).unwrap();
        let start = guarded.find_child(TokenKind::StartParse).unwrap();
        let names: Vec<&str> = start.children().filter_map(|c| c.kwarg_str("name")).collect();
        assert_eq!(names, vec![PRE_VALIDATE, "title"]);
        let pre = guarded.find_child(TokenKind::StructPreValidate).unwrap();
        assert_eq!(pre.last_child().unwrap().kind(), TokenKind::NoReturn);

        let books = module.root().find_child(TokenKind::Struct).unwrap();
        let calls: Vec<TokenKind> = books.find_child(TokenKind::StartParse).unwrap().children().map(|c| c.kind()).collect();
        assert_eq!(calls, vec![TokenKind::CallStructMethod, TokenKind::CallStructClassvar, TokenKind::CallStructMethod, TokenKind::CallStructMethod]);
    }

    #[test]
    fn typedef_carries_nested_and_classvar_fields() {
        let mut reg = books();
        reg.insert_json_struct(JsonStruct::new("Meta", true).field("id", "number"));
        reg.insert(
            Schema::new("Page", StructType::Item)
                .field("books", Document::new().css("main").sub_parser("Books"))
                .field("meta", Document::new().css("script").text().jsonify("Meta", "")),
        )
        .unwrap();
        let module = build(&reg, BuildOptions::default()).unwrap();
        let typedef = module.root().children().find(|c| c.kind() == TokenKind::Typedef && c.kwarg_str("name") == Some("Page")).unwrap();
        let books = typedef.child(0).unwrap();
        assert_eq!(books.kwarg_str("cls_nested"), Some("Books"));
        assert_eq!(books.kwarg_str("cls_nested_type"), Some("list"));
        let meta = typedef.child(1).unwrap();
        assert_eq!(meta.kwarg_str("cls_nested_type"), Some("list"));
        assert_eq!(meta.ret_type(), VariableType::Json);

        let books_td = module.root().find_child(TokenKind::Typedef).unwrap();
        assert_eq!(books_td.child(0).unwrap().kwarg_str("name"), Some("SOURCE"));
        assert!(module.root().find_child(TokenKind::JsonStruct).is_some());
    }

    #[test]
    fn selectors_are_translated() {
        let mut reg = SchemaRegistry::new();
        reg.insert(Schema::new("A", StructType::Item).field("t", Document::new().css("div > a").text())).unwrap();
        let module = build(&reg, BuildOptions { css_to_xpath: true, ..Default::default() }).unwrap();
        let sel = module.walk().into_iter().find(|n| n.kind() == TokenKind::Xpath).unwrap();
        assert_eq!(sel.kwarg_str("query"), Some("descendant-or-self::div/a"));
        let opts = BuildOptions { css_to_xpath: true, xpath_to_css: true, ..Default::default() };
        assert!(matches!(build(&reg, opts), Err(BuildError::ConflictingOptions)));
    }

    #[test]
    fn magic_fields_and_config_structs() {
        let mut reg = SchemaRegistry::new();
        reg.insert(Schema::new("Cfg", StructType::Item).classvar("URL", "https://x.test")).unwrap();
        reg.insert(
            Schema::new("Links", StructType::Dict)
                .field(SPLIT_DOC, Document::new().css_all("a"))
                .field(KEY, Document::new().text())
                .field(VALUE, Document::new().attr("href")),
        )
        .unwrap();
        reg.insert(
            Schema::new("Tags", StructType::FlatList)
                .field(SPLIT_DOC, Document::new().css_all("li"))
                .field(ITEM, Document::new().text()),
        )
        .unwrap();
        let module = build(&reg, BuildOptions::default()).unwrap();
        let typedefs: Vec<&str> = module
            .root()
            .children()
            .filter(|c| c.kind() == TokenKind::Typedef)
            .filter_map(|c| c.kwarg_str("name"))
            .collect();
        assert_eq!(typedefs, vec!["Links", "Tags"]);
        let cfg = module.root().find_child(TokenKind::Struct).unwrap();
        assert_eq!(cfg.kwarg_str("struct_type"), Some("config_classvars"));
        assert_eq!(kinds(&module, cfg.id()), vec![TokenKind::Classvar]);
    }

    #[test]
    fn filter_body_is_attached() {
        let mut reg = SchemaRegistry::new();
        reg.insert(
            Schema::new("A", StructType::Item).field(
                "links",
                Document::new().css_all("a").attr("href").filter(Filter::not(Filter::starts_with(&["#"]))),
            ),
        )
        .unwrap();
        let module = build(&reg, BuildOptions::default()).unwrap();
        let filter = module.walk().into_iter().find(|n| n.kind() == TokenKind::Filter).unwrap();
        let not = filter.child(0).unwrap();
        assert_eq!(not.kind(), TokenKind::FilterNot);
        assert_eq!(not.child(0).unwrap().kind(), TokenKind::FilterStarts);
    }
}
