//! Checks on the shape of a whole schema.
use super::{Diagnostic, SchemaContext};
use crate::document::Expr;
use crate::tokens::{ITEM, KEY, PRE_VALIDATE, SPLIT_DOC, StructType, TokenKind, VALUE, VariableType};

const CLASSVAR_TIP: &str = "reference class variables as `<Schema>.<FIELD>`, e.g. {\"$ref\": \"Books.BASE_URL\"}";

fn unnecessary_fields(cx: &SchemaContext<'_>, kind: StructType, allowed: &[&str]) -> Vec<Diagnostic> {
    if cx.schema.kind != kind {
        return Vec::new();
    }
    let extra: Vec<&str> = cx
        .schema
        .fields
        .keys()
        .map(String::as_str)
        .filter(|name| !allowed.contains(name))
        .collect();
    if extra.is_empty() {
        return Vec::new();
    }
    let message = format!("{} ({kind}) unnecessary fields (remove required): `{}`", cx.schema.name, extra.join(", "));
    let mut diagnostic = cx.error(message);
    diagnostic.lineno = extra.first().and_then(|name| cx.schema.line_of(name));
    vec![diagnostic]
}

pub fn check_dict_fields(cx: &SchemaContext<'_>) -> Vec<Diagnostic> {
    unnecessary_fields(cx, StructType::Dict, &[SPLIT_DOC, PRE_VALIDATE, KEY, VALUE])
}

pub fn check_flat_list_fields(cx: &SchemaContext<'_>) -> Vec<Diagnostic> {
    unnecessary_fields(cx, StructType::FlatList, &[SPLIT_DOC, PRE_VALIDATE, ITEM])
}

pub fn check_acc_list(cx: &SchemaContext<'_>) -> Vec<Diagnostic> {
    if cx.schema.kind != StructType::AccList {
        return Vec::new();
    }
    cx.schema
        .user_fields()
        .filter(|(_, doc)| doc.cursor() != VariableType::ListString)
        .map(|(name, doc)| {
            let message = format!(
                "{}.{name} expected type(s) {}, got {}",
                cx.schema.name,
                VariableType::ListString,
                doc.cursor()
            );
            cx.field_error(name, message)
        })
        .collect()
}

fn missing_field(cx: &SchemaContext<'_>, kinds: &[StructType], field: &str) -> Vec<Diagnostic> {
    if !kinds.contains(&cx.schema.kind) || cx.schema.fields.contains_key(field) {
        return Vec::new();
    }
    vec![cx.error(format!("{} missing {field} field", cx.schema.name))]
}

pub fn check_split_doc_field(cx: &SchemaContext<'_>) -> Vec<Diagnostic> {
    missing_field(cx, &[StructType::List, StructType::Dict, StructType::FlatList], SPLIT_DOC)
}

pub fn check_key_field(cx: &SchemaContext<'_>) -> Vec<Diagnostic> {
    missing_field(cx, &[StructType::Dict], KEY)
}

pub fn check_value_field(cx: &SchemaContext<'_>) -> Vec<Diagnostic> {
    missing_field(cx, &[StructType::Dict], VALUE)
}

pub fn check_item_field(cx: &SchemaContext<'_>) -> Vec<Diagnostic> {
    missing_field(cx, &[StructType::FlatList], ITEM)
}

fn walk_exprs<'a>(exprs: &'a [Expr], out: &mut Vec<&'a Expr>) {
    for expr in exprs {
        out.push(expr);
        walk_exprs(&expr.body, out);
    }
}

/// Hooks must be qualified and point at an existing class variable.
pub fn check_classvar_refs(cx: &SchemaContext<'_>) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for (name, doc) in &cx.schema.fields {
        let mut exprs = Vec::new();
        walk_exprs(doc.stack(), &mut exprs);
        for expr in exprs {
            for (param, target) in &expr.classvar_hooks {
                let Some((schema, field)) = target.split() else {
                    let message = format!(
                        "{}.{name}: {}({param}=`{target}`) classvar missing struct_name and struct_field",
                        cx.schema.name,
                        expr.kind.method_name()
                    );
                    out.push(cx.field_error(name, message).with_tip(CLASSVAR_TIP));
                    continue;
                };
                let found = cx.lookup(schema).is_some_and(|s| s.classvars.contains_key(field));
                if !found {
                    let message = format!("{}.{name}: classvar `{target}` is not defined", cx.schema.name);
                    out.push(cx.field_error(name, message).with_tip(CLASSVAR_TIP));
                }
            }
        }
    }
    out
}

/// `sub_parser` and `jsonify` targets must be registered.
pub fn check_registry_refs(cx: &SchemaContext<'_>) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for (name, doc) in &cx.schema.fields {
        for expr in doc.stack() {
            match expr.kind {
                TokenKind::Nested => {
                    let target = expr.kwarg_str("schema_name").unwrap_or_default();
                    match cx.lookup(target) {
                        None => {
                            let message = format!("{}.{name}: sub_parser schema `{target}` is not registered", cx.schema.name);
                            out.push(cx.field_error(name, message).with_method("sub_parser"));
                        }
                        Some(nested) if nested.kind == StructType::ConfigClassvars => {
                            let message = format!("{}.{name}: `{target}` holds literals only and cannot parse", cx.schema.name);
                            out.push(cx.field_error(name, message).with_method("sub_parser"));
                        }
                        Some(_) => {}
                    }
                }
                TokenKind::Jsonify => {
                    let target = expr.kwarg_str("json_struct").unwrap_or_default();
                    if cx.registry.json_struct(target).is_none() {
                        let message = format!("{}.{name}: json struct `{target}` is not declared", cx.schema.name);
                        out.push(cx.field_error(name, message).with_method("jsonify"));
                    }
                }
                _ => {}
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use crate::analyzer::analyze;
    use crate::document::Document;
    use crate::schema::{Schema, SchemaRegistry};
    use crate::tokens::{ITEM, KEY, SPLIT_DOC, StructType, VALUE};

    fn messages(reg: &SchemaRegistry) -> Vec<String> {
        analyze(reg).into_iter().map(|d| d.message).collect()
    }

    #[test]
    fn dict_with_extra_field() {
        let mut reg = SchemaRegistry::new();
        reg.insert(
            Schema::new("Links", StructType::Dict)
                .field(SPLIT_DOC, Document::new().css_all("a"))
                .field(KEY, Document::new().text())
                .field(VALUE, Document::new().attr("href"))
                .field("extra_name", Document::new().text()),
        )
        .unwrap();
        let msgs = messages(&reg);
        assert!(msgs.contains(&"Links (DICT) unnecessary fields (remove required): `extra_name`".to_string()), "{msgs:?}");
    }

    #[test]
    fn missing_magic_fields() {
        let mut reg = SchemaRegistry::new();
        reg.insert(Schema::new("Links", StructType::Dict).field(KEY, Document::new().css("a").text())).unwrap();
        reg.insert(Schema::new("Tags", StructType::FlatList).field(SPLIT_DOC, Document::new().css_all("li"))).unwrap();
        let msgs = messages(&reg);
        assert!(msgs.contains(&"Links missing __SPLIT_DOC__ field".to_string()));
        assert!(msgs.contains(&"Links missing __VALUE__ field".to_string()));
        assert!(msgs.contains(&format!("Tags missing {ITEM} field")));
    }

    #[test]
    fn acc_list_fields_must_be_string_lists() {
        let mut reg = SchemaRegistry::new();
        reg.insert(
            Schema::new("Acc", StructType::AccList)
                .field("a", Document::new().css_all("a").attr("href"))
                .field("b", Document::new().css("b").text()),
        )
        .unwrap();
        assert_eq!(messages(&reg), vec!["Acc.b expected type(s) LIST_STRING, got STRING".to_string()]);
    }

    #[test]
    fn classvar_and_registry_refs() {
        let mut reg = SchemaRegistry::new();
        reg.insert(
            Schema::new("Page", StructType::Item)
                .classvar("URL", "https://x.test/{{}}")
                .field("ok", Document::new().css("a").attr("href").format("https://x.test/{{}}").hook("fmt", "Page.URL"))
                .field("bare", Document::new().css("a").attr("href").format("{{}}").hook("fmt", "URL"))
                .field("ghost", Document::new().css("a").attr("href").format("{{}}").hook("fmt", "Page.NOPE"))
                .field("nested", Document::new().css("div").sub_parser("Nope"))
                .field("meta", Document::new().css("script").text().jsonify("Meta", "")),
        )
        .unwrap();
        let msgs = messages(&reg);
        assert!(msgs.iter().any(|m| m.starts_with("Page.bare: format(fmt=`URL`) classvar missing")), "{msgs:?}");
        assert!(msgs.iter().any(|m| m == "Page.ghost: classvar `Page.NOPE` is not defined"));
        assert!(msgs.iter().any(|m| m == "Page.nested: sub_parser schema `Nope` is not registered"));
        assert!(msgs.iter().any(|m| m == "Page.meta: json struct `Meta` is not declared"));
        assert!(!msgs.iter().any(|m| m.starts_with("Page.ok")));
    }
}
