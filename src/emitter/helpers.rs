//! Node queries shared by the target callbacks.
use serde_json::Value;

use super::EmitError;
use crate::ast::{NodeRef, struct_type_kwarg};
use crate::tokens::{ITEM, KEY, PRE_VALIDATE, StructType, TokenKind, VALUE, VariableType};

/// Input and output variable of an operation inside a method body.
pub fn prev_next_var(node: &NodeRef<'_>) -> (String, String) {
    match node.index() {
        0 => ("v".to_string(), "v0".to_string()),
        i => (format!("v{}", i - 1), format!("v{i}")),
    }
}

/// The enclosing method body starts with a default wrapper.
pub fn have_default_expr(node: &NodeRef<'_>) -> bool {
    node.method()
        .and_then(|m| m.child(0))
        .is_some_and(|first| first.kind() == TokenKind::DefaultStart)
}

/// The next node ends the method without a value.
pub fn is_last_var_no_ret(node: &NodeRef<'_>) -> bool {
    node.next().is_some_and(|n| n.kind() == TokenKind::NoReturn)
}

pub fn is_pre_validate_parent(node: &NodeRef<'_>) -> bool {
    node.parent().is_some_and(|p| p.kind() == TokenKind::StructPreValidate)
}

/// `StartParse` calls the pre-validation method first.
pub fn have_pre_validate_call(node: &NodeRef<'_>) -> bool {
    node.children()
        .any(|c| c.kind() == TokenKind::CallStructMethod && c.kwarg_str("name") == Some(PRE_VALIDATE))
}

/// Return type of the enclosing method body.
pub fn get_last_ret_type(node: &NodeRef<'_>) -> VariableType {
    node.method()
        .and_then(|m| m.last_child())
        .map(|n| n.ret_type())
        .unwrap_or(VariableType::Any)
}

/// What a field method hands back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape<'a> {
    Nested { schema: &'a str, kind: StructType },
    Json { name: &'a str, is_array: bool },
    Value(VariableType),
}

pub fn return_shape<'a>(method: &NodeRef<'a>) -> ReturnShape<'a> {
    match method.ret_type() {
        VariableType::Nested => {
            let nested = method.find_child(TokenKind::Nested);
            ReturnShape::Nested {
                schema: nested.and_then(|n| n.kwarg_str("schema_name")).unwrap_or_default(),
                kind: nested
                    .and_then(|n| n.kwarg("schema_type"))
                    .and_then(struct_type_kwarg)
                    .unwrap_or(StructType::Item),
            }
        }
        VariableType::Json => {
            let jsonify = method.find_child(TokenKind::Jsonify);
            ReturnShape::Json {
                name: jsonify.and_then(|n| n.kwarg_str("json_struct")).unwrap_or_default(),
                is_array: jsonify.is_some_and(|n| n.kwarg_bool("is_array")),
            }
        }
        ty => ReturnShape::Value(ty),
    }
}

/// Typedef field shape: nested schema, JSON struct or plain value.
pub fn typedef_field_shape<'a>(field: &NodeRef<'a>) -> ReturnShape<'a> {
    let cls = field.kwarg_str("cls_nested").unwrap_or_default();
    let kind = field
        .kwarg("cls_nested_type")
        .and_then(struct_type_kwarg)
        .unwrap_or(StructType::Item);
    match field.ret_type() {
        VariableType::Nested => ReturnShape::Nested { schema: cls, kind },
        VariableType::Json => ReturnShape::Json { name: cls, is_array: kind == StructType::List },
        ty => ReturnShape::Value(ty),
    }
}

/// Short method name for magic fields.
pub fn method_suffix(name: &str) -> &str {
    match name {
        KEY => "key",
        VALUE => "value",
        ITEM => "item",
        other => other,
    }
}

/// Typedef field by name, e.g. `__VALUE__` of a DICT schema.
pub fn typedef_field<'a>(typedef: &NodeRef<'a>, name: &str) -> Option<NodeRef<'a>> {
    typedef.children().find(|f| f.kwarg_str("name") == Some(name))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonPathPart<'a> {
    Key(&'a str),
    Index(u64),
}

/// Split a dotted `jsonify` query; all-digit parts are array indices.
pub fn jsonify_query_parse(query: &str) -> Vec<JsonPathPart<'_>> {
    query
        .split('.')
        .filter(|part| !part.is_empty())
        .map(|part| match part.parse::<u64>() {
            Ok(i) if part.bytes().all(|b| b.is_ascii_digit()) => JsonPathPart::Index(i),
            _ => JsonPathPart::Key(part),
        })
        .collect()
}

/// Separator before a condition under an `and`/`or` combinator; empty for
/// the first one.
pub fn filter_sep(node: &NodeRef<'_>, and: &'static str, or: &'static str) -> &'static str {
    if node.index() == 0 {
        return "";
    }
    match node.parent().map(|p| p.kind()) {
        Some(TokenKind::FilterAnd) => and,
        Some(TokenKind::FilterOr) => or,
        _ => "",
    }
}

// -------------------------------- kwargs ---------------------------------- //

pub fn kwarg<'a>(node: &NodeRef<'a>, key: &str) -> Result<&'a Value, EmitError> {
    node.kwarg(key)
        .ok_or_else(|| EmitError::MissingKwarg { kind: node.kind(), key: key.to_string() })
}

pub fn kwarg_str<'a>(node: &NodeRef<'a>, key: &str) -> Result<&'a str, EmitError> {
    kwarg(node, key)?
        .as_str()
        .ok_or_else(|| EmitError::MissingKwarg { kind: node.kind(), key: key.to_string() })
}

pub fn kwarg_i64(node: &NodeRef<'_>, key: &str) -> Result<i64, EmitError> {
    kwarg(node, key)?
        .as_i64()
        .ok_or_else(|| EmitError::MissingKwarg { kind: node.kind(), key: key.to_string() })
}

/// Render `key` either as a classvar reference or as a literal.
pub fn hook_or_value(
    node: &NodeRef<'_>,
    key: &str,
    hook: impl Fn(&str, &str) -> String,
    literal: impl Fn(&Value) -> String,
) -> Result<String, EmitError> {
    let value = kwarg(node, key)?;
    match node.classvar_hook(key).and_then(|h| h.split()) {
        Some((schema, field)) => Ok(hook(schema, field)),
        None => Ok(literal(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Module, NodeData};
    use crate::ast_build::{BuildOptions, build};
    use crate::document::Document;
    use crate::schema::{Schema, SchemaRegistry};
    use crate::tokens::SPLIT_DOC;

    fn module() -> Module {
        let mut reg = SchemaRegistry::new();
        reg.insert(
            Schema::new("Books", StructType::List)
                .classvar("URL", "https://x.test")
                .field(PRE_VALIDATE, Document::new().is_css("div", "no div"))
                .field(SPLIT_DOC, Document::new().css_all(".book"))
                .field("price", Document::new().default("0").css(".price").text())
                .field("name", Document::new().css("a").attr("title").rm_prefix("x").hook("substr", "Books.URL")),
        )
        .unwrap();
        build(&reg, BuildOptions::default()).unwrap()
    }

    fn field<'a>(m: &'a Module, name: &str) -> NodeRef<'a> {
        m.walk()
            .into_iter()
            .find(|n| n.kind() == TokenKind::StructField && n.kwarg_str("name") == Some(name))
            .unwrap()
    }

    #[test]
    fn variable_numbering_follows_position() {
        let m = module();
        let price = field(&m, "price");
        let names: Vec<(String, String)> = price.children().map(|n| prev_next_var(&n)).collect();
        assert_eq!(names[0], ("v".to_string(), "v0".to_string()));
        assert_eq!(names[2], ("v1".to_string(), "v2".to_string()));
        assert!(price.children().all(|n| have_default_expr(&n)));
        assert_eq!(get_last_ret_type(&price.child(1).unwrap()), VariableType::String);
        assert!(!have_default_expr(&field(&m, "name").child(0).unwrap()));
    }

    #[test]
    fn pre_validate_queries() {
        let m = module();
        let pre = m.walk().into_iter().find(|n| n.kind() == TokenKind::StructPreValidate).unwrap();
        let assert_node = pre.child(0).unwrap();
        assert!(is_last_var_no_ret(&assert_node));
        assert!(is_pre_validate_parent(&assert_node));
        let start = m.walk().into_iter().find(|n| n.kind() == TokenKind::StartParse).unwrap();
        assert!(have_pre_validate_call(&start));
    }

    #[test]
    fn hooks_and_missing_kwargs() {
        let m = module();
        let rm = field(&m, "name").child(2).unwrap();
        let rendered = hook_or_value(&rm, "substr", |s, f| format!("{s}.{f}"), |v| v.to_string()).unwrap();
        assert_eq!(rendered, "Books.URL");
        assert_eq!(
            kwarg_str(&rm, "nope"),
            Err(EmitError::MissingKwarg { kind: TokenKind::RmPrefix, key: "nope".into() })
        );
    }

    #[test]
    fn json_query_parts() {
        assert_eq!(
            jsonify_query_parse("data.items.0.id"),
            vec![
                JsonPathPart::Key("data"),
                JsonPathPart::Key("items"),
                JsonPathPart::Index(0),
                JsonPathPart::Key("id")
            ]
        );
        assert!(jsonify_query_parse("").is_empty());
    }

    #[test]
    fn separators_only_between_conditions() {
        let mut m = Module::new();
        let and = m.push(Module::ROOT, NodeData::new(TokenKind::FilterAnd));
        let a = m.push(and, NodeData::new(TokenKind::FilterEq));
        let b = m.push(and, NodeData::new(TokenKind::FilterNe));
        assert_eq!(filter_sep(&m.node(a), " and ", " or "), "");
        assert_eq!(filter_sep(&m.node(b), " and ", " or "), " and ");
        assert_eq!(method_suffix(KEY), "key");
        assert_eq!(method_suffix("title"), "title");
    }
}
