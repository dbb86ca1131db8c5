//! Dart target over `package:html`.
//!
//! Schemas become classes with a `parse()` method returning records;
//! defaults are `try`/`catch` blocks.
use serde_json::Value;

use super::templates::{DART_HELPERS, DART_IMPORTS};
use crate::ast::NodeRef;
use crate::emitter::helpers::{
    JsonPathPart, ReturnShape, filter_sep, have_default_expr, have_pre_validate_call, hook_or_value, is_last_var_no_ret,
    jsonify_query_parse, kwarg, kwarg_i64, kwarg_str, method_suffix, prev_next_var, return_shape, typedef_field,
    typedef_field_shape,
};
use crate::emitter::{Converter, EmitError};
use crate::str_utils::{dart_raw_string, to_upper_camel_case, wrap_dart_string};
use crate::tokens::{ITEM, KEY, PRE_VALIDATE, SPLIT_DOC, StructType, TokenKind, VALUE, VariableType};

type Out = Result<String, EmitError>;

pub const NAME: &str = "dart::html";

pub fn converter() -> Converter {
    use TokenKind::*;
    let mut conv = Converter::new(NAME, "// ");
    conv.pre(Module, empty)
        .pre(Docstring, |n| Ok(doc_lines(kwarg_str(n, "value")?, "// ")))
        .pre(Imports, |_| Ok(format!("{DART_IMPORTS}\n")))
        .pre(TransformImports, empty)
        .pre(Utilities, |_| Ok(format!("{DART_HELPERS}\n")))
        .pre_many(&[CodeStart, CodeEnd], empty)
        .pre(JsonStruct, |n| Ok(format!("/// JSON document `{}`:", kwarg_str(n, "name")?)))
        .post(JsonStruct, |n| Ok(format!("typedef J{} = Map<String, dynamic>;\n", kwarg_str(n, "name")?)))
        .pre(JsonField, json_field)
        .pre(Typedef, typedef_record)
        .pre_for(Typedef, StructType::Dict, |n| {
            let value = typedef_field(n, VALUE).map(|f| shape_type(typedef_field_shape(&f)));
            alias(n, format!("Map<String, {}>", value.unwrap_or_else(|| "dynamic".into())))
        })
        .pre_for(Typedef, StructType::FlatList, |n| {
            let item = typedef_field(n, ITEM).map(|f| shape_type(typedef_field_shape(&f)));
            alias(n, format!("List<{}>", item.unwrap_or_else(|| "dynamic".into())))
        })
        .pre_for(Typedef, StructType::AccList, |n| alias(n, "List<String>".into()))
        .pre(TypedefField, empty)
        .pre(Struct, struct_header)
        .post(Struct, |_| Ok("}\n".into()))
        .pre(Classvar, |n| Ok(format!("  static const {} = {};", kwarg_str(n, "name")?, literal(kwarg(n, "value")?))))
        .pre(StructInit, init)
        .pre(StructPreValidate, |_| Ok(format!("  void {}(Element v) {{", method_name(PRE_VALIDATE))))
        .pre(StructPartDoc, |_| Ok(format!("  List<Element> {}(Element v) {{", method_name(SPLIT_DOC))))
        .pre(StructField, |n| {
            let ret = shape_type(return_shape(n));
            Ok(format!("  {ret} {}(Element v) {{", method_name(kwarg_str(n, "name")?)))
        })
        .post_many(&[StructPreValidate, StructPartDoc, StructField], |_| Ok("  }\n".into()))
        .pre(StartParse, start_parse_header)
        .post(StartParse, start_parse_item)
        .post_for(StartParse, StructType::List, start_parse_list)
        .post_for(StartParse, StructType::Dict, start_parse_dict)
        .post_for(StartParse, StructType::FlatList, start_parse_flat_list)
        .post_for(StartParse, StructType::AccList, start_parse_acc_list)
        .pre_many(&[CallStructMethod, CallStructClassvar], empty)
        .pre(DefaultStart, |n| {
            let (prv, nxt) = prev_next_var(n);
            Ok(format!("{BODY}final {nxt} = {prv};\n{BODY}try {{"))
        })
        .pre(DefaultEnd, |n| {
            let value = hooked(n, "value")?;
            Ok(format!("{BODY}}} catch (_) {{\n{DEFAULT_BODY}return {value};\n{BODY}}}"))
        })
        .pre(Return, |n| Ok(format!("{}return {};", indent(n), prev_next_var(n).0)))
        .pre(NoReturn, |n| Ok(format!("{}return;", indent(n))))
        .pre(Nested, |n| {
            let schema = kwarg_str(n, "schema_name")?;
            assign(n, |p| format!("{schema}.fromElement({p}).parse()"))
        })
        .unsupported(&[Xpath, XpathAll, IsXpath]);
    register_selectors(&mut conv);
    register_strings(&mut conv);
    register_lists(&mut conv);
    register_checks(&mut conv);
    register_filters(&mut conv);
    conv
}

// ------------------------------ Formatting -------------------------------- //

const BODY: &str = "    ";
const DEFAULT_BODY: &str = "      ";

fn indent(node: &NodeRef<'_>) -> &'static str {
    if have_default_expr(node) { DEFAULT_BODY } else { BODY }
}

fn assign(node: &NodeRef<'_>, expr: impl FnOnce(&str) -> String) -> Out {
    let (prv, nxt) = prev_next_var(node);
    Ok(format!("{}final {nxt} = {};", indent(node), expr(&prv)))
}

fn assertion(node: &NodeRef<'_>, cond: impl FnOnce(&str) -> String) -> Out {
    let (prv, nxt) = prev_next_var(node);
    let msg = wrap_dart_string(kwarg_str(node, "msg")?);
    let ind = indent(node);
    let mut code = format!("{ind}if (!({})) throw Exception({msg});", cond(&prv));
    if !is_last_var_no_ret(node) {
        code.push_str(&format!("\n{ind}final {nxt} = {prv};"));
    }
    Ok(code)
}

fn map_or_apply(node: &NodeRef<'_>, is_list: bool, call: impl Fn(&str) -> String) -> Out {
    if is_list {
        assign(node, |p| format!("{p}.map((i) => {}).toList()", call("i")))
    } else {
        assign(node, |p| call(p))
    }
}

fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => wrap_dart_string(s),
        Value::Array(items) => format!("[{}]", items.iter().map(literal).collect::<Vec<_>>().join(", ")),
        other => other.to_string(),
    }
}

fn string_list(items: &[&str]) -> String {
    format!("[{}]", items.iter().map(|s| wrap_dart_string(s)).collect::<Vec<_>>().join(", "))
}

fn hook(schema: &str, field: &str) -> String {
    format!("{schema}.{field}")
}

fn hooked(node: &NodeRef<'_>, key: &str) -> Out {
    hook_or_value(node, key, hook, literal)
}

/// `RegExp(...)` with the node's flags as named arguments.
fn regex(node: &NodeRef<'_>) -> Out {
    let mut opts = String::new();
    if node.kwarg_bool("ignore_case") {
        opts.push_str(", caseSensitive: false");
    }
    if node.kwarg_bool("dotall") {
        opts.push_str(", dotAll: true");
    }
    let pattern = hook_or_value(node, "pattern", hook, |value| {
        dart_raw_string(&value.as_str().unwrap_or_default().replace("(?P<", "(?<"))
    })?;
    Ok(format!("RegExp({pattern}{opts})"))
}

/// String interpolation with the `{{}}` placeholder bound to `var`.
fn interpolate(fmt: &str, var: &str) -> String {
    wrap_dart_string(fmt).replace("{{}}", &format!("${{{var}}}"))
}

fn doc_lines(doc: &str, prefix: &str) -> String {
    doc.lines().map(|l| format!("{prefix}{l}").trim_end().to_string()).collect::<Vec<_>>().join("\n")
}

fn method_name(field: &str) -> String {
    match field {
        PRE_VALIDATE => "_preValidate".to_string(),
        SPLIT_DOC => "_splitDoc".to_string(),
        other => format!("_parse{}", to_upper_camel_case(method_suffix(other))),
    }
}

fn owner<'a>(node: &NodeRef<'a>) -> Result<&'a str, EmitError> {
    let st = node
        .enclosing_struct()
        .ok_or_else(|| EmitError::MissingKwarg { kind: node.kind(), key: "name".into() })?;
    kwarg_str(&st, "name")
}

fn dart_type(ty: VariableType) -> &'static str {
    use VariableType::*;
    match ty {
        Document => "Element",
        ListDocument => "List<Element>",
        String => "String",
        ListString => "List<String>",
        Int => "int",
        Float => "double",
        ListInt => "List<int>",
        ListFloat => "List<double>",
        Bool => "bool",
        Null => "Null",
        OptionalString => "String?",
        OptionalListString => "List<String>?",
        OptionalInt => "int?",
        OptionalFloat => "double?",
        OptionalListInt => "List<int>?",
        OptionalListFloat => "List<double>?",
        Nested | Json | Any => "dynamic",
        ListAny => "List<dynamic>",
    }
}

fn shape_type(shape: ReturnShape<'_>) -> String {
    match shape {
        ReturnShape::Nested { schema, kind: StructType::List } => format!("List<T{schema}>"),
        ReturnShape::Nested { schema, .. } => format!("T{schema}"),
        ReturnShape::Json { is_array: true, .. } => "List<dynamic>".to_string(),
        ReturnShape::Json { name, .. } => format!("J{name}"),
        ReturnShape::Value(ty) => dart_type(ty).to_string(),
    }
}

fn empty(_: &NodeRef<'_>) -> Out {
    Ok(String::new())
}

// ------------------------------- Typedefs --------------------------------- //

fn json_field(node: &NodeRef<'_>) -> Out {
    let name = kwarg_str(node, "name")?;
    let reference = node.kwarg_str("ref").unwrap_or_default();
    let ty = match kwarg_str(node, "json_type")? {
        "number" | "float" => "num".to_string(),
        "string" => "String".to_string(),
        "boolean" => "bool".to_string(),
        "null" => "Null".to_string(),
        "object" => format!("J{reference}"),
        "array_objects" => format!("List<J{reference}>"),
        "array_number" | "array_float" => "List<num>".to_string(),
        "array_string" => "List<String>".to_string(),
        "array_boolean" => "List<bool>".to_string(),
        "optional_number" | "optional_float" => "num?".to_string(),
        "optional_string" => "String?".to_string(),
        "optional_boolean" => "bool?".to_string(),
        _ => "List<dynamic>".to_string(),
    };
    Ok(format!("/// * `{name}`: `{ty}`"))
}

fn alias(node: &NodeRef<'_>, ty: String) -> Out {
    Ok(format!("typedef T{} = {ty};\n", kwarg_str(node, "name")?))
}

/// Named-field record type; classvars come first, as the AST orders them.
fn typedef_record(node: &NodeRef<'_>) -> Out {
    let name = kwarg_str(node, "name")?;
    let mut fields = Vec::new();
    for field in node.children().filter(|c| c.kind() == TokenKind::TypedefField) {
        fields.push(format!("  {} {},", shape_type(typedef_field_shape(&field)), kwarg_str(&field, "name")?));
    }
    if fields.is_empty() {
        return Ok(format!("typedef T{name} = ();\n"));
    }
    Ok(format!("typedef T{name} = ({{\n{}\n}});\n", fields.join("\n")))
}

// -------------------------------- Structs --------------------------------- //

fn struct_header(node: &NodeRef<'_>) -> Out {
    let name = kwarg_str(node, "name")?;
    match node.kwarg_str("docstring").filter(|d| !d.is_empty()) {
        Some(doc) => Ok(format!("{}\nclass {name} {{", doc_lines(doc, "/// "))),
        None => Ok(format!("class {name} {{")),
    }
}

fn init(node: &NodeRef<'_>) -> Out {
    let name = owner(node)?;
    Ok([
        "  final Element _doc;".to_string(),
        String::new(),
        format!("  {name}(String raw) : _doc = html.parse(raw).documentElement!;"),
        String::new(),
        format!("  {name}.fromElement(this._doc);"),
        String::new(),
    ]
    .join("\n"))
}

fn start_parse_header(node: &NodeRef<'_>) -> Out {
    let name = kwarg_str(node, "name")?;
    let ret = match node.struct_type() {
        Some(StructType::List) => format!("List<T{name}>"),
        _ => format!("T{name}"),
    };
    let mut code = format!("  {ret} parse() {{");
    if have_pre_validate_call(node) {
        code.push_str(&format!("\n{BODY}{}(_doc);", method_name(PRE_VALIDATE)));
    }
    Ok(code)
}

fn parse_entries(node: &NodeRef<'_>, doc: &str) -> Result<Vec<String>, EmitError> {
    let mut entries = Vec::new();
    for call in node.children() {
        let name = kwarg_str(&call, "name")?;
        match call.kind() {
            TokenKind::CallStructClassvar => {
                let owner = kwarg_str(&call, "struct_name")?;
                entries.push(format!("{name}: {owner}.{name}"));
            }
            _ if name == PRE_VALIDATE || name == SPLIT_DOC => {}
            _ => entries.push(format!("{name}: {}({doc})", method_name(name))),
        }
    }
    Ok(entries)
}

fn record_literal(entries: &[String], indent: &str) -> String {
    if entries.is_empty() {
        return "()".into();
    }
    let body: Vec<String> = entries.iter().map(|e| format!("{indent}  {e},")).collect();
    format!("(\n{}\n{indent})", body.join("\n"))
}

fn parts() -> String {
    format!("{}(_doc)", method_name(SPLIT_DOC))
}

fn start_parse_item(node: &NodeRef<'_>) -> Out {
    let entries = parse_entries(node, "_doc")?;
    Ok(format!("{BODY}return {};\n  }}", record_literal(&entries, BODY)))
}

fn start_parse_list(node: &NodeRef<'_>) -> Out {
    let entries = parse_entries(node, "e")?;
    Ok(format!("{BODY}return {}.map((e) => {}).toList();\n  }}", parts(), record_literal(&entries, BODY)))
}

fn start_parse_dict(_: &NodeRef<'_>) -> Out {
    Ok(format!(
        "{BODY}return {{for (final e in {}) {}(e): {}(e)}};\n  }}",
        parts(),
        method_name(KEY),
        method_name(VALUE)
    ))
}

fn start_parse_flat_list(_: &NodeRef<'_>) -> Out {
    Ok(format!("{BODY}return {}.map((e) => {}(e)).toList();\n  }}", parts(), method_name(ITEM)))
}

fn start_parse_acc_list(node: &NodeRef<'_>) -> Out {
    let spreads: Vec<String> = node
        .children()
        .filter(|c| c.kind() == TokenKind::CallStructMethod)
        .filter_map(|c| c.kwarg_str("name"))
        .filter(|name| *name != PRE_VALIDATE)
        .map(|name| format!("...{}(_doc)", method_name(name)))
        .collect();
    if spreads.is_empty() {
        return Ok(format!("{BODY}return <String>[];\n  }}"));
    }
    Ok(format!("{BODY}return <String>{{{}}}.toList();\n  }}", spreads.join(", ")))
}

// ------------------------------- Selectors -------------------------------- //

fn register_selectors(conv: &mut Converter) {
    use TokenKind::*;
    conv.pre(Css, |n| query(n, |p, q| format!("sscCss({p}, {q})")))
        .pre(CssAll, |n| query(n, |p, q| format!("{p}.querySelectorAll({q})")))
        .pre(Attr, attr)
        .pre(AttrAll, |n| {
            let keys = string_list(&n.kwarg_strings("key"));
            assign(n, |p| format!("[for (final e in {p}) ...sscAttrs(e, {keys})]"))
        })
        .pre(Text, |n| assign(n, |p| format!("{p}.text")))
        .pre(TextAll, |n| assign(n, |p| format!("{p}.map((e) => e.text).toList()")))
        .pre(Raw, |n| assign(n, |p| format!("{p}.outerHtml")))
        .pre(RawAll, |n| assign(n, |p| format!("{p}.map((e) => e.outerHtml).toList()")));
}

fn query(node: &NodeRef<'_>, expr: impl FnOnce(&str, &str) -> String) -> Out {
    let q = hooked(node, "query")?;
    assign(node, |p| expr(p, &q))
}

fn attr(node: &NodeRef<'_>) -> Out {
    match node.kwarg_strings("key").as_slice() {
        [key] => {
            let key = hook_or_value(node, "key", hook, |_| wrap_dart_string(key))?;
            assign(node, |p| format!("sscAttr({p}, {key})"))
        }
        keys => {
            let keys = string_list(keys);
            assign(node, |p| format!("sscAttrs({p}, {keys})"))
        }
    }
}

// -------------------------------- Strings --------------------------------- //

fn register_strings(conv: &mut Converter) {
    use TokenKind::*;
    conv.pre(Trim, |n| trim(n, "trim", "sscTrim", false))
        .pre(LTrim, |n| trim(n, "trimLeft", "sscLTrim", false))
        .pre(RTrim, |n| trim(n, "trimRight", "sscRTrim", false))
        .pre(ListTrim, |n| trim(n, "trim", "sscTrim", true))
        .pre(ListLTrim, |n| trim(n, "trimLeft", "sscLTrim", true))
        .pre(ListRTrim, |n| trim(n, "trimRight", "sscRTrim", true))
        .pre(Replace, |n| replace(n, false))
        .pre(ListReplace, |n| replace(n, true))
        .pre(MapReplace, |n| map_replace(n, false))
        .pre(ListMapReplace, |n| map_replace(n, true))
        .pre(Format, |n| format_str(n, false))
        .pre(ListFormat, |n| format_str(n, true))
        .pre(Split, |n| {
            let sep = hooked(n, "sep")?;
            assign(n, |p| format!("{p}.split({sep})"))
        })
        .pre(RmPrefix, |n| call_with_substr(n, "sscRmPrefix", 1, false))
        .pre(ListRmPrefix, |n| call_with_substr(n, "sscRmPrefix", 1, true))
        .pre(RmSuffix, |n| call_with_substr(n, "sscRmSuffix", 1, false))
        .pre(ListRmSuffix, |n| call_with_substr(n, "sscRmSuffix", 1, true))
        .pre(RmPrefixAndSuffix, |n| call_with_substr(n, "sscRmPrefixAndSuffix", 2, false))
        .pre(ListRmPrefixAndSuffix, |n| call_with_substr(n, "sscRmPrefixAndSuffix", 2, true))
        .pre(Unescape, |n| map_or_apply(n, false, |v| format!("sscUnescape({v})")))
        .pre(ListUnescape, |n| map_or_apply(n, true, |v| format!("sscUnescape({v})")))
        .pre(Regex, |n| {
            let re = regex(n)?;
            let group = kwarg_i64(n, "group")?;
            assign(n, |p| format!("sscReMatch({p}, {re}, {group})"))
        })
        .pre(RegexAll, |n| {
            let re = regex(n)?;
            assign(n, |p| format!("sscReAll({p}, {re})"))
        })
        .pre(RegexSub, |n| regex_sub(n, false))
        .pre(ListRegexSub, |n| regex_sub(n, true));
}

fn trim(node: &NodeRef<'_>, method: &str, helper: &str, is_list: bool) -> Out {
    match node.kwarg("substr") {
        Some(Value::String(_)) => {
            let chars = hooked(node, "substr")?;
            map_or_apply(node, is_list, |v| format!("{helper}({v}, {chars})"))
        }
        _ => map_or_apply(node, is_list, |v| format!("{v}.{method}()")),
    }
}

fn replace(node: &NodeRef<'_>, is_list: bool) -> Out {
    let old = hooked(node, "old")?;
    let new = hooked(node, "new")?;
    map_or_apply(node, is_list, |v| format!("{v}.replaceAll({old}, {new})"))
}

fn map_replace(node: &NodeRef<'_>, is_list: bool) -> Out {
    let old = hooked(node, "old")?;
    let new = hooked(node, "new")?;
    map_or_apply(node, is_list, |v| format!("sscMapReplace({v}, {old}, {new})"))
}

fn format_str(node: &NodeRef<'_>, is_list: bool) -> Out {
    let fmt = kwarg_str(node, "fmt")?;
    match node.classvar_hook("fmt").and_then(|h| h.split()) {
        Some((schema, field)) => {
            let target = hook(schema, field);
            map_or_apply(node, is_list, |v| format!("{target}.replaceAll(\"{{{{}}}}\", {v})"))
        }
        None => map_or_apply(node, is_list, |v| interpolate(fmt, v)),
    }
}

fn call_with_substr(node: &NodeRef<'_>, func: &str, times: usize, is_list: bool) -> Out {
    let substr = hooked(node, "substr")?;
    let args = vec![substr; times].join(", ");
    map_or_apply(node, is_list, |v| format!("{func}({v}, {args})"))
}

fn regex_sub(node: &NodeRef<'_>, is_list: bool) -> Out {
    let re = regex(node)?;
    let repl = hooked(node, "repl")?;
    map_or_apply(node, is_list, |v| format!("sscReSub({v}, {re}, {repl})"))
}

// --------------------------------- Lists ---------------------------------- //

fn register_lists(conv: &mut Converter) {
    use TokenKind::*;
    conv.pre(Index, |n| {
        let i = hooked(n, "index")?;
        assign(n, |p| format!("sscIndex({p}, {i})"))
    })
    .pre(Join, |n| {
        let sep = hooked(n, "sep")?;
        assign(n, |p| format!("{p}.join({sep})"))
    })
    .pre(Len, |n| assign(n, |p| format!("{p}.length")))
    .pre(Unique, |n| assign(n, |p| format!("{p}.toSet().toList()")))
    .pre(ToInt, |n| map_or_apply(n, false, |v| format!("int.parse({v}.trim())")))
    .pre(ListToInt, |n| map_or_apply(n, true, |v| format!("int.parse({v}.trim())")))
    .pre(ToFloat, |n| map_or_apply(n, false, |v| format!("double.parse({v}.trim())")))
    .pre(ListToFloat, |n| map_or_apply(n, true, |v| format!("double.parse({v}.trim())")))
    .pre(ToBool, |n| assign(n, |p| format!("sscToBool({p})")))
    .pre(Jsonify, |n| {
        let path: String = jsonify_query_parse(n.kwarg_str("query").unwrap_or_default())
            .into_iter()
            .map(|part| match part {
                JsonPathPart::Key(key) => format!("[{}]", wrap_dart_string(key)),
                JsonPathPart::Index(i) => format!("[{i}]"),
            })
            .collect();
        assign(n, |p| format!("jsonDecode({p}){path}"))
    });
}

// ------------------------------- Assertions ------------------------------- //

fn register_checks(conv: &mut Converter) {
    use TokenKind::*;
    conv.pre(IsEqual, |n| {
        let item = hooked(n, "item")?;
        assertion(n, |p| format!("{p} == {item}"))
    })
    .pre(IsNotEqual, |n| {
        let item = hooked(n, "item")?;
        assertion(n, |p| format!("{p} != {item}"))
    })
    .pre(IsContains, |n| {
        let item = hooked(n, "item")?;
        assertion(n, |p| format!("{p}.contains({item})"))
    })
    .pre(IsCss, |n| {
        let q = hooked(n, "query")?;
        let op = if n.kwarg_bool("invert") { "==" } else { "!=" };
        assertion(n, |p| format!("{p}.querySelector({q}) {op} null"))
    })
    .pre(IsRegex, |n| {
        let re = regex(n)?;
        assertion(n, |p| format!("{re}.hasMatch({p})"))
    })
    .pre(AnyIsRegex, |n| {
        let re = regex(n)?;
        assertion(n, |p| format!("{p}.any((i) => {re}.hasMatch(i))"))
    })
    .pre(AllIsRegex, |n| {
        let re = regex(n)?;
        assertion(n, |p| format!("{p}.every((i) => {re}.hasMatch(i))"))
    })
    .pre(HasAttr, |n| {
        let key = hooked(n, "key")?;
        let not = if n.kwarg_bool("invert") { "!" } else { "" };
        assertion(n, |p| format!("{not}{p}.attributes.containsKey({key})"))
    })
    .pre(ListHasAttr, |n| {
        let key = hooked(n, "key")?;
        let not = if n.kwarg_bool("invert") { "!" } else { "" };
        assertion(n, |p| format!("{p}.every((e) => {not}e.attributes.containsKey({key}))"))
    });
}

// -------------------------------- Filters --------------------------------- //

fn register_filters(conv: &mut Converter) {
    use TokenKind::*;
    conv.pre(Filter, |n| {
        let (prv, nxt) = prev_next_var(n);
        Ok(format!("{}final {nxt} = {prv}.where((i) => ", indent(n)))
    })
    .post(Filter, |_| Ok(").toList();".into()))
    .pre(FilterAnd, |n| Ok(format!("{}(", sep(n))))
    .post(FilterAnd, |_| Ok(")".into()))
    .pre(FilterOr, |n| Ok(format!("{}(", sep(n))))
    .post(FilterOr, |_| Ok(")".into()))
    .pre(FilterNot, |n| Ok(format!("{}!(", sep(n))))
    .post(FilterNot, |_| Ok(")".into()))
    .pre(FilterEq, |n| one_or_many(n, "values", |v| format!("i == {v}"), |l| format!("{l}.contains(i)")))
    .pre(FilterNe, |n| one_or_many(n, "values", |v| format!("i != {v}"), |l| format!("!{l}.contains(i)")))
    .pre(FilterIn, |n| {
        one_or_many(n, "substr", |v| format!("i.contains({v})"), |l| format!("{l}.any((s) => i.contains(s))"))
    })
    .pre(FilterStarts, |n| {
        one_or_many(n, "substr", |v| format!("i.startsWith({v})"), |l| format!("{l}.any((s) => i.startsWith(s))"))
    })
    .pre(FilterEnds, |n| {
        one_or_many(n, "substr", |v| format!("i.endsWith({v})"), |l| format!("{l}.any((s) => i.endsWith(s))"))
    })
    .pre(FilterRe, |n| Ok(format!("{}{}.hasMatch(i)", sep(n), regex(n)?)))
    .pre(FilterLenEq, |n| length(n, "=="))
    .pre(FilterLenNe, |n| length(n, "!="))
    .pre(FilterLenLt, |n| length(n, "<"))
    .pre(FilterLenLe, |n| length(n, "<="))
    .pre(FilterLenGt, |n| length(n, ">"))
    .pre(FilterLenGe, |n| length(n, ">="));
}

fn sep(node: &NodeRef<'_>) -> &'static str {
    filter_sep(node, " && ", " || ")
}

fn one_or_many(
    node: &NodeRef<'_>,
    key: &str,
    one: impl FnOnce(String) -> String,
    many: impl FnOnce(String) -> String,
) -> Out {
    let cond = match node.kwarg_strings(key).as_slice() {
        [] => return Err(EmitError::MissingKwarg { kind: node.kind(), key: key.to_string() }),
        [value] => one(wrap_dart_string(value)),
        values => many(string_list(values)),
    };
    Ok(format!("{}{cond}", sep(node)))
}

fn length(node: &NodeRef<'_>, op: &str) -> Out {
    Ok(format!("{}i.length {op} {}", sep(node), kwarg_i64(node, "length")?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast_build::{BuildOptions, build};
    use crate::document::Document;
    use crate::schema::{Schema, SchemaRegistry};
    use crate::targets::{EmitOptions, Target, emit};

    #[test]
    fn interpolation_escapes_dollar() {
        assert_eq!(interpolate("https://x.test/{{}}", "v1"), "\"https://x.test/${v1}\"");
        assert_eq!(interpolate("$ {{}}", "i"), "\"\\$ ${i}\"");
    }

    #[test]
    fn magic_method_names() {
        assert_eq!(method_name(PRE_VALIDATE), "_preValidate");
        assert_eq!(method_name(SPLIT_DOC), "_splitDoc");
        assert_eq!(method_name("__VALUE__"), "_parseValue");
        assert_eq!(method_name("price_color"), "_parsePriceColor");
    }

    #[test]
    fn records_and_try_catch_defaults() {
        let mut reg = SchemaRegistry::new();
        reg.insert(
            Schema::new("Page", StructType::Item)
                .returned_classvar("SOURCE", "page")
                .field("title", Document::new().css("h1").text())
                .field("price", Document::new().default("0").css(".price").text().re(r"\d+")),
        )
        .unwrap();
        let module = build(&reg, BuildOptions::default()).unwrap();
        let dart = emit(Target::Dart, &module, &EmitOptions::default()).unwrap();
        assert!(dart.starts_with("// Code generated by ssc-gen."));
        assert!(dart.contains("import 'package:html/parser.dart' as html;"));
        assert!(dart.contains("typedef TPage = ({\n  String SOURCE,\n  String title,\n  String price,\n});"));
        assert!(dart.contains("  static const SOURCE = \"page\";"));
        assert!(dart.contains("  String _parsePrice(Element v) {"));
        assert!(dart.contains("    } catch (_) {\n      return \"0\";\n    }"));
        assert!(dart.contains("sscReMatch(v2, RegExp(r'\\d+'), 0)"));
        assert!(dart.contains("      SOURCE: Page.SOURCE,"));
        assert!(dart.contains("      title: _parseTitle(_doc),"));
    }
}
