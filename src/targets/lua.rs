//! Lua 5.3+ target over `lua-htmlparser`, `lrexlib` (`rex_pcre`) and `dkjson`.
//!
//! Schemas become metatables with `:parse()`; defaults run the body inside
//! `pcall`. Typedefs are EmmyLua annotations.
use serde_json::Value;

use super::templates::{LUA_HELPERS, LUA_IMPORTS};
use crate::ast::NodeRef;
use crate::emitter::helpers::{
    JsonPathPart, ReturnShape, filter_sep, have_default_expr, have_pre_validate_call, hook_or_value, is_last_var_no_ret,
    jsonify_query_parse, kwarg, kwarg_i64, kwarg_str, method_suffix, prev_next_var, typedef_field, typedef_field_shape,
};
use crate::emitter::{Converter, EmitError};
use crate::regex_utils::with_inline_flags;
use crate::str_utils::{to_snake_case, wrap_lua_string};
use crate::tokens::{ITEM, KEY, PRE_VALIDATE, SPLIT_DOC, StructType, TokenKind, VALUE, VariableType};

type Out = Result<String, EmitError>;

pub const NAME: &str = "lua::htmlparser";

pub fn converter() -> Converter {
    use TokenKind::*;
    let mut conv = Converter::new(NAME, "-- ");
    conv.pre(Module, empty)
        .pre(Docstring, |n| Ok(doc_lines(kwarg_str(n, "value")?)))
        .pre(Imports, |_| Ok(format!("{LUA_IMPORTS}\n")))
        .pre(TransformImports, empty)
        .pre(Utilities, |_| Ok(format!("{LUA_HELPERS}\n")))
        .pre(CodeStart, code_start)
        .pre(CodeEnd, code_end)
        .pre(JsonStruct, |n| Ok(format!("---@class J_{}", kwarg_str(n, "name")?)))
        .post(JsonStruct, |_| Ok("\n".into()))
        .pre(JsonField, json_field)
        .pre(Typedef, |n| Ok(format!("---@class T_{}", kwarg_str(n, "name")?)))
        .post(Typedef, |_| Ok("\n".into()))
        .pre_for(Typedef, StructType::Dict, |n| {
            let value = typedef_field(n, VALUE).map(|f| shape_type(typedef_field_shape(&f)));
            alias(n, format!("table<string, {}>", value.unwrap_or_else(|| "any".into())))
        })
        .post_for(Typedef, StructType::Dict, empty)
        .pre_for(Typedef, StructType::FlatList, |n| {
            let item = typedef_field(n, ITEM).map(|f| shape_type(typedef_field_shape(&f)));
            alias(n, format!("{}[]", item.unwrap_or_else(|| "any".into())))
        })
        .post_for(Typedef, StructType::FlatList, empty)
        .pre_for(Typedef, StructType::AccList, |n| alias(n, "string[]".into()))
        .post_for(Typedef, StructType::AccList, empty)
        .pre(TypedefField, |n| {
            Ok(format!("---@field {} {}", kwarg_str(n, "name")?, shape_type(typedef_field_shape(n))))
        })
        .pre_for(TypedefField, StructType::Dict, empty)
        .pre_for(TypedefField, StructType::FlatList, empty)
        .pre_for(TypedefField, StructType::AccList, empty)
        .pre(Struct, struct_header)
        .post(Struct, empty)
        .pre(Classvar, |n| {
            Ok(format!("{}.{} = {}", owner(n)?, kwarg_str(n, "name")?, literal(kwarg(n, "value")?)))
        })
        .pre(StructInit, init)
        .pre(StructPreValidate, |n| Ok(format!("function {}:{}(v)", owner(n)?, method_name(PRE_VALIDATE))))
        .pre(StructPartDoc, |n| Ok(format!("function {}:{}(v)", owner(n)?, method_name(SPLIT_DOC))))
        .pre(StructField, |n| Ok(format!("function {}:{}(v)", owner(n)?, method_name(kwarg_str(n, "name")?))))
        .post_many(&[StructPreValidate, StructPartDoc, StructField], |_| Ok("end\n".into()))
        .pre(StartParse, start_parse_header)
        .post(StartParse, start_parse_item)
        .post_for(StartParse, StructType::List, start_parse_list)
        .post_for(StartParse, StructType::Dict, start_parse_dict)
        .post_for(StartParse, StructType::FlatList, start_parse_flat_list)
        .post_for(StartParse, StructType::AccList, start_parse_acc_list)
        .pre_many(&[CallStructMethod, CallStructClassvar], empty)
        .pre(DefaultStart, |n| {
            let (prv, nxt) = prev_next_var(n);
            Ok(format!("{BODY}local {nxt} = {prv}\n{BODY}local ok, result = pcall(function()"))
        })
        .pre(DefaultEnd, |n| {
            let value = hooked(n, "value")?;
            Ok(format!("{BODY}end)\n{BODY}if ok then\n{DEFAULT_BODY}return result\n{BODY}end\n{BODY}return {value}"))
        })
        .pre(Return, |n| Ok(format!("{}return {}", indent(n), prev_next_var(n).0)))
        .pre(NoReturn, |n| Ok(format!("{}return", indent(n))))
        .pre(Nested, |n| {
            let schema = kwarg_str(n, "schema_name")?;
            assign(n, |p| format!("{schema}.new({p}):parse()"))
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
const DEFAULT_BODY: &str = "        ";

fn indent(node: &NodeRef<'_>) -> &'static str {
    if have_default_expr(node) { DEFAULT_BODY } else { BODY }
}

fn assign(node: &NodeRef<'_>, expr: impl FnOnce(&str) -> String) -> Out {
    let (prv, nxt) = prev_next_var(node);
    Ok(format!("{}local {nxt} = {}", indent(node), expr(&prv)))
}

fn assertion(node: &NodeRef<'_>, cond: impl FnOnce(&str) -> String) -> Out {
    let (prv, nxt) = prev_next_var(node);
    let msg = wrap_lua_string(kwarg_str(node, "msg")?);
    let ind = indent(node);
    let mut code = format!("{ind}if not ({}) then\n{ind}    error({msg})\n{ind}end", cond(&prv));
    if !is_last_var_no_ret(node) {
        code.push_str(&format!("\n{ind}local {nxt} = {prv}"));
    }
    Ok(code)
}

fn map_or_apply(node: &NodeRef<'_>, is_list: bool, call: impl Fn(&str) -> String) -> Out {
    if is_list {
        assign(node, |p| format!("Ssc.map({p}, function(i) return {} end)", call("i")))
    } else {
        assign(node, |p| call(p))
    }
}

fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => wrap_lua_string(s),
        Value::Array(items) => format!("{{ {} }}", items.iter().map(literal).collect::<Vec<_>>().join(", ")),
        Value::Null => "nil".to_string(),
        other => other.to_string(),
    }
}

fn string_table(items: &[&str]) -> String {
    format!("{{ {} }}", items.iter().map(|s| wrap_lua_string(s)).collect::<Vec<_>>().join(", "))
}

fn hook(schema: &str, field: &str) -> String {
    format!("{schema}.{field}")
}

fn hooked(node: &NodeRef<'_>, key: &str) -> Out {
    hook_or_value(node, key, hook, literal)
}

/// PCRE pattern with inline flags; a hooked pattern gets them prepended.
fn regex(node: &NodeRef<'_>) -> Out {
    let (ignore_case, dotall) = (node.kwarg_bool("ignore_case"), node.kwarg_bool("dotall"));
    hook_or_value(
        node,
        "pattern",
        |schema, field| match with_inline_flags("", ignore_case, dotall) {
            flags if flags.is_empty() => hook(schema, field),
            flags => format!("{} .. {}", wrap_lua_string(&flags), hook(schema, field)),
        },
        |value| wrap_lua_string(&with_inline_flags(value.as_str().unwrap_or_default(), ignore_case, dotall)),
    )
}

/// String concatenation with the `{{}}` placeholder bound to `var`.
fn concat(fmt: &str, var: &str) -> String {
    fmt.split("{{}}")
        .enumerate()
        .flat_map(|(i, part)| {
            let var = (i > 0).then(|| var.to_string());
            var.into_iter().chain((!part.is_empty()).then(|| wrap_lua_string(part)))
        })
        .collect::<Vec<_>>()
        .join(" .. ")
}

fn doc_lines(doc: &str) -> String {
    doc.lines().map(|l| format!("--- {l}").trim_end().to_string()).collect::<Vec<_>>().join("\n")
}

fn method_name(field: &str) -> String {
    match field {
        PRE_VALIDATE => "_pre_validate".to_string(),
        SPLIT_DOC => "_split_doc".to_string(),
        other => format!("_parse_{}", to_snake_case(method_suffix(other))),
    }
}

fn owner<'a>(node: &NodeRef<'a>) -> Result<&'a str, EmitError> {
    let st = node
        .enclosing_struct()
        .ok_or_else(|| EmitError::MissingKwarg { kind: node.kind(), key: "name".into() })?;
    kwarg_str(&st, "name")
}

fn lua_type(ty: VariableType) -> &'static str {
    use VariableType::*;
    match ty {
        Document => "table",
        ListDocument => "table[]",
        String => "string",
        ListString => "string[]",
        Int => "integer",
        Float => "number",
        ListInt => "integer[]",
        ListFloat => "number[]",
        Bool => "boolean",
        Null => "nil",
        OptionalString => "string?",
        OptionalListString => "string[]?",
        OptionalInt => "integer?",
        OptionalFloat => "number?",
        OptionalListInt => "integer[]?",
        OptionalListFloat => "number[]?",
        Nested | Json | Any => "any",
        ListAny => "any[]",
    }
}

fn shape_type(shape: ReturnShape<'_>) -> String {
    match shape {
        ReturnShape::Nested { schema, kind: StructType::List } => format!("T_{schema}[]"),
        ReturnShape::Nested { schema, .. } => format!("T_{schema}"),
        ReturnShape::Json { name, is_array: true } => format!("J_{name}[]"),
        ReturnShape::Json { name, .. } => format!("J_{name}"),
        ReturnShape::Value(ty) => lua_type(ty).to_string(),
    }
}

fn empty(_: &NodeRef<'_>) -> Out {
    Ok(String::new())
}

// -------------------------------- Module ---------------------------------- //

fn schema_names<'a>(node: &NodeRef<'a>) -> Vec<&'a str> {
    node.module()
        .root()
        .children()
        .filter(|c| c.kind() == TokenKind::Struct)
        .filter_map(|c| c.kwarg_str("name"))
        .collect()
}

/// Forward declarations, so methods may reference schemas defined later.
fn code_start(node: &NodeRef<'_>) -> Out {
    let names = schema_names(node);
    if names.is_empty() {
        return Ok(String::new());
    }
    Ok(format!("local {}\n", names.join(", ")))
}

/// The module's return table.
fn code_end(node: &NodeRef<'_>) -> Out {
    let entries: Vec<String> = schema_names(node).iter().map(|name| format!("{name} = {name}")).collect();
    Ok(format!("return {{ {} }}", entries.join(", ")))
}

fn alias(node: &NodeRef<'_>, ty: String) -> Out {
    Ok(format!("---@alias T_{} {ty}\n", kwarg_str(node, "name")?))
}

fn json_field(node: &NodeRef<'_>) -> Out {
    let name = kwarg_str(node, "name")?;
    let reference = node.kwarg_str("ref").unwrap_or_default();
    let ty = match kwarg_str(node, "json_type")? {
        "number" | "float" => "number".to_string(),
        "string" => "string".to_string(),
        "boolean" => "boolean".to_string(),
        "null" => "nil".to_string(),
        "object" => format!("J_{reference}"),
        "array_objects" => format!("J_{reference}[]"),
        "array_number" | "array_float" => "number[]".to_string(),
        "array_string" => "string[]".to_string(),
        "array_boolean" => "boolean[]".to_string(),
        "optional_number" | "optional_float" => "number?".to_string(),
        "optional_string" => "string?".to_string(),
        "optional_boolean" => "boolean?".to_string(),
        _ => "any[]".to_string(),
    };
    Ok(format!("---@field {name} {ty}"))
}

// -------------------------------- Structs --------------------------------- //

fn struct_header(node: &NodeRef<'_>) -> Out {
    let name = kwarg_str(node, "name")?;
    let mut code = String::new();
    if let Some(doc) = node.kwarg_str("docstring").filter(|d| !d.is_empty()) {
        code.push_str(&format!("{}\n", doc_lines(doc)));
    }
    code.push_str(&format!("{name} = {{}}\n{name}.__index = {name}"));
    Ok(code)
}

fn init(node: &NodeRef<'_>) -> Out {
    let name = owner(node)?;
    Ok([
        "---@param doc string|table".to_string(),
        format!("function {name}.new(doc)"),
        format!("{BODY}if type(doc) == \"string\" then"),
        format!("{DEFAULT_BODY}doc = htmlparser.parse(doc)"),
        format!("{BODY}end"),
        format!("{BODY}return setmetatable({{ _doc = doc }}, {name})"),
        "end\n".to_string(),
    ]
    .join("\n"))
}

fn start_parse_header(node: &NodeRef<'_>) -> Out {
    let name = kwarg_str(node, "name")?;
    let ret = match node.struct_type() {
        Some(StructType::List) => format!("T_{name}[]"),
        _ => format!("T_{name}"),
    };
    let mut code = format!("---@return {ret}\nfunction {}:parse()", owner(node)?);
    if have_pre_validate_call(node) {
        code.push_str(&format!("\n{BODY}self:{}(self._doc)", method_name(PRE_VALIDATE)));
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
                entries.push(format!("[{}] = {owner}.{name}", wrap_lua_string(name)));
            }
            _ if name == PRE_VALIDATE || name == SPLIT_DOC => {}
            _ => entries.push(format!("[{}] = self:{}({doc})", wrap_lua_string(name), method_name(name))),
        }
    }
    Ok(entries)
}

fn table_literal(entries: &[String], indent: &str) -> String {
    if entries.is_empty() {
        return "{}".into();
    }
    let body: Vec<String> = entries.iter().map(|e| format!("{indent}    {e},")).collect();
    format!("{{\n{}\n{indent}}}", body.join("\n"))
}

fn parts_loop(body: &str) -> String {
    format!(
        "{BODY}local out = {{}}\n{BODY}for _, e in ipairs(self:{}(self._doc)) do\n{body}\n{BODY}end\n{BODY}return out\nend\n",
        method_name(SPLIT_DOC)
    )
}

fn start_parse_item(node: &NodeRef<'_>) -> Out {
    let entries = parse_entries(node, "self._doc")?;
    Ok(format!("{BODY}return {}\nend\n", table_literal(&entries, BODY)))
}

fn start_parse_list(node: &NodeRef<'_>) -> Out {
    let entries = parse_entries(node, "e")?;
    Ok(parts_loop(&format!("{DEFAULT_BODY}out[#out + 1] = {}", table_literal(&entries, DEFAULT_BODY))))
}

fn start_parse_dict(_: &NodeRef<'_>) -> Out {
    Ok(parts_loop(&format!(
        "{DEFAULT_BODY}out[self:{}(e)] = self:{}(e)",
        method_name(KEY),
        method_name(VALUE)
    )))
}

fn start_parse_flat_list(_: &NodeRef<'_>) -> Out {
    Ok(parts_loop(&format!("{DEFAULT_BODY}out[#out + 1] = self:{}(e)", method_name(ITEM))))
}

fn start_parse_acc_list(node: &NodeRef<'_>) -> Out {
    let calls: Vec<String> = node
        .children()
        .filter(|c| c.kind() == TokenKind::CallStructMethod)
        .filter_map(|c| c.kwarg_str("name"))
        .filter(|name| *name != PRE_VALIDATE)
        .map(|name| format!("self:{}(self._doc)", method_name(name)))
        .collect();
    Ok(format!(
        "{BODY}local out = {{}}\n{BODY}for _, part in ipairs({{ {} }}) do\n{DEFAULT_BODY}for _, i in ipairs(part) do\n{DEFAULT_BODY}    out[#out + 1] = i\n{DEFAULT_BODY}end\n{BODY}end\n{BODY}return Ssc.unique(out)\nend\n",
        calls.join(", ")
    ))
}

// ------------------------------- Selectors -------------------------------- //

fn register_selectors(conv: &mut Converter) {
    use TokenKind::*;
    conv.pre(Css, |n| query(n, |p, q| format!("Ssc.css({p}, {q})")))
        .pre(CssAll, |n| query(n, |p, q| format!("{p}:select({q})")))
        .pre(Attr, attr)
        .pre(AttrAll, |n| {
            let keys = string_table(&n.kwarg_strings("key"));
            assign(n, |p| format!("Ssc.attrs_all({p}, {keys})"))
        })
        .pre(Text, |n| assign(n, |p| format!("Ssc.text({p})")))
        .pre(TextAll, |n| assign(n, |p| format!("Ssc.map({p}, Ssc.text)")))
        .pre(Raw, |n| assign(n, |p| format!("Ssc.raw({p})")))
        .pre(RawAll, |n| assign(n, |p| format!("Ssc.map({p}, Ssc.raw)")));
}

fn query(node: &NodeRef<'_>, expr: impl FnOnce(&str, &str) -> String) -> Out {
    let q = hooked(node, "query")?;
    assign(node, |p| expr(p, &q))
}

fn attr(node: &NodeRef<'_>) -> Out {
    match node.kwarg_strings("key").as_slice() {
        [key] => {
            let key = hook_or_value(node, "key", hook, |_| wrap_lua_string(key))?;
            assign(node, |p| format!("Ssc.attr({p}, {key})"))
        }
        keys => {
            let keys = string_table(keys);
            assign(node, |p| format!("Ssc.attrs({p}, {keys})"))
        }
    }
}

// -------------------------------- Strings --------------------------------- //

fn register_strings(conv: &mut Converter) {
    use TokenKind::*;
    conv.pre(Trim, |n| trim(n, "Ssc.trim", false))
        .pre(LTrim, |n| trim(n, "Ssc.ltrim", false))
        .pre(RTrim, |n| trim(n, "Ssc.rtrim", false))
        .pre(ListTrim, |n| trim(n, "Ssc.trim", true))
        .pre(ListLTrim, |n| trim(n, "Ssc.ltrim", true))
        .pre(ListRTrim, |n| trim(n, "Ssc.rtrim", true))
        .pre(Replace, |n| replace(n, "Ssc.replace", false))
        .pre(ListReplace, |n| replace(n, "Ssc.replace", true))
        .pre(MapReplace, |n| replace(n, "Ssc.map_replace", false))
        .pre(ListMapReplace, |n| replace(n, "Ssc.map_replace", true))
        .pre(Format, |n| format_str(n, false))
        .pre(ListFormat, |n| format_str(n, true))
        .pre(Split, |n| {
            let sep = hooked(n, "sep")?;
            assign(n, |p| format!("Ssc.split({p}, {sep})"))
        })
        .pre(RmPrefix, |n| call_with_substr(n, "Ssc.rm_prefix", 1, false))
        .pre(ListRmPrefix, |n| call_with_substr(n, "Ssc.rm_prefix", 1, true))
        .pre(RmSuffix, |n| call_with_substr(n, "Ssc.rm_suffix", 1, false))
        .pre(ListRmSuffix, |n| call_with_substr(n, "Ssc.rm_suffix", 1, true))
        .pre(RmPrefixAndSuffix, |n| call_with_substr(n, "Ssc.rm_prefix_and_suffix", 2, false))
        .pre(ListRmPrefixAndSuffix, |n| call_with_substr(n, "Ssc.rm_prefix_and_suffix", 2, true))
        .pre(Unescape, |n| map_or_apply(n, false, |v| format!("Ssc.unescape({v})")))
        .pre(ListUnescape, |n| map_or_apply(n, true, |v| format!("Ssc.unescape({v})")))
        .pre(Regex, |n| {
            let re = regex(n)?;
            let group = kwarg_i64(n, "group")?;
            assign(n, |p| format!("Ssc.re({p}, {re}, {group})"))
        })
        .pre(RegexAll, |n| {
            let re = regex(n)?;
            assign(n, |p| format!("Ssc.re_all({p}, {re})"))
        })
        .pre(RegexSub, |n| regex_sub(n, false))
        .pre(ListRegexSub, |n| regex_sub(n, true));
}

fn trim(node: &NodeRef<'_>, func: &str, is_list: bool) -> Out {
    match node.kwarg("substr") {
        Some(Value::String(_)) => {
            let chars = hooked(node, "substr")?;
            map_or_apply(node, is_list, |v| format!("{func}({v}, {chars})"))
        }
        _ => map_or_apply(node, is_list, |v| format!("{func}({v})")),
    }
}

fn replace(node: &NodeRef<'_>, func: &str, is_list: bool) -> Out {
    let old = hooked(node, "old")?;
    let new = hooked(node, "new")?;
    map_or_apply(node, is_list, |v| format!("{func}({v}, {old}, {new})"))
}

fn format_str(node: &NodeRef<'_>, is_list: bool) -> Out {
    let fmt = kwarg_str(node, "fmt")?;
    match node.classvar_hook("fmt").and_then(|h| h.split()) {
        Some((schema, field)) => {
            let target = hook(schema, field);
            map_or_apply(node, is_list, |v| format!("Ssc.fmt({target}, {v})"))
        }
        None => map_or_apply(node, is_list, |v| concat(fmt, v)),
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
    map_or_apply(node, is_list, |v| format!("Ssc.re_sub({v}, {re}, {repl})"))
}

// --------------------------------- Lists ---------------------------------- //

fn register_lists(conv: &mut Converter) {
    use TokenKind::*;
    conv.pre(Index, |n| {
        let i = hooked(n, "index")?;
        assign(n, |p| format!("Ssc.at({p}, {i})"))
    })
    .pre(Join, |n| {
        let sep = hooked(n, "sep")?;
        assign(n, |p| format!("table.concat({p}, {sep})"))
    })
    .pre(Len, |n| assign(n, |p| format!("#{p}")))
    .pre(Unique, |n| assign(n, |p| format!("Ssc.unique({p})")))
    .pre(ToInt, |n| map_or_apply(n, false, |v| format!("Ssc.to_int({v})")))
    .pre(ListToInt, |n| map_or_apply(n, true, |v| format!("Ssc.to_int({v})")))
    .pre(ToFloat, |n| map_or_apply(n, false, |v| format!("Ssc.to_float({v})")))
    .pre(ListToFloat, |n| map_or_apply(n, true, |v| format!("Ssc.to_float({v})")))
    .pre(ToBool, |n| assign(n, |p| format!("Ssc.to_bool({p})")))
    .pre(Jsonify, |n| {
        let path: String = jsonify_query_parse(n.kwarg_str("query").unwrap_or_default())
            .into_iter()
            .map(|part| match part {
                JsonPathPart::Key(key) => format!("[{}]", wrap_lua_string(key)),
                JsonPathPart::Index(i) => format!("[{}]", i + 1),
            })
            .collect();
        assign(n, |p| format!("Ssc.json({p}){path}"))
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
        assertion(n, |p| format!("{p} ~= {item}"))
    })
    .pre(IsContains, |n| {
        let item = hooked(n, "item")?;
        assertion(n, |p| format!("Ssc.contains({p}, {item})"))
    })
    .pre(IsCss, |n| {
        let q = hooked(n, "query")?;
        let op = if n.kwarg_bool("invert") { "==" } else { ">" };
        assertion(n, |p| format!("#{p}:select({q}) {op} 0"))
    })
    .pre(IsRegex, |n| {
        let re = regex(n)?;
        assertion(n, |p| format!("Ssc.re_test({p}, {re})"))
    })
    .pre(AnyIsRegex, |n| {
        let re = regex(n)?;
        assertion(n, |p| format!("Ssc.any({p}, function(i) return Ssc.re_test(i, {re}) end)"))
    })
    .pre(AllIsRegex, |n| {
        let re = regex(n)?;
        assertion(n, |p| format!("Ssc.all({p}, function(i) return Ssc.re_test(i, {re}) end)"))
    })
    .pre(HasAttr, |n| {
        let key = hooked(n, "key")?;
        let op = if n.kwarg_bool("invert") { "==" } else { "~=" };
        assertion(n, |p| format!("{p}.attributes[{key}] {op} nil"))
    })
    .pre(ListHasAttr, |n| {
        let key = hooked(n, "key")?;
        let op = if n.kwarg_bool("invert") { "==" } else { "~=" };
        assertion(n, |p| format!("Ssc.all({p}, function(e) return e.attributes[{key}] {op} nil end)"))
    });
}

// -------------------------------- Filters --------------------------------- //

fn register_filters(conv: &mut Converter) {
    use TokenKind::*;
    conv.pre(Filter, |n| {
        let (prv, nxt) = prev_next_var(n);
        Ok(format!("{}local {nxt} = Ssc.filter({prv}, function(i) return ", indent(n)))
    })
    .post(Filter, |_| Ok(" end)".into()))
    .pre(FilterAnd, |n| Ok(format!("{}(", sep(n))))
    .post(FilterAnd, |_| Ok(")".into()))
    .pre(FilterOr, |n| Ok(format!("{}(", sep(n))))
    .post(FilterOr, |_| Ok(")".into()))
    .pre(FilterNot, |n| Ok(format!("{}not (", sep(n))))
    .post(FilterNot, |_| Ok(")".into()))
    .pre(FilterEq, |n| one_or_many(n, "values", |v| format!("i == {v}"), |t| format!("Ssc.contains({t}, i)")))
    .pre(FilterNe, |n| one_or_many(n, "values", |v| format!("i ~= {v}"), |t| format!("not Ssc.contains({t}, i)")))
    .pre(FilterIn, |n| {
        one_or_many(
            n,
            "substr",
            |v| format!("Ssc.contains(i, {v})"),
            |t| format!("Ssc.any({t}, function(s) return Ssc.contains(i, s) end)"),
        )
    })
    .pre(FilterStarts, |n| {
        one_or_many(
            n,
            "substr",
            |v| format!("Ssc.starts(i, {v})"),
            |t| format!("Ssc.any({t}, function(s) return Ssc.starts(i, s) end)"),
        )
    })
    .pre(FilterEnds, |n| {
        one_or_many(
            n,
            "substr",
            |v| format!("Ssc.ends(i, {v})"),
            |t| format!("Ssc.any({t}, function(s) return Ssc.ends(i, s) end)"),
        )
    })
    .pre(FilterRe, |n| Ok(format!("{}Ssc.re_test(i, {})", sep(n), regex(n)?)))
    .pre(FilterLenEq, |n| length(n, "=="))
    .pre(FilterLenNe, |n| length(n, "~="))
    .pre(FilterLenLt, |n| length(n, "<"))
    .pre(FilterLenLe, |n| length(n, "<="))
    .pre(FilterLenGt, |n| length(n, ">"))
    .pre(FilterLenGe, |n| length(n, ">="));
}

fn sep(node: &NodeRef<'_>) -> &'static str {
    filter_sep(node, " and ", " or ")
}

fn one_or_many(
    node: &NodeRef<'_>,
    key: &str,
    one: impl FnOnce(String) -> String,
    many: impl FnOnce(String) -> String,
) -> Out {
    let cond = match node.kwarg_strings(key).as_slice() {
        [] => return Err(EmitError::MissingKwarg { kind: node.kind(), key: key.to_string() }),
        [value] => one(wrap_lua_string(value)),
        values => many(string_table(values)),
    };
    Ok(format!("{}{cond}", sep(node)))
}

fn length(node: &NodeRef<'_>, op: &str) -> Out {
    Ok(format!("{}#i {op} {}", sep(node), kwarg_i64(node, "length")?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast_build::{BuildOptions, build};
    use crate::document::Document;
    use crate::schema::{Schema, SchemaRegistry};
    use crate::targets::{EmitOptions, Target, emit};

    #[test]
    fn concat_binds_placeholder() {
        assert_eq!(concat("https://x.test/{{}}", "v1"), "\"https://x.test/\" .. v1");
        assert_eq!(concat("<{{}}>", "i"), "\"<\" .. i .. \">\"");
        assert_eq!(concat("{{}}", "v"), "v");
    }

    #[test]
    fn method_names_are_snake_case() {
        assert_eq!(method_name("__ITEM__"), "_parse_item");
        assert_eq!(method_name("priceColor"), "_parse_price_color");
        assert_eq!(method_name(SPLIT_DOC), "_split_doc");
    }

    #[test]
    fn module_returns_schema_table_and_defaults_use_pcall() {
        let mut reg = SchemaRegistry::new();
        reg.insert(
            Schema::new("Page", StructType::Item)
                .field("title", Document::new().css("h1").text())
                .field("price", Document::new().default("0").css(".price").text().re(r"\d+")),
        )
        .unwrap();
        reg.insert(Schema::new("Cfg", StructType::ConfigClassvars).classvar("BASE", "x")).unwrap();
        let module = build(&reg, BuildOptions::default()).unwrap();
        let lua = emit(Target::Lua, &module, &EmitOptions::default()).unwrap();
        assert!(lua.starts_with("-- Code generated by ssc-gen."));
        assert!(lua.contains("local rex = require(\"rex_pcre\")"));
        assert!(lua.contains("local Page, Cfg\n"));
        assert!(lua.contains("\nPage = {}\nPage.__index = Page"));
        assert!(lua.contains("Cfg.BASE = \"x\""));
        assert!(lua.contains("function Page:_parse_price(v)"));
        assert!(lua.contains("local ok, result = pcall(function()"));
        assert!(lua.contains("return \"0\""));
        assert!(lua.contains("[\"title\"] = self:_parse_title(self._doc),"));
        assert!(lua.trim_end().ends_with("return { Page = Page, Cfg = Cfg }"));
    }
}
