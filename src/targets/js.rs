//! Pure DOM JavaScript target.
//!
//! Schemas become ES classes over `Document`/`Element` (browser DOM or any
//! implementation of it). Defaults are `try`/`catch` blocks; typedefs are
//! JSDoc comments.
use serde_json::Value;

use super::templates::JS_HELPERS;
use crate::ast::NodeRef;
use crate::emitter::helpers::{
    JsonPathPart, ReturnShape, filter_sep, have_default_expr, have_pre_validate_call, hook_or_value, is_last_var_no_ret,
    jsonify_query_parse, kwarg, kwarg_i64, kwarg_str, method_suffix, prev_next_var, typedef_field, typedef_field_shape,
};
use crate::emitter::{Converter, EmitError};
use crate::str_utils::{js_regex_body, to_upper_camel_case, wrap_double_quotes};
use crate::tokens::{ITEM, KEY, PRE_VALIDATE, SPLIT_DOC, StructType, TokenKind, VALUE, VariableType};

type Out = Result<String, EmitError>;

pub const NAME: &str = "js::pure";

pub fn converter() -> Converter {
    use TokenKind::*;
    let mut conv = Converter::new(NAME, "// ");
    conv.pre(Module, empty)
        .pre(Docstring, |n| Ok(jsdoc(kwarg_str(n, "value")?, "")))
        .pre(Imports, empty)
        .pre(TransformImports, empty)
        .pre(Utilities, |_| Ok(format!("{JS_HELPERS}\n")))
        .pre(CodeStart, empty)
        .pre(CodeEnd, code_end)
        .pre(JsonStruct, |n| Ok(format!("/**\n * @typedef {{Object}} J_{}", kwarg_str(n, "name")?)))
        .post(JsonStruct, close_jsdoc)
        .pre(JsonField, json_field)
        .pre(Typedef, |n| Ok(format!("/**\n * @typedef {{Object}} T_{}", kwarg_str(n, "name")?)))
        .post(Typedef, close_jsdoc)
        .pre_for(Typedef, StructType::Dict, typedef_dict)
        .post_for(Typedef, StructType::Dict, empty)
        .pre_for(Typedef, StructType::FlatList, typedef_flat_list)
        .post_for(Typedef, StructType::FlatList, empty)
        .pre_for(Typedef, StructType::AccList, |n| {
            Ok(format!("/** @typedef {{Array<string>}} T_{} */\n", kwarg_str(n, "name")?))
        })
        .post_for(Typedef, StructType::AccList, empty)
        .pre(TypedefField, |n| {
            Ok(format!(" * @property {{{}}} {}", shape_type(typedef_field_shape(n)), kwarg_str(n, "name")?))
        })
        .pre_for(TypedefField, StructType::Dict, empty)
        .pre_for(TypedefField, StructType::FlatList, empty)
        .pre_for(TypedefField, StructType::AccList, empty)
        .pre(Struct, struct_header)
        .post(Struct, |_| Ok("}\n".into()))
        .pre(Classvar, |n| Ok(format!("    static {} = {};", kwarg_str(n, "name")?, literal(kwarg(n, "value")?))))
        .pre(StructInit, init)
        .pre(StructPreValidate, |_| Ok("    _preValidate(v) {".into()))
        .pre(StructPartDoc, |_| Ok("    _splitDoc(v) {".into()))
        .pre(StructField, |n| Ok(format!("    {}(v) {{", method_name(kwarg_str(n, "name")?))))
        .post_many(&[StructPreValidate, StructPartDoc, StructField], |_| Ok("    }\n".into()))
        .pre(StartParse, start_parse_header)
        .post(StartParse, start_parse_item)
        .post_for(StartParse, StructType::List, start_parse_list)
        .post_for(StartParse, StructType::Dict, start_parse_dict)
        .post_for(StartParse, StructType::FlatList, start_parse_flat_list)
        .post_for(StartParse, StructType::AccList, start_parse_acc_list)
        .pre_many(&[CallStructMethod, CallStructClassvar], empty)
        .pre(DefaultStart, |n| {
            let (prv, nxt) = prev_next_var(n);
            Ok(format!("{BODY}let {nxt} = {prv};\n{BODY}try {{"))
        })
        .pre(DefaultEnd, |n| {
            let value = hooked(n, "value")?;
            Ok(format!("{BODY}}} catch (e) {{\n{DEFAULT_BODY}return {value};\n{BODY}}}"))
        })
        .pre(Return, |n| Ok(format!("{}return {};", indent(n), prev_next_var(n).0)))
        .pre(NoReturn, |n| Ok(format!("{}return;", indent(n))))
        .pre(Nested, |n| {
            let schema = kwarg_str(n, "schema_name")?;
            assign(n, |p| format!("new {schema}({p}).parse()"))
        });
    register_selectors(&mut conv);
    register_strings(&mut conv);
    register_lists(&mut conv);
    register_checks(&mut conv);
    register_filters(&mut conv);
    conv
}

// ------------------------------ Formatting -------------------------------- //

const BODY: &str = "        ";
const DEFAULT_BODY: &str = "            ";

fn indent(node: &NodeRef<'_>) -> &'static str {
    if have_default_expr(node) { DEFAULT_BODY } else { BODY }
}

fn assign(node: &NodeRef<'_>, expr: impl FnOnce(&str) -> String) -> Out {
    let (prv, nxt) = prev_next_var(node);
    Ok(format!("{}let {nxt} = {};", indent(node), expr(&prv)))
}

fn assertion(node: &NodeRef<'_>, cond: impl FnOnce(&str) -> String) -> Out {
    let (prv, nxt) = prev_next_var(node);
    let msg = wrap_double_quotes(kwarg_str(node, "msg")?);
    let ind = indent(node);
    let mut code = format!("{ind}if (!({})) throw new Error({msg});", cond(&prv));
    if !is_last_var_no_ret(node) {
        code.push_str(&format!("\n{ind}let {nxt} = {prv};"));
    }
    Ok(code)
}

fn map_or_apply(node: &NodeRef<'_>, is_list: bool, call: impl Fn(&str) -> String) -> Out {
    if is_list {
        assign(node, |p| format!("{p}.map((i) => {})", call("i")))
    } else {
        assign(node, |p| call(p))
    }
}

fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => wrap_double_quotes(s),
        Value::Array(items) => format!("[{}]", items.iter().map(literal).collect::<Vec<_>>().join(", ")),
        other => other.to_string(),
    }
}

fn string_array(items: &[&str]) -> String {
    format!("[{}]", items.iter().map(|s| wrap_double_quotes(s)).collect::<Vec<_>>().join(", "))
}

fn hook(schema: &str, field: &str) -> String {
    format!("{schema}.{field}")
}

/// `key` as JS source: `Schema.FIELD` when hooked, else the literal.
fn hooked(node: &NodeRef<'_>, key: &str) -> Out {
    hook_or_value(node, key, hook, literal)
}

/// `/pattern/flags`, or `new RegExp(Schema.FIELD, flags)` for a hooked
/// pattern; `extra` adds flags such as `g`.
fn regex(node: &NodeRef<'_>, extra: &str) -> Out {
    let mut flags = extra.to_string();
    if node.kwarg_bool("ignore_case") {
        flags.push('i');
    }
    if node.kwarg_bool("dotall") {
        flags.push('s');
    }
    hook_or_value(
        node,
        "pattern",
        |schema, field| format!("new RegExp({}, {})", hook(schema, field), wrap_double_quotes(&flags)),
        |value| {
            let pattern = value.as_str().unwrap_or_default().replace("(?P<", "(?<");
            format!("/{}/{flags}", js_regex_body(&pattern))
        },
    )
}

/// Python-style `\1` backreferences become `$1`; literal `$` is escaped.
fn replacement(repl: &str) -> String {
    let mut out = String::with_capacity(repl.len());
    let mut chars = repl.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '$' => out.push_str("$$"),
            '\\' if chars.peek().is_some_and(|d| d.is_ascii_digit()) => out.push('$'),
            c => out.push(c),
        }
    }
    wrap_double_quotes(&out)
}

/// Template literal with the `{{}}` placeholder bound to `var`.
fn template(fmt: &str, var: &str) -> String {
    let escaped = fmt.replace('\\', "\\\\").replace('`', "\\`").replace("${", "\\${");
    format!("`{}`", escaped.replace("{{}}", &format!("${{{var}}}")))
}

fn jsdoc(doc: &str, indent: &str) -> String {
    let mut lines = vec![format!("{indent}/**")];
    lines.extend(doc.replace("*/", "*\\/").lines().map(|l| format!("{indent} * {l}").trim_end().to_string()));
    lines.push(format!("{indent} */"));
    lines.join("\n")
}

fn method_name(field: &str) -> String {
    format!("_parse{}", to_upper_camel_case(method_suffix(field)))
}

fn js_type(ty: VariableType) -> &'static str {
    use VariableType::*;
    match ty {
        Document => "Element",
        ListDocument => "Array<Element>",
        String => "string",
        ListString => "Array<string>",
        Int | Float => "number",
        ListInt | ListFloat => "Array<number>",
        Bool => "boolean",
        Null => "null",
        OptionalString => "string | null",
        OptionalListString => "Array<string> | null",
        OptionalInt | OptionalFloat => "number | null",
        OptionalListInt | OptionalListFloat => "Array<number> | null",
        Nested | Json | Any => "*",
        ListAny => "Array<*>",
    }
}

fn shape_type(shape: ReturnShape<'_>) -> String {
    match shape {
        ReturnShape::Nested { schema, kind: StructType::List } => format!("Array<T_{schema}>"),
        ReturnShape::Nested { schema, .. } => format!("T_{schema}"),
        ReturnShape::Json { name, is_array: true } => format!("Array<J_{name}>"),
        ReturnShape::Json { name, .. } => format!("J_{name}"),
        ReturnShape::Value(ty) => js_type(ty).to_string(),
    }
}

fn empty(_: &NodeRef<'_>) -> Out {
    Ok(String::new())
}

// -------------------------------- Module ---------------------------------- //

fn code_end(node: &NodeRef<'_>) -> Out {
    let names: Vec<&str> = node
        .module()
        .root()
        .children()
        .filter(|c| c.kind() == TokenKind::Struct)
        .filter_map(|c| c.kwarg_str("name"))
        .collect();
    if names.is_empty() {
        return Ok(String::new());
    }
    Ok(format!("export {{ {} }};", names.join(", ")))
}

fn close_jsdoc(_: &NodeRef<'_>) -> Out {
    Ok(" */\n".into())
}

fn json_field(node: &NodeRef<'_>) -> Out {
    let name = kwarg_str(node, "name")?;
    let reference = node.kwarg_str("ref").unwrap_or_default();
    let ty = match kwarg_str(node, "json_type")? {
        "number" | "float" => "number".to_string(),
        "string" => "string".to_string(),
        "boolean" => "boolean".to_string(),
        "null" => "null".to_string(),
        "object" => format!("J_{reference}"),
        "array_objects" => format!("Array<J_{reference}>"),
        "array_number" | "array_float" => "Array<number>".to_string(),
        "array_string" => "Array<string>".to_string(),
        "array_boolean" => "Array<boolean>".to_string(),
        "optional_number" | "optional_float" => "number | null".to_string(),
        "optional_string" => "string | null".to_string(),
        "optional_boolean" => "boolean | null".to_string(),
        _ => "Array<*>".to_string(),
    };
    Ok(format!(" * @property {{{ty}}} {name}"))
}

fn typedef_dict(node: &NodeRef<'_>) -> Out {
    let name = kwarg_str(node, "name")?;
    let value = typedef_field(node, VALUE).map(|f| shape_type(typedef_field_shape(&f)));
    Ok(format!("/** @typedef {{Object<string, {}>}} T_{name} */\n", value.unwrap_or_else(|| "*".into())))
}

fn typedef_flat_list(node: &NodeRef<'_>) -> Out {
    let name = kwarg_str(node, "name")?;
    let item = typedef_field(node, ITEM).map(|f| shape_type(typedef_field_shape(&f)));
    Ok(format!("/** @typedef {{Array<{}>}} T_{name} */\n", item.unwrap_or_else(|| "*".into())))
}

// -------------------------------- Structs --------------------------------- //

fn struct_header(node: &NodeRef<'_>) -> Out {
    let name = kwarg_str(node, "name")?;
    match node.kwarg_str("docstring").filter(|d| !d.is_empty()) {
        Some(doc) => Ok(format!("{}\nclass {name} {{", jsdoc(doc, ""))),
        None => Ok(format!("class {name} {{")),
    }
}

fn init(_: &NodeRef<'_>) -> Out {
    Ok([
        "    /**",
        "     * @param {string | Document | Element} doc",
        "     */",
        "    constructor(doc) {",
        "        this._doc = typeof doc === \"string\" ? new DOMParser().parseFromString(doc, \"text/html\") : doc;",
        "    }",
        "",
    ]
    .join("\n"))
}

fn start_parse_header(node: &NodeRef<'_>) -> Out {
    let name = kwarg_str(node, "name")?;
    let ret = match node.struct_type() {
        Some(StructType::List) => format!("Array<T_{name}>"),
        _ => format!("T_{name}"),
    };
    let mut code = format!("    /**\n     * @returns {{{ret}}}\n     */\n    parse() {{");
    if have_pre_validate_call(node) {
        code.push_str(&format!("\n{BODY}this._preValidate(this._doc);"));
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
                entries.push(format!("{}: {owner}.{name}", wrap_double_quotes(name)));
            }
            _ if name == PRE_VALIDATE || name == SPLIT_DOC => {}
            _ => entries.push(format!("{}: this.{}({doc})", wrap_double_quotes(name), method_name(name))),
        }
    }
    Ok(entries)
}

fn object_literal(entries: &[String], indent: &str) -> String {
    if entries.is_empty() {
        return "{}".into();
    }
    let body: Vec<String> = entries.iter().map(|e| format!("{indent}    {e},")).collect();
    format!("{{\n{}\n{indent}}}", body.join("\n"))
}

const PARTS: &str = "Array.from(this._splitDoc(this._doc))";

fn start_parse_item(node: &NodeRef<'_>) -> Out {
    let entries = parse_entries(node, "this._doc")?;
    Ok(format!("{BODY}return {};\n    }}", object_literal(&entries, BODY)))
}

fn start_parse_list(node: &NodeRef<'_>) -> Out {
    let entries = parse_entries(node, "e")?;
    Ok(format!("{BODY}return {PARTS}.map((e) => ({}));\n    }}", object_literal(&entries, BODY)))
}

fn start_parse_dict(_: &NodeRef<'_>) -> Out {
    Ok(format!(
        "{BODY}return Object.fromEntries({PARTS}.map((e) => [this.{}(e), this.{}(e)]));\n    }}",
        method_name(KEY),
        method_name(VALUE)
    ))
}

fn start_parse_flat_list(_: &NodeRef<'_>) -> Out {
    Ok(format!("{BODY}return {PARTS}.map((e) => this.{}(e));\n    }}", method_name(ITEM)))
}

fn start_parse_acc_list(node: &NodeRef<'_>) -> Out {
    let calls: Vec<String> = node
        .children()
        .filter(|c| c.kind() == TokenKind::CallStructMethod)
        .filter_map(|c| c.kwarg_str("name"))
        .filter(|name| *name != PRE_VALIDATE)
        .map(|name| format!("this.{}(this._doc)", method_name(name)))
        .collect();
    Ok(format!("{BODY}return [...new Set([{}].flat())];\n    }}", calls.join(", ")))
}

// ------------------------------- Selectors -------------------------------- //

fn register_selectors(conv: &mut Converter) {
    use TokenKind::*;
    conv.pre(Css, |n| query(n, |p, q| format!("{p}.querySelector({q})")))
        .pre(CssAll, |n| query(n, |p, q| format!("Array.from({p}.querySelectorAll({q}))")))
        .pre(Xpath, |n| query(n, |p, q| format!("sscXpath({p}, {q})")))
        .pre(XpathAll, |n| query(n, |p, q| format!("sscXpathAll({p}, {q})")))
        .pre(Attr, attr)
        .pre(AttrAll, |n| {
            let keys = string_array(&n.kwarg_strings("key"));
            assign(n, |p| {
                format!("{p}.flatMap((e) => {keys}.map((k) => e.getAttribute(k))).filter((a) => a !== null)")
            })
        })
        .pre(Text, |n| assign(n, |p| format!("{p}.textContent")))
        .pre(TextAll, |n| assign(n, |p| format!("{p}.map((e) => e.textContent)")))
        .pre(Raw, |n| assign(n, |p| format!("{p}.outerHTML")))
        .pre(RawAll, |n| assign(n, |p| format!("{p}.map((e) => e.outerHTML)")));
}

fn query(node: &NodeRef<'_>, expr: impl FnOnce(&str, &str) -> String) -> Out {
    let q = hooked(node, "query")?;
    assign(node, |p| expr(p, &q))
}

fn attr(node: &NodeRef<'_>) -> Out {
    match node.kwarg_strings("key").as_slice() {
        [key] => {
            let key = hook_or_value(node, "key", hook, |_| wrap_double_quotes(key))?;
            assign(node, |p| format!("sscAttr({p}, {key})"))
        }
        keys => {
            let keys = string_array(keys);
            assign(node, |p| format!("{keys}.map((k) => {p}.getAttribute(k)).filter((a) => a !== null)"))
        }
    }
}

// -------------------------------- Strings --------------------------------- //

fn register_strings(conv: &mut Converter) {
    use TokenKind::*;
    conv.pre(Trim, |n| trim(n, "trim", "sscTrim", false))
        .pre(LTrim, |n| trim(n, "trimStart", "sscLTrim", false))
        .pre(RTrim, |n| trim(n, "trimEnd", "sscRTrim", false))
        .pre(ListTrim, |n| trim(n, "trim", "sscTrim", true))
        .pre(ListLTrim, |n| trim(n, "trimStart", "sscLTrim", true))
        .pre(ListRTrim, |n| trim(n, "trimEnd", "sscRTrim", true))
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
            let re = regex(n, "")?;
            let group = kwarg_i64(n, "group")?;
            assign(n, |p| format!("{p}.match({re})[{group}]"))
        })
        .pre(RegexAll, |n| {
            let re = regex(n, "g")?;
            assign(n, |p| format!("Array.from({p}.matchAll({re}), (m) => m[1] ?? m[0])"))
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
        None => map_or_apply(node, is_list, |v| template(fmt, v)),
    }
}

fn call_with_substr(node: &NodeRef<'_>, func: &str, times: usize, is_list: bool) -> Out {
    let substr = hooked(node, "substr")?;
    let args = vec![substr; times].join(", ");
    map_or_apply(node, is_list, |v| format!("{func}({v}, {args})"))
}

fn regex_sub(node: &NodeRef<'_>, is_list: bool) -> Out {
    let re = regex(node, "g")?;
    let repl = hook_or_value(node, "repl", hook, |v| replacement(v.as_str().unwrap_or_default()))?;
    map_or_apply(node, is_list, |v| format!("{v}.replace({re}, {repl})"))
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
    .pre(Unique, |n| assign(n, |p| format!("[...new Set({p})]")))
    .pre(ToInt, |n| map_or_apply(n, false, |v| format!("sscToInt({v})")))
    .pre(ListToInt, |n| map_or_apply(n, true, |v| format!("sscToInt({v})")))
    .pre(ToFloat, |n| map_or_apply(n, false, |v| format!("sscToFloat({v})")))
    .pre(ListToFloat, |n| map_or_apply(n, true, |v| format!("sscToFloat({v})")))
    .pre(ToBool, |n| assign(n, |p| format!("sscToBool({p})")))
    .pre(Jsonify, |n| {
        let path: String = jsonify_query_parse(n.kwarg_str("query").unwrap_or_default())
            .into_iter()
            .map(|part| match part {
                JsonPathPart::Key(key) => format!("[{}]", wrap_double_quotes(key)),
                JsonPathPart::Index(i) => format!("[{i}]"),
            })
            .collect();
        assign(n, |p| format!("JSON.parse({p}){path}"))
    });
}

// ------------------------------- Assertions ------------------------------- //

fn register_checks(conv: &mut Converter) {
    use TokenKind::*;
    conv.pre(IsEqual, |n| {
        let item = hooked(n, "item")?;
        assertion(n, |p| format!("{p} === {item}"))
    })
    .pre(IsNotEqual, |n| {
        let item = hooked(n, "item")?;
        assertion(n, |p| format!("{p} !== {item}"))
    })
    .pre(IsContains, |n| {
        let item = hooked(n, "item")?;
        assertion(n, |p| format!("{p}.includes({item})"))
    })
    .pre(IsCss, |n| is_query(n, |p, q| format!("{p}.querySelector({q})")))
    .pre(IsXpath, |n| is_query(n, |p, q| format!("sscXpath({p}, {q})")))
    .pre(IsRegex, |n| {
        let re = regex(n, "")?;
        assertion(n, |p| format!("{re}.test({p})"))
    })
    .pre(AnyIsRegex, |n| {
        let re = regex(n, "")?;
        assertion(n, |p| format!("{p}.some((i) => {re}.test(i))"))
    })
    .pre(AllIsRegex, |n| {
        let re = regex(n, "")?;
        assertion(n, |p| format!("{p}.every((i) => {re}.test(i))"))
    })
    .pre(HasAttr, |n| {
        let key = hooked(n, "key")?;
        let not = if n.kwarg_bool("invert") { "!" } else { "" };
        assertion(n, |p| format!("{not}{p}.hasAttribute({key})"))
    })
    .pre(ListHasAttr, |n| {
        let key = hooked(n, "key")?;
        let not = if n.kwarg_bool("invert") { "!" } else { "" };
        assertion(n, |p| format!("{p}.every((e) => {not}e.hasAttribute({key}))"))
    });
}

fn is_query(node: &NodeRef<'_>, expr: impl FnOnce(&str, &str) -> String) -> Out {
    let q = hooked(node, "query")?;
    let not = if node.kwarg_bool("invert") { "!" } else { "" };
    assertion(node, |p| format!("{not}{}", expr(p, &q)))
}

// -------------------------------- Filters --------------------------------- //

fn register_filters(conv: &mut Converter) {
    use TokenKind::*;
    conv.pre(Filter, |n| {
        let (prv, nxt) = prev_next_var(n);
        Ok(format!("{}let {nxt} = {prv}.filter((i) => ", indent(n)))
    })
    .post(Filter, |_| Ok(");".into()))
    .pre(FilterAnd, |n| Ok(format!("{}(", sep(n))))
    .post(FilterAnd, |_| Ok(")".into()))
    .pre(FilterOr, |n| Ok(format!("{}(", sep(n))))
    .post(FilterOr, |_| Ok(")".into()))
    .pre(FilterNot, |n| Ok(format!("{}!(", sep(n))))
    .post(FilterNot, |_| Ok(")".into()))
    .pre(FilterEq, |n| one_or_many(n, "values", |v| format!("i === {v}"), |a| format!("{a}.includes(i)")))
    .pre(FilterNe, |n| one_or_many(n, "values", |v| format!("i !== {v}"), |a| format!("!{a}.includes(i)")))
    .pre(FilterIn, |n| {
        one_or_many(n, "substr", |v| format!("i.includes({v})"), |a| format!("{a}.some((s) => i.includes(s))"))
    })
    .pre(FilterStarts, |n| {
        one_or_many(n, "substr", |v| format!("i.startsWith({v})"), |a| format!("{a}.some((s) => i.startsWith(s))"))
    })
    .pre(FilterEnds, |n| {
        one_or_many(n, "substr", |v| format!("i.endsWith({v})"), |a| format!("{a}.some((s) => i.endsWith(s))"))
    })
    .pre(FilterRe, |n| Ok(format!("{}{}.test(i)", sep(n), regex(n, "")?)))
    .pre(FilterLenEq, |n| length(n, "==="))
    .pre(FilterLenNe, |n| length(n, "!=="))
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
        [value] => one(wrap_double_quotes(value)),
        values => many(string_array(values)),
    };
    Ok(format!("{}{cond}", sep(node)))
}

fn length(node: &NodeRef<'_>, op: &str) -> Out {
    Ok(format!("{}i.length {op} {}", sep(node), kwarg_i64(node, "length")?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_literal_binds_placeholder() {
        assert_eq!(template("https://x.test/{{}}", "v1"), "`https://x.test/${v1}`");
        assert_eq!(template("a`b${c}{{}}", "i"), "`a\\`b\\${c}${i}`");
    }

    #[test]
    fn replacement_backrefs() {
        assert_eq!(replacement(r"\1-$"), "\"$1-$$\"");
        assert_eq!(replacement("x"), "\"x\"");
    }

    #[test]
    fn jsdoc_block() {
        assert_eq!(jsdoc("a\n\nb", ""), "/**\n * a\n *\n * b\n */");
        assert_eq!(method_name("__KEY__"), "_parseKey");
        assert_eq!(method_name("price_color"), "_parsePriceColor");
    }
}
