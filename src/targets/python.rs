//! Python targets: one shared callback table, specialised per HTML library.
//!
//! Generated classes take raw HTML or a parsed document, keep it as
//! `self._document` and expose `parse()`. Every field becomes a
//! `_parse_<name>` method whose body is a chain of `vN = ...` assignments.
pub mod bs4;
pub mod lxml;
pub mod parsel;
pub mod selectolax;

use serde_json::Value;

use super::templates::{PY_HELPERS, PY_IMPORTS};
use crate::ast::NodeRef;
use crate::emitter::helpers::{
    ReturnShape, filter_sep, have_default_expr, have_pre_validate_call, hook_or_value, is_last_var_no_ret,
    jsonify_query_parse, JsonPathPart, kwarg, kwarg_i64, kwarg_str, method_suffix, prev_next_var, return_shape,
    typedef_field, typedef_field_shape,
};
use crate::emitter::{Converter, EmitError};
use crate::regex_utils::with_inline_flags;
use crate::str_utils::py_repr;
use crate::tokens::{ITEM, KEY, PRE_VALIDATE, SPLIT_DOC, StructType, TokenKind, VALUE, VariableType};

type Out = Result<String, EmitError>;

/// HTML library a Python target is written against.
pub trait Flavor {
    const NAME: &'static str;
    const IMPORTS: &'static str;
    /// Annotation of one parsed element.
    const DOC: &'static str;
    const DOC_LIST: &'static str;

    /// Selector, extraction and constructor callbacks.
    fn register(conv: &mut Converter);
}

pub fn converter<F: Flavor>() -> Converter {
    use TokenKind::*;
    let mut conv = Converter::new(F::NAME, "# ");
    conv.pre(Module, empty)
        .pre(Docstring, docstring)
        .pre(Imports, imports::<F>)
        .pre(TransformImports, empty)
        .pre(Utilities, utilities)
        .pre(CodeStart, empty)
        .pre(CodeEnd, empty)
        .pre(JsonStruct, json_struct)
        .post(JsonStruct, close_typed_dict)
        .pre(JsonField, json_field)
        .pre(Typedef, typedef_typed_dict)
        .post(Typedef, close_typed_dict)
        .pre_for(Typedef, StructType::Dict, typedef_dict::<F>)
        .post_for(Typedef, StructType::Dict, empty)
        .pre_for(Typedef, StructType::FlatList, typedef_flat_list::<F>)
        .post_for(Typedef, StructType::FlatList, empty)
        .pre_for(Typedef, StructType::AccList, typedef_acc_list)
        .post_for(Typedef, StructType::AccList, empty)
        .pre(TypedefField, typedef_field_line::<F>)
        .pre_for(TypedefField, StructType::Dict, empty)
        .pre_for(TypedefField, StructType::FlatList, empty)
        .pre_for(TypedefField, StructType::AccList, empty)
        .pre(Struct, struct_header)
        .post(Struct, struct_footer)
        .pre(Classvar, classvar)
        .pre(StructPreValidate, pre_validate_header::<F>)
        .pre(StructPartDoc, split_doc_header::<F>)
        .pre(StructField, field_header::<F>)
        .pre(StartParse, start_parse_header)
        .post(StartParse, start_parse_item)
        .post_for(StartParse, StructType::List, start_parse_list)
        .post_for(StartParse, StructType::Dict, start_parse_dict)
        .post_for(StartParse, StructType::FlatList, start_parse_flat_list)
        .post_for(StartParse, StructType::AccList, start_parse_acc_list)
        .pre_many(&[CallStructMethod, CallStructClassvar], empty)
        .pre(DefaultStart, default_start)
        .pre(DefaultEnd, default_end)
        .pre(Return, ret)
        .pre(NoReturn, no_ret)
        .pre(Nested, nested);
    register_strings(&mut conv);
    register_lists(&mut conv);
    register_checks(&mut conv);
    register_filters(&mut conv);
    F::register(&mut conv);
    conv
}

// ------------------------------ Formatting -------------------------------- //

const BODY: &str = "        ";
const DEFAULT_BODY: &str = "            ";

pub(crate) fn indent(node: &NodeRef<'_>) -> &'static str {
    if have_default_expr(node) { DEFAULT_BODY } else { BODY }
}

/// `vN = <expr(prev)>` at body indentation.
pub(crate) fn assign(node: &NodeRef<'_>, expr: impl FnOnce(&str) -> String) -> Out {
    let (prv, nxt) = prev_next_var(node);
    Ok(format!("{}{nxt} = {}", indent(node), expr(&prv)))
}

/// `assert <cond(prev)>, msg` and, unless the method ends here, pass the
/// value through.
pub(crate) fn assertion(node: &NodeRef<'_>, cond: impl FnOnce(&str) -> String) -> Out {
    let (prv, nxt) = prev_next_var(node);
    let msg = py_repr(kwarg_str(node, "msg")?);
    let ind = indent(node);
    let mut code = format!("{ind}assert {}, {msg}", cond(&prv));
    if !is_last_var_no_ret(node) {
        code.push_str(&format!("\n{ind}{nxt} = {prv}"));
    }
    Ok(code)
}

pub(crate) fn literal(value: &Value) -> String {
    match value {
        Value::Null => "None".into(),
        Value::Bool(true) => "True".into(),
        Value::Bool(false) => "False".into(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => py_repr(s),
        Value::Array(items) => format!("[{}]", items.iter().map(literal).collect::<Vec<_>>().join(", ")),
        Value::Object(map) => {
            let items: Vec<String> = map.iter().map(|(k, v)| format!("{}: {}", py_repr(k), literal(v))).collect();
            format!("{{{}}}", items.join(", "))
        }
    }
}

/// Python tuple of string literals; keeps the trailing comma of a 1-tuple.
pub(crate) fn tuple(items: &[&str]) -> String {
    let parts: Vec<String> = items.iter().map(|s| py_repr(s)).collect();
    match parts.len() {
        1 => format!("({},)", parts[0]),
        _ => format!("({})", parts.join(", ")),
    }
}

fn hook(schema: &str, field: &str) -> String {
    format!("{schema}.{field}")
}

/// `key` as Python source: `Schema.FIELD` when hooked, else the literal.
pub(crate) fn hooked(node: &NodeRef<'_>, key: &str) -> Out {
    hook_or_value(node, key, hook, literal)
}

/// Classvar reference for a hooked `key`, else `fallback`.
pub(crate) fn hooked_or(node: &NodeRef<'_>, key: &str, fallback: String) -> Out {
    hook_or_value(node, key, hook, |_| fallback.clone())
}

/// Pattern literal with inline flags; a hooked pattern gets the flags
/// prepended at runtime.
fn regex(node: &NodeRef<'_>) -> Out {
    let ignore_case = node.kwarg_bool("ignore_case");
    let dotall = node.kwarg_bool("dotall");
    let flags = with_inline_flags("", ignore_case, dotall);
    hook_or_value(
        node,
        "pattern",
        |schema, field| match flags.as_str() {
            "" => hook(schema, field),
            flags => format!("{} + {}", py_repr(flags), hook(schema, field)),
        },
        |value| py_repr(&with_inline_flags(value.as_str().unwrap_or_default(), ignore_case, dotall)),
    )
}

fn docstring_block(doc: &str, indent: &str) -> String {
    let doc = doc.replace('\\', "\\\\").replace("\"\"\"", "\\\"\\\"\\\"");
    let mut lines = vec![format!("{indent}\"\"\"")];
    lines.extend(doc.lines().map(|l| if l.is_empty() { String::new() } else { format!("{indent}{l}") }));
    lines.push(format!("{indent}\"\"\""));
    lines.join("\n")
}

pub(crate) fn py_type<F: Flavor>(ty: VariableType) -> String {
    use VariableType::*;
    match ty {
        Document => F::DOC.into(),
        ListDocument => F::DOC_LIST.into(),
        String => "str".into(),
        ListString => "List[str]".into(),
        Int => "int".into(),
        ListInt => "List[int]".into(),
        Float => "float".into(),
        ListFloat => "List[float]".into(),
        Bool => "bool".into(),
        Null => "None".into(),
        OptionalString => "Optional[str]".into(),
        OptionalListString => "Optional[List[str]]".into(),
        OptionalInt => "Optional[int]".into(),
        OptionalListInt => "Optional[List[int]]".into(),
        OptionalFloat => "Optional[float]".into(),
        OptionalListFloat => "Optional[List[float]]".into(),
        Nested | Json | Any => "Any".into(),
        ListAny => "List[Any]".into(),
    }
}

fn shape_type<F: Flavor>(shape: ReturnShape<'_>) -> String {
    match shape {
        ReturnShape::Nested { schema, kind: StructType::List } => format!("List['T_{schema}']"),
        ReturnShape::Nested { schema, .. } => format!("'T_{schema}'"),
        ReturnShape::Json { name, is_array: true } => format!("List['J_{name}']"),
        ReturnShape::Json { name, .. } => format!("'J_{name}'"),
        ReturnShape::Value(ty) => py_type::<F>(ty),
    }
}

fn empty(_: &NodeRef<'_>) -> Out {
    Ok(String::new())
}

// -------------------------------- Module ---------------------------------- //

fn docstring(node: &NodeRef<'_>) -> Out {
    Ok(docstring_block(kwarg_str(node, "value")?, ""))
}

fn imports<F: Flavor>(_: &NodeRef<'_>) -> Out {
    Ok(format!("{PY_IMPORTS}\n{}\n", F::IMPORTS))
}

fn utilities(_: &NodeRef<'_>) -> Out {
    Ok(format!("{PY_HELPERS}\n"))
}

fn json_struct(node: &NodeRef<'_>) -> Out {
    let name = kwarg_str(node, "name")?;
    Ok(format!("J_{name} = TypedDict('J_{name}', {{"))
}

fn json_field(node: &NodeRef<'_>) -> Out {
    let name = kwarg_str(node, "name")?;
    let reference = node.kwarg_str("ref").unwrap_or_default();
    let ty = match kwarg_str(node, "json_type")? {
        "number" => "int".to_string(),
        "string" => "str".to_string(),
        "float" => "float".to_string(),
        "boolean" => "bool".to_string(),
        "null" => "None".to_string(),
        "object" => format!("'J_{reference}'"),
        "array_objects" => format!("List['J_{reference}']"),
        "array_number" => "List[int]".to_string(),
        "array_string" => "List[str]".to_string(),
        "array_float" => "List[float]".to_string(),
        "array_boolean" => "List[bool]".to_string(),
        "optional_number" => "Optional[int]".to_string(),
        "optional_string" => "Optional[str]".to_string(),
        "optional_float" => "Optional[float]".to_string(),
        "optional_boolean" => "Optional[bool]".to_string(),
        _ => "List[Any]".to_string(),
    };
    Ok(format!("    {}: {ty},", py_repr(name)))
}

fn close_typed_dict(_: &NodeRef<'_>) -> Out {
    Ok("})\n".into())
}

fn typedef_typed_dict(node: &NodeRef<'_>) -> Out {
    let name = kwarg_str(node, "name")?;
    Ok(format!("T_{name} = TypedDict('T_{name}', {{"))
}

fn typedef_dict<F: Flavor>(node: &NodeRef<'_>) -> Out {
    let name = kwarg_str(node, "name")?;
    let value = typedef_field(node, VALUE).map(|f| shape_type::<F>(typedef_field_shape(&f)));
    Ok(format!("T_{name} = Dict[str, {}]\n", value.unwrap_or_else(|| "Any".into())))
}

fn typedef_flat_list<F: Flavor>(node: &NodeRef<'_>) -> Out {
    let name = kwarg_str(node, "name")?;
    let item = typedef_field(node, ITEM).map(|f| shape_type::<F>(typedef_field_shape(&f)));
    Ok(format!("T_{name} = List[{}]\n", item.unwrap_or_else(|| "Any".into())))
}

fn typedef_acc_list(node: &NodeRef<'_>) -> Out {
    Ok(format!("T_{} = List[str]\n", kwarg_str(node, "name")?))
}

fn typedef_field_line<F: Flavor>(node: &NodeRef<'_>) -> Out {
    let name = kwarg_str(node, "name")?;
    Ok(format!("    {}: {},", py_repr(name), shape_type::<F>(typedef_field_shape(node))))
}

// -------------------------------- Structs --------------------------------- //

fn struct_header(node: &NodeRef<'_>) -> Out {
    let name = kwarg_str(node, "name")?;
    let doc = node.kwarg_str("docstring").unwrap_or_default();
    if doc.is_empty() {
        return Ok(format!("class {name}:"));
    }
    Ok(format!("class {name}:\n{}", docstring_block(doc, "    ")))
}

fn struct_footer(node: &NodeRef<'_>) -> Out {
    let has_doc = node.kwarg_str("docstring").is_some_and(|d| !d.is_empty());
    if node.children().next().is_none() && !has_doc {
        return Ok("    pass\n".into());
    }
    Ok("\n".into())
}

fn classvar(node: &NodeRef<'_>) -> Out {
    let name = kwarg_str(node, "name")?;
    let value = match kwarg(node, "value")? {
        Value::String(s) if s.contains(FORMAT_MARK) => format_template(s),
        other => literal(other),
    };
    Ok(format!("    {name}: ClassVar[{}] = {value}", classvar_type(node.ret_type())))
}

fn classvar_type(ty: VariableType) -> &'static str {
    match ty {
        VariableType::String => "str",
        VariableType::Int => "int",
        VariableType::Float => "float",
        VariableType::Bool => "bool",
        VariableType::Null => "None",
        VariableType::ListString => "List[str]",
        VariableType::ListInt => "List[int]",
        VariableType::ListFloat => "List[float]",
        _ => "Any",
    }
}

fn pre_validate_header<F: Flavor>(_: &NodeRef<'_>) -> Out {
    Ok(format!("    def _pre_validate(self, v: {}) -> None:", F::DOC))
}

fn split_doc_header<F: Flavor>(_: &NodeRef<'_>) -> Out {
    Ok(format!("    def _split_doc(self, v: {}) -> {}:", F::DOC, F::DOC_LIST))
}

fn field_header<F: Flavor>(node: &NodeRef<'_>) -> Out {
    let name = kwarg_str(node, "name")?;
    let ret = shape_type::<F>(return_shape(node));
    Ok(format!("    def _parse_{}(self, v: {}) -> {ret}:", method_suffix(name), F::DOC))
}

fn start_parse_header(node: &NodeRef<'_>) -> Out {
    let name = kwarg_str(node, "name")?;
    let ret = match node.struct_type() {
        Some(StructType::List) => format!("List[T_{name}]"),
        _ => format!("T_{name}"),
    };
    let mut code = format!("    def parse(self) -> {ret}:");
    if have_pre_validate_call(node) {
        code.push_str(&format!("\n{BODY}self._pre_validate(self._document)"));
    }
    Ok(code)
}

/// `'key': value` entries of the returned dict for `doc`.
fn parse_entries(node: &NodeRef<'_>, doc: &str) -> Result<Vec<String>, EmitError> {
    let mut entries = Vec::new();
    for call in node.children() {
        let name = kwarg_str(&call, "name")?;
        match call.kind() {
            TokenKind::CallStructClassvar => {
                let owner = kwarg_str(&call, "struct_name")?;
                entries.push(format!("{}: {owner}.{name}", py_repr(name)));
            }
            _ if name == PRE_VALIDATE || name == SPLIT_DOC => {}
            _ => entries.push(format!("{}: self._parse_{}({doc})", py_repr(name), method_suffix(name))),
        }
    }
    Ok(entries)
}

fn dict_literal(entries: &[String], indent: &str) -> String {
    if entries.is_empty() {
        return "{}".into();
    }
    let body: Vec<String> = entries.iter().map(|e| format!("{indent}    {e},")).collect();
    format!("{{\n{}\n{indent}}}", body.join("\n"))
}

fn start_parse_item(node: &NodeRef<'_>) -> Out {
    let entries = parse_entries(node, "self._document")?;
    Ok(format!("{BODY}return {}\n", dict_literal(&entries, BODY)))
}

fn start_parse_list(node: &NodeRef<'_>) -> Out {
    let entries = parse_entries(node, "el")?;
    Ok(format!(
        "{BODY}return [{} for el in self._split_doc(self._document)]\n",
        dict_literal(&entries, BODY)
    ))
}

fn start_parse_dict(_: &NodeRef<'_>) -> Out {
    Ok(format!(
        "{BODY}return {{self._parse_{}(el): self._parse_{}(el) for el in self._split_doc(self._document)}}\n",
        method_suffix(KEY),
        method_suffix(VALUE)
    ))
}

fn start_parse_flat_list(_: &NodeRef<'_>) -> Out {
    Ok(format!(
        "{BODY}return [self._parse_{}(el) for el in self._split_doc(self._document)]\n",
        method_suffix(ITEM)
    ))
}

fn start_parse_acc_list(node: &NodeRef<'_>) -> Out {
    let calls: Vec<String> = node
        .children()
        .filter(|c| c.kind() == TokenKind::CallStructMethod)
        .filter_map(|c| c.kwarg_str("name"))
        .filter(|name| *name != PRE_VALIDATE)
        .map(|name| format!("self._parse_{}(self._document)", method_suffix(name)))
        .collect();
    if calls.is_empty() {
        return Ok(format!("{BODY}return []\n"));
    }
    Ok(format!("{BODY}return list(set({}))\n", calls.join(" + ")))
}

// ------------------------------ Control flow ------------------------------ //

fn default_start(node: &NodeRef<'_>) -> Out {
    let (prv, nxt) = prev_next_var(node);
    Ok(format!("{BODY}{nxt} = {prv}\n{BODY}with suppress(Exception):"))
}

fn default_end(node: &NodeRef<'_>) -> Out {
    Ok(format!("{BODY}return {}\n", hooked(node, "value")?))
}

fn ret(node: &NodeRef<'_>) -> Out {
    let (prv, _) = prev_next_var(node);
    let trailer = if have_default_expr(node) { "" } else { "\n" };
    Ok(format!("{}return {prv}{trailer}", indent(node)))
}

fn no_ret(node: &NodeRef<'_>) -> Out {
    Ok(format!("{}return None\n", indent(node)))
}

fn nested(node: &NodeRef<'_>) -> Out {
    let schema = kwarg_str(node, "schema_name")?;
    assign(node, |p| format!("{schema}({p}).parse()"))
}

// -------------------------------- Strings --------------------------------- //

fn register_strings(conv: &mut Converter) {
    use TokenKind::*;
    conv.pre(Trim, |n| strip(n, "strip", false))
        .pre(LTrim, |n| strip(n, "lstrip", false))
        .pre(RTrim, |n| strip(n, "rstrip", false))
        .pre(ListTrim, |n| strip(n, "strip", true))
        .pre(ListLTrim, |n| strip(n, "lstrip", true))
        .pre(ListRTrim, |n| strip(n, "rstrip", true))
        .pre(Replace, |n| replace(n, false))
        .pre(ListReplace, |n| replace(n, true))
        .pre(MapReplace, |n| map_replace(n, false))
        .pre(ListMapReplace, |n| map_replace(n, true))
        .pre(Format, |n| format_str(n, false))
        .pre(ListFormat, |n| format_str(n, true))
        .pre(Split, split)
        .pre(RmPrefix, |n| call_with_substr(n, "ssc_rm_prefix", false))
        .pre(ListRmPrefix, |n| call_with_substr(n, "ssc_rm_prefix", true))
        .pre(RmSuffix, |n| call_with_substr(n, "ssc_rm_suffix", false))
        .pre(ListRmSuffix, |n| call_with_substr(n, "ssc_rm_suffix", true))
        .pre(RmPrefixAndSuffix, |n| rm_prefix_and_suffix(n, false))
        .pre(ListRmPrefixAndSuffix, |n| rm_prefix_and_suffix(n, true))
        .pre(Unescape, |n| assign(n, |p| format!("ssc_unescape({p})")))
        .pre(ListUnescape, |n| assign(n, |p| format!("[ssc_unescape(i) for i in {p}]")))
        .pre(Regex, regex_search)
        .pre(RegexAll, |n| {
            let re = regex(n)?;
            assign(n, |p| format!("re.findall({re}, {p})"))
        })
        .pre(RegexSub, |n| regex_sub(n, false))
        .pre(ListRegexSub, |n| regex_sub(n, true));
}

/// Apply `call(i)` to the value, or to every item of a list value.
fn map_or_apply(node: &NodeRef<'_>, is_list: bool, call: impl Fn(&str) -> String) -> Out {
    if is_list {
        assign(node, |p| format!("[{} for i in {p}]", call("i")))
    } else {
        assign(node, |p| call(p))
    }
}

fn strip(node: &NodeRef<'_>, method: &str, is_list: bool) -> Out {
    let chars = match node.kwarg("substr") {
        Some(Value::String(_)) => hooked(node, "substr")?,
        _ => String::new(),
    };
    map_or_apply(node, is_list, |v| format!("{v}.{method}({chars})"))
}

fn replace(node: &NodeRef<'_>, is_list: bool) -> Out {
    let old = hooked(node, "old")?;
    let new = hooked(node, "new")?;
    map_or_apply(node, is_list, |v| format!("{v}.replace({old}, {new})"))
}

fn map_replace(node: &NodeRef<'_>, is_list: bool) -> Out {
    let old = hooked(node, "old")?;
    let new = hooked(node, "new")?;
    map_or_apply(node, is_list, |v| format!("ssc_map_replace({v}, {old}, {new})"))
}

const FORMAT_MARK: &str = "{{}}";

/// `'a{}b'.format(v)` with literal braces escaped; the placeholder is `{{}}`.
/// Class variables holding a template are emitted in this form too, so a
/// hooked `fmt` is `Schema.FIELD.format(v)`.
pub(crate) fn format_template(fmt: &str) -> String {
    const MARK: char = '\u{0}';
    let escaped = fmt.replace(FORMAT_MARK, &MARK.to_string()).replace('{', "{{").replace('}', "}}");
    py_repr(&escaped.replace(MARK, "{}"))
}

fn format_str(node: &NodeRef<'_>, is_list: bool) -> Out {
    let template = hook_or_value(node, "fmt", hook, |v| format_template(v.as_str().unwrap_or_default()))?;
    map_or_apply(node, is_list, |v| format!("{template}.format({v})"))
}

fn split(node: &NodeRef<'_>) -> Out {
    let sep = hooked(node, "sep")?;
    assign(node, |p| format!("{p}.split({sep})"))
}

fn call_with_substr(node: &NodeRef<'_>, func: &str, is_list: bool) -> Out {
    let substr = hooked(node, "substr")?;
    map_or_apply(node, is_list, |v| format!("{func}({v}, {substr})"))
}

fn rm_prefix_and_suffix(node: &NodeRef<'_>, is_list: bool) -> Out {
    let substr = hooked(node, "substr")?;
    map_or_apply(node, is_list, |v| format!("ssc_rm_prefix_and_suffix({v}, {substr}, {substr})"))
}

fn regex_search(node: &NodeRef<'_>) -> Out {
    let re = regex(node)?;
    let group = kwarg_i64(node, "group")?;
    assign(node, |p| format!("re.search({re}, {p})[{group}]"))
}

fn regex_sub(node: &NodeRef<'_>, is_list: bool) -> Out {
    let re = regex(node)?;
    let repl = hooked(node, "repl")?;
    map_or_apply(node, is_list, |v| format!("re.sub({re}, {repl}, {v})"))
}

// --------------------------------- Lists ---------------------------------- //

fn register_lists(conv: &mut Converter) {
    use TokenKind::*;
    conv.pre(Index, |n| {
        let i = hooked(n, "index")?;
        assign(n, |p| format!("{p}[{i}]"))
    })
    .pre(Join, |n| {
        let sep = hooked(n, "sep")?;
        assign(n, |p| format!("{sep}.join({p})"))
    })
    .pre(Len, |n| assign(n, |p| format!("len({p})")))
    .pre(Unique, |n| {
        if n.kwarg_bool("keep_order") {
            assign(n, |p| format!("list(dict.fromkeys({p}))"))
        } else {
            assign(n, |p| format!("list(set({p}))"))
        }
    })
    .pre(ToInt, |n| assign(n, |p| format!("int({p})")))
    .pre(ListToInt, |n| assign(n, |p| format!("[int(i) for i in {p}]")))
    .pre(ToFloat, |n| assign(n, |p| format!("float({p})")))
    .pre(ListToFloat, |n| assign(n, |p| format!("[float(i) for i in {p}]")))
    .pre(ToBool, |n| assign(n, |p| format!("bool({p} or {p} == 0)")))
    .pre(Jsonify, jsonify);
}

fn jsonify(node: &NodeRef<'_>) -> Out {
    let path: String = jsonify_query_parse(node.kwarg_str("query").unwrap_or_default())
        .into_iter()
        .map(|part| match part {
            JsonPathPart::Key(key) => format!("[{}]", py_repr(key)),
            JsonPathPart::Index(i) => format!("[{i}]"),
        })
        .collect();
    assign(node, |p| format!("json.loads({p}){path}"))
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
        assertion(n, |p| format!("{item} in {p}"))
    })
    .pre(IsRegex, |n| {
        let re = regex(n)?;
        assertion(n, |p| format!("re.search({re}, {p})"))
    })
    .pre(AnyIsRegex, |n| {
        let re = regex(n)?;
        assertion(n, |p| format!("any(re.search({re}, i) for i in {p})"))
    })
    .pre(AllIsRegex, |n| {
        let re = regex(n)?;
        assertion(n, |p| format!("all(re.search({re}, i) for i in {p})"))
    });
}

// -------------------------------- Filters --------------------------------- //

fn register_filters(conv: &mut Converter) {
    use TokenKind::*;
    conv.pre(Filter, |n| {
        let (prv, nxt) = prev_next_var(n);
        Ok(format!("{}{nxt} = [i for i in {prv} if ", indent(n)))
    })
    .post(Filter, |_| Ok("]".into()))
    .pre(FilterAnd, |n| Ok(format!("{}(", sep(n))))
    .post(FilterAnd, |_| Ok(")".into()))
    .pre(FilterOr, |n| Ok(format!("{}(", sep(n))))
    .post(FilterOr, |_| Ok(")".into()))
    .pre(FilterNot, |n| Ok(format!("{}not (", sep(n))))
    .post(FilterNot, |_| Ok(")".into()))
    .pre(FilterEq, |n| one_or_many(n, "values", |v| format!("i == {v}"), |t| format!("i in {t}")))
    .pre(FilterNe, |n| one_or_many(n, "values", |v| format!("i != {v}"), |t| format!("i not in {t}")))
    .pre(FilterIn, |n| {
        one_or_many(n, "substr", |v| format!("{v} in i"), |t| format!("any(s in i for s in {t})"))
    })
    .pre(FilterStarts, |n| one_or_many(n, "substr", |v| format!("i.startswith({v})"), |t| format!("i.startswith({t})")))
    .pre(FilterEnds, |n| one_or_many(n, "substr", |v| format!("i.endswith({v})"), |t| format!("i.endswith({t})")))
    .pre(FilterRe, |n| Ok(format!("{}re.search({}, i)", sep(n), regex(n)?)))
    .pre(FilterLenEq, |n| length(n, "=="))
    .pre(FilterLenNe, |n| length(n, "!="))
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
    let values = node.kwarg_strings(key);
    let cond = match values.as_slice() {
        [] => return Err(EmitError::MissingKwarg { kind: node.kind(), key: key.to_string() }),
        [value] => one(py_repr(value)),
        values => many(tuple(values)),
    };
    Ok(format!("{}{cond}", sep(node)))
}

fn length(node: &NodeRef<'_>, op: &str) -> Out {
    Ok(format!("{}len(i) {op} {}", sep(node), kwarg_i64(node, "length")?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals() {
        assert_eq!(literal(&serde_json::json!(null)), "None");
        assert_eq!(literal(&serde_json::json!([1, "a", true])), "[1, 'a', True]");
        assert_eq!(tuple(&["a"]), "('a',)");
        assert_eq!(tuple(&["a", "b"]), "('a', 'b')");
    }

    #[test]
    fn format_template_escapes_braces() {
        assert_eq!(format_template("https://x.test/{{}}"), "'https://x.test/{}'");
        assert_eq!(format_template("{a}-{{}}"), "'{{a}}-{}'");
    }

    #[test]
    fn docstring_lines_are_indented() {
        assert_eq!(docstring_block("a\n\nb", "    "), "    \"\"\"\n    a\n\n    b\n    \"\"\"");
    }
}
