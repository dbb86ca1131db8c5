//! Go target over `github.com/PuerkitoBio/goquery`.
//!
//! Every fallible step returns `(value, error)`; a field with a default
//! turns errors into panics and recovers them in a deferred closure that
//! writes the default into the named result. XPath has no goquery
//! counterpart, so XPath kinds are rejected.
use serde_json::Value;

use super::templates::{GO_HELPERS, GO_IMPORTS};
use crate::ast::NodeRef;
use crate::emitter::helpers::{
    JsonPathPart, ReturnShape, filter_sep, have_default_expr, have_pre_validate_call, hook_or_value, is_last_var_no_ret,
    jsonify_query_parse, kwarg, kwarg_i64, kwarg_str, method_suffix, prev_next_var, return_shape, typedef_field,
    typedef_field_shape,
};
use crate::emitter::{Converter, EmitError};
use crate::regex_utils::with_inline_flags;
use crate::str_utils::{to_upper_camel_case, wrap_backtick, wrap_double_quotes};
use crate::tokens::{ITEM, KEY, PRE_VALIDATE, SPLIT_DOC, StructType, TokenKind, VALUE, VariableType};

type Out = Result<String, EmitError>;

pub const NAME: &str = "go::goquery";

pub fn converter() -> Converter {
    use TokenKind::*;
    let mut conv = Converter::new(NAME, "// ");
    conv.pre(Module, empty)
        .pre(Docstring, |n| Ok(comment(kwarg_str(n, "value")?)))
        .pre(Imports, |n| {
            let package = n.kwarg_str("package").unwrap_or("main");
            Ok(format!("package {package}\n\n{GO_IMPORTS}\n"))
        })
        .pre(TransformImports, empty)
        .pre(Utilities, |_| Ok(format!("{GO_HELPERS}\n")))
        .pre(CodeStart, empty)
        .pre(CodeEnd, empty)
        .pre(JsonStruct, |n| Ok(format!("type J{} struct {{", kwarg_str(n, "name")?)))
        .post(JsonStruct, close_block)
        .pre(JsonField, json_field)
        .pre(Typedef, |n| Ok(format!("type T{} struct {{", kwarg_str(n, "name")?)))
        .post(Typedef, close_block)
        .pre_for(Typedef, StructType::Dict, typedef_dict)
        .post_for(Typedef, StructType::Dict, empty)
        .pre_for(Typedef, StructType::FlatList, typedef_flat_list)
        .post_for(Typedef, StructType::FlatList, empty)
        .pre_for(Typedef, StructType::AccList, |n| Ok(format!("type T{} = []string\n", kwarg_str(n, "name")?)))
        .post_for(Typedef, StructType::AccList, empty)
        .pre(TypedefField, |n| {
            let name = kwarg_str(n, "name")?;
            Ok(struct_field(name, &shape_type(typedef_field_shape(n))))
        })
        .pre_for(TypedefField, StructType::Dict, empty)
        .pre_for(TypedefField, StructType::FlatList, empty)
        .pre_for(TypedefField, StructType::AccList, empty)
        .pre(Struct, struct_header)
        .pre_for(Struct, StructType::ConfigClassvars, config_vars)
        .pre(Classvar, empty)
        .pre(StructInit, init)
        .pre(StructPreValidate, |n| {
            Ok(format!("func (p *{}) preValidate(v *goquery.Selection) error {{", owner(n)?))
        })
        .pre(StructPartDoc, |n| {
            Ok(format!("func (p *{}) splitDoc(v *goquery.Selection) (*goquery.Selection, error) {{", owner(n)?))
        })
        .pre(StructField, field_header)
        .post_many(&[StructPreValidate, StructPartDoc, StructField], close_block)
        .pre(StartParse, start_parse_header)
        .post(StartParse, start_parse_item)
        .post_for(StartParse, StructType::List, |n| start_parse_loop(n, StructType::List))
        .post_for(StartParse, StructType::Dict, |n| start_parse_loop(n, StructType::Dict))
        .post_for(StartParse, StructType::FlatList, |n| start_parse_loop(n, StructType::FlatList))
        .post_for(StartParse, StructType::AccList, start_parse_acc_list)
        .pre_many(&[CallStructMethod, CallStructClassvar], empty)
        .pre(DefaultStart, default_start)
        .pre(DefaultEnd, empty)
        .pre(Return, ret)
        .pre(NoReturn, |_| Ok(format!("{BODY}return nil")))
        .pre(Nested, nested)
        .unsupported(&[Xpath, XpathAll, IsXpath]);
    register_selectors(&mut conv);
    register_strings(&mut conv);
    register_lists(&mut conv);
    register_checks(&mut conv);
    register_filters(&mut conv);
    conv
}

// ------------------------------ Formatting -------------------------------- //

const BODY: &str = "\t";

fn empty(_: &NodeRef<'_>) -> Out {
    Ok(String::new())
}

fn close_block(_: &NodeRef<'_>) -> Out {
    Ok("}\n".into())
}

fn comment(text: &str) -> String {
    text.lines()
        .map(|l| format!("// {l}").trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

fn struct_field(name: &str, ty: &str) -> String {
    format!("{BODY}{} {ty} `json:\"{name}\"`", exported(name))
}

/// Exported Go identifier for a field, classvar or method suffix.
fn exported(name: &str) -> String {
    to_upper_camel_case(method_suffix(name))
}

fn owner<'a>(node: &NodeRef<'a>) -> Result<&'a str, EmitError> {
    let st = node
        .enclosing_struct()
        .ok_or_else(|| EmitError::MissingKwarg { kind: node.kind(), key: "name".into() })?;
    kwarg_str(&st, "name")
}

fn go_type(ty: VariableType) -> &'static str {
    use VariableType::*;
    match ty {
        Document | ListDocument => "*goquery.Selection",
        String => "string",
        ListString => "[]string",
        Int => "int",
        ListInt => "[]int",
        Float => "float64",
        ListFloat => "[]float64",
        Bool => "bool",
        OptionalString => "*string",
        OptionalListString => "*[]string",
        OptionalInt => "*int",
        OptionalListInt => "*[]int",
        OptionalFloat => "*float64",
        OptionalListFloat => "*[]float64",
        Null | Nested | Json | Any => "any",
        ListAny => "[]any",
    }
}

fn shape_type(shape: ReturnShape<'_>) -> String {
    match shape {
        ReturnShape::Nested { schema, kind: StructType::List } => format!("[]T{schema}"),
        ReturnShape::Nested { schema, .. } => format!("T{schema}"),
        ReturnShape::Json { name, is_array: true } => format!("[]J{name}"),
        ReturnShape::Json { name, .. } => format!("J{name}"),
        ReturnShape::Value(ty) => go_type(ty).to_string(),
    }
}

fn zero_value(shape: ReturnShape<'_>) -> String {
    match shape {
        ReturnShape::Nested { schema, kind: StructType::Item } => format!("T{schema}{{}}"),
        ReturnShape::Json { name, is_array: false } => format!("J{name}{{}}"),
        ReturnShape::Nested { .. } | ReturnShape::Json { .. } => "nil".into(),
        ReturnShape::Value(VariableType::String) => "\"\"".into(),
        ReturnShape::Value(VariableType::Int | VariableType::Float) => "0".into(),
        ReturnShape::Value(VariableType::Bool) => "false".into(),
        ReturnShape::Value(_) => "nil".into(),
    }
}

fn literal(value: &Value, ty: VariableType) -> String {
    match value {
        Value::Null | Value::Object(_) => "nil".into(),
        Value::String(s) => wrap_double_quotes(s),
        Value::Array(items) => {
            let elem = match ty {
                VariableType::ListInt | VariableType::OptionalListInt => "int",
                VariableType::ListFloat | VariableType::OptionalListFloat => "float64",
                _ => "string",
            };
            let items: Vec<String> = items.iter().map(|v| literal(v, VariableType::Any)).collect();
            format!("[]{elem}{{{}}}", items.join(", "))
        }
        other => other.to_string(),
    }
}

fn string_slice(items: &[&str]) -> String {
    format!("[]string{{{}}}", items.iter().map(|s| wrap_double_quotes(s)).collect::<Vec<_>>().join(", "))
}

fn hook(schema: &str, field: &str) -> String {
    format!("{schema}Cfg.{}", exported(field))
}

fn hooked(node: &NodeRef<'_>, key: &str, ty: VariableType) -> Out {
    hook_or_value(node, key, hook, |v| literal(v, ty))
}

fn hooked_str(node: &NodeRef<'_>, key: &str) -> Out {
    hooked(node, key, VariableType::String)
}

fn regex(node: &NodeRef<'_>) -> Out {
    let ignore_case = node.kwarg_bool("ignore_case");
    let dotall = node.kwarg_bool("dotall");
    let pattern = hook_or_value(
        node,
        "pattern",
        |schema, field| {
            let flags = with_inline_flags("", ignore_case, dotall);
            if flags.is_empty() { hook(schema, field) } else { format!("{} + {}", wrap_backtick(&flags), hook(schema, field)) }
        },
        |v| wrap_backtick(&with_inline_flags(v.as_str().unwrap_or_default(), ignore_case, dotall)),
    )?;
    Ok(format!("regexp.MustCompile({pattern})"))
}

/// Python-style `\1` backreferences become `${1}`; literal `$` is escaped.
fn replacement(repl: &str) -> String {
    let mut out = String::with_capacity(repl.len());
    let mut chars = repl.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '$' => out.push_str("$$"),
            '\\' if chars.peek().is_some_and(|d| d.is_ascii_digit()) => {
                let mut group = String::new();
                while let Some(d) = chars.next_if(|d| d.is_ascii_digit()) {
                    group.push(d);
                }
                out.push_str(&format!("${{{group}}}"));
            }
            c => out.push(c),
        }
    }
    wrap_double_quotes(&out)
}

/// `fmt.Sprintf` template with the `{{}}` placeholder as `%s`.
fn sprintf_template(fmt: &str) -> String {
    wrap_double_quotes(&fmt.replace('%', "%%").replace("{{}}", "%s"))
}

// ----------------------------- Error plumbing ----------------------------- //

/// Statement run when `err` is set inside the method holding `node`.
fn on_err(node: &NodeRef<'_>) -> String {
    if have_default_expr(node) {
        return "panic(err)".into();
    }
    match node.method() {
        Some(m) if m.kind() == TokenKind::StructPreValidate => "return err".into(),
        Some(m) if m.kind() == TokenKind::StructPartDoc => "return nil, err".into(),
        Some(m) => format!("return {}, err", zero_value(return_shape(&m))),
        None => "return err".into(),
    }
}

fn check_err(node: &NodeRef<'_>) -> String {
    format!("{BODY}if err != nil {{\n{BODY}\t{}\n{BODY}}}", on_err(node))
}

fn assign(node: &NodeRef<'_>, expr: impl FnOnce(&str) -> String) -> Out {
    let (prv, nxt) = prev_next_var(node);
    Ok(format!("{BODY}{nxt} := {}", expr(&prv)))
}

fn try_assign(node: &NodeRef<'_>, expr: impl FnOnce(&str) -> String) -> Out {
    let (prv, nxt) = prev_next_var(node);
    Ok(format!("{BODY}{nxt}, err := {}\n{}", expr(&prv), check_err(node)))
}

fn assertion(node: &NodeRef<'_>, cond: impl FnOnce(&str) -> String) -> Out {
    let (prv, nxt) = prev_next_var(node);
    let msg = wrap_double_quotes(kwarg_str(node, "msg")?);
    let mut code = format!(
        "{BODY}if err := sscAssert({}, {msg}); err != nil {{\n{BODY}\t{}\n{BODY}}}",
        cond(&prv),
        on_err(node)
    );
    if !is_last_var_no_ret(node) {
        code.push_str(&format!("\n{BODY}{nxt} := {prv}"));
    }
    Ok(code)
}

fn map_or_apply(node: &NodeRef<'_>, is_list: bool, call: impl Fn(&str) -> String) -> Out {
    if is_list {
        assign(node, |p| format!("sscMapStr({p}, func(i string) string {{ return {} }})", call("i")))
    } else {
        assign(node, |p| call(p))
    }
}

// -------------------------------- Module ---------------------------------- //

fn json_field(node: &NodeRef<'_>) -> Out {
    let name = kwarg_str(node, "name")?;
    let reference = node.kwarg_str("ref").unwrap_or_default();
    let ty = match kwarg_str(node, "json_type")? {
        "number" => "int".to_string(),
        "string" => "string".to_string(),
        "float" => "float64".to_string(),
        "boolean" => "bool".to_string(),
        "null" => "any".to_string(),
        "object" => format!("J{reference}"),
        "array_objects" => format!("[]J{reference}"),
        "array_number" => "[]int".to_string(),
        "array_string" => "[]string".to_string(),
        "array_float" => "[]float64".to_string(),
        "array_boolean" => "[]bool".to_string(),
        "optional_number" => "*int".to_string(),
        "optional_string" => "*string".to_string(),
        "optional_float" => "*float64".to_string(),
        "optional_boolean" => "*bool".to_string(),
        _ => "[]any".to_string(),
    };
    Ok(struct_field(name, &ty))
}

fn typedef_dict(node: &NodeRef<'_>) -> Out {
    let name = kwarg_str(node, "name")?;
    let value = typedef_field(node, VALUE).map(|f| shape_type(typedef_field_shape(&f)));
    Ok(format!("type T{name} = map[string]{}\n", value.unwrap_or_else(|| "any".into())))
}

fn typedef_flat_list(node: &NodeRef<'_>) -> Out {
    let name = kwarg_str(node, "name")?;
    let item = typedef_field(node, ITEM).map(|f| shape_type(typedef_field_shape(&f)));
    Ok(format!("type T{name} = []{}\n", item.unwrap_or_else(|| "any".into())))
}

// -------------------------------- Structs --------------------------------- //

/// `var <Name>Cfg = struct{...}{...}` holding the schema's class variables.
fn config_vars(node: &NodeRef<'_>) -> Out {
    let name = kwarg_str(node, "name")?;
    let mut fields = Vec::new();
    let mut values = Vec::new();
    for cv in node.children().filter(|c| c.kind() == TokenKind::Classvar) {
        let field = exported(kwarg_str(&cv, "name")?);
        let ty = cv.ret_type();
        fields.push(format!("{BODY}{field} {}", go_type(ty)));
        values.push(format!("{BODY}{field}: {},", literal(kwarg(&cv, "value")?, ty)));
    }
    if fields.is_empty() {
        return Ok(String::new());
    }
    Ok(format!("var {name}Cfg = struct {{\n{}\n}}{{\n{}\n}}\n", fields.join("\n"), values.join("\n")))
}

fn struct_header(node: &NodeRef<'_>) -> Out {
    let name = kwarg_str(node, "name")?;
    let mut code = config_vars(node)?;
    if let Some(doc) = node.kwarg_str("docstring").filter(|d| !d.is_empty()) {
        code.push_str(&comment(doc));
        code.push('\n');
    }
    code.push_str(&format!("type {name} struct {{\n{BODY}Document *goquery.Document\n}}\n"));
    Ok(code)
}

fn init(node: &NodeRef<'_>) -> Out {
    let name = kwarg_str(node, "name")?;
    Ok(format!(
        "// New{name} parses raw HTML into a {name} parser.
func New{name}(raw string) (*{name}, error) {{
{BODY}doc, err := goquery.NewDocumentFromReader(strings.NewReader(raw))
{BODY}if err != nil {{
{BODY}{BODY}return nil, err
{BODY}}}
{BODY}return &{name}{{Document: doc}}, nil
}}
"
    ))
}

fn method_name(field: &str) -> String {
    format!("parse{}", exported(field))
}

fn field_header(node: &NodeRef<'_>) -> Out {
    let name = kwarg_str(node, "name")?;
    let ret = shape_type(return_shape(node));
    let results = if node.child(0).is_some_and(|c| c.kind() == TokenKind::DefaultStart) {
        format!("(result {ret}, err error)")
    } else {
        format!("({ret}, error)")
    };
    Ok(format!("func (p *{}) {}(v *goquery.Selection) {results} {{", owner(node)?, method_name(name)))
}

fn start_parse_header(node: &NodeRef<'_>) -> Out {
    let name = kwarg_str(node, "name")?;
    let ret = match node.struct_type() {
        Some(StructType::List) => format!("[]T{name}"),
        _ => format!("T{name}"),
    };
    Ok(format!("func (p *{name}) Parse() ({ret}, error) {{"))
}

fn pre_validate_call(node: &NodeRef<'_>, fail: &str) -> String {
    if !have_pre_validate_call(node) {
        return String::new();
    }
    format!(
        "{BODY}if err := p.preValidate(p.Document.Selection); err != nil {{\n{BODY}\treturn {fail}, err\n{BODY}}}\n"
    )
}

/// Assignments filling `target` from field methods called on `doc`.
fn fill_fields(node: &NodeRef<'_>, target: &str, doc: &str, ind: &str, fail: &str) -> Result<String, EmitError> {
    let mut code = String::new();
    for (i, call) in node.children().enumerate() {
        let name = kwarg_str(&call, "name")?;
        match call.kind() {
            TokenKind::CallStructClassvar => {
                let owner = kwarg_str(&call, "struct_name")?;
                code.push_str(&format!("{ind}{target}.{} = {owner}Cfg.{}\n", exported(name), exported(name)));
            }
            _ if name == PRE_VALIDATE || name == SPLIT_DOC => {}
            _ => code.push_str(&format!(
                "{ind}f{i}, err := p.{}({doc})\n{ind}if err != nil {{\n{ind}\treturn {fail}, err\n{ind}}}\n{ind}{target}.{} = f{i}\n",
                method_name(name),
                exported(name)
            )),
        }
    }
    Ok(code)
}

fn start_parse_item(node: &NodeRef<'_>) -> Out {
    let name = kwarg_str(node, "name")?;
    let mut code = format!("{BODY}result := T{name}{{}}\n");
    code.push_str(&pre_validate_call(node, "result"));
    code.push_str(&fill_fields(node, "result", "p.Document.Selection", BODY, "result")?);
    code.push_str(&format!("{BODY}return result, nil\n}}\n"));
    Ok(code)
}

fn start_parse_loop(node: &NodeRef<'_>, kind: StructType) -> Out {
    let name = kwarg_str(node, "name")?;
    let inner = "\t\t";
    let mut code = match kind {
        StructType::List => format!("{BODY}result := make([]T{name}, 0)\n"),
        StructType::Dict => format!("{BODY}result := make(T{name})\n"),
        _ => format!("{BODY}result := make(T{name}, 0)\n"),
    };
    code.push_str(&pre_validate_call(node, "nil"));
    code.push_str(&format!(
        "{BODY}parts, err := p.splitDoc(p.Document.Selection)\n{BODY}if err != nil {{\n{BODY}\treturn nil, err\n{BODY}}}\n"
    ));
    code.push_str(&format!("{BODY}for i := 0; i < parts.Length(); i++ {{\n"));
    let uses_element = node.children().any(|c| {
        c.kind() == TokenKind::CallStructMethod && !matches!(c.kwarg_str("name"), Some(PRE_VALIDATE | SPLIT_DOC))
    });
    if uses_element {
        code.push_str(&format!("{inner}el := parts.Eq(i)\n"));
    }
    let call = |field: &str, var: &str| {
        format!(
            "{inner}{var}, err := p.{}(el)\n{inner}if err != nil {{\n{inner}\treturn nil, err\n{inner}}}\n",
            method_name(field)
        )
    };
    match kind {
        StructType::Dict => {
            code.push_str(&call(KEY, "k"));
            code.push_str(&call(VALUE, "val"));
            code.push_str(&format!("{inner}result[k] = val\n"));
        }
        StructType::FlatList => {
            code.push_str(&call(ITEM, "f"));
            code.push_str(&format!("{inner}result = append(result, f)\n"));
        }
        _ => {
            code.push_str(&format!("{inner}item := T{name}{{}}\n"));
            code.push_str(&fill_fields(node, "item", "el", inner, "nil")?);
            code.push_str(&format!("{inner}result = append(result, item)\n"));
        }
    }
    code.push_str(&format!("{BODY}}}\n{BODY}return result, nil\n}}\n"));
    Ok(code)
}

fn start_parse_acc_list(node: &NodeRef<'_>) -> Out {
    let name = kwarg_str(node, "name")?;
    let mut code = format!("{BODY}result := make(T{name}, 0)\n");
    code.push_str(&pre_validate_call(node, "nil"));
    for (i, call) in node.children().enumerate() {
        let field = kwarg_str(&call, "name")?;
        if call.kind() != TokenKind::CallStructMethod || field == PRE_VALIDATE {
            continue;
        }
        code.push_str(&format!(
            "{BODY}f{i}, err := p.{}(p.Document.Selection)\n{BODY}if err != nil {{\n{BODY}\treturn nil, err\n{BODY}}}\n{BODY}result = append(result, f{i}...)\n",
            method_name(field)
        ));
    }
    code.push_str(&format!("{BODY}return sscUnique(result), nil\n}}\n"));
    Ok(code)
}

// ------------------------------ Control flow ------------------------------ //

fn default_start(node: &NodeRef<'_>) -> Out {
    let (prv, nxt) = prev_next_var(node);
    let ty = node.method().map(|m| m.ret_type()).unwrap_or(VariableType::Any);
    let value = hooked(node, "value", ty)?;
    Ok(format!(
        "{BODY}defer func() {{
{BODY}{BODY}if r := recover(); r != nil {{
{BODY}{BODY}{BODY}result = {value}
{BODY}{BODY}{BODY}err = nil
{BODY}{BODY}}}
{BODY}}}()
{BODY}{nxt} := {prv}"
    ))
}

fn ret(node: &NodeRef<'_>) -> Out {
    let (prv, _) = prev_next_var(node);
    let optional = node.method().is_some_and(|m| m.ret_type().is_optional());
    let amp = if optional { "&" } else { "" };
    Ok(format!("{BODY}return {amp}{prv}, nil"))
}

fn nested(node: &NodeRef<'_>) -> Out {
    let schema = kwarg_str(node, "schema_name")?;
    let (prv, nxt) = prev_next_var(node);
    Ok(format!(
        "{BODY}{nxt}doc, err := sscSubDocument({prv})\n{check}\n{BODY}{nxt}, err := (&{schema}{{Document: {nxt}doc}}).Parse()\n{check}",
        check = check_err(node)
    ))
}

// ------------------------------- Selectors -------------------------------- //

fn register_selectors(conv: &mut Converter) {
    use TokenKind::*;
    conv.pre(Css, |n| {
        let q = hooked_str(n, "query")?;
        try_assign(n, |p| format!("sscCss({p}, {q})"))
    })
    .pre(CssAll, |n| {
        let q = hooked_str(n, "query")?;
        assign(n, |p| format!("{p}.Find({q})"))
    })
    .pre(Attr, |n| match n.kwarg_strings("key").as_slice() {
        [key] => {
            let key = hook_or_value(n, "key", hook, |_| wrap_double_quotes(key))?;
            try_assign(n, |p| format!("sscGetAttr({p}, {key})"))
        }
        keys => {
            let keys = string_slice(keys);
            assign(n, |p| format!("sscGetManyAttrs({p}, {keys})"))
        }
    })
    .pre(AttrAll, |n| {
        let keys = string_slice(&n.kwarg_strings("key"));
        assign(n, |p| format!("sscEachManyAttrs({p}, {keys})"))
    })
    .pre(Text, |n| assign(n, |p| format!("{p}.Text()")))
    .pre(TextAll, |n| assign(n, |p| format!("sscEachText({p})")))
    .pre(Raw, |n| try_assign(n, |p| format!("goquery.OuterHtml({p})")))
    .pre(RawAll, |n| try_assign(n, |p| format!("sscEachRaw({p})")));
}

// -------------------------------- Strings --------------------------------- //

fn register_strings(conv: &mut Converter) {
    use TokenKind::*;
    conv.pre(Trim, |n| trim(n, "sscTrim", false))
        .pre(LTrim, |n| trim(n, "sscLTrim", false))
        .pre(RTrim, |n| trim(n, "sscRTrim", false))
        .pre(ListTrim, |n| trim(n, "sscTrim", true))
        .pre(ListLTrim, |n| trim(n, "sscLTrim", true))
        .pre(ListRTrim, |n| trim(n, "sscRTrim", true))
        .pre(Replace, |n| replace(n, false))
        .pre(ListReplace, |n| replace(n, true))
        .pre(MapReplace, |n| map_replace(n, false))
        .pre(ListMapReplace, |n| map_replace(n, true))
        .pre(Format, |n| format_str(n, false))
        .pre(ListFormat, |n| format_str(n, true))
        .pre(Split, |n| {
            let sep = hooked_str(n, "sep")?;
            assign(n, |p| format!("strings.Split({p}, {sep})"))
        })
        .pre(RmPrefix, |n| rm_affix(n, false, true, false))
        .pre(ListRmPrefix, |n| rm_affix(n, false, true, true))
        .pre(RmSuffix, |n| rm_affix(n, true, false, false))
        .pre(ListRmSuffix, |n| rm_affix(n, true, false, true))
        .pre(RmPrefixAndSuffix, |n| rm_affix(n, true, true, false))
        .pre(ListRmPrefixAndSuffix, |n| rm_affix(n, true, true, true))
        .pre(Unescape, |n| map_or_apply(n, false, |v| format!("sscUnescape({v})")))
        .pre(ListUnescape, |n| map_or_apply(n, true, |v| format!("sscUnescape({v})")))
        .pre(Regex, |n| {
            let re = regex(n)?;
            let group = kwarg_i64(n, "group")?;
            try_assign(n, |p| format!("sscRegexMatch({p}, {re}, {group})"))
        })
        .pre(RegexAll, |n| {
            let re = regex(n)?;
            assign(n, |p| format!("sscRegexFindAll({p}, {re})"))
        })
        .pre(RegexSub, |n| regex_sub(n, false))
        .pre(ListRegexSub, |n| regex_sub(n, true));
}

fn trim(node: &NodeRef<'_>, helper: &str, is_list: bool) -> Out {
    let chars = match node.kwarg("substr") {
        Some(Value::String(_)) => hooked_str(node, "substr")?,
        _ => "\"\"".to_string(),
    };
    map_or_apply(node, is_list, |v| format!("{helper}({v}, {chars})"))
}

fn replace(node: &NodeRef<'_>, is_list: bool) -> Out {
    let old = hooked_str(node, "old")?;
    let new = hooked_str(node, "new")?;
    map_or_apply(node, is_list, |v| format!("strings.ReplaceAll({v}, {old}, {new})"))
}

fn map_replace(node: &NodeRef<'_>, is_list: bool) -> Out {
    let old = hooked(node, "old", VariableType::ListString)?;
    let new = hooked(node, "new", VariableType::ListString)?;
    map_or_apply(node, is_list, |v| format!("sscMapReplace({v}, {old}, {new})"))
}

fn format_str(node: &NodeRef<'_>, is_list: bool) -> Out {
    let fmt = kwarg_str(node, "fmt")?;
    match node.classvar_hook("fmt").and_then(|h| h.split()) {
        Some((schema, field)) => {
            let template = hook(schema, field);
            map_or_apply(node, is_list, |v| format!("strings.ReplaceAll({template}, \"{{{{}}}}\", {v})"))
        }
        None => {
            let template = sprintf_template(fmt);
            map_or_apply(node, is_list, |v| format!("fmt.Sprintf({template}, {v})"))
        }
    }
}

fn rm_affix(node: &NodeRef<'_>, suffix: bool, prefix: bool, is_list: bool) -> Out {
    let substr = hooked(node, "substr", VariableType::String)?;
    map_or_apply(node, is_list, |v| {
        let mut expr = v.to_string();
        if prefix {
            expr = format!("strings.TrimPrefix({expr}, {substr})");
        }
        if suffix {
            expr = format!("strings.TrimSuffix({expr}, {substr})");
        }
        expr
    })
}

fn regex_sub(node: &NodeRef<'_>, is_list: bool) -> Out {
    let re = regex(node)?;
    let repl = hook_or_value(node, "repl", hook, |v| replacement(v.as_str().unwrap_or_default()))?;
    map_or_apply(node, is_list, |v| format!("{re}.ReplaceAllString({v}, {repl})"))
}

// --------------------------------- Lists ---------------------------------- //

fn register_lists(conv: &mut Converter) {
    use TokenKind::*;
    conv.pre(Index, |n| {
        let i = hooked(n, "index", VariableType::Int)?;
        if n.accept_type() == VariableType::ListDocument {
            try_assign(n, |p| format!("sscEq({p}, {i})"))
        } else {
            try_assign(n, |p| format!("sscIndex({p}, {i})"))
        }
    })
    .pre(Join, |n| {
        let sep = hooked_str(n, "sep")?;
        assign(n, |p| format!("strings.Join({p}, {sep})"))
    })
    .pre(Len, |n| {
        if n.accept_type() == VariableType::ListDocument {
            assign(n, |p| format!("{p}.Length()"))
        } else {
            assign(n, |p| format!("len({p})"))
        }
    })
    .pre(Unique, |n| assign(n, |p| format!("sscUnique({p})")))
    .pre(ToInt, |n| try_assign(n, |p| format!("strconv.Atoi({p})")))
    .pre(ListToInt, |n| try_assign(n, |p| format!("sscToInts({p})")))
    .pre(ToFloat, |n| try_assign(n, |p| format!("strconv.ParseFloat({p}, 64)")))
    .pre(ListToFloat, |n| try_assign(n, |p| format!("sscToFloats({p})")))
    .pre(ToBool, |n| assign(n, |p| format!("sscToBool({p})")))
    .pre(Jsonify, jsonify);
}

fn jsonify(node: &NodeRef<'_>) -> Out {
    let name = kwarg_str(node, "json_struct")?;
    let ty = if node.kwarg_bool("is_array") { format!("[]J{name}") } else { format!("J{name}") };
    let path: String = jsonify_query_parse(node.kwarg_str("query").unwrap_or_default())
        .into_iter()
        .map(|part| match part {
            JsonPathPart::Key(key) => format!(", {}", wrap_double_quotes(key)),
            JsonPathPart::Index(i) => format!(", {i}"),
        })
        .collect();
    let (prv, nxt) = prev_next_var(node);
    Ok(format!(
        "{BODY}{nxt}raw, err := sscJsonPath({prv}{path})\n{}\n{BODY}var {nxt} {ty}\n{BODY}if err := json.Unmarshal({nxt}raw, &{nxt}); err != nil {{\n{BODY}\t{}\n{BODY}}}",
        check_err(node),
        on_err(node)
    ))
}

// ------------------------------- Assertions ------------------------------- //

fn register_checks(conv: &mut Converter) {
    use TokenKind::*;
    conv.pre(IsEqual, |n| {
        let item = hooked(n, "item", n.accept_type())?;
        assertion(n, |p| format!("{p} == {item}"))
    })
    .pre(IsNotEqual, |n| {
        let item = hooked(n, "item", n.accept_type())?;
        assertion(n, |p| format!("{p} != {item}"))
    })
    .pre(IsContains, |n| {
        let item = hooked(n, "item", VariableType::Any)?;
        assertion(n, |p| format!("slices.Contains({p}, {item})"))
    })
    .pre(IsCss, |n| {
        let q = hooked_str(n, "query")?;
        let op = if n.kwarg_bool("invert") { "==" } else { ">" };
        assertion(n, |p| format!("{p}.Find({q}).Length() {op} 0"))
    })
    .pre(IsRegex, |n| {
        let re = regex(n)?;
        assertion(n, |p| format!("{re}.MatchString({p})"))
    })
    .pre(AnyIsRegex, |n| {
        let re = regex(n)?;
        assertion(n, |p| format!("sscAnyMatch({p}, {re})"))
    })
    .pre(AllIsRegex, |n| {
        let re = regex(n)?;
        assertion(n, |p| format!("sscAllMatch({p}, {re})"))
    })
    .pre(HasAttr, |n| {
        let key = hooked_str(n, "key")?;
        let not = if n.kwarg_bool("invert") { "!" } else { "" };
        assertion(n, |p| format!("{not}sscHasAttr({p}, {key})"))
    })
    .pre(ListHasAttr, |n| {
        let key = hooked_str(n, "key")?;
        let want = !n.kwarg_bool("invert");
        assertion(n, |p| format!("sscEachHasAttr({p}, {key}, {want})"))
    });
}

// -------------------------------- Filters --------------------------------- //

fn register_filters(conv: &mut Converter) {
    use TokenKind::*;
    conv.pre(Filter, |n| {
        let (prv, nxt) = prev_next_var(n);
        Ok(format!("{BODY}{nxt} := sscFilter({prv}, func(i string) bool {{ return "))
    })
    .post(Filter, |_| Ok(" })".into()))
    .pre(FilterAnd, |n| Ok(format!("{}(", sep(n))))
    .post(FilterAnd, |_| Ok(")".into()))
    .pre(FilterOr, |n| Ok(format!("{}(", sep(n))))
    .post(FilterOr, |_| Ok(")".into()))
    .pre(FilterNot, |n| Ok(format!("{}!(", sep(n))))
    .post(FilterNot, |_| Ok(")".into()))
    .pre(FilterEq, |n| one_or_many(n, "values", |v| format!("i == {v}"), |s| format!("sscAnyEqual(i, {s})")))
    .pre(FilterNe, |n| one_or_many(n, "values", |v| format!("i != {v}"), |s| format!("!sscAnyEqual(i, {s})")))
    .pre(FilterIn, |n| {
        one_or_many(n, "substr", |v| format!("strings.Contains(i, {v})"), |s| format!("sscAnyContains(i, {s})"))
    })
    .pre(FilterStarts, |n| {
        one_or_many(n, "substr", |v| format!("strings.HasPrefix(i, {v})"), |s| format!("sscAnyPrefix(i, {s})"))
    })
    .pre(FilterEnds, |n| {
        one_or_many(n, "substr", |v| format!("strings.HasSuffix(i, {v})"), |s| format!("sscAnySuffix(i, {s})"))
    })
    .pre(FilterRe, |n| Ok(format!("{}{}.MatchString(i)", sep(n), regex(n)?)))
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
        [value] => one(wrap_double_quotes(value)),
        values => many(string_slice(values)),
    };
    Ok(format!("{}{cond}", sep(node)))
}

fn length(node: &NodeRef<'_>, op: &str) -> Out {
    Ok(format!("{}len([]rune(i)) {op} {}", sep(node), kwarg_i64(node, "length")?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replacement_uses_braced_groups() {
        assert_eq!(replacement(r"\1-\12 $"), "\"${1}-${12} $$\"");
    }

    #[test]
    fn sprintf_escapes_percent() {
        assert_eq!(sprintf_template("100% {{}}"), "\"100%% %s\"");
    }

    #[test]
    fn zero_values_follow_shape() {
        assert_eq!(zero_value(ReturnShape::Value(VariableType::String)), "\"\"");
        assert_eq!(zero_value(ReturnShape::Value(VariableType::OptionalInt)), "nil");
        assert_eq!(zero_value(ReturnShape::Nested { schema: "Page", kind: StructType::Item }), "TPage{}");
        assert_eq!(zero_value(ReturnShape::Nested { schema: "Books", kind: StructType::List }), "nil");
        assert_eq!(literal(&serde_json::json!([1, 2]), VariableType::ListInt), "[]int{1, 2}");
    }

    #[test]
    fn exported_names() {
        assert_eq!(exported("price_color"), "PriceColor");
        assert_eq!(exported("__ITEM__"), "Item");
        assert_eq!(method_name("title"), "parseTitle");
    }
}
