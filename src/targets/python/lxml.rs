//! `lxml.html` flavor: elements are `HtmlElement`, CSS goes through
//! `cssselect`.
use super::{Flavor, Out, assertion, assign, hooked, hooked_or, tuple};
use crate::ast::NodeRef;
use crate::emitter::Converter;
use crate::str_utils::py_repr;
use crate::targets::templates::PY_LXML_IMPORTS;
use crate::tokens::TokenKind;

pub struct Lxml;

impl Flavor for Lxml {
    const NAME: &'static str = "python::lxml";
    const IMPORTS: &'static str = PY_LXML_IMPORTS;
    const DOC: &'static str = "html.HtmlElement";
    const DOC_LIST: &'static str = "List[html.HtmlElement]";

    fn register(conv: &mut Converter) {
        use TokenKind::*;
        conv.pre(StructInit, init)
            .pre(Css, |n| query(n, |p, q| format!("{p}.cssselect({q})[0]")))
            .pre(CssAll, |n| query(n, |p, q| format!("{p}.cssselect({q})")))
            .pre(Xpath, |n| query(n, |p, q| format!("{p}.xpath({q})[0]")))
            .pre(XpathAll, |n| query(n, |p, q| format!("{p}.xpath({q})")))
            .pre(Attr, attr)
            .pre(AttrAll, attr_all)
            .pre(Text, |n| assign(n, |p| format!("{p}.text_content()")))
            .pre(TextAll, |n| assign(n, |p| format!("[e.text_content() for e in {p}]")))
            .pre(Raw, |n| assign(n, |p| format!("html.tostring({p}, encoding='unicode')")))
            .pre(RawAll, |n| assign(n, |p| format!("[html.tostring(e, encoding='unicode') for e in {p}]")))
            .pre(IsCss, |n| is_query(n, "cssselect"))
            .pre(IsXpath, |n| is_query(n, "xpath"))
            .pre(HasAttr, |n| {
                let key = hooked(n, "key")?;
                let op = if n.kwarg_bool("invert") { "is" } else { "is not" };
                assertion(n, |p| format!("{p}.get({key}) {op} None"))
            })
            .pre(ListHasAttr, |n| {
                let key = hooked(n, "key")?;
                let op = if n.kwarg_bool("invert") { "is" } else { "is not" };
                assertion(n, |p| format!("all(e.get({key}) {op} None for e in {p})"))
            });
    }
}

fn init(_: &NodeRef<'_>) -> Out {
    Ok([
        "    def __init__(self, document: Union[str, html.HtmlElement]) -> None:",
        "        if isinstance(document, str):",
        "            document = html.fromstring(document.strip() or FALLBACK_HTML_STR)",
        "        self._document = document",
        "",
    ]
    .join("\n"))
}

fn query(node: &NodeRef<'_>, expr: impl FnOnce(&str, &str) -> String) -> Out {
    let q = hooked(node, "query")?;
    assign(node, |p| expr(p, &q))
}

fn is_query(node: &NodeRef<'_>, method: &str) -> Out {
    let q = hooked(node, "query")?;
    let not = if node.kwarg_bool("invert") { "not " } else { "" };
    assertion(node, |p| format!("{not}{p}.{method}({q})"))
}

fn attr(node: &NodeRef<'_>) -> Out {
    let keys = node.kwarg_strings("key");
    match keys.as_slice() {
        [key] => {
            let key = hooked_or(node, "key", py_repr(key))?;
            assign(node, |p| format!("{p}.attrib[{key}]"))
        }
        keys => {
            let keys = tuple(keys);
            assign(node, |p| format!("[a for k in {keys} if (a := {p}.get(k)) is not None]"))
        }
    }
}

fn attr_all(node: &NodeRef<'_>) -> Out {
    let keys = tuple(&node.kwarg_strings("key"));
    assign(node, |p| format!("[a for e in {p} for k in {keys} if (a := e.get(k)) is not None]"))
}
