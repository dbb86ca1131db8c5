//! `selectolax` (lexbor/modest) flavor. CSS only; XPath kinds are rejected.
use super::{Flavor, Out, assertion, assign, hooked, hooked_or, tuple};
use crate::ast::NodeRef;
use crate::emitter::Converter;
use crate::str_utils::py_repr;
use crate::targets::templates::PY_SELECTOLAX_IMPORTS;
use crate::tokens::TokenKind;

pub struct Selectolax;

impl Flavor for Selectolax {
    const NAME: &'static str = "python::selectolax";
    const IMPORTS: &'static str = PY_SELECTOLAX_IMPORTS;
    const DOC: &'static str = "Union[HTMLParser, Node]";
    const DOC_LIST: &'static str = "List[Node]";

    fn register(conv: &mut Converter) {
        use TokenKind::*;
        conv.pre(StructInit, init)
            .pre(Css, |n| query(n, |p, q| format!("{p}.css({q})[0]")))
            .pre(CssAll, |n| query(n, |p, q| format!("{p}.css({q})")))
            .pre(Attr, attr)
            .pre(AttrAll, |n| {
                let keys = tuple(&n.kwarg_strings("key"));
                assign(n, |p| format!("[a for e in {p} for k in {keys} if (a := e.attributes.get(k)) is not None]"))
            })
            .pre(Text, |n| assign(n, |p| format!("{p}.text()")))
            .pre(TextAll, |n| assign(n, |p| format!("[e.text() for e in {p}]")))
            .pre(Raw, |n| assign(n, |p| format!("{p}.html")))
            .pre(RawAll, |n| assign(n, |p| format!("[e.html for e in {p}]")))
            .pre(IsCss, |n| {
                let q = hooked(n, "query")?;
                let op = if n.kwarg_bool("invert") { "is" } else { "is not" };
                assertion(n, |p| format!("{p}.css_first({q}) {op} None"))
            })
            .pre(HasAttr, |n| {
                let key = hooked(n, "key")?;
                let op = if n.kwarg_bool("invert") { "not in" } else { "in" };
                assertion(n, |p| format!("{key} {op} {p}.attributes"))
            })
            .pre(ListHasAttr, |n| {
                let key = hooked(n, "key")?;
                let op = if n.kwarg_bool("invert") { "not in" } else { "in" };
                assertion(n, |p| format!("all({key} {op} e.attributes for e in {p})"))
            })
            .unsupported(&[Xpath, XpathAll, IsXpath]);
    }
}

fn init(_: &NodeRef<'_>) -> Out {
    Ok([
        "    def __init__(self, document: Union[str, HTMLParser, Node]) -> None:",
        "        self._document = HTMLParser(document) if isinstance(document, str) else document",
        "",
    ]
    .join("\n"))
}

fn query(node: &NodeRef<'_>, expr: impl FnOnce(&str, &str) -> String) -> Out {
    let q = hooked(node, "query")?;
    assign(node, |p| expr(p, &q))
}

/// Valueless attributes come back as `None`; a missing one raises `KeyError`.
fn attr(node: &NodeRef<'_>) -> Out {
    match node.kwarg_strings("key").as_slice() {
        [key] => {
            let key = hooked_or(node, "key", py_repr(key))?;
            assign(node, |p| format!("{p}.attributes[{key}] or ''"))
        }
        keys => {
            let keys = tuple(keys);
            assign(node, |p| format!("[a for k in {keys} if (a := {p}.attributes.get(k)) is not None]"))
        }
    }
}
