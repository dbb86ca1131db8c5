//! `parsel` flavor: documents are `Selector`/`SelectorList`.
use super::{Flavor, Out, assertion, assign, hooked, hooked_or, tuple};
use crate::ast::NodeRef;
use crate::emitter::Converter;
use crate::str_utils::py_repr;
use crate::targets::templates::PY_PARSEL_IMPORTS;
use crate::tokens::TokenKind;

pub struct Parsel;

impl Flavor for Parsel {
    const NAME: &'static str = "python::parsel";
    const IMPORTS: &'static str = PY_PARSEL_IMPORTS;
    const DOC: &'static str = "Selector";
    const DOC_LIST: &'static str = "SelectorList";

    fn register(conv: &mut Converter) {
        use TokenKind::*;
        conv.pre(StructInit, init)
            .pre(Css, |n| query(n, |p, q| format!("{p}.css({q})[0]")))
            .pre(CssAll, |n| query(n, |p, q| format!("{p}.css({q})")))
            .pre(Xpath, |n| query(n, |p, q| format!("{p}.xpath({q})[0]")))
            .pre(XpathAll, |n| query(n, |p, q| format!("{p}.xpath({q})")))
            .pre(Attr, attr)
            .pre(AttrAll, |n| {
                let keys = tuple(&n.kwarg_strings("key"));
                assign(n, |p| format!("[a for e in {p} for k in {keys} if (a := e.attrib.get(k)) is not None]"))
            })
            .pre(Text, |n| assign(n, |p| format!("''.join({p}.css('*::text').getall())")))
            .pre(TextAll, |n| assign(n, |p| format!("[''.join(e.css('*::text').getall()) for e in {p}]")))
            .pre(Raw, |n| assign(n, |p| format!("{p}.get()")))
            .pre(RawAll, |n| assign(n, |p| format!("[e.get() for e in {p}]")))
            .pre(IsCss, |n| is_query(n, "css"))
            .pre(IsXpath, |n| is_query(n, "xpath"))
            .pre(HasAttr, |n| {
                let key = hooked(n, "key")?;
                let op = if n.kwarg_bool("invert") { "is" } else { "is not" };
                assertion(n, |p| format!("{p}.attrib.get({key}) {op} None"))
            })
            .pre(ListHasAttr, |n| {
                let key = hooked(n, "key")?;
                let op = if n.kwarg_bool("invert") { "is" } else { "is not" };
                assertion(n, |p| format!("all(e.attrib.get({key}) {op} None for e in {p})"))
            });
    }
}

fn init(_: &NodeRef<'_>) -> Out {
    Ok([
        "    def __init__(self, document: Union[str, Selector, SelectorList]) -> None:",
        "        self._document = Selector(document) if isinstance(document, str) else document",
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
    match node.kwarg_strings("key").as_slice() {
        [key] => {
            let key = hooked_or(node, "key", py_repr(key))?;
            assign(node, |p| format!("{p}.attrib[{key}]"))
        }
        keys => {
            let keys = tuple(keys);
            assign(node, |p| format!("[a for k in {keys} if (a := {p}.attrib.get(k)) is not None]"))
        }
    }
}
