//! `BeautifulSoup` flavor. bs4 has no XPath engine, so XPath kinds are
//! rejected; multi-valued attributes such as `class` are joined back into
//! one string.
use super::{Flavor, Out, assertion, assign, hooked, hooked_or, tuple};
use crate::ast::NodeRef;
use crate::emitter::Converter;
use crate::str_utils::py_repr;
use crate::targets::templates::PY_BS4_IMPORTS;
use crate::tokens::TokenKind;

pub struct Bs4;

impl Flavor for Bs4 {
    const NAME: &'static str = "python::bs4";
    const IMPORTS: &'static str = PY_BS4_IMPORTS;
    const DOC: &'static str = "Union[BeautifulSoup, Tag]";
    const DOC_LIST: &'static str = "ResultSet";

    fn register(conv: &mut Converter) {
        use TokenKind::*;
        conv.pre(StructInit, init)
            .pre(Css, |n| query(n, |p, q| format!("{p}.select({q})[0]")))
            .pre(CssAll, |n| query(n, |p, q| format!("{p}.select({q})")))
            .pre(Attr, attr)
            .pre(AttrAll, |n| {
                let keys = tuple(&n.kwarg_strings("key"));
                assign(n, |p| format!("[ssc_bs4_attr(a) for e in {p} for k in {keys} if (a := e.get(k)) is not None]"))
            })
            .pre(Text, |n| assign(n, |p| format!("{p}.get_text()")))
            .pre(TextAll, |n| assign(n, |p| format!("[e.get_text() for e in {p}]")))
            .pre(Raw, |n| assign(n, |p| format!("str({p})")))
            .pre(RawAll, |n| assign(n, |p| format!("[str(e) for e in {p}]")))
            .pre(IsCss, |n| {
                let q = hooked(n, "query")?;
                let not = if n.kwarg_bool("invert") { "not " } else { "" };
                assertion(n, |p| format!("{not}{p}.select_one({q})"))
            })
            .pre(HasAttr, |n| {
                let key = hooked(n, "key")?;
                let op = if n.kwarg_bool("invert") { "is" } else { "is not" };
                assertion(n, |p| format!("{p}.get({key}) {op} None"))
            })
            .pre(ListHasAttr, |n| {
                let key = hooked(n, "key")?;
                let op = if n.kwarg_bool("invert") { "is" } else { "is not" };
                assertion(n, |p| format!("all(e.get({key}) {op} None for e in {p})"))
            })
            .unsupported(&[Xpath, XpathAll, IsXpath]);
    }
}

fn init(_: &NodeRef<'_>) -> Out {
    Ok([
        "    def __init__(self, document: Union[str, BeautifulSoup, Tag]) -> None:",
        "        self._document = BeautifulSoup(document, 'lxml') if isinstance(document, str) else document",
        "",
    ]
    .join("\n"))
}

fn query(node: &NodeRef<'_>, expr: impl FnOnce(&str, &str) -> String) -> Out {
    let q = hooked(node, "query")?;
    assign(node, |p| expr(p, &q))
}

fn attr(node: &NodeRef<'_>) -> Out {
    match node.kwarg_strings("key").as_slice() {
        [key] => {
            let key = hooked_or(node, "key", py_repr(key))?;
            assign(node, |p| format!("ssc_bs4_attr({p}[{key}])"))
        }
        keys => {
            let keys = tuple(keys);
            assign(node, |p| format!("[ssc_bs4_attr(a) for k in {keys} if (a := {p}.get(k)) is not None]"))
        }
    }
}
