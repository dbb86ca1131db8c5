//! CSS selector parsing and its XPath 1.0 translation.
//!
//! Queries are parsed with scraper's selector grammar; the translation walks
//! the parsed `selectors` components the way cssselect's `GenericTranslator`
//! does. Components with no XPath form (`:scope`, complex selectors inside
//! `:not()`/`:is()`) are reported as errors.
use cssparser::ParserInput;
use scraper::selector::{CssLocalName, Parser as HtmlSelectorParser, Simple};
use selectors::attr::{AttrSelectorOperator, NamespaceConstraint, ParsedAttrSelectorOperation, ParsedCaseSensitivity};
use selectors::parser::{Combinator, Component, NthSelectorData, NthType, ParseRelative, Selector, SelectorList};

pub type SelectorGroup = SelectorList<Simple>;

pub fn parse(query: &str) -> Result<SelectorGroup, String> {
    let mut input = ParserInput::new(query);
    let mut parser = cssparser::Parser::new(&mut input);
    SelectorList::parse(&HtmlSelectorParser, &mut parser, ParseRelative::No).map_err(|e| format!("{:?}", e.kind))
}

pub fn to_xpath(group: &SelectorGroup, prefix: &str) -> Result<String, String> {
    let parts = group
        .slice()
        .iter()
        .map(|sel| selector_xpath(sel).map(|xp| format!("{prefix}{xp}")))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(parts.join(" | "))
}

type Compound<'a> = Vec<&'a Component<Simple>>;

/// Split a selector into `(combinator to the left, compound)` in parse order.
fn compounds(sel: &Selector<Simple>) -> Vec<(Option<Combinator>, Compound<'_>)> {
    let mut out: Vec<(Option<Combinator>, Compound<'_>)> = vec![(None, Vec::new())];
    for component in sel.iter_raw_parse_order_from(0) {
        match component {
            Component::Combinator(c) => out.push((Some(*c), Vec::new())),
            other => {
                if let Some((_, last)) = out.last_mut() {
                    last.push(other);
                }
            }
        }
    }
    out
}

fn selector_xpath(sel: &Selector<Simple>) -> Result<String, String> {
    let mut out = String::new();
    for (combinator, compound) in compounds(sel) {
        let right = compound_xpath(&compound)?;
        match combinator {
            None => out.push_str(&right),
            Some(c) => out.push_str(&join_step(c, &right)?),
        }
    }
    Ok(out)
}

fn join_step(combinator: Combinator, right: &str) -> Result<String, String> {
    Ok(match combinator {
        Combinator::Descendant => format!("/descendant-or-self::*/{right}"),
        Combinator::Child => format!("/{right}"),
        Combinator::NextSibling => format!("/following-sibling::*[1]/self::{right}"),
        Combinator::LaterSibling => format!("/following-sibling::{right}"),
        other => return Err(format!("combinator {other:?} has no XPath form")),
    })
}

fn ident(name: &CssLocalName) -> &str {
    &name.0
}

fn element_test(compound: &[&Component<Simple>]) -> String {
    compound
        .iter()
        .find_map(|c| match c {
            Component::LocalName(name) => Some(ident(&name.name).to_string()),
            _ => None,
        })
        .unwrap_or_else(|| "*".to_string())
}

fn compound_xpath(compound: &[&Component<Simple>]) -> Result<String, String> {
    let element = element_test(compound);
    let mut out = element.clone();
    for condition in compound_conditions(compound, &element)? {
        out.push('[');
        out.push_str(&condition);
        out.push(']');
    }
    Ok(out)
}

fn compound_conditions(compound: &[&Component<Simple>], element: &str) -> Result<Vec<String>, String> {
    let mut out = Vec::new();
    for component in compound {
        if let Some(cond) = condition(component, element)? {
            out.push(cond);
        }
    }
    Ok(out)
}

/// Boolean test of a selector without combinators, e.g. inside `:not()`.
fn compound_as_test(sel: &Selector<Simple>) -> Result<String, String> {
    let parts = compounds(sel);
    let [(None, compound)] = parts.as_slice() else {
        return Err("only compound selectors are allowed inside :not()/:is()".to_string());
    };
    let element = element_test(compound);
    let mut tests = Vec::new();
    if element != "*" {
        tests.push(format!("self::{element}"));
    }
    tests.extend(compound_conditions(compound, &element)?.into_iter().map(|c| format!("({c})")));
    Ok(if tests.is_empty() { "true()".to_string() } else { tests.join(" and ") })
}

fn any_of(list: &[Selector<Simple>]) -> Result<String, String> {
    let tests = list.iter().map(compound_as_test).collect::<Result<Vec<_>, _>>()?;
    Ok(tests.join(" or "))
}

/// Predicate for one simple selector; `None` for the type and namespace parts.
fn condition(component: &Component<Simple>, element: &str) -> Result<Option<String>, String> {
    let cond = match component {
        Component::LocalName(_)
        | Component::ExplicitUniversalType
        | Component::ExplicitAnyNamespace
        | Component::ExplicitNoNamespace
        | Component::DefaultNamespace(_)
        | Component::Namespace(..) => return Ok(None),
        Component::ID(id) => format!("@id = {}", xpath_literal(ident(id))),
        Component::Class(class) => format!(
            "@class and contains(concat(' ', normalize-space(@class), ' '), {})",
            xpath_literal(&format!(" {} ", ident(class)))
        ),
        Component::AttributeInNoNamespaceExists { local_name, .. } => format!("@{}", ident(local_name)),
        Component::AttributeInNoNamespace { local_name, operator, value, case_sensitivity } => {
            attr_condition(ident(local_name), *operator, &value.0, ignores_case(*case_sensitivity))
        }
        Component::AttributeOther(attr) => {
            if matches!(attr.namespace, Some(NamespaceConstraint::Specific(_))) {
                return Err("namespaced attribute selectors have no XPath form".to_string());
            }
            let name = ident(&attr.local_name_lower);
            match &attr.operation {
                ParsedAttrSelectorOperation::Exists => format!("@{name}"),
                ParsedAttrSelectorOperation::WithValue { operator, case_sensitivity, value } => {
                    attr_condition(name, *operator, &value.0, ignores_case(*case_sensitivity))
                }
            }
        }
        Component::Negation(list) => format!("not({})", any_of(list.slice())?),
        Component::Is(list) | Component::Where(list) => any_of(list.slice())?,
        Component::Root => "not(parent::*)".to_string(),
        Component::Empty => "not(*) and not(string-length())".to_string(),
        Component::Nth(data) => nth_data_condition(data, element),
        Component::Has(relative) => {
            let paths = relative
                .iter()
                .map(|rel| relative_path(&rel.selector))
                .collect::<Result<Vec<_>, _>>()?;
            paths.join(" or ")
        }
        Component::NthOf(_) => return Err(":nth-*(.. of S) has no XPath form".to_string()),
        Component::NonTSPseudoClass(pc) => match *pc {},
        Component::PseudoElement(pe) => match *pe {},
        other => return Err(format!("{other:?} has no XPath form")),
    };
    Ok(Some(cond))
}

fn ignores_case(case: ParsedCaseSensitivity) -> bool {
    matches!(case, ParsedCaseSensitivity::AsciiCaseInsensitive)
}

/// `:has()` argument as a relative location path.
fn relative_path(sel: &Selector<Simple>) -> Result<String, String> {
    let mut out = String::new();
    for (combinator, compound) in compounds(sel) {
        let compound: Vec<_> =
            compound.into_iter().filter(|c| !matches!(c, Component::RelativeSelectorAnchor)).collect();
        if compound.is_empty() && combinator.is_none() {
            continue;
        }
        let right = compound_xpath(&compound)?;
        match (combinator, out.is_empty()) {
            (Some(Combinator::Descendant), true) => out.push_str(&format!("descendant::{right}")),
            (Some(Combinator::Child), true) => out.push_str(&right),
            (Some(Combinator::NextSibling), true) => out.push_str(&format!("following-sibling::*[1]/self::{right}")),
            (Some(Combinator::LaterSibling), true) => out.push_str(&format!("following-sibling::{right}")),
            (Some(c), false) => out.push_str(&join_step(c, &right)?),
            (None, _) => out.push_str(&format!("descendant::{right}")),
            (Some(c), true) => return Err(format!("combinator {c:?} has no XPath form")),
        }
    }
    Ok(out)
}

const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";

fn attr_condition(name: &str, op: AttrSelectorOperator, value: &str, ignore_case: bool) -> String {
    let attr = format!("@{name}");
    let (subject, value) = if ignore_case {
        (format!("translate({attr}, '{UPPER}', '{LOWER}')"), value.to_ascii_lowercase())
    } else {
        (attr.clone(), value.to_string())
    };
    let lit = xpath_literal(&value);
    match op {
        AttrSelectorOperator::Equal => format!("{subject} = {lit}"),
        AttrSelectorOperator::Includes => format!(
            "{attr} and contains(concat(' ', normalize-space({subject}), ' '), {})",
            xpath_literal(&format!(" {value} "))
        ),
        AttrSelectorOperator::DashMatch => format!(
            "{attr} and ({subject} = {lit} or starts-with({subject}, {}))",
            xpath_literal(&format!("{value}-"))
        ),
        AttrSelectorOperator::Prefix => format!("{attr} and starts-with({subject}, {lit})"),
        AttrSelectorOperator::Suffix => {
            let len = value.chars().count() as i64;
            format!("{attr} and substring({subject}, string-length({attr}) - {}) = {lit}", len - 1)
        }
        AttrSelectorOperator::Substring => format!("{attr} and contains({subject}, {lit})"),
    }
}

fn nth_data_condition(data: &NthSelectorData, element: &str) -> String {
    let preceding = |test: &str| format!("count(preceding-sibling::{test}) = 0");
    let following = |test: &str| format!("count(following-sibling::{test}) = 0");
    match data.ty {
        NthType::OnlyChild => format!("{} and {}", preceding("*"), following("*")),
        NthType::OnlyOfType => format!("{} and {}", preceding(element), following(element)),
        ty => {
            let (axis, test) = match ty {
                NthType::Child => ("preceding-sibling", "*"),
                NthType::LastChild => ("following-sibling", "*"),
                NthType::OfType => ("preceding-sibling", element),
                _ => ("following-sibling", element),
            };
            if data.a == 0 && data.b == 1 {
                return format!("count({axis}::{test}) = 0");
            }
            nth_condition(&format!("count({axis}::{test}) + 1"), data.a.into(), data.b.into())
        }
    }
}

fn nth_condition(idx: &str, a: i64, b: i64) -> String {
    let shifted = if b >= 0 { format!("{idx} - {b}") } else { format!("{idx} + {}", -b) };
    match a {
        0 => format!("{idx} = {b}"),
        a if a > 0 => format!("({shifted}) mod {a} = 0 and {idx} >= {b}"),
        a => format!("({shifted}) mod {} = 0 and {idx} <= {b}", -a),
    }
}

/// XPath 1.0 string literal; `concat()` when both quote kinds occur.
pub fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        return format!("'{s}'");
    }
    if !s.contains('"') {
        return format!("\"{s}\"");
    }
    let parts: Vec<String> = s.split('\'').map(|p| format!("'{p}'")).collect();
    format!("concat({})", parts.join(", \"'\", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xpath(q: &str) -> String {
        to_xpath(&parse(q).unwrap(), "descendant-or-self::").unwrap()
    }

    #[test]
    fn parses_common_queries() {
        for q in [
            "div",
            ".col-lg-3",
            "div.product > p.price_color",
            "a[href^='http']",
            "ul li:nth-child(2n+1)",
            "h1 + p ~ span",
            "input:not(.hidden)",
            "div:is(.a, .b)",
            "*|a",
            "section:has(> h2)",
            "#main, .sidebar",
            "*",
        ] {
            assert!(parse(q).is_ok(), "{q}");
        }
    }

    #[test]
    fn rejects_broken_queries() {
        for q in ["", "div >", "a[href", "p::text", "//div", "div:unknown", ".", "a[=x]"] {
            assert!(parse(q).is_err(), "{q}");
        }
    }

    #[test]
    fn translates_like_cssselect() {
        assert_eq!(xpath("div"), "descendant-or-self::div");
        assert_eq!(xpath("div > p"), "descendant-or-self::div/p");
        assert_eq!(xpath("div p"), "descendant-or-self::div/descendant-or-self::*/p");
        assert_eq!(
            xpath(".thumbnail"),
            "descendant-or-self::*[@class and contains(concat(' ', normalize-space(@class), ' '), ' thumbnail ')]"
        );
        assert_eq!(xpath("a[href]"), "descendant-or-self::a[@href]");
        assert_eq!(xpath("#x, #y"), "descendant-or-self::*[@id = 'x'] | descendant-or-self::*[@id = 'y']");
        assert_eq!(xpath("li:first-child"), "descendant-or-self::li[count(preceding-sibling::*) = 0]");
        assert_eq!(xpath("*|a"), "descendant-or-self::a");
    }

    #[test]
    fn logical_pseudo_classes() {
        assert_eq!(
            xpath("input:not(.hidden)"),
            "descendant-or-self::input[not((@class and contains(concat(' ', normalize-space(@class), ' '), ' hidden ')))]"
        );
        assert_eq!(xpath("div:is(#a, p)"), "descendant-or-self::div[(@id = 'a') or self::p]");
        assert_eq!(xpath("section:has(> h2)"), "descendant-or-self::section[h2]");
        assert_eq!(xpath("section:has(img)"), "descendant-or-self::section[descendant::img]");
    }

    #[test]
    fn case_insensitive_attribute_flag() {
        assert_eq!(
            xpath("a[href$='.PDF' i]"),
            "descendant-or-self::a[@href and substring(translate(@href, 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', \
             'abcdefghijklmnopqrstuvwxyz'), string-length(@href) - 3) = '.pdf']"
        );
    }

    #[test]
    fn untranslatable_components() {
        for q in [":scope > a", "div:not(a b)", "p:is(div > p)"] {
            let group = parse(q).unwrap();
            assert!(to_xpath(&group, "").is_err(), "{q}");
        }
    }

    #[test]
    fn literal_quoting() {
        assert_eq!(xpath_literal("a"), "'a'");
        assert_eq!(xpath_literal("it's"), "\"it's\"");
        assert_eq!(xpath_literal("a'b\"c"), "concat('a', \"'\", 'b\"c')");
    }
}
