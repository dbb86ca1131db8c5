//! Trailing extractor pseudo-selectors.
//!
//! `div a::attr(href)` and `//div/a/@href` both mean "select, then extract";
//! the document builder turns the suffix into an extractor node.
use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PseudoAction {
    Text,
    Raw,
    Attr(Vec<String>),
}

static CSS_PSEUDO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"::(?:(text)|(raw)|attr\(([^)]*)\))\s*$").expect("valid pseudo regex")
});

static XPATH_PSEUDO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/(?:(text)\(\)|(raw)\(\)|@([\w:.-]+)|\((@[\w:.-]+(?:\s*\|\s*@[\w:.-]+)*)\))\s*$")
        .expect("valid pseudo regex")
});

impl PseudoAction {
    /// XPath spelling: `/text()`, `/raw()`, `/@a` or `/(@a|@b)`.
    pub fn xpath_suffix(&self) -> String {
        match self {
            Self::Text => "/text()".to_string(),
            Self::Raw => "/raw()".to_string(),
            Self::Attr(names) if names.len() == 1 => format!("/@{}", names[0]),
            Self::Attr(names) => {
                let union: Vec<String> = names.iter().map(|n| format!("@{n}")).collect();
                format!("/({})", union.join("|"))
            }
        }
    }
}

/// `div a::attr(href,src)` -> (`div a`, Attr([href, src])).
pub fn split_css_pseudo(query: &str) -> (String, Option<PseudoAction>) {
    split_with(&CSS_PSEUDO_RE, query)
}

/// `//a/@href` -> (`//a`, Attr([href])).
pub fn split_xpath_pseudo(query: &str) -> (String, Option<PseudoAction>) {
    split_with(&XPATH_PSEUDO_RE, query)
}

fn split_with(re: &Regex, query: &str) -> (String, Option<PseudoAction>) {
    let Some(caps) = re.captures(query) else {
        return (query.to_string(), None);
    };
    let Some(whole) = caps.get(0) else {
        return (query.to_string(), None);
    };
    let action = if caps.get(1).is_some() {
        PseudoAction::Text
    } else if caps.get(2).is_some() {
        PseudoAction::Raw
    } else if let Some(union) = caps.get(4) {
        PseudoAction::Attr(
            union
                .as_str()
                .split('|')
                .map(|s| s.trim().trim_start_matches('@').to_string())
                .collect(),
        )
    } else {
        let names = caps
            .get(3)
            .map(|m| {
                m.as_str()
                    .split(',')
                    .map(|s| s.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        PseudoAction::Attr(names)
    };
    (query[..whole.start()].trim_end().to_string(), Some(action))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_suffixes() {
        assert_eq!(split_css_pseudo("p.title::text"), ("p.title".into(), Some(PseudoAction::Text)));
        assert_eq!(split_css_pseudo("div::raw"), ("div".into(), Some(PseudoAction::Raw)));
        assert_eq!(
            split_css_pseudo("img::attr(src, 'alt')"),
            ("img".into(), Some(PseudoAction::Attr(vec!["src".into(), "alt".into()])))
        );
        assert_eq!(split_css_pseudo("a:first-child"), ("a:first-child".into(), None));
    }

    #[test]
    fn xpath_suffixes() {
        assert_eq!(split_xpath_pseudo("//a/@href"), ("//a".into(), Some(PseudoAction::Attr(vec!["href".into()]))));
        assert_eq!(split_xpath_pseudo("//p/text()"), ("//p".into(), Some(PseudoAction::Text)));
        assert_eq!(split_xpath_pseudo("//p/raw()"), ("//p".into(), Some(PseudoAction::Raw)));
        assert_eq!(split_xpath_pseudo("//p"), ("//p".into(), None));
        assert_eq!(
            split_xpath_pseudo("//img/(@src | @alt)"),
            ("//img".into(), Some(PseudoAction::Attr(vec!["src".into(), "alt".into()])))
        );
        assert_eq!(PseudoAction::Attr(vec!["src".into(), "alt".into()]).xpath_suffix(), "/(@src|@alt)");
    }
}
