//! Selector validation and CSS/XPath translation.
//!
//! CSS queries are parsed with scraper's selector grammar and translated to
//! XPath the way cssselect's `GenericTranslator` does, so every accepted CSS
//! query has an XPath 1.0 counterpart.
pub mod convert;
pub mod css;
pub mod pseudo;
pub mod xpath;

use thiserror::Error;

pub use pseudo::{PseudoAction, split_css_pseudo, split_xpath_pseudo};

/// Prefix used for translated queries; matches the context node and its descendants.
pub const XPATH_PREFIX: &str = "descendant-or-self::";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("`{0}` looks like XPATH query, not CSS")]
    LooksLikeXpath(String),
    #[error("`{0}` is not valid CSS selector")]
    InvalidCss(String),
    #[error("`{query}` has no XPATH equivalent: {reason}")]
    UnsupportedCss { query: String, reason: String },
    #[error("`{0}` looks like CSS query, not XPATH")]
    LooksLikeCss(String),
    #[error("`{0}` is not valid XPATH selector")]
    InvalidXpath(String),
    #[error("`{query}` cannot be converted to CSS: {reason}")]
    Unconvertible { query: String, reason: String },
}

// ------------------------------ Validation -------------------------------- //

/// Accepts what scraper parses and what translates to XPath, with an
/// optional trailing `::text` / `::raw` / `::attr(..)` extractor.
pub fn validate_css_query(query: &str) -> Result<(), SelectorError> {
    css_base_to_xpath(query).map(|_| ())
}

fn css_base_to_xpath(query: &str) -> Result<(String, Option<PseudoAction>), SelectorError> {
    let (base, action) = split_css_pseudo(query);
    let group = match css::parse(&base) {
        Ok(group) => group,
        Err(detail) => {
            log::debug!("css parse failed for `{query}`: {detail}");
            let (xbase, _) = split_xpath_pseudo(query);
            return Err(if xpath::validate(&xbase).is_ok() {
                SelectorError::LooksLikeXpath(query.to_string())
            } else {
                SelectorError::InvalidCss(query.to_string())
            });
        }
    };
    let xp = css::to_xpath(&group, XPATH_PREFIX)
        .map_err(|reason| SelectorError::UnsupportedCss { query: query.to_string(), reason })?;
    Ok((xp, action))
}

/// A query that parses as both is treated as CSS: bare tag names like `div`
/// are almost always a forgotten `//`.
pub fn validate_xpath_query(query: &str) -> Result<(), SelectorError> {
    let (base, _) = split_xpath_pseudo(query);
    match xpath::validate(&base) {
        Ok(()) => {
            let (cbase, _) = split_css_pseudo(query);
            if css::parse(&cbase).is_ok() {
                Err(SelectorError::LooksLikeCss(query.to_string()))
            } else {
                Ok(())
            }
        }
        Err(detail) => {
            log::debug!("xpath parse failed for `{query}`: {detail}");
            Err(SelectorError::InvalidXpath(query.to_string()))
        }
    }
}

// ------------------------------ Conversion -------------------------------- //

/// Translate a CSS query; a trailing extractor keeps its XPath spelling
/// (`::text` becomes `/text()`, `::attr(href)` becomes `/@href`).
pub fn css_to_xpath(query: &str) -> Result<String, SelectorError> {
    let (mut xp, action) = css_base_to_xpath(query)?;
    if let Some(action) = action {
        if xp.contains(" | ") {
            xp = format!("({xp})");
        }
        xp.push_str(&action.xpath_suffix());
    }
    Ok(xp)
}

pub fn xpath_to_css(query: &str) -> Result<String, SelectorError> {
    convert::xpath_to_css(query).map_err(|reason| SelectorError::Unconvertible {
        query: query.to_string(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_validation_messages() {
        assert!(validate_css_query("div.product > a::attr(href)").is_ok());
        assert_eq!(
            validate_css_query("//div/a").unwrap_err().to_string(),
            "`//div/a` looks like XPATH query, not CSS"
        );
        assert_eq!(
            validate_css_query("div[").unwrap_err().to_string(),
            "`div[` is not valid CSS selector"
        );
    }

    #[test]
    fn xpath_validation_messages() {
        assert!(validate_xpath_query("//div[@class='x']/a/@href").is_ok());
        assert_eq!(
            validate_xpath_query("//div[").unwrap_err().to_string(),
            "`//div[` is not valid XPATH selector"
        );
        // parses as a comparison, but reads as CSS
        assert!(matches!(validate_xpath_query("div > a"), Err(SelectorError::LooksLikeCss(_))));
        assert_eq!(
            validate_xpath_query("a").unwrap_err().to_string(),
            "`a` looks like CSS query, not XPATH"
        );
    }

    #[test]
    fn accepted_css_translates_to_valid_xpath() {
        for q in [
            "div",
            "div.product > p.price_color",
            "ul li:nth-child(2n+1)",
            "h1 + p ~ span",
            "a[href$='.pdf']",
            "a[href$='.PDF' i]",
            "a[lang|=en]",
            "a[title~=\"big\"]",
            "input:not(.hidden)",
            "div:is(.a, .b)",
            "section:has(> h2.title)",
            "*|a",
            "li:last-of-type, li:only-child",
            "tr:nth-last-child(-n+3)",
            "div:empty",
            "*",
            "#main .x::text",
            "div.product > a::attr(href)",
            "img::attr(src, alt)",
            "h1, h2::raw",
        ] {
            assert!(validate_css_query(q).is_ok(), "{q}");
            let xp = css_to_xpath(q).unwrap();
            assert!(validate_xpath_query(&xp).is_ok(), "{q} -> {xp}");
        }
    }

    #[test]
    fn extractor_suffix_survives_translation() {
        assert_eq!(
            css_to_xpath("#main .x::text").unwrap(),
            "descendant-or-self::*[@id = 'main']/descendant-or-self::*/*[@class and contains(concat(' ', \
             normalize-space(@class), ' '), ' x ')]/text()"
        );
        assert_eq!(css_to_xpath("a::attr(href)").unwrap(), "descendant-or-self::a/@href");
        assert_eq!(
            css_to_xpath("h1, h2::raw").unwrap(),
            "(descendant-or-self::h1 | descendant-or-self::h2)/raw()"
        );
    }

    #[test]
    fn untranslatable_css_is_rejected() {
        assert!(matches!(validate_css_query(":scope > a"), Err(SelectorError::UnsupportedCss { .. })));
        assert!(matches!(css_to_xpath("div:not(a b)"), Err(SelectorError::UnsupportedCss { .. })));
    }

    #[test]
    fn round_trip_simple_path() {
        let css = xpath_to_css("//div/a").unwrap();
        assert_eq!(css, "div > a");
        assert!(validate_css_query(&css).is_ok());
        assert!(matches!(xpath_to_css("//a/.."), Err(SelectorError::Unconvertible { .. })));
    }
}
