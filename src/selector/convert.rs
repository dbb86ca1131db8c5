//! Best-effort XPath to CSS rewriting.
//!
//! Only location paths built from `/`, `//`, element names and the predicate
//! shapes CSS can express are converted; anything else is reported back.
use super::xpath::{Token, tokenize};

pub fn xpath_to_css(query: &str) -> Result<String, String> {
    let tokens = tokenize(query)?;
    let mut out = String::new();
    let mut i = 0;

    // `.//x` is a plain descendant query; `./x` needs `:scope`, which the
    // generated parsers cannot rely on
    if tokens.first() == Some(&Token::Dot) {
        if tokens.get(1) != Some(&Token::DoubleSlash) {
            return Err("child steps relative to the current node have no CSS equivalent".to_string());
        }
        i += 1;
    }

    while i < tokens.len() {
        match &tokens[i] {
            Token::Slash => {
                if !starts_alternative(&out) {
                    out.push_str(" > ");
                }
                i += 1;
            }
            Token::DoubleSlash => {
                if !starts_alternative(&out) {
                    out.push(' ');
                }
                i += 1;
            }
            Token::NameTest(name) if !name.contains(':') || name == "*" => {
                out.push_str(name);
                i += 1;
                while tokens.get(i) == Some(&Token::LBracket) {
                    let end = tokens[i..]
                        .iter()
                        .position(|t| *t == Token::RBracket)
                        .map(|off| i + off)
                        .ok_or_else(|| "unclosed predicate".to_string())?;
                    out.push_str(&predicate_to_css(&tokens[i + 1..end])?);
                    i = end + 1;
                }
            }
            Token::Pipe => {
                out.push_str(", ");
                i += 1;
            }
            other => return Err(format!("{other:?} has no CSS equivalent")),
        }
    }
    if out.is_empty() {
        return Err("empty selector".to_string());
    }
    Ok(out)
}

fn starts_alternative(out: &str) -> bool {
    out.is_empty() || out.ends_with(", ")
}

fn predicate_to_css(pred: &[Token]) -> Result<String, String> {
    use Token::*;
    match pred {
        [Number(n)] => Ok(format!(":nth-of-type({n})")),
        [At, NameTest(attr)] => Ok(format!("[{attr}]")),
        [At, NameTest(attr), Eq, Literal(value)] => Ok(format!("[{attr}={}]", css_string(value))),
        [FunctionName(f), LParen, At, NameTest(attr), Comma, Literal(value), RParen] => {
            let op = match f.as_str() {
                "contains" => "*=",
                "starts-with" => "^=",
                other => return Err(format!("function `{other}()` has no CSS equivalent")),
            };
            Ok(format!("[{attr}{op}{}]", css_string(value)))
        }
        [FunctionName(f), LParen, RParen] if f == "last" => Ok(":last-of-type".to_string()),
        _ => Err("predicate has no CSS equivalent".to_string()),
    }
}

fn css_string(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_paths() {
        assert_eq!(xpath_to_css("//div/a").unwrap(), "div > a");
        assert_eq!(xpath_to_css("//div//a").unwrap(), "div a");
        assert_eq!(xpath_to_css(".//span").unwrap(), "span");
        assert_eq!(xpath_to_css("//li[2]").unwrap(), "li:nth-of-type(2)");
        assert_eq!(xpath_to_css("//a[@href]").unwrap(), "a[href]");
        assert_eq!(xpath_to_css("//div[@class='x']").unwrap(), "div[class=\"x\"]");
        assert_eq!(xpath_to_css("//div[contains(@class, 'x')]").unwrap(), "div[class*=\"x\"]");
        assert_eq!(xpath_to_css("//h1 | //h2").unwrap(), "h1, h2");
    }

    #[test]
    fn alternatives_restart_the_path() {
        assert_eq!(xpath_to_css("//ul/li | //ol/li").unwrap(), "ul > li, ol > li");
        assert_eq!(xpath_to_css("//h1|//h2[@id]").unwrap(), "h1, h2[id]");
    }

    #[test]
    fn relative_child_steps_are_refused() {
        assert!(xpath_to_css("./span").is_err());
        assert!(xpath_to_css(".").is_err());
        assert_eq!(xpath_to_css(".//span/b").unwrap(), "span > b");
    }

    #[test]
    fn refuses_what_css_cannot_say() {
        assert!(xpath_to_css("//a/..").is_err());
        assert!(xpath_to_css("//a[text()='x']").is_err());
        assert!(xpath_to_css("following-sibling::a").is_err());
    }
}
