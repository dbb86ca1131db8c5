//! Text-level passes run over emitted code.
//!
//! Every pass is a pure `&str -> String` function that leaves code it does
//! not recognise untouched, and running a pass twice gives the same text as
//! running it once.
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

pub type Rewriter = fn(&str) -> String;

/// Run `chain` left to right.
pub fn apply(chain: &[Rewriter], code: &str) -> String {
    chain.iter().fold(code.to_string(), |acc, pass| pass(&acc))
}

// ---------------------------- Trivial returns ----------------------------- //

static PY_RETURN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^([ \t]*)(v\d+) = (.+)\n([ \t]*)return (v\d+)$").expect("valid python return regex")
});

static JS_RETURN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^([ \t]*)let (v\d+) = (.+);\n([ \t]*)return (v\d+);$").expect("valid js return regex")
});

static GO_RETURN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^([ \t]*)(v\d+) := (.+)\n([ \t]*)return (v\d+), nil$").expect("valid go return regex")
});

/// Replace `<assign vN = X>` directly followed by `return vN` at the same
/// indent with `return X`, until nothing changes.
fn collapse(code: &str, re: &Regex, render: fn(&str, &str) -> String) -> String {
    let mut current = code.to_string();
    loop {
        let next = re
            .replace_all(&current, |caps: &Captures<'_>| {
                if caps[1] == caps[4] && caps[2] == caps[5] {
                    render(&caps[1], &caps[3])
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned();
        if next == current {
            return next;
        }
        current = next;
    }
}

pub fn collapse_py_return(code: &str) -> String {
    collapse(code, &PY_RETURN, |indent, expr| format!("{indent}return {expr}"))
}

pub fn collapse_js_return(code: &str) -> String {
    collapse(code, &JS_RETURN, |indent, expr| format!("{indent}return {expr};"))
}

pub fn collapse_go_return(code: &str) -> String {
    collapse(code, &GO_RETURN, |indent, expr| format!("{indent}return {expr}, nil"))
}

// ------------------------------- f-strings -------------------------------- //

static PY_FORMAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"'((?:[^'\\\n]|\\.)*)'\.format\(([A-Za-z_][A-Za-z0-9_]*)\)|"((?:[^"\\\n]|\\.)*)"\.format\(([A-Za-z_][A-Za-z0-9_]*)\)"#)
        .expect("valid python format regex")
});

/// Body with its single `{}` placeholder filled by `var`; `None` when the
/// template has no placeholder, several, or a brace it does not understand.
fn fill_placeholder(body: &str, var: &str) -> Option<String> {
    let mut out = String::with_capacity(body.len() + var.len());
    let mut filled = false;
    let mut rest = body;
    while let Some(c) = rest.chars().next() {
        let pair = rest.get(..2).unwrap_or(rest);
        match (c, pair) {
            (_, "{{") | (_, "}}") => {
                out.push_str(pair);
                rest = &rest[2..];
                continue;
            }
            (_, "{}") if !filled => {
                out.push('{');
                out.push_str(var);
                out.push('}');
                filled = true;
                rest = &rest[2..];
                continue;
            }
            ('{', _) | ('}', _) => return None,
            _ => out.push(c),
        }
        rest = &rest[c.len_utf8()..];
    }
    filled.then_some(out)
}

/// `'a{}b'.format(v1)` to `f'a{v1}b'`.
pub fn py_fstrings(code: &str) -> String {
    PY_FORMAT
        .replace_all(code, |caps: &Captures<'_>| {
            let (quote, body, var) = match (caps.get(1), caps.get(2)) {
                (Some(body), Some(var)) => ('\'', body.as_str(), var.as_str()),
                _ => ('"', caps.get(3).map_or("", |m| m.as_str()), caps.get(4).map_or("", |m| m.as_str())),
            };
            match fill_placeholder(body, var) {
                Some(filled) if !body.contains('\\') => format!("f{quote}{filled}{quote}"),
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

// ----------------------------- Go imports --------------------------------- //

static GO_IMPORT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)import \(\n(.*?)\n\)").expect("valid go import regex"));

static GO_IMPORT_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*(?:([A-Za-z_][A-Za-z0-9_]*)\s+)?"([^"]+)"\s*$"#).expect("valid go import line regex"));

fn import_used(code: &str, name: &str) -> bool {
    match Regex::new(&format!(r"\b{}\.", regex::escape(name))) {
        Ok(re) => re.is_match(code),
        Err(_) => true,
    }
}

/// Drop entries of the `import ( ... )` block whose package is never
/// referenced as `pkg.`.
pub fn go_unused_imports(code: &str) -> String {
    let Some(block) = GO_IMPORT_BLOCK.captures(code) else {
        return code.to_string();
    };
    let (Some(whole), Some(lines)) = (block.get(0), block.get(1)) else {
        return code.to_string();
    };
    let rest = format!("{}{}", &code[..whole.start()], &code[whole.end()..]);
    let kept: Vec<&str> = lines
        .as_str()
        .lines()
        .filter(|line| match GO_IMPORT_LINE.captures(line) {
            Some(caps) => {
                let name = match caps.get(1) {
                    Some(alias) => alias.as_str(),
                    None => caps[2].rsplit('/').next().unwrap_or_default(),
                };
                name == "_" || import_used(&rest, name)
            }
            None => true,
        })
        .collect();
    if kept.is_empty() {
        let tail = &code[whole.end()..];
        return format!("{}{}", &code[..whole.start()], tail.strip_prefix('\n').unwrap_or(tail));
    }
    format!("{}import (\n{}\n){}", &code[..whole.start()], kept.join("\n"), &code[whole.end()..])
}

// ------------------------------ Blank lines ------------------------------- //

pub fn remove_empty_lines(code: &str) -> String {
    let mut out: String = code
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if code.ends_with('\n') && !out.is_empty() {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idempotent(pass: Rewriter, code: &str) {
        let once = pass(code);
        assert_eq!(pass(&once), once);
    }

    #[test]
    fn python_return_collapses_chain() {
        let code = "    def _parse_a(self, v):\n        v0 = v.text\n        v1 = v0.strip()\n        return v1\n";
        assert_eq!(collapse_py_return(code), "    def _parse_a(self, v):\n        v0 = v.text\n        return v0.strip()\n");
        idempotent(collapse_py_return, code);
    }

    #[test]
    fn python_return_keeps_other_names_and_indents() {
        let code = "        v1 = x\n        return v2\n";
        assert_eq!(collapse_py_return(code), code);
        let nested = "            v1 = x\n        return v1\n";
        assert_eq!(collapse_py_return(nested), nested);
    }

    #[test]
    fn js_and_go_returns() {
        assert_eq!(collapse_js_return("  let v3 = v2.trim();\n  return v3;"), "  return v2.trim();");
        assert_eq!(collapse_go_return("\tv3 := strings.TrimSpace(v2)\n\treturn v3, nil"), "\treturn strings.TrimSpace(v2), nil");
        let pointer = "\tv3 := strings.TrimSpace(v2)\n\treturn &v3, nil";
        assert_eq!(collapse_go_return(pointer), pointer);
        idempotent(collapse_js_return, "let v0 = v;\nlet v1 = v0;\nreturn v1;");
    }

    #[test]
    fn fstrings() {
        assert_eq!(py_fstrings("v1 = 'https://x.test/{}'.format(v0)"), "v1 = f'https://x.test/{v0}'");
        assert_eq!(py_fstrings(r#"[ "{{a}} {}".format(e) for e in v0]"#), r#"[ f"{{a}} {e}" for e in v0]"#);
        let two = "'{} {}'.format(v0)";
        assert_eq!(py_fstrings(two), two);
        let escaped = r"'\t{}'.format(v0)";
        assert_eq!(py_fstrings(escaped), escaped);
        idempotent(py_fstrings, "'a{}'.format(v1)");
    }

    #[test]
    fn go_imports_drop_unused() {
        let code = "package main\n\nimport (\n\t\"fmt\"\n\t\"strings\"\n\t\"github.com/PuerkitoBio/goquery\"\n)\n\nfunc f(s *goquery.Selection) string { return strings.TrimSpace(s.Text()) }\n";
        let out = go_unused_imports(code);
        assert!(!out.contains("\"fmt\""));
        assert!(out.contains("\t\"strings\"\n\t\"github.com/PuerkitoBio/goquery\""));
        idempotent(go_unused_imports, code);
    }

    #[test]
    fn empty_lines() {
        assert_eq!(remove_empty_lines("a\n\n  \nb\n"), "a\nb\n");
        idempotent(remove_empty_lines, "a\n\n\tb");
    }
}
