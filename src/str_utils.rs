//! Naming and literal helpers shared by the target emitters.

pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let mut prev_lower = false;
    for c in s.chars() {
        if c == '-' || c == ' ' || c == '_' {
            if !out.ends_with('_') && !out.is_empty() {
                out.push('_');
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() {
            if prev_lower && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

pub fn to_upper_camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper_next = true;
    for c in s.chars() {
        if c == '_' || c == '-' || c == ' ' {
            upper_next = true;
            continue;
        }
        if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

pub fn to_lower_camel_case(s: &str) -> String {
    let upper = to_upper_camel_case(s);
    let mut chars = upper.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Python `repr()` of a str.
pub fn py_repr(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Double quoted literal valid in JS and Go.
pub fn wrap_double_quotes(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Double quoted Lua literal; control characters use decimal escapes.
pub fn wrap_lua_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\{:03}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Double quoted Dart literal with `$` escaped against interpolation.
pub fn wrap_dart_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '$' => out.push_str("\\$"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Dart raw string (`r'...'`) when the text allows one, else an escaped literal.
pub fn dart_raw_string(s: &str) -> String {
    if s.chars().any(|c| (c as u32) < 0x20) {
        return wrap_dart_string(s);
    }
    if !s.contains('\'') {
        return format!("r'{s}'");
    }
    if !s.contains('"') {
        return format!("r\"{s}\"");
    }
    wrap_dart_string(s)
}

/// Go raw string; falls back to an interpreted literal when `s` holds a backtick.
pub fn wrap_backtick(s: &str) -> String {
    if s.contains('`') {
        return wrap_double_quotes(s);
    }
    format!("`{s}`")
}

/// Escape `/` for a JS regex literal body.
pub fn js_regex_body(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut escaped = false;
    for c in pattern.chars() {
        if c == '/' && !escaped {
            out.push('\\');
        }
        escaped = c == '\\' && !escaped;
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_conversions() {
        assert_eq!(to_snake_case("BooksCatalogue"), "books_catalogue");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        assert_eq!(to_upper_camel_case("price_color"), "PriceColor");
        assert_eq!(to_upper_camel_case("__SPLIT_DOC__"), "SPLITDOC");
        assert_eq!(to_lower_camel_case("split_doc"), "splitDoc");
        assert_eq!(to_lower_camel_case("title"), "title");
    }

    #[test]
    fn python_repr_matches_cpython() {
        assert_eq!(py_repr("abc"), "'abc'");
        assert_eq!(py_repr("it's"), "\"it's\"");
        assert_eq!(py_repr("a\\d+"), "'a\\\\d+'");
        assert_eq!(py_repr("x\ny"), "'x\\ny'");
    }

    #[test]
    fn quoting_for_c_like_targets() {
        assert_eq!(wrap_double_quotes("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_eq!(wrap_backtick("\\d+"), "`\\d+`");
        assert_eq!(wrap_backtick("a`b"), "\"a`b\"");
        assert_eq!(js_regex_body("a/b\\/c"), "a\\/b\\/c");
    }

    #[test]
    fn lua_and_dart_literals() {
        assert_eq!(wrap_lua_string("a\"b\\"), "\"a\\\"b\\\\\"");
        assert_eq!(wrap_lua_string("\u{1}"), "\"\\001\"");
        assert_eq!(wrap_dart_string("cost $5"), "\"cost \\$5\"");
        assert_eq!(dart_raw_string(r"\d+"), r"r'\d+'");
        assert_eq!(dart_raw_string("it's"), "r\"it's\"");
        assert_eq!(dart_raw_string("'\""), "\"'\\\"\"");
    }
}
