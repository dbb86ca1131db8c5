//! XPath 1.0 lexer and recursive-descent validator.
//!
//! Token disambiguation follows XPath 1.0 §3.7: when a preceding token exists
//! and is not one of `@ :: ( [ ,` or an operator, `*` is multiplication and a
//! bare name must be an operator name (`and`, `or`, `mod`, `div`).

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    DotDot,
    At,
    Comma,
    ColonColon,
    Slash,
    DoubleSlash,
    Pipe,
    Plus,
    Minus,
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    Multiply,
    /// Operator names: `and`, `or`, `mod`, `div`.
    Operator(String),
    /// `*`, `prefix:*` or a QName used as a name test.
    NameTest(String),
    /// QName followed by `(`.
    FunctionName(String),
    /// `comment`, `text`, `processing-instruction`, `node` followed by `(`.
    NodeType(String),
    AxisName(String),
    Literal(String),
    Number(String),
    Variable(String),
}

const AXES: &[&str] = &[
    "ancestor",
    "ancestor-or-self",
    "attribute",
    "child",
    "descendant",
    "descendant-or-self",
    "following",
    "following-sibling",
    "namespace",
    "parent",
    "preceding",
    "preceding-sibling",
    "self",
];

const NODE_TYPES: &[&str] = &["comment", "text", "processing-instruction", "node"];

// -------------------------------- Lexer ----------------------------------- //

pub fn tokenize(src: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = src.chars().collect();
    let mut pos = 0;
    let mut out: Vec<Token> = Vec::new();

    while pos < chars.len() {
        let c = chars[pos];
        if c.is_whitespace() {
            pos += 1;
            continue;
        }
        let next = chars.get(pos + 1).copied();
        let token = match c {
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '@' => Token::At,
            ',' => Token::Comma,
            '|' => Token::Pipe,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '=' => Token::Eq,
            '!' if next == Some('=') => {
                pos += 1;
                Token::Neq
            }
            '<' if next == Some('=') => {
                pos += 1;
                Token::Le
            }
            '<' => Token::Lt,
            '>' if next == Some('=') => {
                pos += 1;
                Token::Ge
            }
            '>' => Token::Gt,
            '/' if next == Some('/') => {
                pos += 1;
                Token::DoubleSlash
            }
            '/' => Token::Slash,
            ':' if next == Some(':') => {
                pos += 1;
                Token::ColonColon
            }
            '.' if next == Some('.') => {
                pos += 1;
                Token::DotDot
            }
            '.' if next.is_some_and(|n| n.is_ascii_digit()) => {
                let start = pos;
                pos += 1;
                while pos < chars.len() && chars[pos].is_ascii_digit() {
                    pos += 1;
                }
                out.push(Token::Number(chars[start..pos].iter().collect()));
                continue;
            }
            '.' => Token::Dot,
            '"' | '\'' => {
                let start = pos + 1;
                let end = chars[start..]
                    .iter()
                    .position(|&ch| ch == c)
                    .map(|off| start + off)
                    .ok_or_else(|| format!("unterminated literal at {pos}"))?;
                out.push(Token::Literal(chars[start..end].iter().collect()));
                pos = end + 1;
                continue;
            }
            '$' => {
                let (name, end) = read_qname(&chars, pos + 1)
                    .ok_or_else(|| format!("expected variable name at {}", pos + 1))?;
                out.push(Token::Variable(name));
                pos = end;
                continue;
            }
            '*' => {
                if operator_expected(&out) {
                    Token::Multiply
                } else {
                    Token::NameTest("*".to_string())
                }
            }
            c if c.is_ascii_digit() => {
                let start = pos;
                while pos < chars.len() && chars[pos].is_ascii_digit() {
                    pos += 1;
                }
                if pos < chars.len() && chars[pos] == '.' {
                    pos += 1;
                    while pos < chars.len() && chars[pos].is_ascii_digit() {
                        pos += 1;
                    }
                }
                out.push(Token::Number(chars[start..pos].iter().collect()));
                continue;
            }
            c if is_name_start(c) => {
                let (name, end) = read_qname(&chars, pos)
                    .ok_or_else(|| format!("bad name at {pos}"))?;
                pos = end;
                let token = if operator_expected(&out) {
                    match name.as_str() {
                        "and" | "or" | "mod" | "div" => Token::Operator(name),
                        other => return Err(format!("unexpected name `{other}` where operator expected")),
                    }
                } else {
                    match lookahead(&chars, pos) {
                        Some('(') if NODE_TYPES.contains(&name.as_str()) => Token::NodeType(name),
                        Some('(') => Token::FunctionName(name),
                        Some(':') if chars.get(skip_ws(&chars, pos) + 1) == Some(&':') => {
                            if !AXES.contains(&name.as_str()) {
                                return Err(format!("unknown axis `{name}`"));
                            }
                            Token::AxisName(name)
                        }
                        _ => Token::NameTest(name),
                    }
                };
                out.push(token);
                continue;
            }
            other => return Err(format!("unexpected `{other}` at {pos}")),
        };
        out.push(token);
        pos += 1;
    }
    Ok(out)
}

/// True if the previous token ends an operand.
fn operator_expected(prev: &[Token]) -> bool {
    match prev.last() {
        None => false,
        Some(tok) => !matches!(
            tok,
            Token::At
                | Token::ColonColon
                | Token::LParen
                | Token::LBracket
                | Token::Comma
                | Token::Operator(_)
                | Token::Slash
                | Token::DoubleSlash
                | Token::Pipe
                | Token::Plus
                | Token::Minus
                | Token::Eq
                | Token::Neq
                | Token::Lt
                | Token::Le
                | Token::Gt
                | Token::Ge
                | Token::Multiply
        ),
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

fn read_ncname(chars: &[char], start: usize) -> Option<usize> {
    if !chars.get(start).is_some_and(|&c| is_name_start(c)) {
        return None;
    }
    let mut pos = start + 1;
    while pos < chars.len() && is_name_char(chars[pos]) {
        pos += 1;
    }
    Some(pos)
}

/// `NCName (':' (NCName | '*'))?`, never consuming `::`.
fn read_qname(chars: &[char], start: usize) -> Option<(String, usize)> {
    let mut end = read_ncname(chars, start)?;
    if chars.get(end) == Some(&':') && chars.get(end + 1) != Some(&':') {
        if chars.get(end + 1) == Some(&'*') {
            end += 2;
        } else if let Some(local_end) = read_ncname(chars, end + 1) {
            end = local_end;
        }
    }
    Some((chars[start..end].iter().collect(), end))
}

fn skip_ws(chars: &[char], mut pos: usize) -> usize {
    while pos < chars.len() && chars[pos].is_whitespace() {
        pos += 1;
    }
    pos
}

fn lookahead(chars: &[char], pos: usize) -> Option<char> {
    chars.get(skip_ws(chars, pos)).copied()
}

// ------------------------------- Parser ----------------------------------- //

pub fn validate(src: &str) -> Result<(), String> {
    let tokens = tokenize(src)?;
    if tokens.is_empty() {
        return Err("empty expression".to_string());
    }
    let mut p = Parser { tokens: &tokens, pos: 0 };
    p.or_expr()?;
    if p.pos < tokens.len() {
        return Err(format!("unexpected token {:?}", tokens[p.pos]));
    }
    Ok(())
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<&'a Token> {
        let tok = self.tokens.get(self.pos);
        self.pos += 1;
        tok
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), String> {
        if self.eat(&expected) {
            Ok(())
        } else {
            Err(format!("expected {expected:?}, got {:?}", self.peek()))
        }
    }

    fn eat_operator(&mut self, name: &str) -> bool {
        if matches!(self.peek(), Some(Token::Operator(op)) if op == name) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn or_expr(&mut self) -> Result<(), String> {
        self.and_expr()?;
        while self.eat_operator("or") {
            self.and_expr()?;
        }
        Ok(())
    }

    fn and_expr(&mut self) -> Result<(), String> {
        self.equality_expr()?;
        while self.eat_operator("and") {
            self.equality_expr()?;
        }
        Ok(())
    }

    fn equality_expr(&mut self) -> Result<(), String> {
        self.relational_expr()?;
        while self.eat(&Token::Eq) || self.eat(&Token::Neq) {
            self.relational_expr()?;
        }
        Ok(())
    }

    fn relational_expr(&mut self) -> Result<(), String> {
        self.additive_expr()?;
        while self.eat(&Token::Lt) || self.eat(&Token::Le) || self.eat(&Token::Gt) || self.eat(&Token::Ge) {
            self.additive_expr()?;
        }
        Ok(())
    }

    fn additive_expr(&mut self) -> Result<(), String> {
        self.multiplicative_expr()?;
        while self.eat(&Token::Plus) || self.eat(&Token::Minus) {
            self.multiplicative_expr()?;
        }
        Ok(())
    }

    fn multiplicative_expr(&mut self) -> Result<(), String> {
        self.unary_expr()?;
        while self.eat(&Token::Multiply) || self.eat_operator("div") || self.eat_operator("mod") {
            self.unary_expr()?;
        }
        Ok(())
    }

    fn unary_expr(&mut self) -> Result<(), String> {
        while self.eat(&Token::Minus) {}
        self.union_expr()
    }

    fn union_expr(&mut self) -> Result<(), String> {
        self.path_expr()?;
        while self.eat(&Token::Pipe) {
            self.path_expr()?;
        }
        Ok(())
    }

    fn path_expr(&mut self) -> Result<(), String> {
        match self.peek() {
            Some(Token::Variable(_) | Token::LParen | Token::Literal(_) | Token::Number(_) | Token::FunctionName(_)) => {
                self.filter_expr()?;
                if self.eat(&Token::Slash) || self.eat(&Token::DoubleSlash) {
                    self.relative_location_path()?;
                }
                Ok(())
            }
            _ => self.location_path(),
        }
    }

    fn filter_expr(&mut self) -> Result<(), String> {
        self.primary_expr()?;
        while self.peek() == Some(&Token::LBracket) {
            self.predicate()?;
        }
        Ok(())
    }

    fn primary_expr(&mut self) -> Result<(), String> {
        match self.bump() {
            Some(Token::Variable(_) | Token::Literal(_) | Token::Number(_)) => Ok(()),
            Some(Token::LParen) => {
                self.or_expr()?;
                self.expect(Token::RParen)
            }
            Some(Token::FunctionName(_)) => {
                self.expect(Token::LParen)?;
                if self.eat(&Token::RParen) {
                    return Ok(());
                }
                self.or_expr()?;
                while self.eat(&Token::Comma) {
                    self.or_expr()?;
                }
                self.expect(Token::RParen)
            }
            other => Err(format!("expected primary expression, got {other:?}")),
        }
    }

    fn location_path(&mut self) -> Result<(), String> {
        match self.peek() {
            Some(Token::Slash) => {
                self.pos += 1;
                if self.starts_step() {
                    self.relative_location_path()?;
                }
                Ok(())
            }
            Some(Token::DoubleSlash) => {
                self.pos += 1;
                self.relative_location_path()
            }
            _ => self.relative_location_path(),
        }
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Dot | Token::DotDot | Token::At | Token::AxisName(_) | Token::NameTest(_) | Token::NodeType(_))
        )
    }

    fn relative_location_path(&mut self) -> Result<(), String> {
        self.step()?;
        while self.eat(&Token::Slash) || self.eat(&Token::DoubleSlash) {
            self.step()?;
        }
        Ok(())
    }

    fn step(&mut self) -> Result<(), String> {
        if self.eat(&Token::Dot) || self.eat(&Token::DotDot) {
            return Ok(());
        }
        if let Some(Token::AxisName(_)) = self.peek() {
            self.pos += 1;
            self.expect(Token::ColonColon)?;
        } else {
            self.eat(&Token::At);
        }
        self.node_test()?;
        while self.peek() == Some(&Token::LBracket) {
            self.predicate()?;
        }
        Ok(())
    }

    fn node_test(&mut self) -> Result<(), String> {
        match self.bump() {
            Some(Token::NameTest(_)) => Ok(()),
            Some(Token::NodeType(kind)) => {
                self.expect(Token::LParen)?;
                if kind == "processing-instruction" {
                    if let Some(Token::Literal(_)) = self.peek() {
                        self.pos += 1;
                    }
                }
                self.expect(Token::RParen)
            }
            other => Err(format!("expected node test, got {other:?}")),
        }
    }

    fn predicate(&mut self) -> Result<(), String> {
        self.expect(Token::LBracket)?;
        self.or_expr()?;
        self.expect(Token::RBracket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_real_world_queries() {
        for q in [
            "//div",
            "//div[@class='product']/p[2]",
            "//a/@href",
            "//p/text()",
            "descendant-or-self::div/descendant-or-self::*/p",
            "//li[contains(@class, 'item') and not(@hidden)]",
            "count(//a) * 2",
            "//div[last()]",
            "(//a)[1]",
            "./span | ../b",
            "//*[@id = 'x']",
            "//td[position() mod 2 = 1]",
            "div",
        ] {
            assert!(validate(q).is_ok(), "{q}: {:?}", validate(q));
        }
    }

    #[test]
    fn rejects_malformed() {
        for q in ["", "//", "//div[", "div >> p", "//a[@href='x]", ".product", "//div[1", "a b", "foo::bar"] {
            assert!(validate(q).is_err(), "{q}");
        }
    }

    #[test]
    fn star_and_name_disambiguation() {
        let toks = tokenize("2 * 3").unwrap();
        assert_eq!(toks[1], Token::Multiply);
        let toks = tokenize("//*").unwrap();
        assert_eq!(toks[1], Token::NameTest("*".into()));
        let toks = tokenize("a and b").unwrap();
        assert_eq!(toks[1], Token::Operator("and".into()));
        assert_eq!(toks[2], Token::NameTest("b".into()));
    }
}
