//! String filter conditions for `Document::filter`.
//!
//! A filter holds exactly one root condition; conjunction, disjunction and
//! negation are explicit combinators.
use serde_json::{Value, json};

use super::{Expr, Kwargs};
use crate::tokens::{TokenKind, VariableType};

#[derive(Debug, Clone)]
pub struct Filter(Expr);

impl Filter {
    fn predicate(kind: TokenKind, kwargs: Kwargs) -> Self {
        let mut expr = Expr::new(kind, VariableType::String, VariableType::Bool);
        expr.kwargs = kwargs;
        Filter(expr)
    }

    fn combinator(kind: TokenKind, parts: Vec<Filter>) -> Self {
        let mut expr = Expr::new(kind, VariableType::String, VariableType::Bool);
        expr.body = parts.into_iter().map(|f| f.0).collect();
        Filter(expr)
    }

    /// Item equals any of `values`.
    pub fn eq(values: &[&str]) -> Self {
        Self::predicate(TokenKind::FilterEq, kwargs([("values", json!(values))]))
    }

    /// Item equals none of `values`.
    pub fn ne(values: &[&str]) -> Self {
        Self::predicate(TokenKind::FilterNe, kwargs([("values", json!(values))]))
    }

    pub fn contains(values: &[&str]) -> Self {
        Self::predicate(TokenKind::FilterIn, kwargs([("substr", json!(values))]))
    }

    pub fn starts_with(values: &[&str]) -> Self {
        Self::predicate(TokenKind::FilterStarts, kwargs([("substr", json!(values))]))
    }

    pub fn ends_with(values: &[&str]) -> Self {
        Self::predicate(TokenKind::FilterEnds, kwargs([("substr", json!(values))]))
    }

    pub fn re(pattern: &str) -> Self {
        Self::re_with(pattern, false)
    }

    pub fn re_with(pattern: &str, ignore_case: bool) -> Self {
        Self::predicate(
            TokenKind::FilterRe,
            kwargs([("pattern", json!(pattern)), ("ignore_case", json!(ignore_case))]),
        )
    }

    pub fn len_eq(length: i64) -> Self {
        Self::length(TokenKind::FilterLenEq, length)
    }

    pub fn len_ne(length: i64) -> Self {
        Self::length(TokenKind::FilterLenNe, length)
    }

    pub fn len_lt(length: i64) -> Self {
        Self::length(TokenKind::FilterLenLt, length)
    }

    pub fn len_le(length: i64) -> Self {
        Self::length(TokenKind::FilterLenLe, length)
    }

    pub fn len_gt(length: i64) -> Self {
        Self::length(TokenKind::FilterLenGt, length)
    }

    pub fn len_ge(length: i64) -> Self {
        Self::length(TokenKind::FilterLenGe, length)
    }

    fn length(kind: TokenKind, length: i64) -> Self {
        Self::predicate(kind, kwargs([("length", json!(length))]))
    }

    pub fn and(parts: Vec<Filter>) -> Self {
        Self::combinator(TokenKind::FilterAnd, parts)
    }

    pub fn or(parts: Vec<Filter>) -> Self {
        Self::combinator(TokenKind::FilterOr, parts)
    }

    pub fn not(inner: Filter) -> Self {
        Self::combinator(TokenKind::FilterNot, vec![inner])
    }

    pub fn expr(&self) -> &Expr {
        &self.0
    }

    pub fn into_expr(self) -> Expr {
        self.0
    }

    /// Number of predicate leaves.
    pub fn leaves(&self) -> usize {
        fn walk(e: &Expr) -> usize {
            if e.body.is_empty() { 1 } else { e.body.iter().map(walk).sum() }
        }
        walk(&self.0)
    }
}

fn kwargs<const N: usize>(pairs: [(&str, Value); N]) -> Kwargs {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combinators_nest() {
        let f = Filter::and(vec![
            Filter::starts_with(&["http"]),
            Filter::not(Filter::ends_with(&[".png", ".jpg"])),
            Filter::len_gt(10),
        ]);
        let e = f.expr();
        assert_eq!(e.kind, TokenKind::FilterAnd);
        assert_eq!(e.body.len(), 3);
        assert_eq!(e.body[1].kind, TokenKind::FilterNot);
        assert_eq!(e.body[1].body[0].kwargs["substr"], json!([".png", ".jpg"]));
        assert_eq!(f.leaves(), 3);
    }

    #[test]
    fn predicate_kwargs() {
        let f = Filter::re_with("^a", true);
        assert_eq!(f.expr().kwargs["pattern"], json!("^a"));
        assert_eq!(f.expr().kwargs["ignore_case"], json!(true));
        assert_eq!(Filter::len_eq(3).expr().kwargs["length"], json!(3));
    }
}
