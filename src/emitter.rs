//! Callback-table visitor that renders a module tree as target source text.
//!
//! A target fills a [`Converter`] with `pre` and `post` callbacks keyed by
//! node kind, optionally narrowed to one struct kind. Traversal is
//! depth-first: `pre(node)`, the children, then `post(node)`. Filter
//! subtrees are folded into a single fragment so a whole condition lands on
//! one line.
pub mod helpers;

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::ast::{Module, NodeRef};
use crate::tokens::{StructType, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmitError {
    #[error("{kind} is not supported by the {target} target")]
    NotImplemented { kind: TokenKind, target: &'static str },
    #[error("no callback registered for {kind}")]
    MissingCallback { kind: TokenKind },
    #[error("{kind}: missing argument `{key}`")]
    MissingKwarg { kind: TokenKind, key: String },
}

pub type Callback = fn(&NodeRef<'_>) -> Result<String, EmitError>;

type Key = (TokenKind, Option<StructType>);

#[derive(Clone)]
pub struct Converter {
    target: &'static str,
    comment_prefix: &'static str,
    debug: bool,
    pre: HashMap<Key, Callback>,
    post: HashMap<Key, Callback>,
    unsupported: HashSet<TokenKind>,
}

impl Converter {
    pub fn new(target: &'static str, comment_prefix: &'static str) -> Self {
        Self {
            target,
            comment_prefix,
            debug: false,
            pre: HashMap::new(),
            post: HashMap::new(),
            unsupported: HashSet::new(),
        }
    }

    pub fn target(&self) -> &'static str {
        self.target
    }

    pub fn comment_prefix(&self) -> &'static str {
        self.comment_prefix
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn pre(&mut self, kind: TokenKind, callback: Callback) -> &mut Self {
        self.pre.insert((kind, None), callback);
        self
    }

    pub fn pre_for(&mut self, kind: TokenKind, struct_type: StructType, callback: Callback) -> &mut Self {
        self.pre.insert((kind, Some(struct_type)), callback);
        self
    }

    pub fn post(&mut self, kind: TokenKind, callback: Callback) -> &mut Self {
        self.post.insert((kind, None), callback);
        self
    }

    pub fn post_for(&mut self, kind: TokenKind, struct_type: StructType, callback: Callback) -> &mut Self {
        self.post.insert((kind, Some(struct_type)), callback);
        self
    }

    /// Register the same `pre` callback for several kinds.
    pub fn pre_many(&mut self, kinds: &[TokenKind], callback: Callback) -> &mut Self {
        for kind in kinds {
            self.pre(*kind, callback);
        }
        self
    }

    pub fn post_many(&mut self, kinds: &[TokenKind], callback: Callback) -> &mut Self {
        for kind in kinds {
            self.post(*kind, callback);
        }
        self
    }

    pub fn unsupported(&mut self, kinds: &[TokenKind]) -> &mut Self {
        self.unsupported.extend(kinds.iter().copied());
        self
    }

    pub fn is_unsupported(&self, kind: TokenKind) -> bool {
        self.unsupported.contains(&kind)
    }

    /// Whether `kind` has any callback, generic or struct-specific.
    pub fn handles(&self, kind: TokenKind) -> bool {
        self.pre.keys().chain(self.post.keys()).any(|(k, _)| *k == kind)
    }

    pub fn convert(&self, module: &Module) -> Result<String, EmitError> {
        let mut fragments = Vec::new();
        self.visit(module.root(), &mut fragments)?;
        Ok(fragments
            .into_iter()
            .filter(|f| !f.is_empty())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn lookup(table: &HashMap<Key, Callback>, node: &NodeRef<'_>) -> Option<Callback> {
        let kind = node.kind();
        node.struct_type()
            .and_then(|st| table.get(&(kind, Some(st))))
            .or_else(|| table.get(&(kind, None)))
            .copied()
    }

    fn callbacks(&self, node: &NodeRef<'_>) -> Result<(Option<Callback>, Option<Callback>), EmitError> {
        let kind = node.kind();
        if self.unsupported.contains(&kind) {
            return Err(EmitError::NotImplemented { kind, target: self.target });
        }
        let pre = Self::lookup(&self.pre, node);
        let post = Self::lookup(&self.post, node);
        if pre.is_none() && post.is_none() {
            return Err(EmitError::MissingCallback { kind });
        }
        Ok((pre, post))
    }

    fn debug_line(&self, node: &NodeRef<'_>) -> String {
        let kwargs = serde_json::to_string(node.kwargs()).unwrap_or_default();
        format!("{}{} {kwargs}", self.comment_prefix, node.kind())
    }

    fn visit(&self, node: NodeRef<'_>, out: &mut Vec<String>) -> Result<(), EmitError> {
        if node.kind() == TokenKind::Filter {
            if self.debug {
                out.push(self.debug_line(&node));
            }
            out.push(self.inline(node)?);
            return Ok(());
        }
        let (pre, post) = self.callbacks(&node)?;
        if self.debug && node.kind() != TokenKind::Module {
            out.push(self.debug_line(&node));
        }
        if let Some(pre) = pre {
            out.push(pre(&node)?);
        }
        for child in node.children() {
            self.visit(child, out)?;
        }
        if let Some(post) = post {
            out.push(post(&node)?);
        }
        Ok(())
    }

    /// Render a subtree as one fragment; used for filter conditions.
    fn inline(&self, node: NodeRef<'_>) -> Result<String, EmitError> {
        let (pre, post) = self.callbacks(&node)?;
        let mut code = String::new();
        if let Some(pre) = pre {
            code.push_str(&pre(&node)?);
        }
        for child in node.children() {
            code.push_str(&self.inline(child)?);
        }
        if let Some(post) = post {
            code.push_str(&post(&node)?);
        }
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeData;
    use crate::document::Document;
    use crate::document::Filter;

    fn empty(_: &NodeRef<'_>) -> Result<String, EmitError> {
        Ok(String::new())
    }

    fn name(node: &NodeRef<'_>) -> Result<String, EmitError> {
        Ok(node.kind().name().to_lowercase())
    }

    fn item_struct(node: &NodeRef<'_>) -> Result<String, EmitError> {
        Ok(format!("item {}", node.kwarg_str("name").unwrap_or_default()))
    }

    fn open(_: &NodeRef<'_>) -> Result<String, EmitError> {
        Ok("(".into())
    }

    fn close(_: &NodeRef<'_>) -> Result<String, EmitError> {
        Ok(")".into())
    }

    fn module() -> Module {
        let mut m = Module::new();
        m.push(Module::ROOT, NodeData::new(TokenKind::Imports));
        let st = m.push(
            Module::ROOT,
            NodeData::new(TokenKind::Struct).with("name", "A").with("struct_type", "item"),
        );
        m.push(st, NodeData::new(TokenKind::StructInit));
        m
    }

    #[test]
    fn struct_specific_callback_wins() {
        let mut conv = Converter::new("test", "# ");
        conv.pre(TokenKind::Module, empty)
            .pre(TokenKind::Imports, name)
            .pre(TokenKind::Struct, name)
            .pre_for(TokenKind::Struct, StructType::Item, item_struct)
            .pre(TokenKind::StructInit, name);
        assert_eq!(conv.convert(&module()).unwrap(), "imports\nitem A\nstruct_init");
    }

    #[test]
    fn missing_and_unsupported_kinds() {
        let mut conv = Converter::new("test", "# ");
        conv.pre(TokenKind::Module, empty).pre(TokenKind::Imports, name).pre(TokenKind::Struct, name);
        assert_eq!(
            conv.convert(&module()),
            Err(EmitError::MissingCallback { kind: TokenKind::StructInit })
        );
        conv.unsupported(&[TokenKind::StructInit]);
        assert_eq!(
            conv.convert(&module()),
            Err(EmitError::NotImplemented { kind: TokenKind::StructInit, target: "test" })
        );
    }

    #[test]
    fn debug_lines_carry_prefix_and_kwargs() {
        let mut conv = Converter::new("test", "// ");
        conv.pre(TokenKind::Module, empty)
            .pre(TokenKind::Imports, name)
            .pre(TokenKind::Struct, name)
            .pre(TokenKind::StructInit, empty);
        let out = conv.with_debug(true).convert(&module()).unwrap();
        assert_eq!(
            out,
            "// IMPORTS {}\nimports\n// STRUCT {\"name\":\"A\",\"struct_type\":\"item\"}\nstruct\n// STRUCT_INIT {}"
        );
    }

    #[test]
    fn filter_subtree_is_one_fragment() {
        let doc = Document::new()
            .css_all("a")
            .text()
            .filter(Filter::not(Filter::len_eq(0)));
        let mut m = Module::new();
        m.push_expr(Module::ROOT, &doc.stack()[2]);
        let mut conv = Converter::new("test", "# ");
        conv.pre(TokenKind::Module, empty)
            .pre(TokenKind::Filter, name)
            .pre(TokenKind::FilterNot, open)
            .post(TokenKind::FilterNot, close)
            .pre(TokenKind::FilterLenEq, name);
        assert_eq!(conv.convert(&m).unwrap(), "expr_filter(filter_str_len_eq)");
    }
}
