//! Arena-backed module tree.
//!
//! Nodes live in one `Vec` and refer to each other by index, so the parent,
//! sibling and child links are plain `NodeId`s. After `ast_build` finishes the
//! module is immutable; the analyzer and emitters only read it through
//! [`NodeRef`] cursors.
use indexmap::IndexMap;
use serde_json::Value;

use crate::document::{ClassVarRef, Expr, Kwargs};
use crate::tokens::{StructType, TokenKind, VariableType};

pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    pub kind: TokenKind,
    pub kwargs: Kwargs,
    pub accept_type: VariableType,
    pub ret_type: VariableType,
    pub exclude_types: Vec<VariableType>,
    pub classvar_hooks: IndexMap<String, ClassVarRef>,
    pub parent: Option<NodeId>,
    pub prev: Option<NodeId>,
    pub next: Option<NodeId>,
    pub body: Vec<NodeId>,
}

impl NodeData {
    pub fn new(kind: TokenKind) -> Self {
        Self {
            kind,
            kwargs: Kwargs::new(),
            accept_type: VariableType::Any,
            ret_type: VariableType::Any,
            exclude_types: Vec::new(),
            classvar_hooks: IndexMap::new(),
            parent: None,
            prev: None,
            next: None,
            body: Vec::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.to_string(), value.into());
        self
    }

    pub fn typed(mut self, accept: VariableType, ret: VariableType) -> Self {
        self.accept_type = accept;
        self.ret_type = ret;
        self
    }

    /// Node for a DSL operation; filter bodies are attached separately.
    pub fn from_expr(expr: &Expr) -> Self {
        Self {
            kwargs: expr.kwargs.clone(),
            exclude_types: expr.exclude_types.clone(),
            classvar_hooks: expr.classvar_hooks.clone(),
            ..Self::new(expr.kind).typed(expr.accept_type, expr.ret_type)
        }
    }
}

// -------------------------------- Module ---------------------------------- //

#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    nodes: Vec<NodeData>,
}

impl Default for Module {
    fn default() -> Self {
        Self::new()
    }
}

impl Module {
    pub const ROOT: NodeId = 0;

    pub fn new() -> Self {
        Self { nodes: vec![NodeData::new(TokenKind::Module)] }
    }

    pub fn root(&self) -> NodeRef<'_> {
        self.node(Self::ROOT)
    }

    pub fn node(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef { module: self, id }
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Append `data` as the last child of `parent` and link it to its
    /// previous sibling.
    pub fn push(&mut self, parent: NodeId, mut data: NodeData) -> NodeId {
        let id = self.nodes.len();
        let prev = self.nodes[parent].body.last().copied();
        data.parent = Some(parent);
        data.prev = prev;
        data.next = None;
        self.nodes.push(data);
        if let Some(prev) = prev {
            self.nodes[prev].next = Some(id);
        }
        self.nodes[parent].body.push(id);
        id
    }

    /// Append an operation and its filter subtree, recursively.
    pub fn push_expr(&mut self, parent: NodeId, expr: &Expr) -> NodeId {
        let id = self.push(parent, NodeData::from_expr(expr));
        for child in &expr.body {
            self.push_expr(id, child);
        }
        id
    }

    pub fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id]
    }

    /// Every node in depth-first pre-order.
    pub fn walk(&self) -> Vec<NodeRef<'_>> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![Self::ROOT];
        while let Some(id) = stack.pop() {
            out.push(self.node(id));
            stack.extend(self.nodes[id].body.iter().rev());
        }
        out
    }
}

// -------------------------------- Cursor ---------------------------------- //

/// Read-only view of one node inside its module.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    module: &'a Module,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn module(&self) -> &'a Module {
        self.module
    }

    pub fn data(&self) -> &'a NodeData {
        self.module.data(self.id)
    }

    pub fn kind(&self) -> TokenKind {
        self.data().kind
    }

    pub fn kwargs(&self) -> &'a Kwargs {
        &self.data().kwargs
    }

    pub fn kwarg(&self, key: &str) -> Option<&'a Value> {
        self.data().kwargs.get(key)
    }

    pub fn kwarg_str(&self, key: &str) -> Option<&'a str> {
        self.kwarg(key).and_then(Value::as_str)
    }

    pub fn kwarg_bool(&self, key: &str) -> bool {
        self.kwarg(key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn kwarg_i64(&self, key: &str) -> Option<i64> {
        self.kwarg(key).and_then(Value::as_i64)
    }

    /// String array kwarg; a bare string counts as a one-element array.
    pub fn kwarg_strings(&self, key: &str) -> Vec<&'a str> {
        match self.kwarg(key) {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            Some(Value::String(s)) => vec![s.as_str()],
            _ => Vec::new(),
        }
    }

    pub fn accept_type(&self) -> VariableType {
        self.data().accept_type
    }

    pub fn ret_type(&self) -> VariableType {
        self.data().ret_type
    }

    pub fn classvar_hook(&self, param: &str) -> Option<&'a ClassVarRef> {
        self.data().classvar_hooks.get(param)
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.data().parent.map(|id| self.module.node(id))
    }

    pub fn prev(&self) -> Option<NodeRef<'a>> {
        self.data().prev.map(|id| self.module.node(id))
    }

    pub fn next(&self) -> Option<NodeRef<'a>> {
        self.data().next.map(|id| self.module.node(id))
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let module = self.module;
        self.data().body.iter().map(move |id| module.node(*id))
    }

    pub fn child(&self, index: usize) -> Option<NodeRef<'a>> {
        self.data().body.get(index).map(|id| self.module.node(*id))
    }

    pub fn last_child(&self) -> Option<NodeRef<'a>> {
        self.data().body.last().map(|id| self.module.node(*id))
    }

    pub fn find_child(&self, kind: TokenKind) -> Option<NodeRef<'a>> {
        self.children().find(|c| c.kind() == kind)
    }

    /// Position among the parent's children.
    pub fn index(&self) -> usize {
        self.parent()
            .and_then(|p| p.data().body.iter().position(|id| *id == self.id))
            .unwrap_or(0)
    }

    pub fn ancestors(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        std::iter::successors(self.parent(), |n| n.parent())
    }

    pub fn find_ancestor(&self, kind: TokenKind) -> Option<NodeRef<'a>> {
        self.ancestors().find(|n| n.kind() == kind)
    }

    /// Nearest `Struct` or `Typedef` above or at this node.
    pub fn enclosing_struct(&self) -> Option<NodeRef<'a>> {
        std::iter::once(*self)
            .chain(self.ancestors())
            .find(|n| matches!(n.kind(), TokenKind::Struct | TokenKind::Typedef))
    }

    /// Struct kind of the enclosing schema; used to pick callbacks.
    pub fn struct_type(&self) -> Option<StructType> {
        let node = self.enclosing_struct()?;
        struct_type_kwarg(node.kwarg("struct_type")?)
    }

    /// Method (field, part-doc or pre-validate) holding this expression.
    pub fn method(&self) -> Option<NodeRef<'a>> {
        std::iter::once(*self).chain(self.ancestors()).find(|n| {
            matches!(
                n.kind(),
                TokenKind::StructField | TokenKind::StructPartDoc | TokenKind::StructPreValidate
            )
        })
    }
}

pub fn struct_type_kwarg(value: &Value) -> Option<StructType> {
    serde_json::from_value(value.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    #[test]
    fn push_links_siblings_and_parent() {
        let mut m = Module::new();
        let a = m.push(Module::ROOT, NodeData::new(TokenKind::Imports));
        let b = m.push(Module::ROOT, NodeData::new(TokenKind::Utilities));
        assert_eq!(m.data(a).next, Some(b));
        assert_eq!(m.data(b).prev, Some(a));
        assert_eq!(m.node(b).parent().map(|p| p.kind()), Some(TokenKind::Module));
        assert_eq!(m.node(b).index(), 1);
    }

    #[test]
    fn struct_type_resolves_from_enclosing_struct() {
        let mut m = Module::new();
        let st = m.push(
            Module::ROOT,
            NodeData::new(TokenKind::Struct).with("name", "Books").with("struct_type", "list"),
        );
        let field = m.push(st, NodeData::new(TokenKind::StructField).with("name", "title"));
        let doc = Document::new().css("h3").text();
        let text = m.push_expr(field, &doc.stack()[1]);
        assert_eq!(m.node(text).struct_type(), Some(StructType::List));
        assert_eq!(m.node(text).method().map(|n| n.id()), Some(field));
    }

    #[test]
    fn filter_subtree_is_linked() {
        use crate::document::Filter;
        let doc = Document::new()
            .css_all("a")
            .text()
            .filter(Filter::and(vec![Filter::starts_with(&["a"]), Filter::len_gt(2)]));
        let mut m = Module::new();
        let filter = m.push_expr(Module::ROOT, &doc.stack()[2]);
        let and = m.node(filter).child(0).unwrap();
        assert_eq!(and.kind(), TokenKind::FilterAnd);
        let second = and.child(1).unwrap();
        assert_eq!(second.kind(), TokenKind::FilterLenGt);
        assert_eq!(second.prev().map(|n| n.kind()), Some(TokenKind::FilterStarts));
        assert_eq!(m.walk().len(), 5);
    }
}
