//! The input AST contract (spec §6.1). The lexer/parser that produces this
//! tree is out of scope; this module only defines the shape the evaluator
//! consumes. Grounded on the vocabulary of `johanventer-jsonata-rust`'s
//! `ast.rs` (node-kind enum with a flat payload) but restructured around the
//! generic LHS/RHS/Arguments/Expressions/value contract the spec names,
//! since the core must stay agnostic to whichever concrete parser produced
//! the tree.

/// The syntactic kind of a node. Dispatch in `engine::mod` matches on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Str,
    Num,
    Bool,
    Null,
    Name,
    Variable,
    Regex,
    Path,
    Descendant,
    Wildcard,
    Binary,
    Unary,
    Array,
    Object,
    Filter,
    Condition,
    Function,
    Partial,
    /// A `?` placeholder inside a `Partial`'s argument list.
    Placeholder,
    Lambda,
    Bind,
    Block,
    Sort,
    Transform,
    Parent,
    Context,
    Index,
}

/// The literal payload a node carries: a string literal, operator name,
/// variable/binding name, or numeric/boolean literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue {
    Str(String),
    Num(f64),
    Bool(bool),
}

impl NodeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            NodeValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            NodeValue::Num(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            NodeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// One sort term: an expression to compare by and whether it sorts
/// descending (spec §6.1 `Sort`).
#[derive(Debug, Clone)]
pub struct SortTerm {
    pub expr: Node,
    pub descending: bool,
}

/// A parsed expression-tree node. Every field beyond `kind`/`position` is
/// optional or empty unless the kind uses it; see the per-kind notes below.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    /// Byte offset in the original source expression, carried into errors.
    pub position: usize,
    /// Literal payload — string/number/boolean literals; operator name for
    /// `Binary`/`Unary`; the bound name for `Name`/`Variable`/`Bind`/
    /// `Context`/`Index`; the regex source for `Regex`.
    pub value: Option<NodeValue>,
    /// Regex flags (`Regex` only), e.g. `"i"`, `"g"`.
    pub regex_flags: String,
    pub lhs: Option<Box<Node>>,
    pub rhs: Option<Box<Node>>,
    /// `Function`/`Partial` call arguments, in order.
    pub arguments: Vec<Node>,
    /// `Array`/`Block`/`Path` step list, in order.
    pub expressions: Vec<Node>,
    /// `Object` key/value pairs, in source order.
    pub pairs: Vec<(Node, Node)>,
    /// `Sort` terms, in priority order.
    pub sort_terms: Vec<SortTerm>,
    /// `Lambda` parameter names, in order.
    pub params: Vec<String>,
    /// `Lambda` optional signature string (spec §3.3).
    pub signature: Option<String>,
    /// `Transform`'s optional delete clause (`pattern`=`lhs`, `update`=`rhs`).
    pub delete: Option<Box<Node>>,
    /// `Condition`'s else branch (`cond`=`lhs`, `then`=`rhs`).
    pub else_branch: Option<Box<Node>>,
    /// Set by the parser on the literal `[]` syntax and observed by
    /// singleton collapse (spec §4.E) and multi-value filter results.
    pub keep_array: bool,
    /// Set on an infix object constructor (`L^{...}` or grouping path RHS).
    pub is_grouping: bool,
}

impl Node {
    /// A bare node of `kind` at `position` with every other field empty.
    /// Callers fill in only the fields their kind uses.
    pub fn new(kind: NodeKind, position: usize) -> Self {
        Self {
            kind,
            position,
            value: None,
            regex_flags: String::new(),
            lhs: None,
            rhs: None,
            arguments: Vec::new(),
            expressions: Vec::new(),
            pairs: Vec::new(),
            sort_terms: Vec::new(),
            params: Vec::new(),
            signature: None,
            delete: None,
            else_branch: None,
            keep_array: false,
            is_grouping: false,
        }
    }

    pub fn with_value(mut self, value: NodeValue) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_lhs(mut self, lhs: Node) -> Self {
        self.lhs = Some(Box::new(lhs));
        self
    }

    pub fn with_rhs(mut self, rhs: Node) -> Self {
        self.rhs = Some(Box::new(rhs));
        self
    }

    /// The bound/operator name carried by `value`, for kinds where it must
    /// be a string (`Name`, `Variable`, `Binary`, `Unary`, `Bind`, `Context`,
    /// `Index`).
    pub fn name(&self) -> Option<&str> {
        self.value.as_ref().and_then(NodeValue::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_chain() {
        let node = Node::new(NodeKind::Binary, 5)
            .with_value(NodeValue::Str("+".into()))
            .with_lhs(Node::new(NodeKind::Num, 0).with_value(NodeValue::Num(1.0)))
            .with_rhs(Node::new(NodeKind::Num, 2).with_value(NodeValue::Num(2.0)));
        assert_eq!(node.name(), Some("+"));
        assert_eq!(node.lhs.unwrap().value, Some(NodeValue::Num(1.0)));
    }

    #[test]
    fn test_default_fields_are_empty() {
        let node = Node::new(NodeKind::Null, 0);
        assert!(node.lhs.is_none());
        assert!(node.arguments.is_empty());
        assert!(!node.keep_array);
    }
}
