//! Hand-built AST node constructors for integration tests. There is no
//! parser in this crate (spec §1 scope); tests build the tree a parser
//! would have produced directly, the same way the teacher's
//! `tests/operator_tests.rs` builds `RLogic` expressions as literal structs
//! rather than parsing a string.

#![allow(dead_code)]

use jsonata_core::ast::{Node, NodeKind, NodeValue, SortTerm};

pub fn str_lit(s: &str) -> Node {
    Node::new(NodeKind::Str, 0).with_value(NodeValue::Str(s.to_string()))
}

pub fn num_lit(n: f64) -> Node {
    Node::new(NodeKind::Num, 0).with_value(NodeValue::Num(n))
}

pub fn bool_lit(b: bool) -> Node {
    Node::new(NodeKind::Bool, 0).with_value(NodeValue::Bool(b))
}

pub fn null_lit() -> Node {
    Node::new(NodeKind::Null, 0)
}

pub fn name(field: &str) -> Node {
    Node::new(NodeKind::Name, 0).with_value(NodeValue::Str(field.to_string()))
}

pub fn var(binding: &str) -> Node {
    Node::new(NodeKind::Variable, 0).with_value(NodeValue::Str(binding.to_string()))
}

pub fn regex(pattern: &str) -> Node {
    Node::new(NodeKind::Regex, 0).with_value(NodeValue::Str(pattern.to_string()))
}

pub fn binary(op: &str, lhs: Node, rhs: Node) -> Node {
    Node::new(NodeKind::Binary, 0)
        .with_value(NodeValue::Str(op.to_string()))
        .with_lhs(lhs)
        .with_rhs(rhs)
}

pub fn unary(op: &str, rhs: Node) -> Node {
    Node::new(NodeKind::Unary, 0).with_value(NodeValue::Str(op.to_string())).with_rhs(rhs)
}

pub fn path(steps: Vec<Node>) -> Node {
    let mut n = Node::new(NodeKind::Path, 0);
    n.expressions = steps;
    n
}

pub fn wildcard() -> Node {
    Node::new(NodeKind::Wildcard, 0)
}

pub fn descendant(rhs: Option<Node>) -> Node {
    let mut n = Node::new(NodeKind::Descendant, 0);
    n.rhs = rhs.map(Box::new);
    n
}

/// A `Filter` step/node: `lhs[rhs]`. `keep_array` models a trailing literal
/// `[]` (spec §4.E).
pub fn filter(lhs: Option<Node>, rhs: Option<Node>, keep_array: bool) -> Node {
    let mut n = Node::new(NodeKind::Filter, 0);
    n.lhs = lhs.map(Box::new);
    n.rhs = rhs.map(Box::new);
    n.keep_array = keep_array;
    n
}

pub fn array(items: Vec<Node>) -> Node {
    let mut n = Node::new(NodeKind::Array, 0);
    n.expressions = items;
    n
}

pub fn object(pairs: Vec<(Node, Node)>) -> Node {
    let mut n = Node::new(NodeKind::Object, 0);
    n.pairs = pairs;
    n
}

pub fn grouping_object(pairs: Vec<(Node, Node)>) -> Node {
    let mut n = object(pairs);
    n.is_grouping = true;
    n
}

pub fn condition(cond: Node, then: Node, else_branch: Option<Node>) -> Node {
    let mut n = Node::new(NodeKind::Condition, 0).with_lhs(cond).with_rhs(then);
    n.else_branch = else_branch.map(Box::new);
    n
}

pub fn block(exprs: Vec<Node>) -> Node {
    let mut n = Node::new(NodeKind::Block, 0);
    n.expressions = exprs;
    n
}

pub fn lambda(params: Vec<&str>, signature: Option<&str>, body: Node) -> Node {
    let mut n = Node::new(NodeKind::Lambda, 0).with_rhs(body);
    n.params = params.into_iter().map(String::from).collect();
    n.signature = signature.map(String::from);
    n
}

pub fn bind(name: &str, value: Node) -> Node {
    Node::new(NodeKind::Bind, 0).with_value(NodeValue::Str(name.to_string())).with_rhs(value)
}

pub fn call(callee: Node, args: Vec<Node>) -> Node {
    let mut n = Node::new(NodeKind::Function, 0).with_lhs(callee);
    n.arguments = args;
    n
}

pub fn placeholder() -> Node {
    Node::new(NodeKind::Placeholder, 0)
}

pub fn partial(callee: Node, args: Vec<Node>) -> Node {
    let mut n = Node::new(NodeKind::Partial, 0).with_lhs(callee);
    n.arguments = args;
    n
}

pub fn sort(collection: Node, terms: Vec<(Node, bool)>) -> Node {
    let mut n = Node::new(NodeKind::Sort, 0).with_lhs(collection);
    n.sort_terms = terms.into_iter().map(|(expr, descending)| SortTerm { expr, descending }).collect();
    n
}

pub fn transform(path: Node, update: Node, delete: Option<Node>) -> Node {
    let mut n = Node::new(NodeKind::Transform, 0).with_lhs(path).with_rhs(update);
    n.delete = delete.map(Box::new);
    n
}

pub fn parent() -> Node {
    Node::new(NodeKind::Parent, 0)
}

/// `@$x` as a path step (`lhs = None`) or standalone (`lhs = Some(expr)`).
pub fn context_bind(binding: &str, lhs: Option<Node>) -> Node {
    let mut n = Node::new(NodeKind::Context, 0).with_value(NodeValue::Str(binding.to_string()));
    n.lhs = lhs.map(Box::new);
    n
}

/// `#$i` as a path step (`lhs = None`) or standalone (`lhs = Some(expr)`).
pub fn index_bind(binding: &str, lhs: Option<Node>) -> Node {
    let mut n = Node::new(NodeKind::Index, 0).with_value(NodeValue::Str(binding.to_string()));
    n.lhs = lhs.map(Box::new);
    n
}
