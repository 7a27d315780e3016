//! Abstract Syntax Tree node types
//!
//! The AST is a pure tree: every child is owned by exactly one parent and no
//! node is mutated after the parser builds it. Nodes carry a [`NodeId`] so the
//! validator can attach inferred types in a side table without touching the
//! tree itself.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::Type;

/// Source location span for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Span {
    /// Start byte offset
    pub start: usize,
    /// End byte offset
    pub end: usize,
    /// Start line (0-indexed)
    pub start_line: usize,
    /// Start column (0-indexed)
    pub start_col: usize,
    /// End line (0-indexed)
    pub end_line: usize,
    /// End column (0-indexed)
    pub end_col: usize,
}

impl Span {
    pub fn new(
        start: usize,
        end: usize,
        start_line: usize,
        start_col: usize,
        end_line: usize,
        end_col: usize,
    ) -> Self {
        Self {
            start,
            end,
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Create a span that covers both self and other
    pub fn merge(&self, other: &Span) -> Span {
        let (start_line, start_col) = if self.start <= other.start {
            (self.start_line, self.start_col)
        } else {
            (other.start_line, other.start_col)
        };
        let (end_line, end_col) = if self.end >= other.end {
            (self.end_line, self.end_col)
        } else {
            (other.end_line, other.end_col)
        };

        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line + 1, self.start_col + 1)
    }
}

fn is_default_span(span: &Span) -> bool {
    *span == Span::default()
}

/// Identity of a node within one parsed program.
///
/// Ids are assigned by the parser in creation order and are unique per
/// program; they key the validator's inferred-type side table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/* ===================== Nodes ===================== */

/// Expression node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Node {
    /// Reference to a leaf task, or to a previously declared functor
    Literal {
        id: NodeId,
        name: String,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    /// `outer ∘ inner`, i.e. `outer(inner(x))`
    Composition {
        id: NodeId,
        outer: Box<Node>,
        inner: Box<Node>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    /// `left × right`, i.e. `(left(x), right(x))` computed concurrently
    Product {
        id: NodeId,
        left: Box<Node>,
        right: Box<Node>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    /// Named binding of a reusable expression
    Functor {
        id: NodeId,
        name: String,
        body: Box<Node>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
}

impl Node {
    pub fn id(&self) -> NodeId {
        match self {
            Node::Literal { id, .. }
            | Node::Composition { id, .. }
            | Node::Product { id, .. }
            | Node::Functor { id, .. } => *id,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Node::Literal { span, .. }
            | Node::Composition { span, .. }
            | Node::Product { span, .. }
            | Node::Functor { span, .. } => *span,
        }
    }

    /// Every literal name referenced under this node, in source order.
    pub fn references(&self) -> Vec<&str> {
        let mut names = Vec::new();
        collect_references(self, &mut names);
        names
    }
}

fn collect_references<'a>(node: &'a Node, names: &mut Vec<&'a str>) {
    match node {
        Node::Literal { name, .. } => names.push(name),
        Node::Composition { outer, inner, .. } => {
            collect_references(outer, names);
            collect_references(inner, names);
        }
        Node::Product { left, right, .. } => {
            collect_references(left, names);
            collect_references(right, names);
        }
        Node::Functor { body, .. } => collect_references(body, names),
    }
}

/// Canonical, fully parenthesized rendering. Spans and ids are not shown, so
/// two structurally identical trees always render the same text.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Literal { name, .. } => write!(f, "{}", name),
            Node::Composition { outer, inner, .. } => write!(f, "({} ∘ {})", outer, inner),
            Node::Product { left, right, .. } => write!(f, "({} × {})", left, right),
            Node::Functor { name, body, .. } => write!(f, "functor {} = {}", name, body),
        }
    }
}

/* ===================== Program ===================== */

/// Declared type signature of a leaf task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub ty: Type,
    #[serde(default, skip_serializing_if = "is_default_span")]
    pub span: Span,
}

/// A complete parsed program.
///
/// Bundles the root expression, the functor table (in declaration order,
/// each entry a [`Node::Functor`]) and the type signatures declared in the
/// source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub signatures: IndexMap<String, Signature>,
    pub functors: IndexMap<String, Node>,
    pub root: Node,
    #[serde(default, skip_serializing_if = "is_default_span")]
    pub span: Span,
}

impl Program {
    /// Body bound to a functor name, if `name` is a declared functor.
    pub fn functor_body(&self, name: &str) -> Option<&Node> {
        match self.functors.get(name) {
            Some(Node::Functor { body, .. }) => Some(body),
            _ => None,
        }
    }

    pub fn is_functor(&self, name: &str) -> bool {
        self.functors.contains_key(name)
    }
}
