//! Syntax tree produced by a parse.
//!
//! A tree is either a `Leaf` wrapping one consumed token or a `Composite`
//! that owns an ordered list of children. Child order is source
//! order. Trees are plain values without parent pointers. A composite's
//! child list is shared between clones and copied on the first `append`
//! after a clone, so cloning a committed subtree is cheap.
//!
//! [`Node::render`] is the canonical textual form:
//! `<Name>, Count=<n>, Children=(<child0>, <child1>, ...)`, with leaves
//! rendered as their lexeme. Two trees are equivalent iff their renders are.

mod printer;


use std::fmt::{self, Write};
use std::sync::Arc;

use serde::Serialize;
use skein_core::{Span, Token};

use crate::{Error, Result};

pub use printer::TreePrinter;

/// Which combinator produced a composite node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CompositeKind {
    /// Built by hand rather than by a combinator.
    Node,
    Sequence,
    Alternation,
    Repeat,
    Skip { support_nested: bool },
}

impl CompositeKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Node => "Node",
            Self::Sequence => "Sequence",
            Self::Alternation => "Alternation",
            Self::Repeat => "Repeat",
            Self::Skip { .. } => "Skip",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Composite {
    kind: CompositeKind,
    name: Option<String>,
    children: Arc<Vec<Node>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Node {
    Leaf(Token),
    Composite(Composite),
}

impl Node {
    pub fn leaf(token: Token) -> Self {
        Node::Leaf(token)
    }

    /// Empty composite of the given kind.
    pub fn composite(kind: CompositeKind, name: Option<&str>) -> Self {
        Self::from_parts(kind, name, Vec::new())
    }

    /// Empty hand-built composite carrying `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Node::Composite(Composite {
            kind: CompositeKind::Node,
            name: Some(name.into()),
            children: Arc::default(),
        })
    }

    pub(crate) fn from_parts(kind: CompositeKind, name: Option<&str>, children: Vec<Node>) -> Self {
        Node::Composite(Composite {
            kind,
            name: name.map(str::to_string),
            children: Arc::new(children),
        })
    }

    /// Adds `child` after the existing children.
    ///
    /// Returns the composite so appends chain:
    /// `node.append(a)?.append(b)?;`
    pub fn append(&mut self, child: Node) -> Result<&mut Node> {
        match self {
            Node::Composite(composite) => {
                Arc::make_mut(&mut composite.children).push(child);
                Ok(self)
            }
            Node::Leaf(token) => Err(Error::InvalidOperation(format!(
                "cannot append a child to leaf `{}`",
                token.lexeme
            ))),
        }
    }

    /// Number of direct children; always 0 for a leaf.
    pub fn count(&self) -> usize {
        self.children().len()
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Leaf(_) => &[],
            Node::Composite(composite) => composite.children.as_slice(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    pub fn as_token(&self) -> Option<&Token> {
        match self {
            Node::Leaf(token) => Some(token),
            Node::Composite(_) => None,
        }
    }

    pub fn kind(&self) -> Option<CompositeKind> {
        match self {
            Node::Leaf(_) => None,
            Node::Composite(composite) => Some(composite.kind),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Node::Leaf(_) => None,
            Node::Composite(composite) => composite.name.as_deref(),
        }
    }

    /// Explicit name if any, otherwise the producing combinator's label.
    /// Leaves are labelled by their token kind.
    pub fn label(&self) -> &str {
        match self {
            Node::Leaf(token) => token.kind.as_str(),
            Node::Composite(composite) => composite
                .name
                .as_deref()
                .unwrap_or(composite.kind.label()),
        }
    }

    /// Leaf tokens in source order.
    pub fn tokens(&self) -> Tokens<'_> {
        Tokens { stack: vec![self] }
    }

    /// Span from the first to the last leaf, `None` when there are no leaves.
    pub fn span(&self) -> Option<Span> {
        let mut tokens = self.tokens();
        let first = tokens.next()?.span;
        Some(tokens.fold(first, |acc, t| acc.cover(t.span)))
    }

    /// First composite named `name`, searching depth-first in source order.
    pub fn find(&self, name: &str) -> Option<&Node> {
        if self.name() == Some(name) {
            return Some(self);
        }
        self.children().iter().find_map(|child| child.find(name))
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.format(&mut out).expect("String write never fails");
        out
    }

    fn format(&self, w: &mut impl Write) -> fmt::Result {
        let composite = match self {
            Node::Leaf(token) => return w.write_str(&token.lexeme),
            Node::Composite(composite) => composite,
        };

        w.write_str(self.label())?;
        if let CompositeKind::Skip { support_nested } = composite.kind {
            write!(w, ", SupportNested={support_nested}")?;
        }
        write!(w, ", Count={}, Children=(", composite.children.len())?;
        for (i, child) in composite.children.iter().enumerate() {
            if i > 0 {
                w.write_str(", ")?;
            }
            child.format(w)?;
        }
        w.write_char(')')
    }

    pub fn printer(&self) -> TreePrinter<'_> {
        TreePrinter::new(self)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.format(f)
    }
}

impl From<Token> for Node {
    fn from(token: Token) -> Self {
        Node::Leaf(token)
    }
}

/// Preorder leaf iterator, see [`Node::tokens`].
pub struct Tokens<'n> {
    stack: Vec<&'n Node>,
}

impl<'n> Iterator for Tokens<'n> {
    type Item = &'n Token;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            match node {
                Node::Leaf(token) => return Some(token),
                Node::Composite(composite) => self.stack.extend(composite.children.iter().rev()),
            }
        }
        None
    }
}
