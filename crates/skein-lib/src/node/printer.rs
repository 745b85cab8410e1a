//! Indented, one-node-per-line tree dump.

use std::fmt::Write;

use super::{CompositeKind, Node};

pub struct TreePrinter<'n> {
    root: &'n Node,
    spans: bool,
    kinds: bool,
}

impl<'n> TreePrinter<'n> {
    pub fn new(root: &'n Node) -> Self {
        Self {
            root,
            spans: false,
            kinds: false,
        }
    }

    pub fn with_spans(mut self, value: bool) -> Self {
        self.spans = value;
        self
    }

    /// Show the producing combinator next to named composites.
    pub fn with_kinds(mut self, value: bool) -> Self {
        self.kinds = value;
        self
    }

    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.format(&mut out).expect("String write never fails");
        out
    }

    pub fn format(&self, w: &mut impl Write) -> std::fmt::Result {
        self.format_node(self.root, 0, w)
    }

    fn format_node(&self, node: &Node, indent: usize, w: &mut impl Write) -> std::fmt::Result {
        let prefix = "  ".repeat(indent);
        write!(w, "{prefix}{}", node.label())?;

        if self.kinds
            && node.name().is_some()
            && let Some(kind) = node.kind()
            && kind != CompositeKind::Node
        {
            write!(w, " ({})", kind.label())?;
        }

        if let Some(CompositeKind::Skip {
            support_nested: false,
        }) = node.kind()
        {
            w.write_str(" strict")?;
        }

        if self.spans
            && let Some(span) = node.span()
        {
            write!(w, " [{span}]")?;
        }

        if let Some(token) = node.as_token() {
            write!(w, " {:?}", token.lexeme)?;
        }

        writeln!(w)?;

        for child in node.children() {
            self.format_node(child, indent + 1, w)?;
        }
        Ok(())
    }
}
