//! Grammar construction: rules and named definitions.
//!
//! A [`Rule`] is one tagged value over the combinator kinds. Every rule keeps
//! its sub-rules in a shared child list, so grammars are assembled the same
//! way trees are: by appending children in order. Rules hold configuration
//! only; all per-parse state lives in [`ParseContext`](crate::ParseContext).

use std::fmt::{self, Write};

use indexmap::IndexMap;
use skein_core::Token;

use crate::{Error, Result};

/// What a token-level rule accepts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TokenPattern {
    /// Any token of this kind.
    Kind(String),
    /// A token of this kind with exactly this lexeme.
    Keyword { kind: String, lexeme: String },
    /// Any single token.
    Any,
}

impl TokenPattern {
    pub fn matches(&self, token: &Token) -> bool {
        match self {
            Self::Kind(kind) => token.kind == *kind,
            Self::Keyword { kind, lexeme } => token.kind == *kind && token.lexeme == *lexeme,
            Self::Any => true,
        }
    }

    /// How the pattern shows up in "expected ..." messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Kind(kind) => format!("`{kind}`"),
            Self::Keyword { lexeme, .. } => format!("`{lexeme}`"),
            Self::Any => "any token".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKind {
    Token(TokenPattern),
    /// All children in order, all-or-nothing.
    Sequence,
    /// First matching child in declaration order.
    Alternation,
    /// Zero or more applications of the body, greedy. `max` caps iterations.
    Repeat { max: Option<u32> },
    /// Zero or one application of the body. With `support_nested == false`,
    /// optional rules nested inside the body must match.
    Skip { support_nested: bool },
    /// Named definition looked up in the enclosing [`Grammar`].
    Ref(String),
}

impl RuleKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Token(_) => "Token",
            Self::Sequence => "Sequence",
            Self::Alternation => "Alternation",
            Self::Repeat { .. } => "Repeat",
            Self::Skip { .. } => "Skip",
            Self::Ref(_) => "Ref",
        }
    }

    /// Token and reference rules are leaves of the grammar tree.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Token(_) | Self::Ref(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    kind: RuleKind,
    name: Option<String>,
    children: Vec<Rule>,
}

impl Rule {
    /// Rule of `kind` with no children yet; see [`Rule::append`].
    pub fn new(kind: RuleKind) -> Self {
        Self {
            kind,
            name: None,
            children: Vec::new(),
        }
    }

    fn with_children(kind: RuleKind, children: impl IntoIterator<Item = Rule>) -> Self {
        Self {
            kind,
            name: None,
            children: children.into_iter().collect(),
        }
    }

    pub fn token(kind: impl Into<String>) -> Self {
        Self::new(RuleKind::Token(TokenPattern::Kind(kind.into())))
    }

    pub fn keyword(kind: impl Into<String>, lexeme: impl Into<String>) -> Self {
        Self::new(RuleKind::Token(TokenPattern::Keyword {
            kind: kind.into(),
            lexeme: lexeme.into(),
        }))
    }

    pub fn any() -> Self {
        Self::new(RuleKind::Token(TokenPattern::Any))
    }

    pub fn sequence(children: impl IntoIterator<Item = Rule>) -> Self {
        Self::with_children(RuleKind::Sequence, children)
    }

    pub fn alternation(children: impl IntoIterator<Item = Rule>) -> Self {
        Self::with_children(RuleKind::Alternation, children)
    }

    pub fn repeat(body: Rule) -> Self {
        Self::with_children(RuleKind::Repeat { max: None }, [body])
    }

    pub fn repeat_at_most(body: Rule, max: u32) -> Self {
        Self::with_children(RuleKind::Repeat { max: Some(max) }, [body])
    }

    /// Optional `body`; nested optional rules may skip too.
    pub fn skip(body: Rule) -> Self {
        Self::skip_nested(body, true)
    }

    pub fn skip_nested(body: Rule, support_nested: bool) -> Self {
        Self::with_children(RuleKind::Skip { support_nested }, [body])
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Self::new(RuleKind::Ref(name.into()))
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds `child` after the existing children.
    ///
    /// Token and reference rules have no children; appending to them is an
    /// [`Error::InvalidOperation`].
    pub fn append(&mut self, child: Rule) -> Result<&mut Rule> {
        if self.kind.is_leaf() {
            return Err(Error::InvalidOperation(format!(
                "cannot append a child to {} rule `{}`",
                self.kind.label(),
                self.label()
            )));
        }
        self.children.push(child);
        Ok(self)
    }

    pub fn kind(&self) -> &RuleKind {
        &self.kind
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn children(&self) -> &[Rule] {
        &self.children
    }

    pub fn count(&self) -> usize {
        self.children.len()
    }

    /// Explicit name if any, otherwise what the rule matches or its kind.
    pub fn label(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        match &self.kind {
            RuleKind::Token(TokenPattern::Kind(kind)) => kind.clone(),
            RuleKind::Token(TokenPattern::Keyword { lexeme, .. }) => format!("{lexeme:?}"),
            RuleKind::Token(TokenPattern::Any) => "_".to_string(),
            RuleKind::Ref(target) => format!("<{target}>"),
            kind => kind.label().to_string(),
        }
    }

    /// Checks that every combinator has what it needs to run.
    ///
    /// Repeat, Skip and Alternation need at least one child. References must
    /// resolve when `definitions` is given.
    pub fn validate(&self, definitions: Option<&IndexMap<String, Rule>>) -> Result<()> {
        match &self.kind {
            RuleKind::Repeat { .. } | RuleKind::Skip { .. } | RuleKind::Alternation
                if self.children.is_empty() =>
            {
                return Err(Error::MissingRule { rule: self.label() });
            }
            RuleKind::Ref(target) => {
                if let Some(defs) = definitions
                    && !defs.contains_key(target)
                {
                    return Err(Error::UndefinedRule(target.clone()));
                }
            }
            _ => {}
        }
        self.children
            .iter()
            .try_for_each(|child| child.validate(definitions))
    }

    /// Same shape as [`Node::render`](crate::Node::render), for the grammar itself.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.format(&mut out).expect("String write never fails");
        out
    }

    fn format(&self, w: &mut impl Write) -> fmt::Result {
        w.write_str(&self.label())?;
        if self.kind.is_leaf() {
            return Ok(());
        }
        match self.kind {
            RuleKind::Skip { support_nested } => write!(w, ", SupportNested={support_nested}")?,
            RuleKind::Repeat { max: Some(max) } => write!(w, ", Max={max}")?,
            _ => {}
        }
        write!(w, ", Count={}, Children=(", self.children.len())?;
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                w.write_str(", ")?;
            }
            child.format(w)?;
        }
        w.write_char(')')
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.format(f)
    }
}

/// A root rule plus named definitions that rules can refer to.
///
/// Definitions are kept in insertion order. A definition's rule takes the
/// definition's name, so the nodes it produces are labelled by it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    root: Rule,
    definitions: IndexMap<String, Rule>,
}

impl Grammar {
    pub fn new(root: Rule) -> Self {
        Self {
            root,
            definitions: IndexMap::new(),
        }
    }

    /// Adds or replaces the definition `name`.
    pub fn define(&mut self, name: impl Into<String>, rule: Rule) -> &mut Self {
        let name = name.into();
        let rule = rule.named(name.clone());
        self.definitions.insert(name, rule);
        self
    }

    pub fn with_definition(mut self, name: impl Into<String>, rule: Rule) -> Self {
        self.define(name, rule);
        self
    }

    pub fn root(&self) -> &Rule {
        &self.root
    }

    pub fn definition(&self, name: &str) -> Option<&Rule> {
        self.definitions.get(name)
    }

    pub fn definitions(&self) -> &IndexMap<String, Rule> {
        &self.definitions
    }

    /// Validates the root and every definition before any token is read.
    pub fn validate(&self) -> Result<()> {
        self.root.validate(Some(&self.definitions))?;
        self.definitions
            .values()
            .try_for_each(|rule| rule.validate(Some(&self.definitions)))
    }
}

impl From<Rule> for Grammar {
    fn from(root: Rule) -> Self {
        Grammar::new(root)
    }
}
