//! Matching semantics for each rule kind.
//!
//! Every rule answers [`Rule::try_match`] with a [`MatchOutcome`]. A mismatch
//! is an ordinary return value and always leaves the cursor where it was;
//! `Err` is reserved for misconfiguration and resource limits, both of which
//! abort the whole parse.
//!
//! Token and reference rules that carry a name wrap their result in a
//! composite of that name, so every named rule shows up in the tree.

use log::trace;
use skein_core::Checkpoint;

use crate::context::ParseContext;
use crate::node::{CompositeKind, Node};
use crate::rule::{Rule, RuleKind, TokenPattern};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Matched(Node),
    NotMatched,
}

impl MatchOutcome {
    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched(_))
    }

    pub fn node(&self) -> Option<&Node> {
        match self {
            Self::Matched(node) => Some(node),
            Self::NotMatched => None,
        }
    }

    pub fn into_node(self) -> Option<Node> {
        match self {
            Self::Matched(node) => Some(node),
            Self::NotMatched => None,
        }
    }
}

impl Rule {
    /// Applies this rule at the context's current position.
    ///
    /// On `Matched` the cursor sits after everything the rule consumed. On
    /// `NotMatched` the cursor is back where it was before the call. On `Err`
    /// the cursor and outstanding nodes are back as well, so the context can
    /// be inspected or reused.
    pub fn try_match(&self, ctx: &mut ParseContext<'_>) -> Result<MatchOutcome> {
        ctx.tick()?;
        ctx.enter_recursion()?;
        let entry = ctx.begin_attempt();
        let outcome = self.dispatch(ctx);
        ctx.exit_recursion();

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                ctx.discard(entry);
                return Err(err);
            }
        };
        let before = entry.checkpoint.position();
        if !outcome.is_matched() {
            ctx.ensure_backtracked(before, self);
        }
        Ok(outcome)
    }

    fn dispatch(&self, ctx: &mut ParseContext<'_>) -> Result<MatchOutcome> {
        match self.kind() {
            RuleKind::Token(pattern) => Ok(self.match_token(pattern, ctx)),
            RuleKind::Sequence => match_sequence(self.name(), self.children(), ctx),
            RuleKind::Alternation => self.match_alternation(ctx),
            RuleKind::Repeat { max } => self.match_repeat(*max, ctx),
            RuleKind::Skip { support_nested } => self.match_skip(*support_nested, ctx),
            RuleKind::Ref(target) => self.match_reference(target, ctx),
        }
    }

    fn match_token(&self, pattern: &TokenPattern, ctx: &mut ParseContext<'_>) -> MatchOutcome {
        let position = ctx.position();
        let token = match ctx.cursor().peek() {
            Some(token) if pattern.matches(token) => token,
            _ => {
                let expected = match self.name() {
                    Some(name) => format!("`{name}`"),
                    None => pattern.describe(),
                };
                ctx.note_expected(position, expected);
                return MatchOutcome::NotMatched;
            }
        };

        ctx.cursor_mut().advance();
        let node = self.wrap_named(Node::leaf(token.clone()));
        trace!("token `{}` matched at {position}", token.lexeme);
        ctx.record_last_good(&node);
        MatchOutcome::Matched(node)
    }

    fn match_alternation(&self, ctx: &mut ParseContext<'_>) -> Result<MatchOutcome> {
        self.require_body()?;
        let start = ctx.cursor().mark();
        for (i, branch) in self.children().iter().enumerate() {
            match branch.try_match(ctx)? {
                MatchOutcome::Matched(node) => {
                    trace!("alternation `{}` took branch {i}", self.label());
                    let node = Node::from_parts(CompositeKind::Alternation, self.name(), vec![node]);
                    return Ok(commit_node(ctx, start, node));
                }
                MatchOutcome::NotMatched => ctx.cursor_mut().restore(start),
            }
        }
        Ok(MatchOutcome::NotMatched)
    }

    fn match_repeat(&self, max: Option<u32>, ctx: &mut ParseContext<'_>) -> Result<MatchOutcome> {
        self.require_body()?;
        let limit = match (max, ctx.max_repeat()) {
            (Some(own), Some(global)) => Some(own.min(global)),
            (own, global) => own.or(global),
        };

        let attempt = ctx.begin_attempt();
        let mut iterations = 0u32;
        loop {
            ctx.check_cancelled()?;
            if limit.is_some_and(|limit| iterations >= limit) {
                trace!("repeat `{}` stopped at its cap of {iterations}", self.label());
                break;
            }

            let iteration = ctx.cursor().mark();
            match self.match_body(ctx)? {
                MatchOutcome::Matched(node) if ctx.position() > iteration.position() => {
                    ctx.push_outstanding(node);
                    iterations += 1;
                }
                // A body that matches without consuming would match forever.
                MatchOutcome::Matched(_) | MatchOutcome::NotMatched => {
                    ctx.cursor_mut().restore(iteration);
                    break;
                }
            }
        }

        trace!("repeat `{}` collected {iterations}", self.label());
        let children = ctx.commit(attempt);
        let node = Node::from_parts(CompositeKind::Repeat, self.name(), children);
        Ok(commit_node(ctx, attempt.checkpoint, node))
    }

    /// Zero or one application of the body.
    ///
    /// While the body runs, nested Skips are mandatory unless this Skip
    /// supports nesting. A Skip that is itself evaluated in that mode reports
    /// `NotMatched` instead of matching empty.
    fn match_skip(&self, support_nested: bool, ctx: &mut ParseContext<'_>) -> Result<MatchOutcome> {
        self.require_body()?;
        let start = ctx.cursor().mark();
        let mandatory = ctx.set_strict_optional(!support_nested);
        let outcome = self.match_body(ctx);
        ctx.set_strict_optional(mandatory);

        let kind = CompositeKind::Skip { support_nested };
        match outcome? {
            MatchOutcome::Matched(node) => {
                let node = Node::from_parts(kind, self.name(), vec![node]);
                Ok(commit_node(ctx, start, node))
            }
            MatchOutcome::NotMatched if mandatory => {
                trace!("skip `{}` is mandatory here and did not match", self.label());
                Ok(MatchOutcome::NotMatched)
            }
            MatchOutcome::NotMatched => {
                ctx.cursor_mut().restore(start);
                Ok(MatchOutcome::Matched(Node::from_parts(kind, self.name(), Vec::new())))
            }
        }
    }

    fn match_reference(&self, target: &str, ctx: &mut ParseContext<'_>) -> Result<MatchOutcome> {
        let Some(definition) = ctx.definition(target) else {
            return Err(Error::UndefinedRule(target.to_string()));
        };
        Ok(match definition.try_match(ctx)? {
            MatchOutcome::Matched(node) => MatchOutcome::Matched(self.wrap_named(node)),
            MatchOutcome::NotMatched => MatchOutcome::NotMatched,
        })
    }

    /// Repeat and Skip treat several children as one implicit sequence.
    fn match_body(&self, ctx: &mut ParseContext<'_>) -> Result<MatchOutcome> {
        match self.children() {
            [] => Err(self.missing_rule()),
            [body] => body.try_match(ctx),
            children => match_sequence(None, children, ctx),
        }
    }

    fn require_body(&self) -> Result<()> {
        if self.children().is_empty() {
            return Err(self.missing_rule());
        }
        Ok(())
    }

    fn missing_rule(&self) -> Error {
        Error::MissingRule { rule: self.label() }
    }

    fn wrap_named(&self, node: Node) -> Node {
        match self.name() {
            Some(name) => Node::from_parts(CompositeKind::Node, Some(name), vec![node]),
            None => node,
        }
    }
}

/// All of `children` in order, or nothing.
fn match_sequence(
    name: Option<&str>,
    children: &[Rule],
    ctx: &mut ParseContext<'_>,
) -> Result<MatchOutcome> {
    let attempt = ctx.begin_attempt();
    for child in children {
        match child.try_match(ctx)? {
            MatchOutcome::Matched(node) => ctx.push_outstanding(node),
            MatchOutcome::NotMatched => {
                trace!(
                    "sequence `{}` failed at {}, backtracking to {}",
                    name.unwrap_or("Sequence"),
                    ctx.position(),
                    attempt.checkpoint.position()
                );
                ctx.discard(attempt);
                return Ok(MatchOutcome::NotMatched);
            }
        }
    }

    let children = ctx.commit(attempt);
    let node = Node::from_parts(CompositeKind::Sequence, name, children);
    Ok(commit_node(ctx, attempt.checkpoint, node))
}

/// Makes `node` the last good node when it consumed input since `start`.
fn commit_node(ctx: &mut ParseContext<'_>, start: Checkpoint, node: Node) -> MatchOutcome {
    if ctx.position() > start.position() {
        ctx.record_last_good(&node);
    }
    MatchOutcome::Matched(node)
}
