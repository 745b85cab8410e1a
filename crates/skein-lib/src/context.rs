//! Per-parse mutable state.
//!
//! One `ParseContext` serves exactly one parse. It owns the cursor, the
//! `LastGood` anchor used for failure reports, and the outstanding-node stack
//! that combinators fill while they decide whether to commit.
//!
//! Outstanding nodes are organised as frames: an attempt remembers the stack
//! height when it opened, pushes tentative children above it, and is then
//! either committed (frame drained into the caller's hands) or discarded
//! (frame truncated, cursor restored). Either way the frame is gone once the
//! attempt resolves, so nothing leaks between sibling attempts.

use indexmap::IndexMap;
use skein_core::{Checkpoint, Token, TokenCursor};

use crate::cancel::Cancellation;
use crate::engine::{EngineConfig, ParseFailure};
use crate::node::Node;
use crate::rule::Rule;
use crate::{Error, Result};

/// Most recent committed node and the cursor position right after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastGood {
    pub node: Node,
    pub end: usize,
}

/// An unresolved attempt, see [`ParseContext::begin_attempt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Attempt {
    pub(crate) checkpoint: Checkpoint,
    pub(crate) frame: usize,
}

/// Furthest token index where a token rule failed, and what it wanted there.
#[derive(Debug, Clone, Default)]
struct Furthest {
    position: usize,
    expected: Vec<String>,
}

pub struct ParseContext<'a> {
    cursor: TokenCursor<'a>,
    definitions: Option<&'a IndexMap<String, Rule>>,
    cancel: Option<&'a dyn Cancellation>,
    last_good: Option<LastGood>,
    pub(crate) outstanding: Vec<Node>,
    furthest: Option<Furthest>,
    pub(crate) strict_optional: bool,
    pub(crate) depth: u32,
    exec_fuel_initial: Option<u32>,
    exec_fuel_remaining: Option<u32>,
    recursion_limit: Option<u32>,
    max_repeat: Option<u32>,
}

impl<'a> ParseContext<'a> {
    /// Context over `tokens` with no limits and no definitions.
    ///
    /// An empty slice is valid input.
    pub fn new(tokens: &'a [Token]) -> Self {
        Self {
            cursor: TokenCursor::new(tokens),
            definitions: None,
            cancel: None,
            last_good: None,
            outstanding: Vec::new(),
            furthest: None,
            strict_optional: false,
            depth: 0,
            exec_fuel_initial: None,
            exec_fuel_remaining: None,
            recursion_limit: None,
            max_repeat: None,
        }
    }

    pub fn with_config(mut self, config: &EngineConfig) -> Self {
        self.exec_fuel_initial = config.exec_fuel;
        self.exec_fuel_remaining = config.exec_fuel;
        self.recursion_limit = config.recursion_limit;
        self.max_repeat = config.max_repeat;
        self
    }

    pub fn with_definitions(mut self, definitions: &'a IndexMap<String, Rule>) -> Self {
        self.definitions = Some(definitions);
        self
    }

    pub fn with_cancellation(mut self, cancel: &'a dyn Cancellation) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn cursor(&self) -> &TokenCursor<'a> {
        &self.cursor
    }

    pub fn cursor_mut(&mut self) -> &mut TokenCursor<'a> {
        &mut self.cursor
    }

    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    pub fn last_good(&self) -> Option<&LastGood> {
        self.last_good.as_ref()
    }

    /// Overwrites `LastGood` with `node`, ending at the current position.
    ///
    /// Combinators only call this for commits that consumed input. An empty
    /// Skip, Repeat or Sequence leaves the previous anchor in place, so the
    /// anchor always covers the furthest committed tokens.
    pub fn record_last_good(&mut self, node: &Node) {
        self.last_good = Some(LastGood {
            node: node.clone(),
            end: self.cursor.position(),
        });
    }

    /// Nodes produced by attempts that have not resolved yet, innermost last.
    pub fn outstanding(&self) -> &[Node] {
        &self.outstanding
    }

    pub fn fuel_consumed(&self) -> u32 {
        match (self.exec_fuel_initial, self.exec_fuel_remaining) {
            (Some(initial), Some(remaining)) => initial.saturating_sub(remaining),
            _ => 0,
        }
    }

    pub(crate) fn begin_attempt(&mut self) -> Attempt {
        Attempt {
            checkpoint: self.cursor.mark(),
            frame: self.outstanding.len(),
        }
    }

    pub(crate) fn push_outstanding(&mut self, node: Node) {
        self.outstanding.push(node);
    }

    /// Accepts the attempt: hands back its tentative children and keeps the
    /// cursor where it is.
    pub(crate) fn commit(&mut self, attempt: Attempt) -> Vec<Node> {
        self.ensure_frame(attempt);
        self.outstanding.split_off(attempt.frame)
    }

    /// Drops the attempt's tentative children and restores the cursor.
    pub(crate) fn discard(&mut self, attempt: Attempt) {
        self.ensure_frame(attempt);
        self.outstanding.truncate(attempt.frame);
        self.cursor.restore(attempt.checkpoint);
    }

    pub(crate) fn definition(&self, name: &str) -> Option<&'a Rule> {
        self.definitions.and_then(|defs| defs.get(name))
    }

    pub(crate) fn max_repeat(&self) -> Option<u32> {
        self.max_repeat
    }

    /// Sets whether optional rules must match; returns the previous mode.
    pub(crate) fn set_strict_optional(&mut self, strict: bool) -> bool {
        std::mem::replace(&mut self.strict_optional, strict)
    }

    /// Called at every rule entry: polls cancellation and burns one unit of fuel.
    pub(crate) fn tick(&mut self) -> Result<()> {
        self.check_cancelled()?;
        if let Some(remaining) = self.exec_fuel_remaining.as_mut() {
            if *remaining == 0 {
                return Err(Error::ExecFuelExhausted);
            }
            *remaining -= 1;
        }
        Ok(())
    }

    pub(crate) fn check_cancelled(&self) -> Result<()> {
        match self.cancel {
            Some(cancel) if cancel.is_cancelled() => Err(Error::Cancelled),
            _ => Ok(()),
        }
    }

    pub(crate) fn enter_recursion(&mut self) -> Result<()> {
        if let Some(limit) = self.recursion_limit
            && self.depth >= limit
        {
            return Err(Error::RecursionLimitExceeded);
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn exit_recursion(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Records that a token rule wanted `what` at `position` and did not get it.
    pub(crate) fn note_expected(&mut self, position: usize, what: String) {
        let furthest = self.furthest.get_or_insert_with(|| Furthest {
            position,
            expected: Vec::new(),
        });
        if position > furthest.position {
            furthest.position = position;
            furthest.expected.clear();
        }
        if position == furthest.position && !furthest.expected.contains(&what) {
            furthest.expected.push(what);
        }
    }

    pub(crate) fn into_failure(self) -> ParseFailure {
        let Furthest { position, expected } = self.furthest.unwrap_or_default();
        ParseFailure {
            last_good: self.last_good,
            position: self.cursor.position(),
            furthest: position,
            expected,
            found: self.cursor.tokens().get(position).cloned(),
            span: self.cursor.span_at(position),
        }
    }
}
