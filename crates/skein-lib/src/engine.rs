//! Top-level driver: one grammar, one token sequence, one result.
//!
//! The engine validates the grammar, builds a fresh [`ParseContext`], applies
//! the root rule once, and turns the outcome into either a [`Parse`] or an
//! [`Error::ParseFailed`] anchored at the last good node. Unconsumed trailing
//! tokens do not fail the parse; [`Parse::trailing`] and
//! [`Parse::diagnostics`] report them and the caller decides.

use std::fmt;

use log::debug;
use serde::Deserialize;
use skein_core::{Span, Token};

use crate::cancel::Cancellation;
use crate::combinators::MatchOutcome;
use crate::context::{LastGood, ParseContext};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::node::Node;
use crate::rule::Grammar;
use crate::{Error, Result};

/// Default rule-attempt budget per parse.
pub const DEFAULT_EXEC_FUEL: u32 = 1_000_000;

/// Default maximum rule nesting depth.
pub const DEFAULT_RECURSION_LIMIT: u32 = 512;

/// Resource limits for a parse. `None` disables a limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub exec_fuel: Option<u32>,
    pub recursion_limit: Option<u32>,
    /// Iteration cap applied to every Repeat, on top of its own `max`.
    pub max_repeat: Option<u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            exec_fuel: Some(DEFAULT_EXEC_FUEL),
            recursion_limit: Some(DEFAULT_RECURSION_LIMIT),
            max_repeat: None,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// No limits at all. Only for grammars known to terminate.
    pub fn unlimited() -> Self {
        Self {
            exec_fuel: None,
            recursion_limit: None,
            max_repeat: None,
        }
    }

    pub fn with_exec_fuel(mut self, limit: Option<u32>) -> Self {
        self.exec_fuel = limit;
        self
    }

    pub fn with_recursion_limit(mut self, limit: Option<u32>) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn with_max_repeat(mut self, limit: Option<u32>) -> Self {
        self.max_repeat = limit;
        self
    }
}

pub struct Engine<'g> {
    grammar: &'g Grammar,
    config: EngineConfig,
    cancel: Option<&'g dyn Cancellation>,
}

impl<'g> Engine<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self {
            grammar,
            config: EngineConfig::default(),
            cancel: None,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_exec_fuel(mut self, limit: Option<u32>) -> Self {
        self.config.exec_fuel = limit;
        self
    }

    pub fn with_recursion_limit(mut self, limit: Option<u32>) -> Self {
        self.config.recursion_limit = limit;
        self
    }

    pub fn with_max_repeat(mut self, limit: Option<u32>) -> Self {
        self.config.max_repeat = limit;
        self
    }

    /// Polled at every rule entry and Repeat iteration.
    pub fn with_cancellation(mut self, cancel: &'g dyn Cancellation) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parses `tokens` with the grammar's root rule.
    ///
    /// Returns `Err(Error::ParseFailed)` when the root rule does not match,
    /// and other errors for misconfigured grammars or exhausted limits.
    pub fn parse<'t>(&self, tokens: &'t [Token]) -> Result<Parse<'t>> {
        self.grammar.validate()?;
        debug!(
            "parsing {} tokens with root `{}`",
            tokens.len(),
            self.grammar.root().label()
        );

        let mut ctx = ParseContext::new(tokens)
            .with_config(&self.config)
            .with_definitions(self.grammar.definitions());
        if let Some(cancel) = self.cancel {
            ctx = ctx.with_cancellation(cancel);
        }

        let outcome = match self.grammar.root().try_match(&mut ctx) {
            Ok(outcome) => outcome,
            Err(err) => {
                debug!("parse aborted at token {}: {err}", ctx.position());
                return Err(err);
            }
        };
        ctx.ensure_settled();

        match outcome {
            MatchOutcome::Matched(root) => {
                let position = ctx.position();
                debug!(
                    "parse succeeded: consumed {position} of {} tokens",
                    tokens.len()
                );
                Ok(Parse {
                    root,
                    position,
                    tokens,
                    fuel_consumed: ctx.fuel_consumed(),
                })
            }
            MatchOutcome::NotMatched => {
                let failure = ctx.into_failure();
                debug!("parse failed: {failure}");
                Err(Error::ParseFailed(Box::new(failure)))
            }
        }
    }
}

/// Parses `tokens` with default limits.
pub fn parse<'t>(grammar: &Grammar, tokens: &'t [Token]) -> Result<Parse<'t>> {
    Engine::new(grammar).parse(tokens)
}

/// Successful parse: the tree plus where the cursor stopped.
#[derive(Debug, Clone)]
pub struct Parse<'t> {
    root: Node,
    position: usize,
    tokens: &'t [Token],
    fuel_consumed: u32,
}

impl<'t> Parse<'t> {
    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn into_root(self) -> Node {
        self.root
    }

    /// Cursor index after the root rule.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_complete(&self) -> bool {
        self.position == self.tokens.len()
    }

    /// Tokens the root rule left unconsumed.
    pub fn trailing(&self) -> &'t [Token] {
        &self.tokens[self.position..]
    }

    pub fn fuel_consumed(&self) -> u32 {
        self.fuel_consumed
    }

    pub fn render(&self) -> String {
        self.root.render()
    }

    /// A warning covering the trailing tokens, if any.
    pub fn diagnostics(&self) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        let trailing = self.trailing();
        if let (Some(first), Some(last)) = (trailing.first(), trailing.last()) {
            diagnostics
                .report(DiagnosticKind::TrailingTokens, first.span.cover(last.span))
                .message(format!(
                    "{} left, starting at `{}`",
                    trailing.len(),
                    first.lexeme
                ))
                .emit();
        }
        diagnostics
    }
}

/// Why the root rule did not match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    /// Most recent node committed before the parse gave up.
    pub last_good: Option<LastGood>,
    /// Cursor index after the root rule backtracked.
    pub position: usize,
    /// Furthest token index any token rule was tried at.
    pub furthest: usize,
    /// What the token rules at `furthest` wanted, in the order they asked.
    pub expected: Vec<String>,
    /// Token at `furthest`, `None` at end of input.
    pub found: Option<Token>,
    pub span: Span,
}

impl ParseFailure {
    pub fn is_end_of_input(&self) -> bool {
        self.found.is_none()
    }

    fn expected_message(&self) -> String {
        match self.expected.as_slice() {
            [] => "no rule matched".to_string(),
            [one] => format!("expected {one}"),
            many => format!("expected one of {}", many.join(", ")),
        }
    }

    /// One error at the furthest failure point, pointing back at the last
    /// good node when it covers any tokens.
    pub fn diagnostics(&self) -> Diagnostics {
        let kind = if self.is_end_of_input() {
            DiagnosticKind::UnexpectedEndOfInput
        } else {
            DiagnosticKind::UnexpectedToken
        };

        let mut diagnostics = Diagnostics::new();
        let mut report = diagnostics.report(kind, self.span).message(self.expected_message());
        if let Some(last_good) = &self.last_good
            && let Some(span) = last_good.node.span()
        {
            report = report.related_to(format!("last match: `{}`", last_good.node.label()), span);
        }
        report.emit();
        diagnostics
    }
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expected_message())?;
        match &self.found {
            Some(token) => write!(f, ", found `{}`", token.lexeme),
            None => f.write_str(", found end of input"),
        }
    }
}
