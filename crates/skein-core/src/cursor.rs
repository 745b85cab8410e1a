//! Position-tracking view over a token slice.
//!
//! The cursor never owns tokens. Exhaustion is an ordinary state: `peek` past
//! the end yields `None` and `advance_by` refuses to move, so callers can treat
//! end of input as "stop matching" without any error plumbing.

use crate::token::{Span, Token};

/// Opaque saved position, produced by [`TokenCursor::mark`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Checkpoint(usize);

impl Checkpoint {
    /// Token index this checkpoint refers to.
    pub fn position(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct TokenCursor<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> TokenCursor<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn tokens(&self) -> &'t [Token] {
        self.tokens
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn at_end(&self) -> bool {
        self.pos == self.tokens.len()
    }

    /// Tokens not yet consumed.
    pub fn remaining(&self) -> &'t [Token] {
        &self.tokens[self.pos..]
    }

    pub fn peek(&self) -> Option<&'t Token> {
        self.peek_nth(0)
    }

    /// Token `offset` positions ahead of the current one, without moving.
    pub fn peek_nth(&self, offset: usize) -> Option<&'t Token> {
        self.pos
            .checked_add(offset)
            .and_then(|index| self.tokens.get(index))
    }

    pub fn advance(&mut self) -> bool {
        self.advance_by(1)
    }

    /// Moves forward by `n`. Refuses (returns `false`, no movement) when that
    /// would run past the end.
    pub fn advance_by(&mut self, n: usize) -> bool {
        match self.pos.checked_add(n) {
            Some(next) if next <= self.tokens.len() => {
                self.pos = next;
                true
            }
            _ => false,
        }
    }

    /// Returns the current token and steps past it.
    pub fn bump(&mut self) -> Option<&'t Token> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    pub fn mark(&self) -> Checkpoint {
        Checkpoint(self.pos)
    }

    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.ensure_checkpoint_in_range(checkpoint);
        self.pos = checkpoint.0;
    }

    /// Tokens consumed between `checkpoint` and the current position.
    pub fn consumed_since(&self, checkpoint: Checkpoint) -> &'t [Token] {
        self.ensure_checkpoint_in_range(checkpoint);
        let start = checkpoint.0.min(self.pos);
        &self.tokens[start..self.pos]
    }

    /// Span of the current token, or an empty span just after the last token.
    pub fn current_span(&self) -> Span {
        self.span_at(self.pos)
    }

    /// Span of the token at `index`, or the end-of-input span when `index` is
    /// out of range.
    pub fn span_at(&self, index: usize) -> Span {
        match self.tokens.get(index) {
            Some(token) => token.span,
            None => Span::empty(self.eof_offset()),
        }
    }

    fn eof_offset(&self) -> u32 {
        self.tokens.last().map_or(0, |t| t.span.end)
    }
}
