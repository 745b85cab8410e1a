//! Tokens and source spans.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Half-open byte range `start..end` in the text the tokens were lexed from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        assert!(start <= end, "span start {start} is past its end {end}");
        Self { start, end }
    }

    /// Zero-width span at `offset`.
    pub fn empty(offset: u32) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Smallest span containing both.
    pub fn cover(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn range(&self) -> Range<usize> {
        self.start as usize..self.end as usize
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Span::new(range.start as u32, range.end as u32)
    }
}

/// One lexical unit: kind, raw text, and where it came from.
///
/// Kinds are plain strings so that any external lexer can feed the engine
/// without sharing an enum with it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub kind: String,
    pub lexeme: String,
    #[serde(default)]
    pub span: Span,
}

impl Token {
    pub fn new(kind: impl Into<String>, lexeme: impl Into<String>, span: Span) -> Self {
        Self {
            kind: kind.into(),
            lexeme: lexeme.into(),
            span,
        }
    }

    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lexeme)
    }
}

/// Deserialize a token stream from JSON.
///
/// Expects an array of `{"kind", "lexeme", "span"?}` objects. A JSON `null`
/// means the producer had no sequence to hand over, which is rejected; an
/// empty array is a valid (empty) stream. Spans must not end before they start.
pub fn parse_tokens(json: &str) -> Result<Vec<Token>> {
    let tokens: Option<Vec<Token>> = serde_json::from_str(json)?;
    let tokens =
        tokens.ok_or_else(|| Error::ArgumentInvalid("token sequence is absent".to_string()))?;

    if let Some((index, token)) = tokens
        .iter()
        .enumerate()
        .find(|(_, token)| token.span.start > token.span.end)
    {
        return Err(Error::ArgumentInvalid(format!(
            "token {index} (`{}`) has a reversed span {}..{}",
            token.lexeme, token.span.start, token.span.end
        )));
    }
    Ok(tokens)
}
