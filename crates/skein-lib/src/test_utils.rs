//! Token fixtures for unit tests.

use skein_core::{Span, Token};

/// One token per whitespace-separated kind, lexeme is the kind lowercased.
///
/// Spans assume the kinds were separated by single spaces, so they line up
/// with [`source`] of the same input.
pub fn tokens(kinds: &str) -> Vec<Token> {
    let mut offset = 0u32;
    kinds
        .split_whitespace()
        .map(|kind| {
            let start = offset;
            let end = start + kind.len() as u32;
            offset = end + 1;
            Token::new(kind, kind.to_lowercase(), Span::new(start, end))
        })
        .collect()
}

/// Text the fixture tokens of `kinds` were "lexed" from.
pub fn source(kinds: &str) -> String {
    kinds
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
