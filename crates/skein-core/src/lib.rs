#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core data structures for Skein token streams.
//!
//! Two pieces:
//! - **Tokens** (`Token`, `Span`): immutable units produced by an external lexer
//! - **Cursor** (`TokenCursor`): a position-tracking view with checkpoints for backtracking
//!
//! The engine never lexes. Token streams arrive fully materialized, either built
//! in code or deserialized from JSON with [`parse_tokens`].

mod cursor;
mod invariants;
mod token;


pub use cursor::{Checkpoint, TokenCursor};
pub use token::{Span, Token, parse_tokens};

/// Errors raised while building token streams.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The caller passed something that cannot stand in for a token sequence.
    #[error("invalid argument: {0}")]
    ArgumentInvalid(String),

    #[error("malformed token stream: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
