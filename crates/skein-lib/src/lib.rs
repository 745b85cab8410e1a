//! Skein: a backtracking parser-combinator engine over pre-lexed token streams.
//!
//! # Example
//!
//! ```
//! use skein_lib::{Grammar, Rule, Token, Span};
//!
//! let tokens = vec![
//!     Token::new("A", "a", Span::new(0, 1)),
//!     Token::new("B", "b", Span::new(2, 3)),
//!     Token::new("C", "c", Span::new(4, 5)),
//! ];
//! let grammar = Grammar::new(Rule::sequence([
//!     Rule::token("A"),
//!     Rule::repeat(Rule::token("B")),
//!     Rule::token("C"),
//! ]));
//!
//! let parse = skein_lib::parse(&grammar, &tokens).expect("grammar matches");
//! assert_eq!(
//!     parse.root().render(),
//!     "Sequence, Count=3, Children=(a, Repeat, Count=1, Children=(b), c)"
//! );
//! ```

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod cancel;
pub mod diagnostics;
pub mod engine;
pub mod node;
pub mod rule;

mod combinators;
mod context;
mod invariants;

#[cfg(test)]
mod combinators_tests;
#[cfg(test)]
mod test_utils;

pub use cancel::{CancelToken, Cancellation, Never};
pub use combinators::MatchOutcome;
pub use context::{LastGood, ParseContext};
pub use diagnostics::{DiagnosticKind, Diagnostics, DiagnosticsPrinter, Severity};
pub use engine::{Engine, EngineConfig, Parse, ParseFailure, parse};
pub use node::{CompositeKind, Node, TreePrinter};
pub use rule::{Grammar, Rule, RuleKind, TokenPattern};
pub use skein_core::{Checkpoint, Span, Token, TokenCursor};

/// Errors that abort a parse or reject a grammar.
///
/// Ordinary mismatches never show up here; they are resolved by backtracking.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Execution fuel exhausted (too many rule attempts).
    #[error("execution limit exceeded")]
    ExecFuelExhausted,

    /// Recursion fuel exhausted (rules nested too deeply, e.g. left recursion).
    #[error("recursion limit exceeded")]
    RecursionLimitExceeded,

    /// The caller's cancellation capability fired.
    #[error("parse cancelled")]
    Cancelled,

    /// Operation not valid for this value, e.g. appending a child to a leaf.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// A combinator that wraps a rule was built without one.
    #[error("`{rule}` requires at least one child rule")]
    MissingRule { rule: String },

    /// A reference names a definition the grammar does not have.
    #[error("`{0}` is not defined")]
    UndefinedRule(String),

    #[error("{0}")]
    ParseFailed(Box<ParseFailure>),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
