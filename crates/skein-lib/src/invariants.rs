//! Invariant checks excluded from coverage reports.

#![cfg_attr(coverage_nightly, coverage(off))]

use crate::context::{Attempt, ParseContext};
use crate::rule::Rule;

impl ParseContext<'_> {
    /// An attempt resolves only its own frame: nested attempts must already
    /// be gone when the outer one commits or discards.
    #[inline]
    pub(crate) fn ensure_frame(&self, attempt: Attempt) {
        assert!(
            attempt.frame <= self.outstanding.len(),
            "broken attempt nesting: frame {} opened above an outstanding stack of {} \
             (inner attempt resolved twice?)",
            attempt.frame,
            self.outstanding.len(),
        );
    }

    /// A rule that reports `NotMatched` must leave the cursor where it found it.
    #[inline]
    pub(crate) fn ensure_backtracked(&self, before: usize, rule: &Rule) {
        assert_eq!(
            self.position(),
            before,
            "`{}` reported NotMatched but moved the cursor from {before} to {}",
            rule.label(),
            self.position(),
        );
    }

    /// State left behind once the root rule has returned.
    #[inline]
    pub(crate) fn ensure_settled(&self) {
        assert!(
            self.outstanding.is_empty(),
            "{} outstanding node(s) leaked past the root rule",
            self.outstanding.len(),
        );
        assert_eq!(self.depth, 0, "rule nesting did not unwind");
        assert!(!self.strict_optional, "strict optional mode leaked past its Skip");
    }
}
