//! Invariant checks excluded from coverage reports.

#![cfg_attr(coverage_nightly, coverage(off))]

use crate::cursor::{Checkpoint, TokenCursor};

impl TokenCursor<'_> {
    #[inline]
    pub(crate) fn ensure_checkpoint_in_range(&self, checkpoint: Checkpoint) {
        assert!(
            checkpoint.position() <= self.len(),
            "TokenCursor: checkpoint {} is past the end of a {}-token stream \
             (checkpoint taken from another cursor?)",
            checkpoint.position(),
            self.len(),
        );
    }
}
