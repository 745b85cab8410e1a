//! Cooperative cancellation.
//!
//! The engine never blocks, so cancellation is a flag it polls: once at every
//! rule entry and once per Repeat iteration.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Capability the engine polls to find out whether to stop early.
pub trait Cancellation {
    fn is_cancelled(&self) -> bool;
}

/// Never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct Never;

impl Cancellation for Never {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Shareable cancellation flag. Clones observe the same flag, so one half can
/// be handed to another thread while the parse holds the other.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

impl Cancellation for CancelToken {
    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl<F: Fn() -> bool> Cancellation for F {
    fn is_cancelled(&self) -> bool {
        self()
    }
}
