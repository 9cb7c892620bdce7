//! Reactive Context
//!
//! The context stack tracks which computation is currently running.
//! This enables automatic dependency tracking: when a signal is read,
//! it asks the stack for the top entry and registers that computation
//! as a subscriber.
//!
//! # Implementation
//!
//! Each [`Runtime`](super::Runtime) owns one stack. When a computation
//! executes it pushes itself, runs its body, and pops itself again. The pop
//! happens in a guard's `Drop`, so a panicking body still leaves the stack
//! balanced.
//!
//! Entries are `Option<ComputationId>`: `None` marks an untracked section,
//! inside which reads register nothing even if a computation is running
//! further down the stack.

use std::cell::RefCell;

use super::ComputationId;

/// Ordered stack of running computations.
#[derive(Debug, Default)]
pub(crate) struct ContextStack {
    entries: RefCell<Vec<Option<ComputationId>>>,
}

impl ContextStack {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, entry: Option<ComputationId>) {
        self.entries.borrow_mut().push(entry);
    }

    pub(crate) fn pop(&self) -> Option<Option<ComputationId>> {
        self.entries.borrow_mut().pop()
    }

    /// The computation reads should register against, if any.
    pub(crate) fn peek(&self) -> Option<ComputationId> {
        self.entries.borrow().last().copied().flatten()
    }

    /// Number of entries, untracked sections included.
    pub(crate) fn depth(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Push `entry` and return a guard that pops it when dropped.
    pub(crate) fn enter(&self, entry: Option<ComputationId>) -> ContextGuard<'_> {
        self.push(entry);
        ContextGuard { stack: self, entry }
    }
}

/// Guard that pops the context when dropped.
///
/// This ensures the context stack is properly maintained even if
/// the computation panics.
pub(crate) struct ContextGuard<'a> {
    stack: &'a ContextStack,
    entry: Option<ComputationId>,
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        let popped = self.stack.pop();

        // Push/pop must be strictly balanced around each execution.
        debug_assert_eq!(
            popped,
            Some(self.entry),
            "ContextGuard mismatch: expected {:?}, got {:?}",
            self.entry,
            popped
        );
    }
}
