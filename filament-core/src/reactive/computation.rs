//! Computation nodes.
//!
//! A computation is any re-runnable body whose signal dependencies are
//! rediscovered on every run: an effect, or the updater inside a memo.
//!
//! A node stays in its runtime while something can still trigger it: a
//! handle ([`Effect`](super::Effect) or [`Memo`](super::Memo)) is alive, it
//! is running, or at least one signal lists it as a subscriber. Once none of
//! those hold, the runtime drops the node and its body.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

use super::runtime::WeakRuntime;
use super::SignalId;

/// Unique identifier for a computation.
///
/// Ids are never reused, across all runtimes, so a stale or foreign id
/// simply finds nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComputationId(u64);

impl ComputationId {
    /// Generate a new unique computation ID.
    pub(crate) fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ComputationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "computation#{}", self.0)
    }
}

/// What created a computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputationKind {
    /// Created by `create_effect` or `Runtime::effect`.
    Effect,
    /// The internal updater of a memo.
    Memo,
}

/// A computation as stored in the runtime arena.
pub(crate) struct ComputationNode {
    pub(crate) kind: ComputationKind,

    /// The body. Shared so it can be called without holding an arena borrow.
    pub(crate) body: Rc<dyn Fn()>,

    /// Signals read during the most recent run.
    /// Mirrors the subscriber sets those signals hold.
    pub(crate) dependencies: SmallVec<[SignalId; 4]>,

    /// Set by `Effect::dispose`; disposed computations never run again.
    pub(crate) disposed: bool,

    /// Number of times the body has been invoked.
    pub(crate) run_count: usize,

    /// Whether an `Effect` or `Memo` handle still refers to this node.
    pub(crate) retained: bool,

    /// Executions of this node currently on the call stack.
    pub(crate) running: usize,
}

impl ComputationNode {
    pub(crate) fn new(kind: ComputationKind, body: Rc<dyn Fn()>) -> Self {
        Self {
            kind,
            body,
            dependencies: SmallVec::new(),
            disposed: false,
            run_count: 0,
            retained: true,
            running: 0,
        }
    }

    /// Nothing can trigger this node again.
    pub(crate) fn is_collectable(&self) -> bool {
        !self.retained && self.running == 0 && self.dependencies.is_empty()
    }
}

impl fmt::Debug for ComputationNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputationNode")
            .field("kind", &self.kind)
            .field("dependencies", &self.dependencies)
            .field("disposed", &self.disposed)
            .field("run_count", &self.run_count)
            .field("retained", &self.retained)
            .field("running", &self.running)
            .finish()
    }
}

/// Shared by every clone of an `Effect` or `Memo` handle.
///
/// When the last clone goes away the node is released, and dropped if
/// nothing else can trigger it.
pub(crate) struct ComputationRef {
    id: ComputationId,
    runtime: WeakRuntime,
}

impl ComputationRef {
    pub(crate) fn new(id: ComputationId, runtime: WeakRuntime) -> Self {
        Self { id, runtime }
    }

    pub(crate) fn id(&self) -> ComputationId {
        self.id
    }

    pub(crate) fn runtime(&self) -> &WeakRuntime {
        &self.runtime
    }
}

impl Drop for ComputationRef {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.release(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn computation_ids_are_unique() {
        let id1 = ComputationId::new();
        let id2 = ComputationId::new();
        let id3 = ComputationId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
        assert_eq!(id2.to_string(), format!("computation#{}", id2.raw()));
    }

    #[test]
    fn new_node_starts_idle_and_retained() {
        let called = Rc::new(Cell::new(false));
        let called_clone = called.clone();

        let mut node = ComputationNode::new(
            ComputationKind::Effect,
            Rc::new(move || called_clone.set(true)),
        );

        assert!(node.dependencies.is_empty());
        assert!(!node.disposed);
        assert_eq!(node.run_count, 0);
        assert!(!node.is_collectable());
        assert!(!called.get());

        (node.body)();
        assert!(called.get());

        node.retained = false;
        assert!(node.is_collectable());

        node.dependencies.push(SignalId::new());
        assert!(!node.is_collectable());
    }
}
