//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects signals, memos, and
//! effects. It owns one dependency graph: the context stack, the signal
//! nodes with their subscriber sets, and the computation nodes with their
//! dependency sets.
//!
//! # How It Works
//!
//! 1. A computation executes: its old edges are severed, it pushes itself
//!    onto the context stack and runs its body.
//!
//! 2. Every signal read inside the body links the signal and the running
//!    computation in both directions.
//!
//! 3. The body returns (or panics) and the computation is popped.
//!
//! 4. A later write to a signal snapshots its subscribers and executes each
//!    one in order, synchronously, repeating the cycle.
//!
//! There is no batching, no scheduler and no equality check: every write is
//! fully propagated before it returns. A computation that writes one of its
//! own (transitive) dependencies re-enters itself; unless a `max_depth` is
//! configured, nothing stops that recursion short of stack exhaustion.
//!
//! # Ownership
//!
//! Only [`Runtime`] handles keep a graph alive. Signal, memo and effect
//! handles hold a [`WeakRuntime`], so bodies capturing them do not form a
//! cycle with the runtime that stores those bodies. A signal node is removed
//! when the last handle to the signal drops; a computation node is removed
//! once no handle, no running execution and no subscribed signal can reach
//! it. After the runtime itself is gone, handles keep working as plain
//! value cells with no tracking or propagation.
//!
//! # Threading
//!
//! A runtime is single-threaded (`!Send`). Each thread gets its own default
//! runtime from [`Runtime::global`]; independent graphs come from
//! [`Runtime::new`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace, warn};

use super::computation::{ComputationId, ComputationKind, ComputationNode, ComputationRef};
use super::context::ContextStack;
use super::effect::Effect;
use super::memo::Memo;
use super::signal::{ReadSignal, Signal, SignalId, SignalNode, WriteSignal};
use crate::error::{capture, ReactiveError, Result};

/// Runtime configuration.
///
/// The default reproduces the baseline semantics exactly: no recursion
/// guard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Maximum context-stack depth. An execution that would exceed it raises
    /// [`ReactiveError::RecursionLimit`] instead of running.
    pub max_depth: Option<usize>,
}

impl RuntimeConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit how deeply propagation may nest.
    pub fn max_depth(mut self, limit: usize) -> Self {
        self.max_depth = Some(limit);
        self
    }
}

thread_local! {
    static GLOBAL_RUNTIME: Runtime = Runtime::new();
}

/// Handle to one reactive graph.
///
/// Cloning is cheap and every clone refers to the same graph. The graph is
/// freed when the last `Runtime` clone drops.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

/// A non-owning reference to a [`Runtime`].
///
/// Capture this, not a `Runtime`, inside effect and memo bodies.
#[derive(Clone)]
pub struct WeakRuntime {
    inner: Weak<RuntimeInner>,
}

impl WeakRuntime {
    /// The runtime, if it is still alive.
    pub fn upgrade(&self) -> Option<Runtime> {
        self.inner.upgrade().map(|inner| Runtime { inner })
    }
}

impl fmt::Debug for WeakRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakRuntime")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

struct RuntimeInner {
    config: RuntimeConfig,
    context: ContextStack,
    signals: RefCell<HashMap<SignalId, SignalNode>>,
    computations: RefCell<HashMap<ComputationId, ComputationNode>>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    /// Create a new, empty runtime with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a new, empty runtime.
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                config,
                context: ContextStack::new(),
                signals: RefCell::new(HashMap::new()),
                computations: RefCell::new(HashMap::new()),
            }),
        }
    }

    /// The current thread's default runtime.
    pub fn global() -> Self {
        GLOBAL_RUNTIME.with(Runtime::clone)
    }

    /// The configuration this runtime was created with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// A non-owning reference to this runtime.
    pub fn downgrade(&self) -> WeakRuntime {
        WeakRuntime {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Whether two handles refer to the same graph.
    pub fn ptr_eq(&self, other: &Runtime) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // ------------------------------------------------------------------
    // Constructors
    // ------------------------------------------------------------------

    /// Create a signal and return its read and write halves.
    pub fn create_signal<T: 'static>(&self, initial: T) -> (ReadSignal<T>, WriteSignal<T>) {
        self.signal(initial).split()
    }

    /// Create a signal as a single read/write handle.
    pub fn signal<T: 'static>(&self, initial: T) -> Signal<T> {
        Signal::new_in(self, initial)
    }

    /// Create an effect and run it once immediately.
    ///
    /// No handle is returned; the effect re-runs whenever a signal it last
    /// read is written, for as long as one of those signals is alive.
    pub fn create_effect<F>(&self, f: F)
    where
        F: Fn() + 'static,
    {
        Effect::new_in(self, f);
    }

    /// Like [`create_effect`](Self::create_effect), but returns a handle that
    /// can [`dispose`](Effect::dispose) the effect.
    pub fn effect<F>(&self, f: F) -> Effect
    where
        F: Fn() + 'static,
    {
        Effect::new_in(self, f)
    }

    /// Create a memo. `f` runs once, eagerly, before this returns.
    pub fn create_memo<T, F>(&self, f: F) -> Memo<T>
    where
        T: Clone + 'static,
        F: Fn() -> T + 'static,
    {
        Memo::new_in(self, f)
    }

    /// [`create_effect`](Self::create_effect), returning a panic in the
    /// initial run as an error.
    pub fn try_create_effect<F>(&self, f: F) -> Result<()>
    where
        F: Fn() + 'static,
    {
        capture(|| self.create_effect(f))
    }

    /// [`create_memo`](Self::create_memo), returning a panic in the initial
    /// evaluation as an error.
    pub fn try_create_memo<T, F>(&self, f: F) -> Result<Memo<T>>
    where
        T: Clone + 'static,
        F: Fn() -> T + 'static,
    {
        capture(|| self.create_memo(f))
    }

    /// Run `f` without registering any reads it performs.
    pub fn untrack<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.inner.context.enter(None);
        f()
    }

    // ------------------------------------------------------------------
    // Introspection
    //
    // Lookups by id return `None` when the id is not live in this runtime:
    // the node was freed, or the id belongs to another runtime.
    // ------------------------------------------------------------------

    /// Whether a signal read right now would register a dependency.
    pub fn is_tracking(&self) -> bool {
        self.inner.context.peek().is_some()
    }

    /// The computation reads are currently registered against.
    pub fn current_computation(&self) -> Option<ComputationId> {
        self.inner.context.peek()
    }

    /// Number of signals `id` read during its most recent run.
    pub fn dependency_count(&self, id: ComputationId) -> Option<usize> {
        self.with_computation(id, |node| node.dependencies.len())
    }

    /// Number of computations subscribed to `id`.
    pub fn subscriber_count(&self, id: SignalId) -> Option<usize> {
        self.inner
            .signals
            .borrow()
            .get(&id)
            .map(|node| node.subscribers.len())
    }

    /// Number of times the body of `id` has run.
    pub fn run_count(&self, id: ComputationId) -> Option<usize> {
        self.with_computation(id, |node| node.run_count)
    }

    /// Whether `id` was disposed through its [`Effect`] handle.
    pub fn is_disposed(&self, id: ComputationId) -> Option<bool> {
        self.with_computation(id, |node| node.disposed)
    }

    /// Whether `id` is an effect or a memo's updater.
    pub fn kind(&self, id: ComputationId) -> Option<ComputationKind> {
        self.with_computation(id, |node| node.kind)
    }

    /// Whether `computation` is in `signal`'s subscriber set.
    ///
    /// By construction this is true exactly when `signal` is in the
    /// computation's dependency set.
    pub fn is_subscribed(&self, signal: SignalId, computation: ComputationId) -> bool {
        self.inner
            .signals
            .borrow()
            .get(&signal)
            .is_some_and(|node| node.subscribers.contains(&computation))
    }

    /// Number of live signal nodes.
    pub fn signal_count(&self) -> usize {
        self.inner.signals.borrow().len()
    }

    /// Number of live computation nodes.
    pub fn computation_count(&self) -> usize {
        self.inner.computations.borrow().len()
    }

    fn with_computation<R>(
        &self,
        id: ComputationId,
        f: impl FnOnce(&ComputationNode) -> R,
    ) -> Option<R> {
        self.inner.computations.borrow().get(&id).map(f)
    }

    // ------------------------------------------------------------------
    // Graph maintenance
    // ------------------------------------------------------------------

    pub(crate) fn register_signal(&self) -> SignalId {
        let id = SignalId::new();
        self.inner
            .signals
            .borrow_mut()
            .insert(id, SignalNode::default());
        id
    }

    /// Remove a signal whose last handle dropped.
    ///
    /// Its subscribers lose the edge, and any of them left unreachable are
    /// collected.
    pub(crate) fn free_signal(&self, id: SignalId) {
        let Some(node) = self.inner.signals.borrow_mut().remove(&id) else {
            return;
        };
        trace!(signal = id.raw(), "freed signal");

        for computation in node.subscribers {
            if let Some(dependent) = self
                .inner
                .computations
                .borrow_mut()
                .get_mut(&computation)
            {
                dependent.dependencies.retain(|dep| *dep != id);
            }
            self.collect(computation);
        }
    }

    /// Add a computation node, retained by the returned reference.
    pub(crate) fn register_computation(
        &self,
        kind: ComputationKind,
        body: Rc<dyn Fn()>,
    ) -> ComputationRef {
        let id = ComputationId::new();
        self.inner
            .computations
            .borrow_mut()
            .insert(id, ComputationNode::new(kind, body));
        trace!(computation = id.raw(), ?kind, "registered computation");
        ComputationRef::new(id, self.downgrade())
    }

    /// The last handle to `id` dropped.
    pub(crate) fn release(&self, id: ComputationId) {
        if let Some(node) = self.inner.computations.borrow_mut().get_mut(&id) {
            node.retained = false;
        }
        self.collect(id);
    }

    /// Drop `id` if nothing can trigger it any more.
    fn collect(&self, id: ComputationId) {
        let removed = {
            let mut computations = self.inner.computations.borrow_mut();
            match computations.get(&id) {
                Some(node) if node.is_collectable() => computations.remove(&id),
                _ => None,
            }
        };

        // The body may own the last handles to other signals, whose drops
        // re-enter the runtime, so it is dropped with no borrow held.
        if let Some(node) = removed {
            trace!(computation = id.raw(), "collected computation");
            drop(node);
        }
    }

    /// Link the running computation, if any, to `signal`.
    ///
    /// Registering twice in one run is a no-op.
    pub(crate) fn track(&self, signal: SignalId) {
        let Some(running) = self.inner.context.peek() else {
            return;
        };

        let mut computations = self.inner.computations.borrow_mut();
        let Some(node) = computations.get_mut(&running) else {
            return;
        };
        if node.disposed {
            return;
        }

        let mut signals = self.inner.signals.borrow_mut();
        let Some(signal_node) = signals.get_mut(&signal) else {
            return;
        };
        if signal_node.subscribers.insert(running) {
            node.dependencies.push(signal);
            trace!(
                signal = signal.raw(),
                computation = running.raw(),
                "subscribed"
            );
        }
    }

    /// Re-execute every current subscriber of `signal`, in subscription
    /// order, against a snapshot taken before the first one runs.
    pub(crate) fn propagate(&self, signal: SignalId) {
        let snapshot: Vec<ComputationId> = self
            .inner
            .signals
            .borrow()
            .get(&signal)
            .map(|node| node.subscribers.iter().copied().collect())
            .unwrap_or_default();

        debug!(
            signal = signal.raw(),
            subscribers = snapshot.len(),
            "propagating write"
        );

        for id in snapshot {
            self.execute(id);
        }
    }

    /// Sever every dependency edge `id` holds.
    pub(crate) fn cleanup(&self, id: ComputationId) {
        let dependencies = match self.inner.computations.borrow_mut().get_mut(&id) {
            Some(node) => std::mem::take(&mut node.dependencies),
            None => return,
        };
        if dependencies.is_empty() {
            return;
        }

        let mut signals = self.inner.signals.borrow_mut();
        for signal in &dependencies {
            if let Some(node) = signals.get_mut(signal) {
                // shift_remove keeps the remaining subscribers in order.
                node.subscribers.shift_remove(&id);
            }
        }
        trace!(
            computation = id.raw(),
            severed = dependencies.len(),
            "cleaned up"
        );
    }

    /// Run one execution cycle of `id`: cleanup, push, body, pop.
    ///
    /// A panicking body unwinds through here to the caller with the
    /// context stack already restored.
    pub(crate) fn execute(&self, id: ComputationId) {
        let body = {
            let computations = self.inner.computations.borrow();
            let Some(node) = computations.get(&id) else {
                trace!(computation = id.raw(), "skipping collected computation");
                return;
            };
            if node.disposed {
                trace!(computation = id.raw(), "skipping disposed computation");
                return;
            }
            Rc::clone(&node.body)
        };

        if let Some(limit) = self.inner.config.max_depth {
            if self.inner.context.depth() >= limit {
                warn!(computation = id.raw(), limit, "recursion limit exceeded");
                ReactiveError::RecursionLimit { limit }.raise();
            }
        }

        self.cleanup(id);
        if let Some(node) = self.inner.computations.borrow_mut().get_mut(&id) {
            node.run_count += 1;
            node.running += 1;
        }

        let _running = RunningGuard { runtime: self, id };
        let _span = tracing::trace_span!("execute", computation = id.raw()).entered();
        let _guard = self.inner.context.enter(Some(id));
        body();
    }

    /// Sever `id`'s edges and stop it from ever running again.
    pub(crate) fn dispose(&self, id: ComputationId) {
        if let Some(node) = self.inner.computations.borrow_mut().get_mut(&id) {
            node.disposed = true;
        }
        self.cleanup(id);
        debug!(computation = id.raw(), "disposed computation");
        self.collect(id);
    }
}

/// Marks an execution as finished, on return or unwind.
struct RunningGuard<'a> {
    runtime: &'a Runtime,
    id: ComputationId,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        if let Some(node) = self
            .runtime
            .inner
            .computations
            .borrow_mut()
            .get_mut(&self.id)
        {
            node.running -= 1;
        }
        self.runtime.collect(self.id);
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.inner.config)
            .field("depth", &self.inner.context.depth())
            .field("signals", &self.signal_count())
            .field("computations", &self.computation_count())
            .finish()
    }
}
