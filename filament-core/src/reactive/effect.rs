//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies.
//!
//! 2. When any dependency is written, the effect re-runs synchronously,
//!    inside the `set` call.
//!
//! 3. Before re-running, the effect severs all of its old dependencies and
//!    rediscovers them during execution. A signal read only in a branch that
//!    is no longer taken stops triggering the effect.
//!
//! # Disposal
//!
//! [`Runtime::create_effect`] returns nothing; the effect lives for as long
//! as some signal it read on its last run is alive. [`Runtime::effect`] and
//! [`Effect::new`] return a handle whose [`dispose`](Effect::dispose) stops
//! it for good. Dropping the handle does not dispose, it only stops keeping
//! the effect reachable.

use std::fmt;
use std::rc::Rc;

use super::computation::{ComputationId, ComputationKind, ComputationRef};
use super::runtime::Runtime;

/// A handle to a side-effecting computation.
///
/// # Example
///
/// ```rust
/// use filament_core::reactive::Runtime;
///
/// let rt = Runtime::new();
/// let count = rt.signal(0);
///
/// let c = count.clone();
/// let effect = rt.effect(move || {
///     println!("Count is: {}", c.get());
/// });
///
/// count.set(5); // Prints: "Count is: 5"
/// assert_eq!(effect.run_count(), 2);
/// ```
#[derive(Clone)]
pub struct Effect {
    handle: Rc<ComputationRef>,
}

impl Effect {
    /// Create an effect in the current thread's default runtime.
    ///
    /// The function runs immediately to establish initial dependencies.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self::new_in(&Runtime::global(), run)
    }

    pub(crate) fn new_in<F>(runtime: &Runtime, run: F) -> Self
    where
        F: Fn() + 'static,
    {
        let handle = runtime.register_computation(ComputationKind::Effect, Rc::new(run));
        runtime.execute(handle.id());

        Self {
            handle: Rc::new(handle),
        }
    }

    /// Get the effect's computation ID.
    pub fn id(&self) -> ComputationId {
        self.handle.id()
    }

    /// Run the effect now, exactly as a dependency write would.
    ///
    /// Does nothing once the runtime is gone.
    pub fn execute(&self) {
        if let Some(runtime) = self.runtime() {
            runtime.execute(self.id());
        }
    }

    /// Sever every dependency and never run again.
    ///
    /// Calling this from inside the effect's own body is allowed; reads made
    /// later in that run are not tracked.
    pub fn dispose(&self) {
        if let Some(runtime) = self.runtime() {
            runtime.dispose(self.id());
        }
    }

    /// Check if the effect has been disposed.
    ///
    /// An effect whose runtime is gone counts as disposed.
    pub fn is_disposed(&self) -> bool {
        self.runtime()
            .and_then(|rt| rt.is_disposed(self.id()))
            .unwrap_or(true)
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.runtime()
            .and_then(|rt| rt.run_count(self.id()))
            .unwrap_or(0)
    }

    /// Get the number of signals read during the most recent run.
    pub fn dependency_count(&self) -> usize {
        self.runtime()
            .and_then(|rt| rt.dependency_count(self.id()))
            .unwrap_or(0)
    }

    fn runtime(&self) -> Option<Runtime> {
        self.handle.runtime().upgrade()
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id())
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn effect_runs_on_creation() {
        let rt = Runtime::new();
        let run_count = Rc::new(Cell::new(0));
        let run_count_clone = run_count.clone();

        rt.create_effect(move || {
            run_count_clone.set(run_count_clone.get() + 1);
        });

        assert_eq!(run_count.get(), 1);
    }

    #[test]
    fn effect_reruns_on_dependency_write() {
        let rt = Runtime::new();
        let signal = rt.signal(0);
        let seen = Rc::new(Cell::new(-1));

        let s = signal.clone();
        let seen_clone = seen.clone();
        let effect = rt.effect(move || seen_clone.set(s.get()));
        assert_eq!(seen.get(), 0);

        signal.set(42);
        assert_eq!(seen.get(), 42);
        assert_eq!(effect.run_count(), 2);
    }

    #[test]
    fn effect_execute_reruns_manually() {
        let rt = Runtime::new();
        let effect = rt.effect(|| {});

        assert_eq!(effect.run_count(), 1);

        effect.execute();
        assert_eq!(effect.run_count(), 2);

        effect.execute();
        assert_eq!(effect.run_count(), 3);
    }

    #[test]
    fn effect_does_not_run_after_disposal() {
        let rt = Runtime::new();
        let signal = rt.signal(0);

        let s = signal.clone();
        let effect = rt.effect(move || {
            s.get();
        });
        assert_eq!(signal.subscriber_count(), 1);

        effect.dispose();
        assert!(effect.is_disposed());
        assert_eq!(signal.subscriber_count(), 0);
        assert_eq!(effect.dependency_count(), 0);

        signal.set(1);
        effect.execute();
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn effect_can_dispose_itself() {
        let rt = Runtime::new();
        let signal = rt.signal(0);
        let handle: Rc<Cell<Option<ComputationId>>> = Rc::new(Cell::new(None));

        let s = signal.clone();
        let weak = rt.downgrade();
        let handle_clone = handle.clone();
        let effect = rt.effect(move || {
            if s.get() >= 2 {
                if let (Some(id), Some(rt)) = (handle_clone.get(), weak.upgrade()) {
                    rt.dispose(id);
                }
                // Not tracked: the effect is already disposed.
                s.get();
            }
        });
        handle.set(Some(effect.id()));

        signal.set(1);
        signal.set(2);
        signal.set(3);

        assert_eq!(effect.run_count(), 3);
        assert!(effect.is_disposed());
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn dropping_handle_keeps_effect_alive() {
        let rt = Runtime::new();
        let signal = rt.signal(0);
        let runs = Rc::new(Cell::new(0));

        {
            let s = signal.clone();
            let r = runs.clone();
            let _effect = rt.effect(move || {
                s.get();
                r.set(r.get() + 1);
            });
        }

        signal.set(1);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn unreachable_effect_is_collected() {
        let rt = Runtime::new();
        let signal = rt.signal(0);

        // Reads nothing, so nothing can ever trigger it again.
        rt.create_effect(|| {});
        assert_eq!(rt.computation_count(), 0);

        let s = signal.clone();
        let effect = rt.effect(move || {
            s.get();
        });
        let id = effect.id();
        effect.dispose();
        assert_eq!(rt.kind(id), Some(ComputationKind::Effect));

        drop(effect);
        assert_eq!(rt.computation_count(), 0);
        assert_eq!(rt.kind(id), None);
    }

    #[test]
    fn handle_outliving_runtime_is_inert() {
        let rt = Runtime::new();
        let runs = Rc::new(Cell::new(0));
        let r = runs.clone();
        let effect = rt.effect(move || r.set(r.get() + 1));
        drop(rt);

        effect.execute();
        assert_eq!(runs.get(), 1);
        assert!(effect.is_disposed());
        assert_eq!(effect.run_count(), 0);
    }

    #[test]
    fn effect_clone_shares_state() {
        let rt = Runtime::new();
        let effect1 = rt.effect(|| {});
        let effect2 = effect1.clone();

        assert_eq!(effect1.id(), effect2.id());

        effect1.execute();
        assert_eq!(effect2.run_count(), 2);

        effect1.dispose();
        assert!(effect2.is_disposed());
    }
}
