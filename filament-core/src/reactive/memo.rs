//! Memo Implementation
//!
//! A Memo is a cached derived value, built from the two primitives below it:
//! one signal that holds the result and one computation that recomputes the
//! result and writes it into that signal.
//!
//! # How Memos Work
//!
//! 1. On creation, the computation runs once, eagerly, so the memo has a
//!    value before [`Runtime::create_memo`] returns.
//!
//! 2. Reading the memo reads its internal signal, so whoever reads it
//!    subscribes exactly as if it were a plain signal.
//!
//! 3. When a dependency of the derivation is written, the computation re-runs
//!    and writes the new result, which in turn re-executes every reader.
//!
//! There is no lazy evaluation and no equality check: every upstream write
//! recomputes and re-propagates, even if the result is unchanged.
//!
//! Only the read side of the internal signal is kept, so nothing outside the
//! derivation can assign to a memo.

use std::fmt;
use std::rc::Rc;

use super::computation::{ComputationId, ComputationKind, ComputationRef};
use super::runtime::Runtime;
use super::signal::{ReadSignal, SignalId};

/// A cached derived value.
///
/// # Example
///
/// ```rust
/// use filament_core::reactive::Runtime;
///
/// let rt = Runtime::new();
/// let (count, set_count) = rt.create_signal(2);
/// let doubled = rt.create_memo(move || count.get() * 2);
///
/// assert_eq!(doubled.get(), 4);
/// set_count.set(5);
/// assert_eq!(doubled.get(), 10);
/// ```
pub struct Memo<T> {
    /// `None` only while the first evaluation is running, before any handle
    /// exists.
    value: ReadSignal<Option<T>>,
    handle: Rc<ComputationRef>,
}

impl<T: Clone + 'static> Memo<T> {
    /// Create a memo in the current thread's default runtime.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self::new_in(&Runtime::global(), compute)
    }

    pub(crate) fn new_in<F>(runtime: &Runtime, compute: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        let (value, write) = runtime.create_signal(None::<T>);

        let handle = runtime.register_computation(
            ComputationKind::Memo,
            Rc::new(move || {
                let next = compute();
                write.set(Some(next));
            }),
        );
        runtime.execute(handle.id());

        Self {
            value,
            handle: Rc::new(handle),
        }
    }

    /// Get the current value, tracking like a signal read.
    pub fn get(&self) -> T {
        self.value
            .get()
            .expect("memo is evaluated before its handle is returned")
    }

    /// Borrow the current value, tracking like [`get`](Self::get).
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.value.with(|value| {
            f(value
                .as_ref()
                .expect("memo is evaluated before its handle is returned"))
        })
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.value
            .get_untracked()
            .expect("memo is evaluated before its handle is returned")
    }

    /// The id of the internal computation.
    pub fn computation_id(&self) -> ComputationId {
        self.handle.id()
    }

    /// The id of the internal result signal.
    pub fn signal_id(&self) -> SignalId {
        self.value.id()
    }

    /// Number of times the derivation has run.
    pub fn run_count(&self) -> usize {
        self.runtime()
            .and_then(|rt| rt.run_count(self.computation_id()))
            .unwrap_or(0)
    }

    /// Number of signals the derivation read on its most recent run.
    pub fn dependency_count(&self) -> usize {
        self.runtime()
            .and_then(|rt| rt.dependency_count(self.computation_id()))
            .unwrap_or(0)
    }

    /// Number of computations reading this memo.
    pub fn subscriber_count(&self) -> usize {
        self.value.subscriber_count()
    }

    fn runtime(&self) -> Option<Runtime> {
        self.handle.runtime().upgrade()
    }
}

impl<T> Clone for Memo<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            handle: Rc::clone(&self.handle),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Memo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memo")
            .field("computation", &self.handle.id())
            .field("value", &self.value)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    #[test]
    fn memo_computes_eagerly_once() {
        let rt = Runtime::new();
        let call_count = Rc::new(Cell::new(0));
        let call_count_clone = call_count.clone();

        let memo = rt.create_memo(move || {
            call_count_clone.set(call_count_clone.get() + 1);
            42
        });

        // Computed before the accessor is ever called.
        assert_eq!(call_count.get(), 1);
        assert_eq!(memo.get_untracked(), 42);

        // Reads use the cached value.
        assert_eq!(memo.get(), 42);
        assert_eq!(memo.get(), 42);
        assert_eq!(call_count.get(), 1);
    }

    #[test]
    fn memo_recomputes_on_dependency_write() {
        let rt = Runtime::new();
        let (count, set_count) = rt.create_signal(3);

        let memo = rt.create_memo(move || count.get() * 10);
        assert_eq!(memo.get(), 30);

        set_count.set(4);
        assert_eq!(memo.get(), 40);
        assert_eq!(memo.run_count(), 2);
    }

    #[test]
    fn memo_recomputes_even_when_result_unchanged() {
        let rt = Runtime::new();
        let (count, set_count) = rt.create_signal(3);
        let memo = rt.create_memo(move || count.get() % 2);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let m = memo.clone();
        let seen_clone = seen.clone();
        rt.create_effect(move || seen_clone.borrow_mut().push(m.get()));

        set_count.set(5);

        assert_eq!(memo.run_count(), 2);
        assert_eq!(*seen.borrow(), vec![1, 1]);
    }

    #[test]
    fn memo_depends_on_memo() {
        let rt = Runtime::new();
        let (base, set_base) = rt.create_signal(5);

        let doubled = rt.create_memo(move || base.get() * 2);
        let d = doubled.clone();
        let plus_ten = rt.create_memo(move || d.get() + 10);

        assert_eq!(doubled.get(), 10);
        assert_eq!(plus_ten.get(), 20);

        set_base.set(10);

        assert_eq!(doubled.get(), 20);
        assert_eq!(plus_ten.get(), 30);
    }

    #[test]
    fn memo_with_borrows_value() {
        let rt = Runtime::new();
        let memo = rt.create_memo(|| vec![1, 2, 3]);
        assert_eq!(memo.with(|v| v.len()), 3);
    }

    #[test]
    fn memo_has_value_once_created() {
        let rt = Runtime::new();
        let (count, set_count) = rt.create_signal(1);

        let memo = rt.create_memo(move || count.get() + 1);
        assert_eq!(memo.get_untracked(), 2);
        assert_eq!(memo.run_count(), 1);
        assert_eq!(rt.kind(memo.computation_id()), Some(ComputationKind::Memo));

        // A failing re-evaluation keeps the last good value.
        let failing = rt.create_memo(move || {
            let n = memo.get();
            assert!(n < 5, "too large");
            n
        });
        assert!(set_count.try_set(10).is_err());
        assert_eq!(failing.get_untracked(), 2);
    }

    #[test]
    fn dropped_memo_stays_live_while_subscribed() {
        let rt = Runtime::new();
        let (count, set_count) = rt.create_signal(1);
        let seen = Rc::new(Cell::new(0));

        let memo = rt.create_memo(move || count.get() * 3);
        let m = memo.clone();
        let seen_clone = seen.clone();
        rt.create_effect(move || seen_clone.set(m.get()));
        drop(memo);

        set_count.set(2);
        assert_eq!(seen.get(), 6);
        assert_eq!(rt.computation_count(), 2);
    }

    #[test]
    fn memo_clone_shares_state() {
        let rt = Runtime::new();
        let (count, set_count) = rt.create_signal(1);
        let memo1 = rt.create_memo(move || count.get() + 1);
        let memo2 = memo1.clone();

        assert_eq!(memo1.computation_id(), memo2.computation_id());

        set_count.set(9);
        assert_eq!(memo2.get(), 10);
    }
}
