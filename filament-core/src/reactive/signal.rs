//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a running computation (memo/effect), the
//!    signal registers that computation as a subscriber, and the computation
//!    records the signal as a dependency.
//!
//! 2. When a signal is written, the value is replaced unconditionally and
//!    every subscriber re-executes before the write returns. Writing a value
//!    equal to the current one still re-executes everything.
//!
//! # Memory Layout
//!
//! The value lives in the handle, shared by every clone. The subscriber set
//! lives in the runtime's signal arena, addressed by [`SignalId`], so signals
//! and computations refer to each other by id only. Dropping the last handle
//! removes the arena node.
//!
//! Handles hold the runtime weakly. Once the runtime is gone a signal is a
//! plain value cell: reads track nothing and writes propagate nowhere.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexSet;

use super::computation::ComputationId;
use super::runtime::{Runtime, WeakRuntime};
use crate::error::{capture, ReactiveError, Result};

/// Unique identifier for a signal.
///
/// Ids are never reused, across all runtimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignalId(u64);

impl SignalId {
    pub(crate) fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "signal#{}", self.0)
    }
}

/// A signal as stored in the runtime arena.
#[derive(Debug, Default)]
pub(crate) struct SignalNode {
    /// Computations to re-execute on write, in subscription order.
    pub(crate) subscribers: IndexSet<ComputationId>,
}

struct SignalInner<T> {
    id: SignalId,
    value: RefCell<T>,
    runtime: WeakRuntime,
}

impl<T> SignalInner<T> {
    fn value(&self) -> Ref<'_, T> {
        match self.value.try_borrow() {
            Ok(value) => value,
            Err(_) => ReactiveError::BorrowConflict { signal: self.id }.raise(),
        }
    }

    fn value_mut(&self) -> RefMut<'_, T> {
        match self.value.try_borrow_mut() {
            Ok(value) => value,
            Err(_) => ReactiveError::BorrowConflict { signal: self.id }.raise(),
        }
    }
}

impl<T> Drop for SignalInner<T> {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.free_signal(self.id);
        }
    }
}

/// A reactive signal holding a value of type T.
///
/// # Example
///
/// ```rust
/// use filament_core::reactive::Runtime;
///
/// let rt = Runtime::new();
/// let count = rt.signal(0);
///
/// assert_eq!(count.get(), 0);
/// count.set(5);
/// assert_eq!(count.get(), 5);
/// ```
pub struct Signal<T> {
    inner: Rc<SignalInner<T>>,
}

impl<T: 'static> Signal<T> {
    /// Create a new signal in the current thread's default runtime.
    pub fn new(value: T) -> Self {
        Self::new_in(&Runtime::global(), value)
    }

    pub(crate) fn new_in(runtime: &Runtime, value: T) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                id: runtime.register_signal(),
                value: RefCell::new(value),
                runtime: runtime.downgrade(),
            }),
        }
    }

    pub fn id(&self) -> SignalId {
        self.inner.id
    }

    /// The runtime this signal belongs to, if it is still alive.
    pub fn runtime(&self) -> Option<Runtime> {
        self.inner.runtime.upgrade()
    }

    /// Get the current value.
    ///
    /// If called within a running computation, this also registers that
    /// computation as a subscriber.
    ///
    /// # Panics
    ///
    /// Panics with [`ReactiveError::BorrowConflict`] when called from inside
    /// this signal's own [`update`](Self::update) closure.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.track();
        self.inner.value().clone()
    }

    /// Borrow the current value, tracking like [`get`](Self::get).
    ///
    /// The value stays borrowed until `f` returns. Other reads of this
    /// signal are fine in the meantime.
    ///
    /// # Panics
    ///
    /// Panics with [`ReactiveError::BorrowConflict`] if `f` writes this
    /// signal, directly or through any subscriber its writes re-execute.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&*self.inner.value())
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.inner.value().clone()
    }

    /// Set a new value and re-execute every subscriber.
    ///
    /// No borrow of the value is held while subscribers run.
    ///
    /// # Panics
    ///
    /// Panics if a subscriber panics, and with
    /// [`ReactiveError::BorrowConflict`] if the value is borrowed by an
    /// enclosing [`with`](Self::with) or [`update`](Self::update).
    pub fn set(&self, value: T) {
        let previous = std::mem::replace(&mut *self.inner.value_mut(), value);
        drop(previous);
        self.propagate();
    }

    /// Mutate the value in place, then propagate exactly like [`set`](Self::set).
    ///
    /// # Panics
    ///
    /// The value is mutably borrowed while `f` runs: any access to this
    /// signal from inside `f`, tracked or not, panics with
    /// [`ReactiveError::BorrowConflict`]. Subscriber panics propagate as for
    /// [`set`](Self::set).
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut *self.inner.value_mut());
        self.propagate();
    }

    /// [`set`](Self::set), returning a panicking subscriber as an error.
    ///
    /// The value is replaced either way. Subscribers after the failing one
    /// are not run.
    pub fn try_set(&self, value: T) -> Result<()> {
        capture(|| self.set(value))
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.runtime()
            .and_then(|rt| rt.subscriber_count(self.inner.id))
            .unwrap_or(0)
    }

    /// Split into read and write halves.
    pub fn split(self) -> (ReadSignal<T>, WriteSignal<T>) {
        (
            ReadSignal {
                inner: self.clone(),
            },
            WriteSignal { inner: self },
        )
    }

    /// A read-only handle to the same signal.
    pub fn read_only(&self) -> ReadSignal<T> {
        ReadSignal {
            inner: self.clone(),
        }
    }

    fn track(&self) {
        if let Some(runtime) = self.runtime() {
            runtime.track(self.inner.id);
        }
    }

    fn propagate(&self) {
        if let Some(runtime) = self.runtime() {
            runtime.propagate(self.inner.id);
        }
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Signal");
        s.field("id", &self.inner.id);
        match self.inner.value.try_borrow() {
            Ok(value) => s.field("value", &*value),
            Err(_) => s.field("value", &"<borrowed>"),
        };
        s.field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// The read half of a signal.
pub struct ReadSignal<T> {
    inner: Signal<T>,
}

impl<T: 'static> ReadSignal<T> {
    /// Tracked read. See [`Signal::get`].
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.inner.get()
    }

    /// Tracked borrow. See [`Signal::with`].
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.with(f)
    }

    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.inner.get_untracked()
    }

    pub fn id(&self) -> SignalId {
        self.inner.id()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscriber_count()
    }
}

impl<T> Clone for ReadSignal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for ReadSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadSignal").field(&self.inner).finish()
    }
}

/// The write half of a signal.
pub struct WriteSignal<T> {
    inner: Signal<T>,
}

impl<T: 'static> WriteSignal<T> {
    /// See [`Signal::set`].
    pub fn set(&self, value: T) {
        self.inner.set(value);
    }

    /// See [`Signal::update`].
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.inner.update(f);
    }

    /// See [`Signal::try_set`].
    pub fn try_set(&self, value: T) -> Result<()> {
        self.inner.try_set(value)
    }

    pub fn id(&self) -> SignalId {
        self.inner.id()
    }
}

impl<T> Clone for WriteSignal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for WriteSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteSignal")
            .field("id", &self.inner.inner.id)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
