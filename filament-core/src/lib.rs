//! Filament Core
//!
//! A minimal fine-grained reactive runtime. State lives in signals; effects
//! and memos read them and are re-run automatically when those signals are
//! written. Nobody declares dependencies: they are discovered on every run.
//!
//! # Architecture
//!
//! - `reactive`: the runtime, its context stack, and the signal, memo and
//!   effect primitives built on it
//! - `error`: [`ReactiveError`] and the `try_*` capture helpers
//!
//! Propagation is synchronous and unbatched. Each write re-runs every
//! subscriber, recursively, before it returns.
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use filament_core::{create_effect, create_memo, create_signal};
//!
//! let (a, set_a) = create_signal(1);
//! let (b, set_b) = create_signal(2);
//! let sum = create_memo(move || a.get() + b.get());
//!
//! let log = Rc::new(RefCell::new(Vec::new()));
//! let log_clone = log.clone();
//! create_effect(move || log_clone.borrow_mut().push(sum.get()));
//!
//! set_a.set(10);
//! set_b.set(0);
//! assert_eq!(*log.borrow(), vec![3, 12, 10]);
//! ```

pub mod error;
pub mod reactive;

pub use error::{ReactiveError, Result};
pub use reactive::{
    ComputationId, ComputationKind, Effect, Memo, ReadSignal, Runtime, RuntimeConfig, Signal,
    SignalId, WeakRuntime, WriteSignal,
};

/// Create a signal in the current thread's default runtime.
pub fn create_signal<T: 'static>(initial: T) -> (ReadSignal<T>, WriteSignal<T>) {
    Runtime::global().create_signal(initial)
}

/// Create an effect in the current thread's default runtime and run it once.
pub fn create_effect<F>(f: F)
where
    F: Fn() + 'static,
{
    Runtime::global().create_effect(f);
}

/// Create a memo in the current thread's default runtime.
pub fn create_memo<T, F>(f: F) -> Memo<T>
where
    T: Clone + 'static,
    F: Fn() -> T + 'static,
{
    Runtime::global().create_memo(f)
}
