//! Reactive Primitives
//!
//! This module implements the core reactive system: signals, memos, and effects.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! while a computation (memo or effect) is running, the signal registers that
//! computation as a subscriber. When the signal is written, every subscriber
//! re-runs before the write returns.
//!
//! ## Memos
//!
//! A Memo is a derived value that caches its result in an internal signal.
//! It is evaluated eagerly on creation and again whenever any signal it read
//! on its last run is written.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that runs once on creation and
//! again whenever its dependencies are written.
//!
//! # Implementation Notes
//!
//! Each [`Runtime`] owns a context stack. A running computation sits on top
//! of it, and signal reads consult the top entry to record edges. Edges are
//! stored by id on both sides: the signal node keeps its subscriber ids, the
//! computation node keeps its dependency ids. Every run starts by severing
//! all of a computation's edges, so the dependency set always reflects
//! exactly the most recent run.

mod computation;
mod context;
mod effect;
mod memo;
mod runtime;
mod signal;

pub use computation::{ComputationId, ComputationKind};
pub use effect::Effect;
pub use memo::Memo;
pub use runtime::{Runtime, RuntimeConfig, WeakRuntime};
pub use signal::{ReadSignal, Signal, SignalId, WriteSignal};
