//! Error types for the reactive runtime.
//!
//! A failing computation body is a Rust panic and unwinds out of whichever
//! `set` or creation call triggered it. The `try_*` entry points catch that
//! unwind and hand it back as a [`ReactiveError`].

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;

use crate::reactive::SignalId;

/// Errors surfaced by the reactive runtime.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    /// Propagation nested deeper than the runtime's configured `max_depth`.
    #[error("recursion limit exceeded: more than {limit} nested computations")]
    RecursionLimit {
        /// The configured maximum depth.
        limit: usize,
    },

    /// A signal's value was accessed while a borrow of it was still open,
    /// such as a write from inside [`Signal::with`](crate::reactive::Signal::with).
    #[error("{signal} is already borrowed")]
    BorrowConflict {
        /// The signal whose value cell was borrowed.
        signal: SignalId,
    },

    /// A computation body panicked.
    #[error("computation panicked: {message}")]
    Panicked {
        /// The panic message, if it was a string.
        message: String,
    },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ReactiveError>;

impl ReactiveError {
    /// Convert a caught panic payload into an error.
    ///
    /// Payloads raised with [`std::panic::panic_any`] carrying a
    /// `ReactiveError` come back unchanged.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        match payload.downcast::<ReactiveError>() {
            Ok(err) => *err,
            Err(payload) => {
                let message = if let Some(s) = payload.downcast_ref::<&str>() {
                    (*s).to_string()
                } else if let Some(s) = payload.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "non-string panic payload".to_string()
                };
                ReactiveError::Panicked { message }
            }
        }
    }

    /// Raise this error as a panic so it unwinds through the propagation path.
    pub(crate) fn raise(self) -> ! {
        panic::panic_any(self)
    }
}

/// Run `f`, turning any panic that escapes it into a `ReactiveError`.
pub(crate) fn capture<R>(f: impl FnOnce() -> R) -> Result<R> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(ReactiveError::from_panic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_passes_through_values() {
        assert_eq!(capture(|| 7), Ok(7));
    }

    #[test]
    fn capture_converts_string_panics() {
        let err = capture(|| panic!("boom {}", 1)).unwrap_err();
        assert_eq!(
            err,
            ReactiveError::Panicked {
                message: "boom 1".to_string()
            }
        );
    }

    #[test]
    fn capture_preserves_typed_payloads() {
        let err = capture(|| ReactiveError::RecursionLimit { limit: 3 }.raise()).unwrap_err();
        assert_eq!(err, ReactiveError::RecursionLimit { limit: 3 });
    }

    #[test]
    fn display_messages() {
        assert_eq!(
            ReactiveError::RecursionLimit { limit: 4 }.to_string(),
            "recursion limit exceeded: more than 4 nested computations"
        );

        let signal = SignalId::new();
        assert_eq!(
            ReactiveError::BorrowConflict { signal }.to_string(),
            format!("signal#{} is already borrowed", signal.raw())
        );
    }
}
