//! The receiver contract (spec §4.1).
//!
//! A receiver is a sink for exactly one completion. Rust's ownership
//! model enforces the "exactly once" invariant for free: each method
//! takes `self` by value, so after any one of them is called the
//! receiver is gone and none of the others can be called on it.

/// A terminal sink for a sender's completion.
///
/// `T` is the value-completion payload (use `()` for senders that carry
/// no value); `E` is the error type. `set_error` and `set_done` must
/// never panic across an unwind boundary that the runtime depends on —
/// callers that can't guarantee this should not implement `Receiver`
/// directly but go through [`crate::spawn`] or [`crate::wait`], which
/// isolate receiver panics to a single operation.
pub trait Receiver<T = (), E = corio_error::CorioError> {
    /// Normal completion with a value.
    fn set_value(self, value: T);

    /// Failure completion. Must not be invoked more than once and must
    /// not be invoked after `set_value` or `set_done`.
    fn set_error(self, error: E);

    /// Cancellation completion.
    fn set_done(self);
}

/// A receiver that discards values, aborts the process on error, and
/// no-ops on cancellation — the terminal sink for operations whose
/// outcome is not worth observing (ported from `corio`'s
/// `sink_receiver`).
///
/// Reaching `set_error` on a `SinkReceiver` means a sender that was
/// assumed infallible actually failed; per spec §7 ("if a downstream
/// receiver throws from these [set_error/set_done], the program is in
/// an unrecoverable state and should terminate") this aborts rather
/// than unwinds.
#[derive(Debug, Default, Clone, Copy)]
pub struct SinkReceiver;

impl<T, E: std::fmt::Debug> Receiver<T, E> for SinkReceiver {
    fn set_value(self, _value: T) {}

    fn set_error(self, error: E) {
        eprintln!("corio: sink receiver observed an error: {error:?}");
        std::process::abort();
    }

    fn set_done(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_receiver_accepts_value_and_done() {
        SinkReceiver.set_value(42);
        SinkReceiver.set_done();
    }
}
