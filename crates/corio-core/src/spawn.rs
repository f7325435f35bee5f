//! `spawn` — detach a sender so it runs to completion without the
//! caller holding on to its operation state (spec §4.2, grounded on
//! `corio`'s `spawn.hpp`).
//!
//! `spawn.hpp` heap-allocates an `operation_type` wrapping a receiver
//! that, once the inner sender completes, forwards to the caller's
//! receiver and then `delete`s the heap block it lives in — so the
//! operation's lifetime is exactly "until one of the three completion
//! methods fires." We reproduce that with `Box::into_raw`/`Box::from_raw`:
//! the box is handed to the connected operation as a raw pointer before
//! the operation itself is built (the operation doesn't need the box's
//! contents yet, only a place to eventually free), then reclaimed and
//! dropped the instant the wrapped receiver is signalled.

use std::pin::Pin;

use crate::{Operation, Receiver, Sender};

struct SpawnedOp<S, R>
where
    S: Sender + Send + 'static,
    R: Receiver<S::Value, S::Error> + Send + 'static,
    S::Value: Send,
    S::Error: Send,
{
    receiver: Option<R>,
    op: Option<S::Operation<WrapperReceiver<S, R>>>,
}

struct WrapperReceiver<S, R>
where
    S: Sender + Send + 'static,
    R: Receiver<S::Value, S::Error> + Send + 'static,
    S::Value: Send,
    S::Error: Send,
{
    target: *mut SpawnedOp<S, R>,
}

// SAFETY: `target` only ever points at heap data that is itself `Send`
// when `S` and `R` (and their associated types) are `Send`; the pointer
// is never dereferenced concurrently from two threads because each of
// set_value/set_error/set_done consumes `self` and runs exactly once.
unsafe impl<S, R> Send for WrapperReceiver<S, R>
where
    S: Sender + Send + 'static,
    R: Receiver<S::Value, S::Error> + Send + 'static,
    S::Value: Send,
    S::Error: Send,
{
}

impl<S, R> WrapperReceiver<S, R>
where
    S: Sender + Send + 'static,
    R: Receiver<S::Value, S::Error> + Send + 'static,
    S::Value: Send,
    S::Error: Send,
{
    /// Reclaim the box and hand back the caller's receiver, dropping
    /// everything else (including the now-finished operation state).
    fn take_receiver(self) -> R {
        // SAFETY: `target` was produced by `Box::into_raw` in `spawn`
        // and this is the only place that ever reconstructs the box;
        // the contract on `Receiver` guarantees this runs at most once.
        let boxed = unsafe { Box::from_raw(self.target) };
        boxed.receiver.expect("spawned receiver already taken")
    }
}

impl<S, R> Receiver<S::Value, S::Error> for WrapperReceiver<S, R>
where
    S: Sender + Send + 'static,
    R: Receiver<S::Value, S::Error> + Send + 'static,
    S::Value: Send,
    S::Error: Send,
{
    fn set_value(self, value: S::Value) {
        self.take_receiver().set_value(value);
    }

    fn set_error(self, error: S::Error) {
        self.take_receiver().set_error(error);
    }

    fn set_done(self) {
        self.take_receiver().set_done();
    }
}

/// Connect `sender` to `receiver` on the heap and start it immediately,
/// without requiring the caller to keep the operation state alive.
///
/// `receiver` still observes exactly one completion, same as if the
/// caller had connected and started the operation on its own stack —
/// `spawn` only changes where the operation state lives, not the
/// completion contract.
pub fn spawn<S, R>(sender: S, receiver: R)
where
    S: Sender + Send + 'static,
    R: Receiver<S::Value, S::Error> + Send + 'static,
    S::Value: Send,
    S::Error: Send,
{
    let boxed = Box::new(SpawnedOp {
        receiver: Some(receiver),
        op: None,
    });
    let target = Box::into_raw(boxed);

    let wrapper = WrapperReceiver { target };
    let op = sender.connect(wrapper);

    // SAFETY: `target` is still a live, uniquely-owned allocation; no
    // other reference to it exists until a completion method fires.
    unsafe {
        (*target).op = Some(op);
        let op_ref = (*target).op.as_mut().unwrap();
        Pin::new_unchecked(op_ref).start();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::immediate::Just;
    use std::sync::{Arc, Mutex};

    struct RecordingReceiver(Arc<Mutex<Option<i32>>>);

    impl Receiver<i32, std::convert::Infallible> for RecordingReceiver {
        fn set_value(self, value: i32) {
            *self.0.lock().unwrap() = Some(value);
        }
        fn set_error(self, _error: std::convert::Infallible) {}
        fn set_done(self) {}
    }

    #[test]
    fn spawn_runs_to_completion_and_frees_itself() {
        let slot = Arc::new(Mutex::new(None));
        spawn(Just::new(7), RecordingReceiver(slot.clone()));
        assert_eq!(*slot.lock().unwrap(), Some(7));
    }
}
