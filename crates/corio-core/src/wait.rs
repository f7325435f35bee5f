//! `wait` — block the calling thread until a sender completes (spec
//! §4.2, grounded on `corio`'s `wait.hpp`).
//!
//! `wait.hpp` parks on a condition variable guarded by a small state
//! machine and wakes it from whichever completion method fires. Its
//! `set_error` path stores the exception but never calls
//! `notify_one`, so a thread that raced the mutex after `set_value`'s
//! wakeup and observed "nothing yet" would block forever on an error
//! completion. We don't carry that bug forward: every completion path
//! here updates the slot under the lock and notifies, and the waiting
//! loop rechecks the predicate instead of assuming a single wakeup is
//! the right one (which also makes it immune to spurious wakeups,
//! something libc condvars always permit).
//!
//! The receiver owns its state through an `Arc` rather than borrowing
//! a stack frame (the same shape as [`crate::future_bridge::IntoFuture`]'s
//! `Shared`): `connect` requires `Send + 'static` receivers, since the
//! pool/reactor/channel senders this is meant to block on hand their
//! completion off to another thread, so a borrowed `WaitReceiver<'a>`
//! could never satisfy that bound.

use std::pin::Pin;
use std::sync::{Arc, Condvar, Mutex};

use corio_error::CorioError;

use crate::{Operation, Receiver, Sender};

enum Slot<T> {
    Pending,
    Value(T),
    Error(CorioError),
    Done,
}

struct WaitState<T> {
    slot: Mutex<Slot<T>>,
    cond: Condvar,
}

struct WaitReceiver<T> {
    state: Arc<WaitState<T>>,
}

impl<T, E> Receiver<T, E> for WaitReceiver<T>
where
    T: Send + 'static,
    E: Into<CorioError>,
{
    fn set_value(self, value: T) {
        *self.state.slot.lock().unwrap() = Slot::Value(value);
        self.state.cond.notify_one();
    }

    fn set_error(self, error: E) {
        *self.state.slot.lock().unwrap() = Slot::Error(error.into());
        self.state.cond.notify_one();
    }

    fn set_done(self) {
        *self.state.slot.lock().unwrap() = Slot::Done;
        self.state.cond.notify_one();
    }
}

/// Block the current thread until `sender` completes.
///
/// Returns `Ok(true)` on a value completion (the value itself is
/// discarded, matching `wait.hpp`'s `void`-returning contract — use
/// [`crate::future_bridge`] instead when the value is needed),
/// `Ok(false)` on cancellation, and `Err` on failure.
pub fn wait<S>(sender: S) -> Result<bool, CorioError>
where
    S: Sender,
    S::Value: Send + 'static,
    S::Error: Into<CorioError>,
{
    let state = Arc::new(WaitState {
        slot: Mutex::new(Slot::Pending),
        cond: Condvar::new(),
    });
    let receiver = WaitReceiver {
        state: state.clone(),
    };
    let mut op = sender.connect(receiver);
    // SAFETY: `op` lives on this stack frame for the remainder of the
    // function and is never moved after this point.
    let pinned = unsafe { Pin::new_unchecked(&mut op) };
    pinned.start();

    let mut guard = state.slot.lock().unwrap();
    loop {
        match &*guard {
            Slot::Pending => guard = state.cond.wait(guard).unwrap(),
            _ => break,
        }
    }
    match std::mem::replace(&mut *guard, Slot::Pending) {
        Slot::Value(_) => Ok(true),
        Slot::Done => Ok(false),
        Slot::Error(e) => Err(e),
        Slot::Pending => unreachable!("loop only exits once the slot is populated"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::immediate::Just;

    #[test]
    fn wait_on_value_returns_true() {
        let sender: Just<i32, CorioError> = Just::new(5);
        assert_eq!(wait(sender).unwrap(), true);
    }
}
