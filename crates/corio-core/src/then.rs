//! `then` / `then_fallible` — synchronous value transforms (spec §4.2,
//! grounded on `corio`'s `then.hpp`).
//!
//! `then.hpp` picks between two wrapper shapes depending on whether the
//! user's callable is declared `noexcept`: a noexcept callable can only
//! ever feed `set_value`, so the wrapper skips any error-union
//! machinery; a throwing callable needs its exception folded into the
//! sender's error channel. Rust has no `noexcept` bit to inspect, so we
//! make the split explicit at the call site instead: [`then`] wraps an
//! infallible `FnOnce`, [`then_fallible`] wraps one returning `Result`
//! and folds `Err` into [`CorioError`](corio_error::CorioError) via
//! `Into`.

use corio_error::CorioError;

use crate::{Operation, Receiver, Sender};
use std::pin::Pin;

/// Sender returned by [`then`].
pub struct Then<S, F> {
    sender: S,
    f: F,
}

/// Apply an infallible transform to a sender's value completion.
/// Errors and cancellation pass through unchanged.
pub fn then<S, F, U>(sender: S, f: F) -> Then<S, F>
where
    S: Sender,
    F: FnOnce(S::Value) -> U,
{
    Then { sender, f }
}

struct ThenReceiver<F, R> {
    f: F,
    receiver: R,
}

impl<F, R, T, U, E> Receiver<T, E> for ThenReceiver<F, R>
where
    F: FnOnce(T) -> U,
    R: Receiver<U, E>,
{
    fn set_value(self, value: T) {
        let mapped = (self.f)(value);
        self.receiver.set_value(mapped);
    }

    fn set_error(self, error: E) {
        self.receiver.set_error(error);
    }

    fn set_done(self) {
        self.receiver.set_done();
    }
}

impl<S, F, U> Sender for Then<S, F>
where
    S: Sender,
    F: FnOnce(S::Value) -> U + Send + 'static,
{
    type Value = U;
    type Error = S::Error;
    const SENDS_DONE: bool = S::SENDS_DONE;

    type Operation<R>
        = S::Operation<ThenReceiver<F, R>>
    where
        R: Receiver<U, S::Error> + Send + 'static;

    fn connect<R>(self, receiver: R) -> Self::Operation<R>
    where
        R: Receiver<U, S::Error> + Send + 'static,
    {
        self.sender.connect(ThenReceiver {
            f: self.f,
            receiver,
        })
    }
}

/// Sender returned by [`then_fallible`].
pub struct ThenFallible<S, F> {
    sender: S,
    f: F,
}

/// Apply a fallible transform to a sender's value completion. `Ok`
/// becomes the downstream value completion; `Err` becomes a
/// `set_error` carrying a [`CorioError::User`]. The upstream error type
/// is folded into `CorioError` too, so the whole chain settles on one
/// concrete error type the way `then.hpp`'s error-union computation
/// does in the throwing case.
pub fn then_fallible<S, F, U, E>(sender: S, f: F) -> ThenFallible<S, F>
where
    S: Sender,
    S::Error: Into<CorioError>,
    F: FnOnce(S::Value) -> Result<U, E>,
    E: std::error::Error + Send + Sync + 'static,
{
    ThenFallible { sender, f }
}

struct ThenFallibleReceiver<F, R> {
    f: F,
    receiver: R,
}

impl<F, R, T, U, E, TE> Receiver<T, TE> for ThenFallibleReceiver<F, R>
where
    F: FnOnce(T) -> Result<U, E>,
    E: std::error::Error + Send + Sync + 'static,
    TE: Into<CorioError>,
    R: Receiver<U, CorioError>,
{
    fn set_value(self, value: T) {
        match (self.f)(value) {
            Ok(mapped) => self.receiver.set_value(mapped),
            Err(e) => self.receiver.set_error(CorioError::from_user(e)),
        }
    }

    fn set_error(self, error: TE) {
        self.receiver.set_error(error.into());
    }

    fn set_done(self) {
        self.receiver.set_done();
    }
}

impl<S, F, U, E> Sender for ThenFallible<S, F>
where
    S: Sender,
    S::Error: Into<CorioError>,
    F: FnOnce(S::Value) -> Result<U, E> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    type Value = U;
    type Error = CorioError;
    const SENDS_DONE: bool = S::SENDS_DONE;

    type Operation<R>
        = S::Operation<ThenFallibleReceiver<F, R>>
    where
        R: Receiver<U, CorioError> + Send + 'static;

    fn connect<R>(self, receiver: R) -> Self::Operation<R>
    where
        R: Receiver<U, CorioError> + Send + 'static,
    {
        self.sender.connect(ThenFallibleReceiver {
            f: self.f,
            receiver,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::immediate::Just;
    use std::sync::{Arc, Mutex};

    /// Owns its slot through an `Arc` rather than borrowing a stack
    /// frame, so it satisfies the `Send + 'static` bound `connect` now
    /// requires on every receiver (the same reason `WaitReceiver` and
    /// `FutureReceiver` are `Arc`-based rather than reference-based).
    #[derive(Debug, Default, Clone)]
    struct CapturingReceiver {
        value: Arc<Mutex<Option<i32>>>,
    }

    impl Receiver<i32, CorioError> for CapturingReceiver {
        fn set_value(self, value: i32) {
            *self.value.lock().unwrap() = Some(value);
        }
        fn set_error(self, _error: CorioError) {
            panic!("unexpected error");
        }
        fn set_done(self) {
            panic!("unexpected done");
        }
    }

    #[test]
    fn then_maps_value() {
        let sender = then(Just::<i32, CorioError>::new(21), |v: i32| v * 2);
        let recv = CapturingReceiver::default();
        let mut op = sender.connect(recv.clone());
        let pinned = unsafe { Pin::new_unchecked(&mut op) };
        pinned.start();
        assert_eq!(*recv.value.lock().unwrap(), Some(42));
    }

    #[test]
    fn then_fallible_ok_path() {
        let sender = then_fallible(
            Just::<i32, CorioError>::new(21),
            |v: i32| -> Result<i32, std::io::Error> { Ok(v * 2) },
        );
        let recv = CapturingReceiver::default();
        let mut op = sender.connect(recv.clone());
        let pinned = unsafe { Pin::new_unchecked(&mut op) };
        pinned.start();
        assert_eq!(*recv.value.lock().unwrap(), Some(42));
    }

    /// spec §8 scenario 6: `then(sender_of(1), x => throw E)` awaited
    /// via `wait` rethrows `E`. Rust has no exceptions to throw across
    /// the boundary, so the equivalent is `then_fallible`'s `Err` arm
    /// folded into `CorioError::User` and surfaced by `wait`'s `Err`.
    #[test]
    fn then_fallible_err_path_propagates_through_wait() {
        #[derive(Debug)]
        struct BoomError;
        impl std::fmt::Display for BoomError {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "boom")
            }
        }
        impl std::error::Error for BoomError {}

        let sender = then_fallible(Just::<i32, CorioError>::new(1), |_: i32| {
            Err::<i32, BoomError>(BoomError)
        });

        match crate::wait(sender) {
            Err(CorioError::User(e)) => assert_eq!(e.to_string(), "boom"),
            other => panic!("expected a rethrown user error, got {other:?}"),
        }
    }
}
