//! The await-bridge: adapts any [`Sender`] into a Rust [`Future`] (spec
//! §4.2, grounded on `corio`'s `await_sender.hpp`).
//!
//! `await_sender.hpp`'s `await_ready` unconditionally returns `false` —
//! a coroutine awaiting a sender always suspends at least once, and
//! `connect`/`start` only happen inside `await_suspend`, not at the
//! awaiter's construction. Rust's `Future` doesn't have a separate
//! "ready" probe; the equivalent property is connecting the sender
//! lazily on the *first* `poll` rather than in [`IntoFuture::new`], so
//! a future that's constructed but never polled never starts any work.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use corio_error::CorioError;

use crate::{Operation, Receiver, Sender};

enum SharedState<T, E> {
    Empty,
    Waiting(Waker),
    Value(T),
    Error(E),
    Done,
}

struct Shared<T, E> {
    state: Mutex<SharedState<T, E>>,
}

impl<T, E> Shared<T, E> {
    fn new() -> Self {
        Shared {
            state: Mutex::new(SharedState::Empty),
        }
    }
}

fn complete<T, E>(shared: &Shared<T, E>, new_state: SharedState<T, E>) {
    let waker = {
        let mut guard = shared.state.lock().unwrap();
        match std::mem::replace(&mut *guard, new_state) {
            SharedState::Waiting(waker) => Some(waker),
            _ => None,
        }
    };
    if let Some(waker) = waker {
        waker.wake();
    }
}

struct FutureReceiver<T, E> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> Receiver<T, E> for FutureReceiver<T, E> {
    fn set_value(self, value: T) {
        complete(&self.shared, SharedState::Value(value));
    }

    fn set_error(self, error: E) {
        complete(&self.shared, SharedState::Error(error));
    }

    fn set_done(self) {
        complete(&self.shared, SharedState::Done);
    }
}

enum State<S: Sender> {
    NotStarted(S),
    Started(S::Operation<FutureReceiver<S::Value, S::Error>>),
    Completed,
}

/// A `Future` adapting a `Sender`. Build with [`IntoFuture::new`] or the
/// [`SenderFutureExt::into_future`] convenience, then `.await` it.
pub struct IntoFuture<S: Sender> {
    shared: Arc<Shared<S::Value, S::Error>>,
    state: State<S>,
    done: bool,
}

impl<S: Sender> IntoFuture<S> {
    pub fn new(sender: S) -> Self {
        IntoFuture {
            shared: Arc::new(Shared::new()),
            state: State::NotStarted(sender),
            done: false,
        }
    }
}

/// Extension trait so any `Sender` can be turned into a future with
/// `.into_future()` instead of the more verbose `IntoFuture::new`.
pub trait SenderFutureExt: Sender + Sized {
    fn into_future(self) -> IntoFuture<Self> {
        IntoFuture::new(self)
    }
}

impl<S: Sender> SenderFutureExt for S {}

impl<S> Future for IntoFuture<S>
where
    S: Sender,
    S::Value: Send + 'static,
    S::Error: Into<CorioError> + Send + 'static,
{
    type Output = Result<S::Value, CorioError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // SAFETY: `IntoFuture` has no `Unpin` requirements of its own;
        // the only field that cares about address stability is the
        // connected operation inside `state`, which we re-pin
        // explicitly below and never move once `Started`.
        let this = unsafe { self.get_unchecked_mut() };

        debug_assert!(
            !this.done,
            "corio future polled again after already returning Poll::Ready"
        );

        if matches!(this.state, State::NotStarted(_)) {
            let sender = match std::mem::replace(&mut this.state, State::Completed) {
                State::NotStarted(sender) => sender,
                _ => unreachable!(),
            };
            let receiver = FutureReceiver {
                shared: this.shared.clone(),
            };
            let op = sender.connect(receiver);
            this.state = State::Started(op);
            if let State::Started(op) = &mut this.state {
                // SAFETY: reached transitively from `self: Pin<&mut Self>`;
                // `state` is not replaced again while this variant holds.
                unsafe { Pin::new_unchecked(op) }.start();
            }
        }

        let mut guard = this.shared.state.lock().unwrap();
        match &*guard {
            SharedState::Empty | SharedState::Waiting(_) => {
                *guard = SharedState::Waiting(cx.waker().clone());
                Poll::Pending
            }
            SharedState::Value(_) | SharedState::Error(_) | SharedState::Done => {
                let settled = std::mem::replace(&mut *guard, SharedState::Empty);
                drop(guard);
                this.state = State::Completed;
                this.done = true;
                match settled {
                    SharedState::Value(v) => Poll::Ready(Ok(v)),
                    SharedState::Error(e) => Poll::Ready(Err(e.into())),
                    SharedState::Done => Poll::Ready(Err(CorioError::Cancelled)),
                    SharedState::Empty | SharedState::Waiting(_) => unreachable!(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::immediate::Just;

    #[test]
    fn value_completion_resolves_the_future() {
        let fut = Just::<i32, CorioError>::new(9).into_future();
        let result = futures_lite_block_on(fut);
        assert_eq!(result.unwrap(), 9);
    }

    /// Minimal single-threaded executor, just enough to drive a future
    /// to completion in a test without depending on an async runtime
    /// crate for something this self-contained.
    fn futures_lite_block_on<F: Future>(mut fut: F) -> F::Output {
        use std::task::{RawWaker, RawWakerVTable};

        fn noop(_: *const ()) {}
        fn clone(_: *const ()) -> RawWaker {
            RawWaker::new(std::ptr::null(), &VTABLE)
        }
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, noop, noop, noop);
        let waker = unsafe { Waker::from_raw(RawWaker::new(std::ptr::null(), &VTABLE)) };
        let mut cx = Context::from_waker(&waker);

        // SAFETY: `fut` is a local never moved again after this point.
        let mut fut = unsafe { Pin::new_unchecked(&mut fut) };
        loop {
            if let Poll::Ready(v) = fut.as_mut().poll(&mut cx) {
                return v;
            }
        }
    }
}
