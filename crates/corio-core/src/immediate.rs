//! The base-case sender: completes synchronously inside `start`, with
//! no queue, no thread hop, no I/O. Every algorithm-level sender in
//! this workspace (pool, reactor, channel) wraps something that
//! eventually behaves like this; it also gives the combinator tests in
//! this crate something concrete to connect without dragging in
//! `corio-pool` or `corio-reactor`.

use std::marker::PhantomData;
use std::pin::Pin;

use crate::{Operation, Receiver, Sender};

/// A sender that immediately completes with a fixed value.
pub struct Just<T, E = std::convert::Infallible> {
    value: T,
    _error: PhantomData<E>,
}

impl<T, E> Just<T, E> {
    pub fn new(value: T) -> Self {
        Just {
            value,
            _error: PhantomData,
        }
    }
}

pub struct JustOperation<T, E, R> {
    value: Option<T>,
    receiver: Option<R>,
    _error: PhantomData<E>,
}

impl<T, E, R> Operation for JustOperation<T, E, R>
where
    R: Receiver<T, E>,
{
    fn start(self: Pin<&mut Self>) {
        // Neither field is structurally pinned; `Just` never
        // self-references, so projecting by value is sound.
        let this = unsafe { self.get_unchecked_mut() };
        let value = this.value.take().expect("started twice");
        let receiver = this.receiver.take().expect("started twice");
        receiver.set_value(value);
    }
}

impl<T, E> Sender for Just<T, E> {
    type Value = T;
    type Error = E;
    const SENDS_DONE: bool = false;

    type Operation<R>
        = JustOperation<T, E, R>
    where
        R: Receiver<T, E> + Send + 'static;

    fn connect<R>(self, receiver: R) -> Self::Operation<R>
    where
        R: Receiver<T, E> + Send + 'static,
    {
        JustOperation {
            value: Some(self.value),
            receiver: Some(receiver),
            _error: PhantomData,
        }
    }
}
