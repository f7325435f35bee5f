//! The channel's read sender (spec §4.5 "Operations — read").

use std::pin::Pin;
use std::sync::Arc;

use corio_core::{Operation, Receiver, Sender};
use corio_error::CorioError;

use crate::shared::ChannelShared;

/// Sender returned by [`crate::ReadHandle::read`].
pub struct ReadSender<T> {
    pub(crate) shared: Arc<ChannelShared<T>>,
}

/// Operation state produced by connecting a [`ReadSender`].
pub struct ReadOperation<T, R> {
    shared: Arc<ChannelShared<T>>,
    receiver: Option<R>,
}

impl<T, R> Operation for ReadOperation<T, R>
where
    T: Send + 'static,
    R: Receiver<T, CorioError> + Send + 'static,
{
    fn start(self: Pin<&mut Self>) {
        let this = unsafe { self.get_unchecked_mut() };
        let receiver = this.receiver.take().expect("read operation started twice");
        let shared = this.shared.clone();

        let mut state = shared.state.lock().unwrap();

        // Buffered path: a value is already queued. Deliver it, and if
        // a writer was blocked on a full buffer, move its value into
        // the now-free slot and wake it (spec §4.5 "signal any waiting
        // writer (space freed)").
        if let Some(value) = state.buffer.pop_front() {
            let woken_writer = state.pending_writers.pop_front();
            let writer_done = woken_writer.map(|(queued_value, writer_done)| {
                state.buffer.push_back(queued_value);
                writer_done
            });
            drop(state);
            if let Some(writer_done) = writer_done {
                writer_done(Ok(()));
            }
            shared.notify_reader_progress();
            receiver.set_value(value);
            return;
        }

        // Rendezvous path: no buffer in play, pair directly with a
        // waiting writer if one exists.
        if let Some((value, writer_done)) = state.pending_writers.pop_front() {
            drop(state);
            writer_done(Ok(()));
            shared.notify_reader_progress();
            receiver.set_value(value);
            return;
        }

        if state.closed {
            drop(state);
            receiver.set_error(CorioError::ChannelClosed);
            return;
        }

        state
            .pending_readers
            .push_back(Box::new(move |result| match result {
                Ok(value) => receiver.set_value(value),
                Err(err) => receiver.set_error(err),
            }));
    }
}

impl<T> Sender for ReadSender<T>
where
    T: Send + 'static,
{
    type Value = T;
    type Error = CorioError;
    const SENDS_DONE: bool = false;

    type Operation<R>
        = ReadOperation<T, R>
    where
        R: Receiver<T, CorioError> + Send + 'static;

    fn connect<R>(self, receiver: R) -> Self::Operation<R>
    where
        R: Receiver<T, CorioError> + Send + 'static,
    {
        ReadOperation {
            shared: self.shared,
            receiver: Some(receiver),
        }
    }
}
