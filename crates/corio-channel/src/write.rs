//! The channel's write sender (spec §4.5 "Operations — write").

use std::pin::Pin;
use std::sync::Arc;

use corio_core::{Operation, Receiver, Sender};
use corio_error::CorioError;

use crate::shared::ChannelShared;

/// Sender returned by [`crate::WriteHandle::write`].
pub struct WriteSender<T> {
    pub(crate) shared: Arc<ChannelShared<T>>,
    pub(crate) value: T,
}

/// Operation state produced by connecting a [`WriteSender`].
pub struct WriteOperation<T, R> {
    shared: Arc<ChannelShared<T>>,
    value: Option<T>,
    receiver: Option<R>,
}

impl<T, R> Operation for WriteOperation<T, R>
where
    T: Send + 'static,
    R: Receiver<(), CorioError> + Send + 'static,
{
    fn start(self: Pin<&mut Self>) {
        let this = unsafe { self.get_unchecked_mut() };
        let receiver = this
            .receiver
            .take()
            .expect("write operation started twice");
        let value = this.value.take().expect("write operation started twice");
        let shared = this.shared.clone();

        let mut state = shared.state.lock().unwrap();

        if state.closed {
            drop(state);
            receiver.set_error(CorioError::ChannelClosed);
            return;
        }

        // A pending reader always takes priority over the buffer
        // (spec §4.5 "write: ... push and signal any waiting reader").
        if let Some(reader_done) = state.pending_readers.pop_front() {
            drop(state);
            reader_done(Ok(value));
            shared.notify_writer_progress();
            receiver.set_value(());
            return;
        }

        if let Some(capacity) = shared.capacity {
            if state.buffer.len() < capacity {
                state.buffer.push_back(value);
                drop(state);
                shared.notify_writer_progress();
                receiver.set_value(());
                return;
            }
        }

        // Buffer full (or rendezvous with no waiting reader): queue.
        state.pending_writers.push_back((
            value,
            Box::new(move |result| match result {
                Ok(()) => receiver.set_value(()),
                Err(err) => receiver.set_error(err),
            }),
        ));
    }
}

impl<T> Sender for WriteSender<T>
where
    T: Send + 'static,
{
    type Value = ();
    type Error = CorioError;
    const SENDS_DONE: bool = false;

    type Operation<R>
        = WriteOperation<T, R>
    where
        R: Receiver<(), CorioError> + Send + 'static;

    fn connect<R>(self, receiver: R) -> Self::Operation<R>
    where
        R: Receiver<(), CorioError> + Send + 'static,
    {
        WriteOperation {
            shared: self.shared,
            value: Some(self.value),
            receiver: Some(receiver),
        }
    }
}
