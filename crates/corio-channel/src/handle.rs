//! Reference-counted read/write handles and the `make_channel`
//! factory (spec §4.5 "Model"), grounded on `gvthread_core::channel`'s
//! `Sender`/`Receiver` handle split over one `Arc<ChannelInner>`.

use std::sync::Arc;

use corio_error::{TryRecvError, TrySendError};
use corio_reactor::ReactorHandle;

use crate::config::ChannelConfig;
use crate::read::ReadSender;
use crate::shared::{dec_to_zero, inc, ChannelShared};
use crate::write::WriteSender;

/// Construct a channel. `config.capacity == None` yields a rendezvous
/// channel; `Some(n)` (`n >= 1`) yields a channel buffering up to `n`
/// values. Panics if `config` doesn't validate — call
/// [`ChannelConfig::validate`] yourself first if the capacity is not a
/// compile-time constant.
pub fn make_channel<T>(reactor: ReactorHandle, config: ChannelConfig) -> (ReadHandle<T>, WriteHandle<T>)
where
    T: Send + 'static,
{
    config
        .validate()
        .expect("invalid ChannelConfig passed to make_channel");
    let shared = Arc::new(ChannelShared::new(config.capacity, reactor));
    (
        ReadHandle {
            shared: shared.clone(),
        },
        WriteHandle { shared },
    )
}

/// The read side of a channel. Reference-counted: the channel closes
/// once every `ReadHandle` clone is dropped (spec §4.5 "Each handle
/// decrements a per-side counter on drop").
pub struct ReadHandle<T> {
    shared: Arc<ChannelShared<T>>,
}

impl<T> ReadHandle<T>
where
    T: Send + 'static,
{
    /// A sender that completes with the next value in FIFO order, or
    /// `CorioError::ChannelClosed` once the channel has closed with no
    /// value left to deliver.
    pub fn read(&self) -> ReadSender<T> {
        ReadSender {
            shared: self.shared.clone(),
        }
    }

    /// Non-blocking read: takes a value immediately if one is
    /// available without registering a pending reader.
    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        let mut state = self.shared.state.lock().unwrap();
        if let Some(value) = state.buffer.pop_front() {
            let woken = state.pending_writers.pop_front();
            let writer_done = woken.map(|(queued, done)| {
                state.buffer.push_back(queued);
                done
            });
            drop(state);
            if let Some(done) = writer_done {
                done(Ok(()));
            }
            self.shared.notify_reader_progress();
            return Ok(value);
        }
        if let Some((value, writer_done)) = state.pending_writers.pop_front() {
            drop(state);
            writer_done(Ok(()));
            self.shared.notify_reader_progress();
            return Ok(value);
        }
        Err(TryRecvError)
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }
}

impl<T> Clone for ReadHandle<T> {
    fn clone(&self) -> Self {
        inc(&self.shared.read_handles);
        ReadHandle {
            shared: self.shared.clone(),
        }
    }
}

impl<T> Drop for ReadHandle<T> {
    fn drop(&mut self) {
        if dec_to_zero(&self.shared.read_handles) {
            self.shared.close();
        }
    }
}

/// The write side of a channel. Reference-counted like [`ReadHandle`].
pub struct WriteHandle<T> {
    shared: Arc<ChannelShared<T>>,
}

impl<T> WriteHandle<T>
where
    T: Send + 'static,
{
    /// A sender that completes once `value` has been accepted — either
    /// buffered, or handed directly to a waiting reader.
    pub fn write(&self, value: T) -> WriteSender<T> {
        WriteSender {
            shared: self.shared.clone(),
            value,
        }
    }

    /// Non-blocking write: succeeds immediately if a reader is waiting
    /// or the buffer has room, without registering a pending writer.
    pub fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
        let mut state = self.shared.state.lock().unwrap();
        if state.closed {
            return Err(TrySendError(value));
        }
        if let Some(reader_done) = state.pending_readers.pop_front() {
            drop(state);
            reader_done(Ok(value));
            self.shared.notify_writer_progress();
            return Ok(());
        }
        if let Some(capacity) = self.shared.capacity {
            if state.buffer.len() < capacity {
                state.buffer.push_back(value);
                drop(state);
                self.shared.notify_writer_progress();
                return Ok(());
            }
        }
        Err(TrySendError(value))
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }
}

impl<T> Clone for WriteHandle<T> {
    fn clone(&self) -> Self {
        inc(&self.shared.write_handles);
        WriteHandle {
            shared: self.shared.clone(),
        }
    }
}

impl<T> Drop for WriteHandle<T> {
    fn drop(&mut self) {
        if dec_to_zero(&self.shared.write_handles) {
            self.shared.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corio_reactor::{Reactor, ReactorConfig};

    fn test_reactor() -> Reactor {
        Reactor::start(ReactorConfig::default()).expect("reactor start")
    }

    #[test]
    fn try_send_then_try_recv_buffered() {
        let reactor = test_reactor();
        let (read, write) = make_channel::<i32>(reactor.handle(), ChannelConfig::buffered(2));
        write.try_send(1).unwrap();
        write.try_send(2).unwrap();
        assert!(write.try_send(3).is_err());
        assert_eq!(read.try_recv().unwrap(), 1);
        assert_eq!(read.try_recv().unwrap(), 2);
        assert_eq!(read.try_recv(), Err(TryRecvError));
    }

    #[test]
    fn dropping_both_write_handles_closes_channel() {
        let reactor = test_reactor();
        let (read, write) = make_channel::<i32>(reactor.handle(), ChannelConfig::rendezvous());
        let write2 = write.clone();
        drop(write);
        assert!(!read.is_closed());
        drop(write2);
        assert!(read.is_closed());
    }
}
