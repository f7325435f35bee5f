//! The reactor's read sender: `read(fd, buffer, size)` (spec §4.4
//! "Operation taxonomy — read").

use std::os::unix::io::RawFd;
use std::pin::Pin;

use corio_core::{Operation, Receiver, Sender};
use corio_error::CorioError;

use crate::handle::ReactorHandle;
use crate::op::{OpKind, OpNode, Outcome, ReactorOpId};

impl ReactorHandle {
    /// A sender that reads into `buf` and completes with the number
    /// of bytes read.
    ///
    /// # Safety contract
    ///
    /// `buf` must remain valid and must not be accessed by anything
    /// else for as long as the returned sender's operation is
    /// in-flight — i.e. from [`Operation::start`] until the receiver's
    /// completion fires. This mirrors every `io_uring`-backed read
    /// API: the kernel holds the pointer until the completion queue
    /// entry is posted.
    pub fn read<'buf>(&self, fd: RawFd, buf: &'buf mut [u8]) -> ReadSender<'buf> {
        ReadSender {
            handle: self.clone(),
            fd,
            buf,
        }
    }
}

/// Sender returned by [`ReactorHandle::read`].
pub struct ReadSender<'buf> {
    handle: ReactorHandle,
    fd: RawFd,
    buf: &'buf mut [u8],
}

/// Operation state produced by connecting a [`ReadSender`].
pub struct ReadOperation<'buf, R> {
    node: OpNode,
    handle: ReactorHandle,
    receiver: Option<R>,
    _buf: std::marker::PhantomData<&'buf mut [u8]>,
}

impl<'buf, R> ReadOperation<'buf, R> {
    pub fn id(&self) -> ReactorOpId {
        self.node.id()
    }
}

impl<'buf, R> Operation for ReadOperation<'buf, R>
where
    R: Receiver<usize, CorioError> + Send + 'static,
{
    fn start(self: Pin<&mut Self>) {
        // SAFETY: see `ScheduleOperation::start` — address stability
        // is preserved, we only move out of `Option` fields.
        let this = unsafe { self.get_unchecked_mut() };
        let receiver = this.receiver.take().expect("read operation started twice");

        let id = this.handle.next_op_id();
        this.node.set_id(id);
        this.node.set_complete(Box::new(move |outcome| match outcome {
            Outcome::ValueWithLen(n) => receiver.set_value(n),
            Outcome::Value => receiver.set_value(0),
            Outcome::Error(errno) => receiver.set_error(CorioError::Io(errno)),
            Outcome::Done => receiver.set_done(),
        }));
        this.handle.submit(&this.node);
    }
}

impl<'buf> Sender for ReadSender<'buf> {
    type Value = usize;
    type Error = CorioError;
    const SENDS_DONE: bool = true;

    type Operation<R>
        = ReadOperation<'buf, R>
    where
        R: Receiver<usize, CorioError> + Send + 'static;

    fn connect<R>(self, receiver: R) -> Self::Operation<R>
    where
        R: Receiver<usize, CorioError> + Send + 'static,
    {
        let kind = OpKind::Read {
            fd: self.fd,
            buf: self.buf.as_mut_ptr(),
            len: self.buf.len() as u32,
        };
        ReadOperation {
            node: OpNode::new(kind),
            handle: self.handle,
            receiver: Some(receiver),
            _buf: std::marker::PhantomData,
        }
    }
}
