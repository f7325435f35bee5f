//! The reactor's cancel sender: `cancel(target_op_ptr)` (spec §4.4
//! "Operation taxonomy — cancel"), addressed by [`ReactorOpId`] rather
//! than a raw pointer (SPEC_FULL §2 "cancel-sender addressing model").

use std::pin::Pin;

use corio_core::{Operation, Receiver, Sender};
use corio_error::CorioError;

use crate::handle::ReactorHandle;
use crate::op::{OpKind, OpNode, Outcome, ReactorOpId};

impl ReactorHandle {
    /// A sender that requests cancellation of the in-flight operation
    /// identified by `target`. Cancelling an operation that has
    /// already completed, or was never submitted, is a no-op from the
    /// caller's point of view — the cancel sender still completes
    /// with a value (spec §4.4 "Cancelling a completed operation is a
    /// no-op").
    pub fn cancel(&self, target: ReactorOpId) -> CancelSender {
        CancelSender {
            handle: self.clone(),
            target,
        }
    }
}

/// Sender returned by [`ReactorHandle::cancel`].
pub struct CancelSender {
    handle: ReactorHandle,
    target: ReactorOpId,
}

/// Operation state produced by connecting a [`CancelSender`].
pub struct CancelOperation<R> {
    node: OpNode,
    handle: ReactorHandle,
    receiver: Option<R>,
}

impl<R> Operation for CancelOperation<R>
where
    R: Receiver<(), CorioError> + Send + 'static,
{
    fn start(self: Pin<&mut Self>) {
        let this = unsafe { self.get_unchecked_mut() };
        let receiver = this
            .receiver
            .take()
            .expect("cancel operation started twice");

        let id = this.handle.next_op_id();
        this.node.set_id(id);
        this.node.set_complete(Box::new(move |outcome| match outcome {
            Outcome::Value | Outcome::ValueWithLen(_) => receiver.set_value(()),
            // A cancel entry can itself report ENOENT (target already
            // gone) — spec: still a no-op success from the caller's
            // perspective.
            Outcome::Error(errno) if errno == libc::ENOENT => receiver.set_value(()),
            Outcome::Error(errno) => receiver.set_error(CorioError::Io(errno)),
            Outcome::Done => receiver.set_done(),
        }));
        this.handle.submit(&this.node);
    }
}

impl Sender for CancelSender {
    type Value = ();
    type Error = CorioError;
    const SENDS_DONE: bool = false;

    type Operation<R>
        = CancelOperation<R>
    where
        R: Receiver<(), CorioError> + Send + 'static;

    fn connect<R>(self, receiver: R) -> Self::Operation<R>
    where
        R: Receiver<(), CorioError> + Send + 'static,
    {
        CancelOperation {
            node: OpNode::new(OpKind::Cancel {
                target: self.target,
            }),
            handle: self.handle,
            receiver: Some(receiver),
        }
    }
}
