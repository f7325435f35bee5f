//! The reactor's own schedule sender: zero-delay (`nop`) or timer
//! (`timeout`) completion (spec §4.4 "Operation taxonomy — schedule").

use std::pin::Pin;
use std::time::Duration;

use corio_core::{Operation, Receiver, Sender};
use corio_error::CorioError;

use crate::handle::ReactorHandle;
use crate::op::{OpKind, OpNode, Outcome, ReactorOpId};

impl ReactorHandle {
    /// A sender that completes with a value as soon as the reactor
    /// thread next processes its submission queue — spec §8 "Timer
    /// with duration 0 completes promptly via the `nop` path, not via
    /// the timer path".
    pub fn schedule(&self) -> ScheduleSender {
        ScheduleSender {
            handle: self.clone(),
            kind: ScheduleKind::Immediate,
        }
    }

    /// A sender that completes after `duration` has elapsed, via the
    /// ring's `timeout` opcode. `schedule_after` is the canonical
    /// timeout primitive (spec §5 "Cancellation & timeouts").
    pub fn schedule_after(&self, duration: Duration) -> ScheduleSender {
        if duration.is_zero() {
            return self.schedule();
        }
        ScheduleSender {
            handle: self.clone(),
            kind: ScheduleKind::After(duration),
        }
    }
}

enum ScheduleKind {
    Immediate,
    After(Duration),
}

/// Sender returned by [`ReactorHandle::schedule`] /
/// [`ReactorHandle::schedule_after`].
pub struct ScheduleSender {
    handle: ReactorHandle,
    kind: ScheduleKind,
}

/// Operation state produced by connecting a [`ScheduleSender`].
pub struct ScheduleOperation<R> {
    node: OpNode,
    handle: ReactorHandle,
    receiver: Option<R>,
}

impl<R> ScheduleOperation<R> {
    /// The id this operation was submitted under. Only meaningful
    /// after [`Operation::start`] — used to address a
    /// [`crate::cancel::CancelSender`] at it.
    pub fn id(&self) -> ReactorOpId {
        self.node.id()
    }
}

impl<R> Operation for ScheduleOperation<R>
where
    R: Receiver<(), CorioError> + Send + 'static,
{
    fn start(self: Pin<&mut Self>) {
        // SAFETY: neither field is structurally pinned; the node's
        // address (what must stay stable) is never moved out of.
        let this = unsafe { self.get_unchecked_mut() };
        let receiver = this
            .receiver
            .take()
            .expect("schedule operation started twice");

        let id = this.handle.next_op_id();
        this.node.set_id(id);
        this.node.set_complete(Box::new(move |outcome| match outcome {
            Outcome::Value | Outcome::ValueWithLen(_) => receiver.set_value(()),
            Outcome::Error(errno) => receiver.set_error(CorioError::Io(errno)),
            Outcome::Done => receiver.set_done(),
        }));
        this.handle.submit(&this.node);
    }
}

impl Sender for ScheduleSender {
    type Value = ();
    type Error = CorioError;
    const SENDS_DONE: bool = true;

    type Operation<R>
        = ScheduleOperation<R>
    where
        R: Receiver<(), CorioError> + Send + 'static;

    fn connect<R>(self, receiver: R) -> Self::Operation<R>
    where
        R: Receiver<(), CorioError> + Send + 'static,
    {
        let kind = match self.kind {
            ScheduleKind::Immediate => OpKind::Nop,
            ScheduleKind::After(duration) => {
                let ts = io_uring::types::Timespec::new()
                    .sec(duration.as_secs())
                    .nsec(duration.subsec_nanos());
                OpKind::Timer(ts)
            }
        };
        ScheduleOperation {
            node: OpNode::new(kind),
            handle: self.handle,
            receiver: Some(receiver),
        }
    }
}
