//! The cross-thread handle to a running reactor: the pending
//! submission queue, the op-id generator, and the notifier eventfd
//! (spec §4.4 "Submission/start": "safe from any thread"), grounded on
//! `ksvc_module::eventfd_notifier::EventFdNotifier`.

use std::os::unix::io::RawFd;
use std::ptr::NonNull;
use std::sync::Arc;

use corio_mpsc::MpscQueue;

use crate::op::{OpIdGen, OpNode, ReactorOpId};

pub(crate) struct ReactorShared {
    pub(crate) pending: MpscQueue<OpNode>,
    pub(crate) ids: OpIdGen,
    pub(crate) notifier_fd: RawFd,
}

impl ReactorShared {
    pub(crate) fn notify(&self) {
        let val: u64 = 1;
        // SAFETY: `notifier_fd` is a valid, owned eventfd for the
        // lifetime of the reactor; EAGAIN (counter would overflow)
        // just means a wakeup is already pending, which is fine —
        // same tolerance `EventFdNotifier::notify` applies.
        let ret = unsafe {
            libc::write(
                self.notifier_fd,
                &val as *const u64 as *const libc::c_void,
                std::mem::size_of::<u64>(),
            )
        };
        if ret < 0 {
            let errno = unsafe { *libc::__errno_location() };
            if errno != libc::EAGAIN {
                eprintln!("corio-reactor: notifier write failed (errno {errno})");
            }
        }
    }
}

impl Drop for ReactorShared {
    fn drop(&mut self) {
        if self.notifier_fd >= 0 {
            unsafe {
                libc::close(self.notifier_fd);
            }
        }
    }
}

/// A cheaply-cloneable handle to a running [`crate::Reactor`]. Produces
/// the reactor's senders (`schedule`, `read`, `cancel`) and is the
/// thing operations use to push themselves onto the pending queue.
#[derive(Clone)]
pub struct ReactorHandle {
    pub(crate) shared: Arc<ReactorShared>,
}

impl ReactorHandle {
    pub(crate) fn next_op_id(&self) -> ReactorOpId {
        self.shared.ids.next()
    }

    /// Enqueue `node` (already populated with `kind`/`complete`) onto
    /// the pending queue and wake the reactor thread. Safe to call
    /// from any thread — the queue is lock-free MPSC and the notifier
    /// is an eventfd (spec §4.4 "Submission/start").
    pub(crate) fn submit(&self, node: &OpNode) {
        self.shared.pending.push(NonNull::from(node));
        self.shared.notify();
    }
}
