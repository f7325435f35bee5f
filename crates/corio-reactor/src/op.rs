//! The opcode-agnostic operation node shared by every reactor sender
//! (spec §4.4 "Operation taxonomy"), grounded on `ksvc-core::entry`'s
//! `CorrId`/`SubmitEntry` split and `io_backend::IoCompletion`.
//!
//! The C++ original gives each operation type (`schedule`, `read`,
//! `cancel`) its own class with virtual `prepare`/`set_result`
//! methods; spec §9 says virtual dispatch is fine here "where the
//! cost is dominated by a syscall". Rust's answer to "a handful of
//! concrete shapes behind one dispatch point, each paying for a
//! syscall anyway" is a closed `enum` for the prepare-time payload
//! (`OpKind`) plus a boxed `FnOnce` for the completion path, rather
//! than a hand-rolled vtable: the reactor's dispatch loop in
//! `reactor.rs` only ever sees a homogeneous [`OpNode`], never the
//! concrete `ScheduleOperation<R>` / `ReadOperation<R>` / `CancelOperation<R>`
//! wrapping it, so there's nothing for a vtable to buy over the enum.

use std::cell::Cell;
use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicU64, Ordering};

use corio_mpsc::{Link, QueueNode};

/// Correlation id for an in-flight reactor operation — the Rust
/// analogue of `corio`'s "cancel by stable address" (SPEC_FULL §2):
/// assigned once, at `start()`, by [`OpIdGen`]; stable until the
/// operation completes, since operation states are sealed and never
/// moved after `start()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ReactorOpId(pub(crate) u64);

impl ReactorOpId {
    /// `user_data` tag the reactor's own internal notifier poll is
    /// armed with (spec §4.4 dispatch step "`self` ⇒ notifier woke us").
    pub(crate) const NOTIFIER: u64 = u64::MAX;
    /// `user_data` tag for completions nobody observes (spec §4.4
    /// dispatch step "`0` ⇒ ignore", e.g. a cancel's own completion).
    pub(crate) const IGNORED: u64 = 0;

    pub(crate) fn from_raw(raw: u64) -> Self {
        ReactorOpId(raw)
    }

    pub(crate) fn raw(self) -> u64 {
        self.0
    }
}

/// Monotonic generator for [`ReactorOpId`]s, skipping the two reserved
/// sentinel values.
pub(crate) struct OpIdGen(AtomicU64);

impl OpIdGen {
    pub(crate) fn new() -> Self {
        OpIdGen(AtomicU64::new(1))
    }

    pub(crate) fn next(&self) -> ReactorOpId {
        let id = self.0.fetch_add(1, Ordering::Relaxed);
        if id == ReactorOpId::IGNORED || id == ReactorOpId::NOTIFIER {
            return ReactorOpId(self.0.fetch_add(1, Ordering::Relaxed));
        }
        ReactorOpId(id)
    }
}

/// What `prepare` writes into a submission-queue entry, matching the
/// three concrete operation types named in spec §4.4.
pub(crate) enum OpKind {
    /// Zero-delay schedule: a `nop`.
    Nop,
    /// Timer-based schedule: a `timeout` with an owned `Timespec` (the
    /// node must outlive submission, which it does — it's pinned).
    Timer(io_uring::types::Timespec),
    /// A `read(fd, buf, len)`. `buf` must stay valid and unaliased
    /// until the completion fires; enforced by the caller of
    /// [`crate::read::ReactorHandle::read`], not by this type.
    Read { fd: RawFd, buf: *mut u8, len: u32 },
    /// A `cancel(target)`, addressing another operation by id.
    Cancel { target: ReactorOpId },
}

/// The outcome a completion translates into, independent of which
/// `OpKind` produced it.
pub(crate) enum Outcome {
    /// Plain value completion (schedule, cancel).
    Value,
    /// Value completion carrying a byte count (read).
    ValueWithLen(usize),
    /// Failure completion carrying a positive errno.
    Error(i32),
    /// Cancellation completion.
    Done,
}

/// The homogeneous node every reactor sender's operation state embeds
/// and the reactor's pending queue and in-flight table actually see.
/// `#[repr(C)]` with [`Link`] first, per `corio_mpsc::QueueNode`'s
/// contract.
#[repr(C)]
pub(crate) struct OpNode {
    link: Link,
    id: Cell<ReactorOpId>,
    kind: std::cell::UnsafeCell<OpKind>,
    complete: std::cell::UnsafeCell<Option<Box<dyn FnOnce(Outcome) + Send>>>,
    /// Set once the reactor has submitted a cancel targeting this
    /// node during shutdown, so the drain loop in `reactor.rs` doesn't
    /// resubmit a cancel every iteration while waiting for the
    /// original completion to arrive.
    cancel_sent: Cell<bool>,
}

// SAFETY: `kind` and `complete` are written once by the thread that
// calls `start()` (before the node is pushed onto the pending MPSC
// queue) and afterward are only ever read/taken by the reactor
// thread, which observes the write through the queue's
// release/acquire pair — the same single-writer-then-single-reader
// discipline `corio-pool`'s `PoolOpNode` uses under a mutex instead.
unsafe impl Send for OpNode {}

unsafe impl QueueNode for OpNode {
    fn link(&self) -> &Link {
        &self.link
    }
}

impl OpNode {
    pub(crate) fn new(kind: OpKind) -> Self {
        OpNode {
            link: Link::new(),
            id: Cell::new(ReactorOpId(ReactorOpId::IGNORED)),
            kind: std::cell::UnsafeCell::new(kind),
            complete: std::cell::UnsafeCell::new(None),
            cancel_sent: Cell::new(false),
        }
    }

    /// Whether the reactor has already submitted a shutdown cancel for
    /// this node.
    pub(crate) fn cancel_sent(&self) -> bool {
        self.cancel_sent.get()
    }

    pub(crate) fn mark_cancel_sent(&self) {
        self.cancel_sent.set(true);
    }

    pub(crate) fn id(&self) -> ReactorOpId {
        self.id.get()
    }

    pub(crate) fn set_id(&self, id: ReactorOpId) {
        self.id.set(id);
    }

    /// Install the completion closure. Must be called exactly once,
    /// before the node is pushed onto the pending queue.
    pub(crate) fn set_complete(&self, f: Box<dyn FnOnce(Outcome) + Send>) {
        // SAFETY: see the `unsafe impl Send` note above — this runs on
        // the starting thread, strictly before the node becomes
        // visible to the reactor thread via `push`.
        unsafe {
            *self.complete.get() = Some(f);
        }
    }

    /// Build the `io_uring` submission entry for this node. Called
    /// only from the reactor thread.
    pub(crate) fn prepare(&self, user_data: u64) -> io_uring::squeue::Entry {
        use io_uring::{opcode, types};

        // SAFETY: reactor-thread-only access, after the node has been
        // popped from the pending queue (and thus is no longer being
        // written by its originating thread).
        let kind = unsafe { &*self.kind.get() };
        let entry = match kind {
            OpKind::Nop => opcode::Nop::new().build(),
            OpKind::Timer(ts) => opcode::Timeout::new(ts as *const _).count(0).build(),
            OpKind::Read { fd, buf, len } => {
                opcode::Read::new(types::Fd(*fd), *buf, *len).build()
            }
            OpKind::Cancel { target } => opcode::AsyncCancel::new(target.raw()).build(),
        };
        entry.user_data(user_data)
    }

    /// Translate a completion queue entry's result into an [`Outcome`]
    /// and run the stored completion closure. Called only from the
    /// reactor thread, and only once per node.
    pub(crate) fn complete(&self, res: i32) {
        // SAFETY: see `prepare`.
        let kind = unsafe { &*self.kind.get() };
        let outcome = match kind {
            OpKind::Nop | OpKind::Cancel { .. } => {
                if res < 0 && -res == libc::ECANCELED {
                    Outcome::Done
                } else if res < 0 {
                    Outcome::Error(-res)
                } else {
                    Outcome::Value
                }
            }
            OpKind::Timer(_) => {
                if res < 0 && -res == libc::ECANCELED {
                    Outcome::Done
                } else {
                    // `timeout` yields `-ETIME` on the ordinary
                    // expiry path and `0` if raced by completion
                    // count; spec §4.4: "success or timed-out both
                    // yield set_value()".
                    Outcome::Value
                }
            }
            OpKind::Read { .. } => {
                if res < 0 && -res == libc::ECANCELED {
                    Outcome::Done
                } else if res < 0 {
                    Outcome::Error(-res)
                } else {
                    Outcome::ValueWithLen(res as usize)
                }
            }
        };
        // SAFETY: `complete` is written exactly once before the node
        // is submitted and taken exactly once here.
        let complete = unsafe { (*self.complete.get()).take() }
            .expect("reactor operation completed twice");
        complete(outcome);
    }
}
