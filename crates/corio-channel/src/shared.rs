//! The channel's shared state: buffer, pending-reader/writer FIFO
//! lists, ref counts, and the pair of notification event-fds (spec
//! §4.5 "Notification plumbing"), grounded on `gvthread_core::channel`
//! (waiter-list shape, `Arc<ChannelInner>` split) and `channel.hpp` /
//! `io_uring.hpp` (the event-fd pairing itself).

use std::collections::VecDeque;
use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use corio_error::CorioError;
use corio_reactor::ReactorHandle;

type ReaderDone<T> = Box<dyn FnOnce(Result<T, CorioError>) + Send>;
type WriterDone = Box<dyn FnOnce(Result<(), CorioError>) + Send>;

pub(crate) struct ChannelState<T> {
    pub(crate) buffer: VecDeque<T>,
    pub(crate) pending_readers: VecDeque<ReaderDone<T>>,
    pub(crate) pending_writers: VecDeque<(T, WriterDone)>,
    pub(crate) closed: bool,
}

pub(crate) struct ChannelShared<T> {
    pub(crate) state: Mutex<ChannelState<T>>,
    /// `None` capacity means rendezvous: the buffer is never used and
    /// a write only ever completes by handing its value directly to a
    /// waiting reader.
    pub(crate) capacity: Option<usize>,
    pub(crate) read_handles: AtomicUsize,
    pub(crate) write_handles: AtomicUsize,
    /// Written to whenever a pending writer is unblocked (space freed
    /// or a rendezvous partner arrived) — the read-side's progress fd.
    read_progress_fd: RawFd,
    /// Written to whenever a pending reader is unblocked (data became
    /// available) — the write-side's progress fd.
    write_progress_fd: RawFd,
    _reactor: ReactorHandle,
}

fn new_eventfd() -> RawFd {
    // SAFETY: plain syscall; EFD_NONBLOCK means a saturated counter
    // (extremely unlikely — it takes 2^64 unconsumed notifications)
    // never blocks the caller.
    let fd = unsafe { libc::eventfd(0, libc::EFD_NONBLOCK | libc::EFD_CLOEXEC) };
    assert!(fd >= 0, "corio-channel: eventfd creation failed");
    fd
}

fn bump(fd: RawFd) {
    let val: u64 = 1;
    // SAFETY: `fd` is a valid eventfd owned by this channel for as
    // long as `ChannelShared` is alive.
    let ret = unsafe {
        libc::write(
            fd,
            &val as *const u64 as *const libc::c_void,
            std::mem::size_of::<u64>(),
        )
    };
    if ret < 0 {
        let errno = unsafe { *libc::__errno_location() };
        if errno != libc::EAGAIN {
            eprintln!("corio-channel: progress-fd write failed (errno {errno})");
        }
    }
}

impl<T> ChannelShared<T> {
    pub(crate) fn new(capacity: Option<usize>, reactor: ReactorHandle) -> Self {
        ChannelShared {
            state: Mutex::new(ChannelState {
                buffer: VecDeque::new(),
                pending_readers: VecDeque::new(),
                pending_writers: VecDeque::new(),
                closed: false,
            }),
            capacity,
            read_handles: AtomicUsize::new(1),
            write_handles: AtomicUsize::new(1),
            read_progress_fd: new_eventfd(),
            write_progress_fd: new_eventfd(),
            _reactor: reactor,
        }
    }

    /// Raw fd a reactor `read` could be armed against to observe
    /// "a writer made progress" (data became available) externally —
    /// the write-progress side of spec §4.5's event-fd pair.
    pub fn write_progress_fd(&self) -> RawFd {
        self.write_progress_fd
    }

    /// Raw fd mirroring "a reader made progress" (space freed).
    pub fn read_progress_fd(&self) -> RawFd {
        self.read_progress_fd
    }

    pub(crate) fn notify_writer_progress(&self) {
        bump(self.write_progress_fd);
    }

    pub(crate) fn notify_reader_progress(&self) {
        bump(self.read_progress_fd);
    }

    /// Close the channel: mark it closed, drain every pending reader
    /// and writer with `ChannelClosed`, and bump both progress fds so
    /// anything externally polling on them observes the transition
    /// (spec §4.5 "Close": "both event fds are written to").
    ///
    /// Idempotent — draining an already-closed channel is a no-op.
    pub(crate) fn close(&self) {
        let (readers, writers) = {
            let mut state = self.state.lock().unwrap();
            if state.closed {
                return;
            }
            state.closed = true;
            (
                std::mem::take(&mut state.pending_readers),
                std::mem::take(&mut state.pending_writers),
            )
        };
        for reader in readers {
            reader(Err(CorioError::ChannelClosed));
        }
        for (_, writer) in writers {
            writer(Err(CorioError::ChannelClosed));
        }
        self.notify_reader_progress();
        self.notify_writer_progress();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

impl<T> Drop for ChannelShared<T> {
    fn drop(&mut self) {
        // SAFETY: sole owner at this point, both fds created in `new`.
        unsafe {
            libc::close(self.read_progress_fd);
            libc::close(self.write_progress_fd);
        }
    }
}

pub(crate) fn inc(count: &AtomicUsize) {
    count.fetch_add(1, Ordering::AcqRel);
}

/// Decrement, returning `true` if this was the transition to zero.
pub(crate) fn dec_to_zero(count: &AtomicUsize) -> bool {
    count.fetch_sub(1, Ordering::AcqRel) == 1
}
