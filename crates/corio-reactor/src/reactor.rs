//! The reactor thread itself: ring setup, the submit/dispatch loop,
//! and shutdown (spec §4.4 "The reactor loop"), grounded on
//! `ksvc_gvthread::reactor`'s dedicated-thread shape and
//! `ksvc_module::basic_iouring::BasicIoUring`'s ring usage.

use std::collections::HashMap;
use std::os::unix::io::RawFd;
use std::ptr::NonNull;
use std::thread::JoinHandle;

use corio_core::stop_token::{StopCallback, StopSource, StopToken};
use corio_error::{CorioError, CorioResult};
use corio_mpsc::MpscQueue;

use crate::config::ReactorConfig;
use crate::handle::{ReactorHandle, ReactorShared};
use crate::op::{OpIdGen, OpNode, ReactorOpId};

/// An owned, running reactor. Dropping it requests stop and joins the
/// reactor thread (spec §4.4 "the reactor owns its thread").
pub struct Reactor {
    handle: ReactorHandle,
    stop_source: StopSource,
    thread: Option<JoinHandle<()>>,
}

impl Reactor {
    /// Start a reactor on its own dedicated thread. Returns once the
    /// `io_uring` ring and notifier eventfd have been created on the
    /// calling thread — the thread itself only runs the dispatch loop.
    pub fn start(config: ReactorConfig) -> CorioResult<Self> {
        config.validate()?;

        let notifier_fd = create_eventfd()?;
        let shared = ReactorShared {
            pending: MpscQueue::new(),
            ids: OpIdGen::new(),
            notifier_fd,
        };
        let handle = ReactorHandle {
            shared: std::sync::Arc::new(shared),
        };

        let stop_source = StopSource::new();
        let token = stop_source.token();
        let thread_handle = handle.clone();
        let thread_config = config;

        let thread = std::thread::Builder::new()
            .name("corio-reactor".to_string())
            .spawn(move || run(thread_handle, token, thread_config))
            .map_err(|e| CorioError::from_user(SpawnError(e.to_string())))?;

        Ok(Reactor {
            handle,
            stop_source,
            thread: Some(thread),
        })
    }

    /// A cheaply-cloneable handle to this reactor, usable from any
    /// thread to build `schedule`/`read`/`cancel` senders.
    pub fn handle(&self) -> ReactorHandle {
        self.handle.clone()
    }

    /// Request shutdown and block until the reactor thread has drained
    /// every in-flight operation and exited.
    pub fn stop(&mut self) {
        self.stop_source.request_stop();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for Reactor {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug)]
struct SpawnError(String);

impl std::fmt::Display for SpawnError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to spawn reactor thread: {}", self.0)
    }
}

impl std::error::Error for SpawnError {}

fn create_eventfd() -> CorioResult<RawFd> {
    // SAFETY: plain syscall, no preconditions beyond the flags being
    // valid, which they are.
    let fd = unsafe { libc::eventfd(0, libc::EFD_NONBLOCK | libc::EFD_CLOEXEC) };
    if fd < 0 {
        let errno = unsafe { *libc::__errno_location() };
        return Err(CorioError::Io(errno));
    }
    Ok(fd)
}

/// Arm (or re-arm) a one-shot readiness poll on the notifier fd, tagged
/// with the [`ReactorOpId::NOTIFIER`] sentinel.
fn arm_notifier_poll(ring: &mut io_uring::IoUring, fd: RawFd) {
    let entry = io_uring::opcode::PollAdd::new(io_uring::types::Fd(fd), libc::POLLIN as u32)
        .build()
        .user_data(ReactorOpId::NOTIFIER);
    // SAFETY: `fd` is the reactor's own eventfd, open for the life of
    // the loop; the entry carries no other pointers.
    let _ = unsafe { ring.submission().push(&entry) };
}

/// Drain the eventfd's counter so a subsequent write can re-trigger
/// readiness (spec §4.4 "self ⇒ notifier woke us").
fn drain_notifier(fd: RawFd) {
    let mut buf = [0u8; 8];
    // SAFETY: `buf` is sized for the eventfd counter; EAGAIN (no bytes
    // pending, e.g. a spurious wakeup) is expected and ignored.
    unsafe {
        libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, 8);
    }
}

/// Submit an `AsyncCancel` targeting `target`, tagged with the
/// [`ReactorOpId::IGNORED`] sentinel — the reactor only cares about the
/// *original* operation's completion, not the cancel request's own.
fn push_shutdown_cancel(ring: &mut io_uring::IoUring, target: u64) {
    let entry = io_uring::opcode::AsyncCancel::new(target)
        .build()
        .user_data(ReactorOpId::IGNORED);
    // SAFETY: no pointers beyond the plain u64 target.
    let _ = unsafe { ring.submission().push(&entry) };
}

/// The reactor thread's body (spec §4.4):
///
/// 1. Install a stop-callback that notifies the eventfd, so a
///    concurrent `stop()` wakes a blocked `submit_and_wait`.
/// 2. While running: drain the pending queue into submission entries.
///    While stopping: submit one cancel per still in-flight operation
///    (once each).
/// 3. `submit_and_wait`, then dispatch every completion by `user_data`:
///    `0` ⇒ ignore, the notifier sentinel ⇒ drain + re-arm the poll,
///    anything else ⇒ look the id up in the in-flight table and run
///    its completion.
/// 4. Exit once stopped and both the pending queue and the in-flight
///    table are empty.
fn run(handle: ReactorHandle, token: StopToken, config: ReactorConfig) {
    let notify_handle = handle.clone();
    let _stop_cb = StopCallback::new(&token, move || {
        notify_handle.shared.notify();
    });

    let mut ring = match io_uring::IoUring::builder().build(config.sq_entries) {
        Ok(ring) => ring,
        Err(e) => {
            eprintln!("corio-reactor: failed to create io_uring: {e}");
            return;
        }
    };

    arm_notifier_poll(&mut ring, handle.shared.notifier_fd);

    let mut in_flight: HashMap<u64, NonNull<OpNode>> = HashMap::new();

    loop {
        let stopping = token.is_stop_requested();

        if stopping {
            for (&id, &node_ptr) in in_flight.iter() {
                let node = unsafe { node_ptr.as_ref() };
                if !node.cancel_sent() {
                    push_shutdown_cancel(&mut ring, id);
                    node.mark_cancel_sent();
                }
            }
        } else {
            loop {
                let Some(node_ptr) = handle.shared.pending.front() else {
                    break;
                };
                let node = unsafe { node_ptr.as_ref() };
                let id = node.id();
                let entry = node.prepare(id.raw());
                // SAFETY: the node was popped from the pending queue
                // and its buffers/state stay valid until `complete`
                // runs, which only happens after this push.
                let push_result = unsafe { ring.submission().push(&entry) };
                match push_result {
                    Ok(()) => {
                        handle.shared.pending.pop();
                        in_flight.insert(id.raw(), node_ptr);
                    }
                    Err(_) => break,
                }
            }
        }

        if stopping && in_flight.is_empty() && handle.shared.pending.front().is_none() {
            break;
        }

        if config.debug_logging {
            eprintln!(
                "corio-reactor: submit_and_wait, {} in flight, stopping={}",
                in_flight.len(),
                stopping
            );
        }

        let want = if in_flight.is_empty() { 0 } else { 1 };
        if let Err(e) = ring.submit_and_wait(want) {
            if e.raw_os_error() != Some(libc::EINTR) {
                eprintln!("corio-reactor: submit_and_wait failed: {e}");
            }
            continue;
        }

        let mut completions: Vec<(u64, i32)> = Vec::with_capacity(config.completion_batch);
        {
            let mut cq = ring.completion();
            cq.sync();
            for cqe in &mut cq {
                completions.push((cqe.user_data(), cqe.result()));
                if completions.len() >= config.completion_batch {
                    break;
                }
            }
        }

        for (user_data, res) in completions {
            if user_data == ReactorOpId::IGNORED {
                continue;
            }
            if user_data == ReactorOpId::NOTIFIER {
                drain_notifier(handle.shared.notifier_fd);
                arm_notifier_poll(&mut ring, handle.shared.notifier_fd);
                continue;
            }
            if let Some(node_ptr) = in_flight.remove(&user_data) {
                let node = unsafe { node_ptr.as_ref() };
                node.complete(res);
            }
        }
    }
}
