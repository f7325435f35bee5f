//! Fixed-size worker thread pool whose schedule-point is a sender
//! (spec §4.3), grounded on `gvthread_runtime::worker::WorkerPool` for
//! the thread-lifecycle shape and on `corio`'s `thread_pool.hpp` for
//! the central-FIFO-plus-depleted-barrier design itself.
//!
//! Unlike the reactor's submission queue (`corio-mpsc`, lock-free
//! MPSC), the pool's work queue and depleted queue are plain
//! intrusively-linked singly-linked lists guarded by one
//! [`std::sync::Mutex`] — spec §4.3 is explicit that this is a central
//! FIFO, not a lock-free structure, and §5 requires "no lock held
//! across user code": every completion call in this file happens
//! after the guard protecting the list it came from has been dropped.

mod config;

pub use config::PoolConfig;

use std::pin::Pin;
use std::ptr::NonNull;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use corio_core::{Operation, Receiver, Sender};
use corio_error::CorioError;

enum Outcome {
    Value,
    Done,
}

/// Intrusive node for both the work queue and the depleted queue.
/// Embedded directly in each sender's operation state (no heap
/// allocation for scheduling itself — only `spawn`, used by callers
/// who want fire-and-forget, allocates).
struct PoolOpNode {
    next: Option<NonNull<PoolOpNode>>,
    complete: Option<Box<dyn FnOnce(Outcome) + Send>>,
}

impl PoolOpNode {
    fn new() -> Self {
        PoolOpNode {
            next: None,
            complete: None,
        }
    }
}

fn push_back(
    head: &mut Option<NonNull<PoolOpNode>>,
    tail: &mut Option<NonNull<PoolOpNode>>,
    mut node: NonNull<PoolOpNode>,
) {
    // SAFETY: `node` outlives the list (operation states are sealed —
    // never moved or dropped before their completion fires, and every
    // completion path pops before calling back into user code).
    unsafe {
        node.as_mut().next = None;
    }
    match tail.take() {
        Some(mut old_tail) => unsafe {
            old_tail.as_mut().next = Some(node);
        },
        None => {
            *head = Some(node);
        }
    }
    *tail = Some(node);
}

fn pop_front(
    head: &mut Option<NonNull<PoolOpNode>>,
    tail: &mut Option<NonNull<PoolOpNode>>,
) -> Option<NonNull<PoolOpNode>> {
    let node = (*head)?;
    // SAFETY: `node` is still linked; reading `next` before unlinking
    // is the standard singly-linked-list pop.
    let next = unsafe { node.as_ref().next };
    *head = next;
    if next.is_none() {
        *tail = None;
    }
    Some(node)
}

fn take_list(
    head: &mut Option<NonNull<PoolOpNode>>,
    tail: &mut Option<NonNull<PoolOpNode>>,
) -> Vec<NonNull<PoolOpNode>> {
    let mut out = Vec::new();
    *tail = None;
    let mut cur = head.take();
    while let Some(node) = cur {
        // SAFETY: nodes in this list are never concurrently mutated
        // except under the same mutex we're currently holding.
        cur = unsafe { node.as_ref().next };
        out.push(node);
    }
    out
}

struct PoolState {
    work_head: Option<NonNull<PoolOpNode>>,
    work_tail: Option<NonNull<PoolOpNode>>,
    depleted_head: Option<NonNull<PoolOpNode>>,
    depleted_tail: Option<NonNull<PoolOpNode>>,
    busy_workers: usize,
    stopping: bool,
}

// SAFETY: every `NonNull<PoolOpNode>` stored here points at an
// operation state whose owner (the sender's caller, or `spawn`'s heap
// box) guarantees `Send` on the underlying `R`; the pool only ever
// touches these pointers while holding `mutex`.
unsafe impl Send for PoolState {}

struct PoolShared {
    state: Mutex<PoolState>,
    cond: Condvar,
    debug_logging: bool,
}

/// A fixed-size worker thread pool (spec §4.3).
///
/// Dropping the pool calls [`Pool::stop`], same as `thread_pool.hpp`'s
/// destructor.
pub struct Pool {
    shared: Arc<PoolShared>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl Pool {
    /// Spawn `config.num_workers` worker threads and return the pool.
    pub fn new(config: PoolConfig) -> corio_error::CorioResult<Self> {
        config.validate()?;
        let shared = Arc::new(PoolShared {
            state: Mutex::new(PoolState {
                work_head: None,
                work_tail: None,
                depleted_head: None,
                depleted_tail: None,
                busy_workers: 0,
                stopping: false,
            }),
            cond: Condvar::new(),
            debug_logging: config.debug_logging,
        });

        let mut threads = Vec::with_capacity(config.num_workers);
        for i in 0..config.num_workers {
            let shared = shared.clone();
            let handle = std::thread::Builder::new()
                .name(format!("corio-pool-{i}"))
                .spawn(move || worker_loop(shared))
                .expect("failed to spawn corio pool worker");
            threads.push(handle);
        }

        Ok(Pool {
            shared,
            threads: Mutex::new(threads),
        })
    }

    /// A lightweight, cheaply-cloneable handle that can produce
    /// schedule senders (spec §3 "Scheduler").
    pub fn scheduler(&self) -> PoolScheduler {
        PoolScheduler {
            shared: self.shared.clone(),
        }
    }

    /// A sender that completes once every operation scheduled so far
    /// has finished and no worker is mid-completion (spec §4.3
    /// "Depleted barrier").
    pub fn depleted(&self) -> DepletedSender {
        DepletedSender {
            shared: self.shared.clone(),
        }
    }

    /// Stop the pool: every queued and depleted operation observes
    /// `set_done`, then every worker thread is joined. Idempotent.
    pub fn stop(&self) {
        let mut guard = self.shared.state.lock().unwrap();
        if !guard.stopping {
            guard.stopping = true;
            let work = take_list(&mut guard.work_head, &mut guard.work_tail);
            let depleted = take_list(&mut guard.depleted_head, &mut guard.depleted_tail);
            drop(guard);
            self.shared.cond.notify_all();
            for node in work.into_iter().chain(depleted) {
                // SAFETY: popped from the list under the lock above;
                // nothing else references it now.
                let complete = unsafe { (*node.as_ptr()).complete.take() }
                    .expect("queued pool operation missing its completion");
                complete(Outcome::Done);
            }
        } else {
            drop(guard);
        }

        for handle in self.threads.lock().unwrap().drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(shared: Arc<PoolShared>) {
    loop {
        let mut guard = shared.state.lock().unwrap();
        while guard.work_head.is_none() && !guard.stopping {
            guard = shared.cond.wait(guard).unwrap();
        }
        if guard.stopping {
            return;
        }
        let node = pop_front(&mut guard.work_head, &mut guard.work_tail)
            .expect("wait predicate guarantees a queued item");
        guard.busy_workers += 1;
        drop(guard);

        // SAFETY: just popped; sole owner until its completion runs.
        let complete = unsafe { (*node.as_ptr()).complete.take() }
            .expect("queued pool operation missing its completion");
        complete(Outcome::Value);

        let mut guard = shared.state.lock().unwrap();
        guard.busy_workers -= 1;
        if guard.work_head.is_none() && guard.busy_workers == 0 {
            let drained = take_list(&mut guard.depleted_head, &mut guard.depleted_tail);
            drop(guard);
            if shared.debug_logging && !drained.is_empty() {
                eprintln!("corio-pool: queue depleted, firing {} waiter(s)", drained.len());
            }
            for node in drained {
                // SAFETY: see above.
                let complete = unsafe { (*node.as_ptr()).complete.take() }
                    .expect("queued depleted operation missing its completion");
                complete(Outcome::Value);
            }
        }
    }
}

/// A lightweight value whose only capability is producing a schedule
/// sender (spec §3 "Scheduler"). Cloning is cheap (one `Arc` bump).
#[derive(Clone)]
pub struct PoolScheduler {
    shared: Arc<PoolShared>,
}

impl PoolScheduler {
    /// A sender that, once started, enqueues onto the pool's central
    /// FIFO and completes (with a value) once a worker picks it up.
    pub fn schedule(&self) -> ScheduleSender {
        ScheduleSender {
            shared: self.shared.clone(),
        }
    }
}

/// Sender returned by [`PoolScheduler::schedule`].
pub struct ScheduleSender {
    shared: Arc<PoolShared>,
}

/// Operation state produced by connecting a [`ScheduleSender`].
pub struct ScheduleOperation<R> {
    node: PoolOpNode,
    shared: Arc<PoolShared>,
    receiver: Option<R>,
}

impl<R> Operation for ScheduleOperation<R>
where
    R: Receiver<(), CorioError> + Send + 'static,
{
    fn start(self: Pin<&mut Self>) {
        // SAFETY: neither field is structurally pinned; the node's
        // address is what must stay stable, and it does — we only
        // ever take `&mut this.node` to read it, never move it out.
        let this = unsafe { self.get_unchecked_mut() };
        let receiver = this
            .receiver
            .take()
            .expect("schedule operation started twice");
        this.node.complete = Some(Box::new(move |outcome| match outcome {
            Outcome::Value => receiver.set_value(()),
            Outcome::Done => receiver.set_done(),
        }));

        let node_ptr = NonNull::from(&mut this.node);
        let mut guard = this.shared.state.lock().unwrap();
        if guard.stopping {
            drop(guard);
            // SAFETY: never linked into any list.
            let complete = unsafe { (*node_ptr.as_ptr()).complete.take() }.unwrap();
            complete(Outcome::Done);
            return;
        }
        push_back(&mut guard.work_head, &mut guard.work_tail, node_ptr);
        drop(guard);
        this.shared.cond.notify_one();
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
        ScheduleOperation {
            node: PoolOpNode::new(),
            shared: self.shared,
            receiver: Some(receiver),
        }
    }
}

/// Sender returned by [`Pool::depleted`].
pub struct DepletedSender {
    shared: Arc<PoolShared>,
}

/// Operation state produced by connecting a [`DepletedSender`].
pub struct DepletedOperation<R> {
    node: PoolOpNode,
    shared: Arc<PoolShared>,
    receiver: Option<R>,
}

impl<R> Operation for DepletedOperation<R>
where
    R: Receiver<(), CorioError> + Send + 'static,
{
    fn start(self: Pin<&mut Self>) {
        let this = unsafe { self.get_unchecked_mut() };
        let receiver = this
            .receiver
            .take()
            .expect("depleted operation started twice");

        let mut guard = this.shared.state.lock().unwrap();
        if guard.stopping {
            drop(guard);
            receiver.set_done();
            return;
        }
        if guard.work_head.is_none() && guard.busy_workers == 0 {
            drop(guard);
            receiver.set_value(());
            return;
        }
        this.node.complete = Some(Box::new(move |outcome| match outcome {
            Outcome::Value => receiver.set_value(()),
            Outcome::Done => receiver.set_done(),
        }));
        let node_ptr = NonNull::from(&mut this.node);
        push_back(&mut guard.depleted_head, &mut guard.depleted_tail, node_ptr);
    }
}

impl Sender for DepletedSender {
    type Value = ();
    type Error = CorioError;
    const SENDS_DONE: bool = true;

    type Operation<R>
        = DepletedOperation<R>
    where
        R: Receiver<(), CorioError> + Send + 'static;

    fn connect<R>(self, receiver: R) -> Self::Operation<R>
    where
        R: Receiver<(), CorioError> + Send + 'static,
    {
        DepletedOperation {
            node: PoolOpNode::new(),
            shared: self.shared,
            receiver: Some(receiver),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corio_core::wait;
    use std::sync::Mutex as StdMutex;

    #[test]
    fn pool_executes_all_scheduled_tasks() {
        let pool = Pool::new(PoolConfig::new().num_workers(4)).unwrap();
        let scheduler = pool.scheduler();
        let results = Arc::new(StdMutex::new(Vec::new()));

        for i in 0..10 {
            let results = results.clone();
            corio_core::spawn(
                scheduler.schedule(),
                FnReceiver(move |_: ()| {
                    results.lock().unwrap().push(i);
                }),
            );
        }

        assert!(wait(pool.depleted()).unwrap());
        let mut seen = results.lock().unwrap().clone();
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn depleted_completes_immediately_when_already_idle() {
        let pool = Pool::new(PoolConfig::new().num_workers(2)).unwrap();
        assert!(wait(pool.depleted()).unwrap());
    }

    #[test]
    fn stop_cancels_pending_work() {
        let pool = Pool::new(PoolConfig::new().num_workers(1)).unwrap();
        let scheduler = pool.scheduler();
        let ran = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let ran2 = ran.clone();
        // Block the single worker so the second task stays queued.
        let gate = Arc::new(std::sync::Barrier::new(2));
        let gate2 = gate.clone();
        corio_core::spawn(
            scheduler.schedule(),
            FnReceiver(move |_: ()| {
                gate2.wait();
            }),
        );
        let sender = scheduler.schedule();
        let mut op = sender.connect(FnReceiver2 {
            on_value: move || ran2.store(true, std::sync::atomic::Ordering::SeqCst),
            on_done: {
                let ran3 = ran.clone();
                move || {
                    let _ = &ran3;
                }
            },
        });
        let pinned = unsafe { Pin::new_unchecked(&mut op) };
        pinned.start();
        gate.wait();
        pool.stop();
    }

    struct FnReceiver<F>(F);
    impl<F: FnOnce(())> Receiver<(), CorioError> for FnReceiver<F> {
        fn set_value(self, value: ()) {
            (self.0)(value);
        }
        fn set_error(self, _error: CorioError) {}
        fn set_done(self) {}
    }

    struct FnReceiver2<V, D> {
        on_value: V,
        on_done: D,
    }
    impl<V: FnOnce(), D: FnOnce()> Receiver<(), CorioError> for FnReceiver2<V, D> {
        fn set_value(self, _value: ()) {
            (self.on_value)();
        }
        fn set_error(self, _error: CorioError) {}
        fn set_done(self) {
            (self.on_done)();
        }
    }
}
