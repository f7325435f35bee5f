//! The single-threaded `io_uring` reactor (spec §4): timer, read, and
//! cancel senders, all backed by one dedicated thread so the kernel
//! ring is only ever touched from one place.
//!
//! Grounded on `ksvc-gvthread::reactor` (the dedicated-thread shape),
//! `ksvc-module::eventfd_notifier` (the notifier), and
//! `ksvc-module::basic_iouring` (the ring API surface).

mod cancel;
mod config;
mod handle;
mod op;
mod read;
mod reactor;
mod schedule;

pub use cancel::CancelSender;
pub use config::ReactorConfig;
pub use handle::ReactorHandle;
pub use op::ReactorOpId;
pub use read::ReadSender;
pub use reactor::Reactor;
pub use schedule::ScheduleSender;
