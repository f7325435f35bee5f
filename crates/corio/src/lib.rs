//! corio: a sender/receiver async I/O runtime core.
//!
//! Re-exports the public surface of the per-concern crates that make
//! up the workspace — the algebra ([`corio_core`]), the error taxonomy
//! ([`corio_error`]), the thread pool ([`corio_pool`]), the `io_uring`
//! reactor ([`corio_reactor`]), and the typed channel
//! ([`corio_channel`]) — the same flat facade shape as the teacher's
//! `gvthread` crate over `gvthread-core`/`gvthread-runtime`.

pub use corio_error::{CorioError, CorioResult, TryRecvError, TrySendError};

pub use corio_core::{
    spawn, then, then_fallible, wait, IntoFuture, Just, Operation, Receiver, Sender,
    SenderFutureExt, SinkReceiver, StopCallback, StopSource, StopToken, Then, ThenFallible,
};

pub use corio_pool::{
    DepletedSender, Pool, PoolConfig, PoolScheduler, ScheduleOperation as PoolScheduleOperation,
    ScheduleSender as PoolScheduleSender,
};

pub use corio_reactor::{
    CancelSender, Reactor, ReactorConfig, ReactorHandle, ReactorOpId, ReadSender,
    ScheduleSender as ReactorScheduleSender,
};

pub use corio_channel::{make_channel, ChannelConfig, ReadHandle, WriteHandle};
pub use corio_channel::{ReadSender as ChannelReadSender, WriteSender as ChannelWriteSender};
