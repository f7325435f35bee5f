//! Platform-agnostic sender/receiver/operation algebra for corio.
//!
//! This crate has no knowledge of threads, `io_uring`, or channels — it
//! only defines the vocabulary ([`Sender`], [`Receiver`], [`Operation`])
//! and the combinators built purely in terms of that vocabulary
//! ([`then`], [`spawn`], [`wait`], the await-bridge in
//! [`future_bridge`], and cancellation in [`stop_token`]). `corio-pool`,
//! `corio-reactor`, and `corio-channel` each implement `Sender` for
//! their own concrete operations.

mod immediate;
mod receiver;
mod sender;
mod spawn;
mod then;
mod wait;

pub mod future_bridge;
pub mod stop_token;

pub use immediate::Just;
pub use receiver::{Receiver, SinkReceiver};
pub use sender::{Operation, Sender};
pub use spawn::spawn;
pub use then::{then, then_fallible, Then, ThenFallible};
pub use wait::wait;

pub use future_bridge::{IntoFuture, SenderFutureExt};
pub use stop_token::{StopCallback, StopSource, StopToken};
