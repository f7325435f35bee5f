//! A typed, bounded-or-rendezvous channel whose read and write are
//! senders, coordinated through the reactor (spec §4.5).
//!
//! Grounded on `gvthread_core::channel`'s handle/waiter-list shape and
//! `channel.hpp` / `io_uring.hpp`'s event-fd notification pairing.

mod config;
mod handle;
mod read;
mod shared;
mod write;

pub use config::ChannelConfig;
pub use handle::{make_channel, ReadHandle, WriteHandle};
pub use read::ReadSender;
pub use write::WriteSender;
