//! The sender and operation-state contracts (spec §4.1).

use std::pin::Pin;

/// A lazy, composable description of an asynchronous operation.
///
/// A `Sender` does nothing by itself — it only becomes active once
/// [`connect`](Sender::connect)ed to a [`Receiver`](crate::Receiver) and
/// the resulting [`Operation`] is [`start`](Operation::start)ed. This
/// mirrors the "senders are descriptions, operations are the actual
/// work" split from the original sender/receiver algebra; unlike the
/// C++ original, Rust's concrete associated types mean there is no
/// `value_types`/`error_types` type-list machinery to carry over — each
/// `Sender` already names one concrete `Value` and `Error` type.
pub trait Sender {
    /// The payload delivered to `Receiver::set_value`. Use `()` for
    /// senders that complete without a value.
    type Value;

    /// The payload delivered to `Receiver::set_error`.
    type Error;

    /// Whether this sender can ever complete via `set_done`. Purely
    /// informational — nothing in this crate enforces it — but it lets
    /// combinators and documentation be honest about cancellation.
    const SENDS_DONE: bool;

    /// The operation state produced by connecting this sender to a
    /// receiver of type `R`. Parameterized over `R` (a GAT) because the
    /// concrete state generally embeds the receiver inline to avoid an
    /// extra allocation.
    ///
    /// `R` carries `Send + 'static` here, not just `Receiver<...>`:
    /// every non-trivial operation in this workspace (pool, reactor,
    /// channel) registers itself with a queue whose completion is
    /// eventually invoked from another thread, which means the
    /// receiver it was connected with has to survive and cross that
    /// thread boundary. Declaring the bound once, here, is what lets
    /// every `impl Sender` actually prove `Self::Operation<R>:
    /// Operation` for the `R`s its concrete `Operation` impl requires
    /// — a looser bound here would make that unprovable in generic
    /// code (the trait would promise an operation for receivers the
    /// impl can't actually build one for).
    type Operation<R>: Operation
    where
        R: crate::Receiver<Self::Value, Self::Error> + Send + 'static;

    /// Combine this sender with a receiver, producing an inert
    /// operation state. Does not start any work — see [`Operation::start`].
    fn connect<R>(self, receiver: R) -> Self::Operation<R>
    where
        R: crate::Receiver<Self::Value, Self::Error> + Send + 'static;
}

/// The result of [`Sender::connect`]: a sealed, non-movable operation
/// that owns everything needed to run to completion.
///
/// Operations are pinned because most non-trivial implementations are
/// self-referential or register their own address with a queue (the
/// thread pool's intrusive FIFO, the reactor's in-flight list) before
/// `start` returns, so the operation must never move afterward.
pub trait Operation {
    /// Begin the operation. Exactly one receiver method fires, now or
    /// later, possibly from another thread.
    fn start(self: Pin<&mut Self>);
}
