//! Error taxonomy for the corio runtime.
//!
//! One flat enum, matched by `Display`, with `From` conversions where one
//! error naturally wraps another. No `thiserror`, no `anyhow` — every
//! error in the runtime is a terminal completion value, not a
//! recoverable control-flow detail, so a small hand-written enum is
//! enough.

use std::fmt;

/// Result alias used throughout the workspace.
pub type CorioResult<T> = Result<T, CorioError>;

/// Errors delivered through a receiver's `set_error`, or returned by
/// synchronous entry points such as `wait` and the `try_*` channel API.
#[derive(Debug)]
#[non_exhaustive]
pub enum CorioError {
    /// The await-bridge observed `set_done` and is surfacing it as an
    /// error to synchronous callers that have no other way to see
    /// cancellation (`wait` reports it instead via `Ok(false)`; this
    /// variant exists for call sites that must return `CorioResult`).
    Cancelled,

    /// Every read-handle or write-handle on the channel's peer side has
    /// been dropped.
    ChannelClosed,

    /// `try_send` found the buffer at capacity; carries the value back
    /// to the caller so it isn't lost.
    ChannelFull,

    /// `try_recv` found the buffer empty and the channel still open.
    ChannelEmpty,

    /// A reactor I/O operation completed with a negative result; the
    /// field is the positive errno (`-cqe.result()`).
    Io(i32),

    /// A user-supplied transform (`then_fallible`) returned an error.
    User(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for CorioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorioError::Cancelled => write!(f, "operation cancelled"),
            CorioError::ChannelClosed => write!(f, "channel closed"),
            CorioError::ChannelFull => write!(f, "channel full"),
            CorioError::ChannelEmpty => write!(f, "channel empty"),
            CorioError::Io(errno) => write!(f, "i/o error (errno {errno})"),
            CorioError::User(e) => write!(f, "transform error: {e}"),
        }
    }
}

impl std::error::Error for CorioError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CorioError::User(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl CorioError {
    /// Build an [`CorioError::Io`] from a raw `io_uring` completion result.
    ///
    /// `res` is expected to be negative, per kernel convention; the
    /// stored errno is always positive.
    pub fn from_cqe_result(res: i32) -> Self {
        CorioError::Io(res.unsigned_abs() as i32)
    }

    /// Wrap an arbitrary user error as the `then_fallible` error channel.
    pub fn from_user<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        CorioError::User(Box::new(err))
    }

    /// True for variants that represent cancellation rather than failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CorioError::Cancelled)
    }
}

/// Error returned by a bounded channel's `try_send` when the buffer is
/// full. Carries the rejected value back, matching `std::sync::mpsc`'s
/// convention for `TrySendError`.
#[derive(Debug)]
pub struct TrySendError<T>(pub T);

impl<T> fmt::Display for TrySendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel full")
    }
}

impl<T: fmt::Debug> std::error::Error for TrySendError<T> {}

/// Error returned by a bounded channel's `try_recv` when the buffer is
/// empty and the channel is still open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TryRecvError;

impl fmt::Display for TryRecvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel empty")
    }
}

impl std::error::Error for TryRecvError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(format!("{}", CorioError::Cancelled), "operation cancelled");
        assert_eq!(format!("{}", CorioError::ChannelClosed), "channel closed");
        assert_eq!(format!("{}", CorioError::Io(32)), "i/o error (errno 32)");
    }

    #[test]
    fn from_cqe_result_takes_absolute_value() {
        match CorioError::from_cqe_result(-9) {
            CorioError::Io(errno) => assert_eq!(errno, 9),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn is_cancelled_only_for_cancelled_variant() {
        assert!(CorioError::Cancelled.is_cancelled());
        assert!(!CorioError::ChannelClosed.is_cancelled());
    }

    #[test]
    fn user_error_source_chain() {
        #[derive(Debug)]
        struct Boom;
        impl fmt::Display for Boom {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "boom")
            }
        }
        impl std::error::Error for Boom {}

        let err = CorioError::from_user(Boom);
        assert_eq!(format!("{err}"), "transform error: boom");
        assert!(std::error::Error::source(&err).is_some());
    }
}
