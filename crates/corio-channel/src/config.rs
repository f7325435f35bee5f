//! Channel tunables (spec §4.5, ambient config surface per SPEC_FULL
//! §1.3), grounded on `ReactorConfig`/`PoolConfig`'s builder+validate
//! shape.

use corio_error::{CorioError, CorioResult};

/// Configuration for [`crate::make_channel`].
///
/// `capacity: None` yields a **rendezvous** channel (unbuffered): a
/// writer and a reader must be present at the same time. `capacity:
/// Some(n)` with `n >= 1` yields a buffered channel whose internal
/// queue never exceeds `n` (spec §4.5 "Model").
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelConfig {
    pub capacity: Option<usize>,
}

impl ChannelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rendezvous (unbuffered).
    pub fn rendezvous() -> Self {
        ChannelConfig { capacity: None }
    }

    /// Buffered with room for `n` values.
    pub fn buffered(n: usize) -> Self {
        ChannelConfig { capacity: Some(n) }
    }

    pub fn validate(&self) -> CorioResult<()> {
        if let Some(0) = self.capacity {
            return Err(CorioError::from_user(ConfigError(
                "buffered channel capacity must be >= 1; omit capacity for rendezvous",
            )));
        }
        Ok(())
    }
}

#[derive(Debug)]
struct ConfigError(&'static str);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid channel config: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendezvous_and_default_are_valid() {
        assert!(ChannelConfig::default().validate().is_ok());
        assert!(ChannelConfig::rendezvous().validate().is_ok());
    }

    #[test]
    fn zero_capacity_is_invalid() {
        assert!(ChannelConfig::buffered(0).validate().is_err());
    }

    #[test]
    fn positive_capacity_is_valid() {
        assert!(ChannelConfig::buffered(4).validate().is_ok());
    }
}
