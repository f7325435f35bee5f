//! Tunables for [`crate::Reactor`] (spec §4.4, §6), ambient config
//! surface per SPEC_FULL §1.3, grounded on `ReactorConfig` in
//! `ksvc-gvthread::reactor` and `BasicIoUringConfig` in
//! `ksvc-module::basic_iouring`.

use corio_error::{CorioError, CorioResult};

/// Configuration for a [`crate::Reactor`].
#[derive(Debug, Clone)]
pub struct ReactorConfig {
    /// `io_uring` submission-queue depth. Spec §6 default: 128.
    pub sq_entries: u32,

    /// Size of the completion batch drained per loop iteration.
    pub completion_batch: usize,

    /// `eprintln!`-gated diagnostics on the run loop (SPEC_FULL §1.2).
    pub debug_logging: bool,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        ReactorConfig {
            sq_entries: 128,
            completion_batch: 256,
            debug_logging: false,
        }
    }
}

impl ReactorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sq_entries(mut self, n: u32) -> Self {
        self.sq_entries = n;
        self
    }

    pub fn completion_batch(mut self, n: usize) -> Self {
        self.completion_batch = n;
        self
    }

    pub fn debug_logging(mut self, enable: bool) -> Self {
        self.debug_logging = enable;
        self
    }

    pub fn validate(&self) -> CorioResult<()> {
        if self.sq_entries == 0 || !self.sq_entries.is_power_of_two() {
            return Err(CorioError::from_user(ConfigError(
                "sq_entries must be a non-zero power of two",
            )));
        }
        if self.completion_batch == 0 {
            return Err(CorioError::from_user(ConfigError(
                "completion_batch must be > 0",
            )));
        }
        Ok(())
    }
}

#[derive(Debug)]
struct ConfigError(&'static str);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid reactor config: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ReactorConfig::default().validate().is_ok());
    }

    #[test]
    fn non_power_of_two_sq_entries_is_invalid() {
        assert!(ReactorConfig::new().sq_entries(100).validate().is_err());
    }
}
