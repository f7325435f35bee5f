//! Tunables for [`crate::Pool`] (spec §4.3, ambient config surface per
//! SPEC_FULL §1.3, grounded on
//! `gvthread_runtime::config::SchedulerConfig`: a builder-style struct
//! with compile-time defaults and a `validate()` method. Unlike the
//! teacher, no `from_env()` — SPEC_FULL §1.3 explicitly drops
//! environment-variable overrides as out of scope.

use corio_error::{CorioError, CorioResult};

/// Configuration for a [`crate::Pool`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of OS worker threads. Fixed for the pool's lifetime —
    /// corio has no work stealing and no dynamic scaling (spec §1
    /// Non-goals).
    pub num_workers: usize,

    /// `eprintln!`-gated diagnostics on the worker loop and the
    /// depleted barrier firing (SPEC_FULL §1.2).
    pub debug_logging: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            num_workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            debug_logging: false,
        }
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_workers(mut self, n: usize) -> Self {
        self.num_workers = n;
        self
    }

    pub fn debug_logging(mut self, enable: bool) -> Self {
        self.debug_logging = enable;
        self
    }

    pub fn validate(&self) -> CorioResult<()> {
        if self.num_workers == 0 {
            return Err(CorioError::from_user(ConfigError(
                "num_workers must be > 0",
            )));
        }
        Ok(())
    }
}

#[derive(Debug)]
struct ConfigError(&'static str);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid pool config: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(PoolConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_workers_is_invalid() {
        assert!(PoolConfig::new().num_workers(0).validate().is_err());
    }
}
