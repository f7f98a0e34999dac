//! # Runtime Configuration Module
//!
//! Environment-driven settings for the `may` coroutine runtime that serves
//! requests.
//!
//! ## Environment Variables
//!
//! ### `THIMBLE_STACK_SIZE`
//!
//! Stack size for each request coroutine. Accepts decimal (`32768`) or
//! hexadecimal (`0x8000`). Default: `0x8000` (32 KB).
//!
//! Every request runs its whole middleware chain on this stack, and `next()`
//! nests one frame per middleware, so deep chains or large handler locals
//! need a bigger value. Memory cost is `stack_size × concurrent requests`.
//!
//! ### `THIMBLE_WORKERS`
//!
//! Number of scheduler threads. Default: the parallelism reported by the OS.
//!
//! ## Usage
//!
//! ```rust
//! use thimble::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("Stack size: {} bytes", config.stack_size);
//! ```

use std::env;
use std::num::NonZeroUsize;

use tracing::info;

/// Default coroutine stack size (32 KB)
pub const DEFAULT_STACK_SIZE: usize = 0x8000;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Stack size for request coroutines in bytes
    pub stack_size: usize,
    /// Scheduler worker threads
    pub workers: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
            workers: default_workers(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from any key/value source. Unparseable values
    /// fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let stack_size = lookup("THIMBLE_STACK_SIZE")
            .and_then(|val| parse_size(&val))
            .unwrap_or(DEFAULT_STACK_SIZE);
        let workers = lookup("THIMBLE_WORKERS")
            .and_then(|val| val.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or_else(default_workers);
        RuntimeConfig {
            stack_size,
            workers,
        }
    }

    /// Push these settings into the global `may` configuration.
    ///
    /// Must run before the first coroutine is spawned; the scheduler reads
    /// the worker count once at startup.
    pub fn apply(&self) {
        may::config()
            .set_stack_size(self.stack_size)
            .set_workers(self.workers);
        info!(
            stack_size = self.stack_size,
            workers = self.workers,
            "Coroutine runtime configured"
        );
    }
}

fn parse_size(val: &str) -> Option<usize> {
    let val = val.trim();
    match val.strip_prefix("0x").or_else(|| val.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => val.parse().ok(),
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
}
