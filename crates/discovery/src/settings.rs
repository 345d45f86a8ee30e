//! Runtime settings shared between the host and the poll loop.
//!
//! Values are plain atomics read with relaxed ordering: a change made by
//! the host is picked up by the next tick.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Default poll interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1500;

/// Longest accepted poll interval in milliseconds.
pub const MAX_POLL_INTERVAL_MS: u64 = 5000;

/// Default for keeping repeated endpoints.
pub const DEFAULT_KEEP_DUPLICATES: bool = false;

/// Poll interval and duplicate handling.
#[derive(Debug)]
pub struct Settings {
    poll_interval_ms: AtomicU64,
    keep_duplicates: AtomicBool,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL_MS, DEFAULT_KEEP_DUPLICATES)
    }
}

impl Settings {
    /// Creates settings with the given values.
    pub fn new(poll_interval_ms: u64, keep_duplicates: bool) -> Self {
        Self {
            poll_interval_ms: AtomicU64::new(poll_interval_ms),
            keep_duplicates: AtomicBool::new(keep_duplicates),
        }
    }

    /// Requested poll interval. Strategies apply their own floor on top.
    pub fn poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms.load(Ordering::Relaxed)
    }

    pub fn set_poll_interval_ms(&self, ms: u64) {
        self.poll_interval_ms.store(ms, Ordering::Relaxed);
    }

    pub fn keep_duplicates(&self) -> bool {
        self.keep_duplicates.load(Ordering::Relaxed)
    }

    pub fn set_keep_duplicates(&self, keep: bool) {
        self.keep_duplicates.store(keep, Ordering::Relaxed);
    }
}
