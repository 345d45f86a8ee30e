//! Game server endpoint discovery.
//!
//! A [`DiscoveryCore`] owns an [`EndpointStore`], the runtime [`Settings`]
//! and one background poll loop. Each tick asks the configured [`Strategy`]
//! for candidate endpoint labels (from the OS connection table or from the
//! game's log) and folds them into the store, which the UI side reads at any
//! time.

pub mod host;
pub mod scheduler;
pub mod settings;
pub mod store;
pub mod strategy;
pub mod types;

#[cfg(test)]
mod test_support;

// Re-export primary types.
pub use host::{Host, SystemHost};
pub use scheduler::{DiscoveryCore, OnDiscoveredFn};
pub use settings::{DEFAULT_KEEP_DUPLICATES, DEFAULT_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS, Settings};
pub use store::{EndpointStore, StoreView};
pub use strategy::{ActiveScan, Candidate, LogTail, ScanPhase, Strategy, TickContext};
pub use types::{EndpointLabel, InsertPosition, MatchEvent, extract_address};

/// Errors for discovery lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("poll loop is already running")]
    AlreadyRunning,

    #[error("poll loop is not running")]
    NotRunning,

    #[error("strategy {0} does not support manual rescans")]
    RescanUnsupported(&'static str),

    #[error("poll loop task failed: {0}")]
    Join(String),
}
