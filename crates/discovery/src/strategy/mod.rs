//! Discovery strategies.
//!
//! A strategy turns one poll tick into candidate labels and reacts to the
//! match lifecycle. The scheduler and store are shared; only this part
//! differs between connection-table scanning and log scanning.

mod active_scan;
mod log_tail;

pub use active_scan::{ActiveScan, ScanPhase};
pub use log_tail::LogTail;

use crate::host::Host;
use crate::store::EndpointStore;
use crate::types::{EndpointLabel, InsertPosition};

/// A label proposed by a strategy, with where it should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub label: EndpointLabel,
    pub position: InsertPosition,
}

impl Candidate {
    pub fn append(label: EndpointLabel) -> Self {
        Self {
            label,
            position: InsertPosition::Append,
        }
    }

    pub fn prepend(label: EndpointLabel) -> Self {
        Self {
            label,
            position: InsertPosition::Prepend,
        }
    }
}

/// What a strategy may look at during a tick.
pub struct TickContext<'a> {
    pub host: &'a dyn Host,
    pub store: &'a EndpointStore,
    pub keep_duplicates: bool,
    /// [`Strategy::match_generation`] when the tick began.
    pub generation: u64,
}

/// One way of discovering endpoints.
///
/// Methods take `&self`: tick callbacks run on the poll loop while match
/// events arrive from the host side, so implementations keep their state in
/// atomics.
pub trait Strategy: Send + Sync + 'static {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Lowest poll interval this strategy accepts, in milliseconds.
    fn poll_floor_ms(&self) -> u64;

    /// Produces this tick's candidates. Failures are logged and yield none.
    fn on_tick(&self, ctx: &TickContext<'_>) -> Vec<Candidate>;

    /// Called after the tick's candidates went into the store with the labels
    /// that were actually inserted.
    fn on_inserted(&self, _ctx: &TickContext<'_>, _inserted: &[EndpointLabel]) {}

    /// A match started.
    fn on_match_start(&self, _store: &EndpointStore) {}

    /// A match ended.
    fn on_match_end(&self) {}

    /// The operator reset the list (the store is already cleared).
    fn on_reset(&self) {}

    /// Counter bumped before each match start clears the store. Candidates
    /// from a tick that began under an older value are dropped.
    fn match_generation(&self) -> u64 {
        0
    }

    /// Whether an operator may force an immediate tick.
    fn supports_rescan(&self) -> bool {
        false
    }
}
