use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use rlgrab_netscan::filter_by_owner;

use super::{Candidate, Strategy, TickContext};
use crate::store::EndpointStore;
use crate::types::EndpointLabel;

/// Lowest accepted poll interval for connection-table scans.
pub const ACTIVE_SCAN_FLOOR_MS: u64 = 250;

/// Low byte of the state word holds the phase, the rest the match generation.
const PHASE_BITS: u32 = 8;
const PHASE_MASK: u64 = (1 << PHASE_BITS) - 1;

/// Where the active scan is in the match lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ScanPhase {
    /// Not in a match.
    Idle = 0,
    /// In a match, looking for the server.
    Scanning = 1,
    /// Server found for this match; no more scans until the next one.
    Found = 2,
}

impl ScanPhase {
    fn from_bits(v: u64) -> Self {
        match v & PHASE_MASK {
            1 => ScanPhase::Scanning,
            2 => ScanPhase::Found,
            _ => ScanPhase::Idle,
        }
    }
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanPhase::Idle => write!(f, "idle"),
            ScanPhase::Scanning => write!(f, "scanning"),
            ScanPhase::Found => write!(f, "found"),
        }
    }
}

/// Finds the game server by polling the connection table for sockets owned
/// by the game process.
///
/// Scans only between match start and the first successful insert. A server
/// change later in the same match is not picked up.
#[derive(Debug)]
pub struct ActiveScan {
    executable: String,
    /// `generation << PHASE_BITS | phase`, updated as one word so a phase
    /// change can be tied to the match it belongs to.
    state: AtomicU64,
}

impl ActiveScan {
    /// Creates a scanner for the process named `executable`.
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            state: AtomicU64::new(ScanPhase::Idle as u64),
        }
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    pub fn phase(&self) -> ScanPhase {
        ScanPhase::from_bits(self.state.load(Ordering::Acquire))
    }

    /// Applies `f(generation, phase)` atomically; `None` leaves the state alone.
    fn update(&self, f: impl Fn(u64, ScanPhase) -> Option<(u64, ScanPhase)>) -> bool {
        self.state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |word| {
                f(word >> PHASE_BITS, ScanPhase::from_bits(word))
                    .map(|(generation, phase)| (generation << PHASE_BITS) | phase as u64)
            })
            .is_ok()
    }

    fn set_phase(&self, phase: ScanPhase) {
        self.update(|generation, _| Some((generation, phase)));
    }

    /// Moves `from` -> `to` only if still in `from`.
    fn transition(&self, from: ScanPhase, to: ScanPhase) -> bool {
        self.update(|generation, phase| (phase == from).then_some((generation, to)))
    }
}

impl Strategy for ActiveScan {
    fn name(&self) -> &'static str {
        "active-scan"
    }

    fn poll_floor_ms(&self) -> u64 {
        ACTIVE_SCAN_FLOOR_MS
    }

    fn on_tick(&self, ctx: &TickContext<'_>) -> Vec<Candidate> {
        if self.phase() != ScanPhase::Scanning {
            return Vec::new();
        }

        let Some(pid) = ctx.host.find_process_id(&self.executable) else {
            tracing::debug!(executable = %self.executable, "game process not running");
            return Vec::new();
        };

        let all = match ctx.host.enumerate_connections() {
            Ok(all) => all,
            Err(e) => {
                tracing::debug!(error = %e, "skipping tick");
                return Vec::new();
            }
        };

        let owned = filter_by_owner(&all, pid);
        tracing::trace!(pid, total = all.len(), owned = owned.len(), "connections scanned");

        owned
            .iter()
            .filter(|c| !c.has_unspecified_remote())
            .map(|c| Candidate::append(EndpointLabel::from_socket(c.remote_address, c.remote_port)))
            .collect()
    }

    fn on_inserted(&self, ctx: &TickContext<'_>, inserted: &[EndpointLabel]) {
        if inserted.is_empty() {
            return;
        }
        // Only the match the tick started in may move to Found.
        let found = self.update(|generation, phase| {
            (generation == ctx.generation && phase == ScanPhase::Scanning)
                .then_some((generation, ScanPhase::Found))
        });
        if found {
            tracing::info!(count = inserted.len(), "server found, scanning paused until next match");
        }
    }

    fn on_match_start(&self, store: &EndpointStore) {
        // New generation before the clear: an in-flight tick either inserts
        // before the clear or sees the new generation and drops its candidates.
        self.update(|generation, _| Some((generation.wrapping_add(1), ScanPhase::Idle)));
        store.clear();
        self.set_phase(ScanPhase::Scanning);
    }

    fn on_match_end(&self) {
        self.set_phase(ScanPhase::Idle);
    }

    fn on_reset(&self) {
        // Still in the match: look again.
        self.transition(ScanPhase::Found, ScanPhase::Scanning);
    }

    fn match_generation(&self) -> u64 {
        self.state.load(Ordering::Acquire) >> PHASE_BITS
    }
}
