use rlgrab_game_log::LogTailer;

use super::{Candidate, Strategy, TickContext};
use crate::types::EndpointLabel;

/// Lowest accepted poll interval for log scans.
pub const LOG_TAIL_FLOOR_MS: u64 = 1000;

/// Finds game servers by re-reading the game's log on every tick.
///
/// Independent of the match lifecycle. New labels go to the front of the
/// list so the latest session shows first.
#[derive(Debug, Default)]
pub struct LogTail;

impl LogTail {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for LogTail {
    fn name(&self) -> &'static str {
        "log-tail"
    }

    fn poll_floor_ms(&self) -> u64 {
        LOG_TAIL_FLOOR_MS
    }

    fn on_tick(&self, ctx: &TickContext<'_>) -> Vec<Candidate> {
        let Some(path) = ctx.host.log_path() else {
            tracing::debug!("log path unknown, skipping tick");
            return Vec::new();
        };

        let mut seen = ctx.store.known_labels();
        LogTailer::new(path)
            .scan(&mut seen, ctx.keep_duplicates)
            .into_iter()
            .map(|label| Candidate::prepend(EndpointLabel::from(label)))
            .collect()
    }

    fn supports_rescan(&self) -> bool {
        true
    }
}
