//! Capabilities the core needs from its environment.

use std::path::PathBuf;

use rlgrab_netscan::{ConnectionInfo, NetScanError};

/// OS and host-application access used by the strategies.
///
/// Passed into [`DiscoveryCore`](crate::DiscoveryCore) explicitly so tests
/// can substitute a fake.
pub trait Host: Send + Sync + 'static {
    /// Looks up the id of a running process by executable name.
    fn find_process_id(&self, executable: &str) -> Option<u32>;

    /// Snapshots the IPv4 TCP connection table.
    fn enumerate_connections(&self) -> Result<Vec<ConnectionInfo>, NetScanError>;

    /// Location of the game log, if it can be determined.
    fn log_path(&self) -> Option<PathBuf>;
}

/// [`Host`] backed by the real operating system.
#[derive(Debug, Clone, Default)]
pub struct SystemHost {
    log_path: Option<PathBuf>,
}

impl SystemHost {
    /// Creates a host that resolves the log path from the documents folder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses an explicit log path instead of the platform default.
    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }
}

impl Host for SystemHost {
    fn find_process_id(&self, executable: &str) -> Option<u32> {
        rlgrab_netscan::find_process_id(executable)
    }

    fn enumerate_connections(&self) -> Result<Vec<ConnectionInfo>, NetScanError> {
        rlgrab_netscan::enumerate_tcp_connections()
    }

    fn log_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.log_path {
            return Some(path.clone());
        }
        match rlgrab_game_log::default_log_path() {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::debug!(error = %e, "no default log path");
                None
            }
        }
    }
}
