//! Process lookup and TCP connection-table snapshots.
//!
//! Answers two questions about the local host: which process id belongs to
//! a given executable, and which IPv4 TCP connections that process owns.
//! The OS-specific work lives in a per-platform backend; decoding of the raw
//! table encoding and filtering are plain functions usable everywhere.

mod connection;

#[cfg(target_os = "linux")]
#[path = "proc_linux.rs"]
mod platform;

#[cfg(target_os = "windows")]
#[path = "iphlp_windows.rs"]
mod platform;

#[cfg(not(any(target_os = "linux", target_os = "windows")))]
#[path = "unsupported.rs"]
mod platform;

pub use connection::{ConnectionInfo, decode_ipv4, decode_port, filter_by_owner};

/// Errors for connection-table queries.
#[derive(Debug, thiserror::Error)]
pub enum NetScanError {
    #[error("connection enumeration failed: {0}")]
    Enumeration(String),
}

/// Returns the id of the first running process whose executable name matches
/// `executable` (case-insensitive), or `None` if it is not running.
///
/// Looks at the live process list on every call; ids are never cached since
/// the target may start late or restart under a new id.
pub fn find_process_id(executable: &str) -> Option<u32> {
    let pid = platform::find_process_id(executable);
    if pid.is_none() {
        tracing::trace!(executable, "process not found");
    }
    pid
}

/// Snapshots every IPv4 TCP connection on the host together with its owner.
pub fn enumerate_tcp_connections() -> Result<Vec<ConnectionInfo>, NetScanError> {
    platform::enumerate_tcp_connections()
}

/// Case-insensitive executable name comparison shared by the backends.
pub(crate) fn same_executable(candidate: &str, target: &str) -> bool {
    candidate.eq_ignore_ascii_case(target)
}
