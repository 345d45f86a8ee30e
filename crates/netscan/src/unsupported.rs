//! Fallback for platforms without a connection-table backend.

use crate::{ConnectionInfo, NetScanError};

pub fn find_process_id(_executable: &str) -> Option<u32> {
    None
}

pub fn enumerate_tcp_connections() -> Result<Vec<ConnectionInfo>, NetScanError> {
    Err(NetScanError::Enumeration("unsupported platform".into()))
}
