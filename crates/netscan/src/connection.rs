use std::fmt;
use std::net::Ipv4Addr;

/// One row of the TCP connection table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub local_address: Ipv4Addr,
    pub local_port: u16,
    pub remote_address: Ipv4Addr,
    pub remote_port: u16,
    pub owner_pid: u32,
}

impl ConnectionInfo {
    /// Returns `"ip:port"` for the remote end of the connection.
    pub fn remote_endpoint(&self) -> String {
        format!("{}:{}", self.remote_address, self.remote_port)
    }

    /// Returns true when the remote end is `0.0.0.0` (listening socket or
    /// not yet connected).
    pub fn has_unspecified_remote(&self) -> bool {
        self.remote_address.is_unspecified()
    }
}

impl fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{} (pid {})",
            self.local_address, self.local_port, self.remote_address, self.remote_port, self.owner_pid
        )
    }
}

/// Decodes an address as stored in the connection table: a 32-bit value
/// whose little-endian bytes are the octets in address order.
pub fn decode_ipv4(raw: u32) -> Ipv4Addr {
    Ipv4Addr::from(raw.to_le_bytes())
}

/// Decodes a port as stored in the connection table: network byte order in
/// the low 16 bits of a 32-bit field.
pub fn decode_port(raw: u32) -> u16 {
    u16::from_be(raw as u16)
}

/// Returns the connections owned by `pid`, keeping their relative order.
pub fn filter_by_owner(all: &[ConnectionInfo], pid: u32) -> Vec<ConnectionInfo> {
    all.iter().filter(|c| c.owner_pid == pid).cloned().collect()
}
