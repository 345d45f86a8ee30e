use std::fmt;
use std::net::Ipv4Addr;

use serde::Serialize;

/// Display and dedup key for a discovered server.
///
/// Either `"ip:port"` (connection table) or `"<server name> (ip:port)"`
/// (game log). Two labels name the same endpoint only if their text is
/// identical.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EndpointLabel(String);

impl EndpointLabel {
    /// Wraps an already formatted label.
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Builds `"ip:port"` for a remote socket address.
    pub fn from_socket(ip: Ipv4Addr, port: u16) -> Self {
        Self(format!("{ip}:{port}"))
    }

    /// Builds `"<server name> (<game url>)"`, or just the URL when the server
    /// name is missing or empty.
    pub fn from_log(server_name: Option<&str>, game_url: &str) -> Self {
        match server_name {
            Some(name) if !name.is_empty() => Self(format!("{name} ({game_url})")),
            _ => Self(game_url.to_string()),
        }
    }

    /// Returns the label text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the IP portion of the label.
    pub fn address(&self) -> &str {
        extract_address(&self.0)
    }
}

impl fmt::Display for EndpointLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for EndpointLabel {
    fn from(label: String) -> Self {
        Self(label)
    }
}

impl From<EndpointLabel> for String {
    fn from(label: EndpointLabel) -> Self {
        label.0
    }
}

impl AsRef<str> for EndpointLabel {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Extracts the IP from a label of either shape.
///
/// With a parenthesized `(ip:port)` suffix the part before the colon inside
/// the parentheses is returned; otherwise the label is taken as `ip:port`.
pub fn extract_address(label: &str) -> &str {
    let endpoint = match (label.rfind('('), label.rfind(')')) {
        (Some(open), Some(close)) if open < close => &label[open + 1..close],
        _ => label,
    };
    endpoint.split_once(':').map_or(endpoint, |(ip, _)| ip)
}

/// Where a new label goes in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    /// End of the list (oldest first).
    Append,
    /// Front of the list (newest first).
    Prepend,
}

/// Match lifecycle notification from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchEvent {
    Started,
    Ended,
}

impl fmt::Display for MatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchEvent::Started => write!(f, "started"),
            MatchEvent::Ended => write!(f, "ended"),
        }
    }
}
