//! Single-line field extraction.

use std::sync::LazyLock;

use regex::Regex;

/// `ServerName="…"`, the field naming the server (e.g. `"EU West 3"`).
static SERVER_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bServerName="([^"]*)""#).expect("valid ServerName pattern"));

/// `GameURL="…"`, the field carrying the server address (`"ip:port"`).
static GAME_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bGameURL="([^"]*)""#).expect("valid GameURL pattern"));

/// Fields found on one log line. Absent fields stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedLine {
    pub server_name: Option<String>,
    pub game_url: Option<String>,
}

impl ParsedLine {
    /// Returns true if neither field was found.
    pub fn is_empty(&self) -> bool {
        self.server_name.is_none() && self.game_url.is_none()
    }
}

/// Extracts the server name and game URL fields from one line of log text.
///
/// Surrounding text is ignored. Empty values (`ServerName=""`) count as
/// absent. If a key appears more than once on the line, the last one wins.
pub fn parse_line(line: &str) -> ParsedLine {
    ParsedLine {
        server_name: last_value(&SERVER_NAME, line),
        game_url: last_value(&GAME_URL, line),
    }
}

/// Last non-empty capture of `pattern` on `line`.
fn last_value(pattern: &Regex, line: &str) -> Option<String> {
    pattern
        .captures_iter(line)
        .filter_map(|caps| caps.get(1))
        .map(|value| value.as_str().trim())
        .filter(|value| !value.is_empty())
        .last()
        .map(str::to_string)
}
