//! Full-rescan log reader.
//!
//! The game rewrites its log on every launch and appends during play, so no
//! read offset is kept: each scan starts from the first byte.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::GameLogError;
use crate::parser::parse_line;

/// Re-reads one log file and turns its fields into endpoint labels.
#[derive(Debug, Clone)]
pub struct LogTailer {
    path: PathBuf,
}

impl LogTailer {
    /// Creates a tailer for the log at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the log path being scanned.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole log and returns the labels not yet seen, in file order.
    ///
    /// Accepted labels are added to `already_seen`, so a label is returned at
    /// most once per scan unless `keep_duplicates` is set. A missing or
    /// unreadable file yields an empty result.
    pub fn scan(&self, already_seen: &mut HashSet<String>, keep_duplicates: bool) -> Vec<String> {
        match self.read() {
            Ok(text) => scan_text(&text, already_seen, keep_duplicates),
            Err(e) => {
                tracing::debug!(error = %e, "log not readable, skipping scan");
                Vec::new()
            }
        }
    }

    fn read(&self) -> Result<String, GameLogError> {
        let bytes = std::fs::read(&self.path).map_err(|source| GameLogError::Unavailable {
            path: self.path.clone(),
            source,
        })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Folds log text into candidate labels, top to bottom.
///
/// The most recent server name is carried forward across lines; each game
/// URL produces one label, `"<server name> (<url>)"` or just `"<url>"` when
/// no server name has appeared yet.
pub fn scan_text(
    text: &str,
    already_seen: &mut HashSet<String>,
    keep_duplicates: bool,
) -> Vec<String> {
    let mut labels = Vec::new();
    let mut current_server_name = String::new();
    let mut current_game_url = String::new();

    for line in text.lines() {
        let parsed = parse_line(line);
        if let Some(name) = parsed.server_name {
            current_server_name = name;
        }
        let Some(url) = parsed.game_url else {
            continue;
        };
        current_game_url = url;

        let label = if current_server_name.is_empty() {
            current_game_url.clone()
        } else {
            format!("{current_server_name} ({current_game_url})")
        };
        current_game_url.clear();

        if keep_duplicates || !already_seen.contains(&label) {
            already_seen.insert(label.clone());
            labels.push(label);
        }
    }

    labels
}
