//! Game log scanning.
//!
//! The game writes its session details to a plain-text log under the user's
//! documents folder. Every scan re-reads that file from the top, pulls out
//! `ServerName="…"` / `GameURL="…"` fields, and turns them into endpoint
//! labels.

mod parser;
mod paths;
mod tailer;

pub use parser::{ParsedLine, parse_line};
pub use paths::{LOG_RELATIVE_PATH, default_log_path, log_path_under};
pub use tailer::{LogTailer, scan_text};

use std::path::PathBuf;

/// Errors for log access.
#[derive(Debug, thiserror::Error)]
pub enum GameLogError {
    #[error("log file unavailable at {path}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not determine the documents directory")]
    NoDocumentsDir,
}
