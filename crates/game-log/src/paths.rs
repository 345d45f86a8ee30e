use std::path::{Path, PathBuf};

use crate::GameLogError;

/// Log location relative to the user's documents folder.
pub const LOG_RELATIVE_PATH: &[&str] = &["My Games", "Rocket League", "TAGame", "Logs", "Launch.log"];

/// Steam app id, used to locate the Proton prefix on Linux.
#[cfg(target_os = "linux")]
const STEAM_APP_ID: u32 = 252950;

/// Returns the log path under a given documents directory.
pub fn log_path_under(documents: &Path) -> PathBuf {
    LOG_RELATIVE_PATH
        .iter()
        .fold(documents.to_path_buf(), |path, part| path.join(part))
}

/// Returns the platform's default log path.
pub fn default_log_path() -> Result<PathBuf, GameLogError> {
    documents_dir().map(|docs| log_path_under(&docs))
}

#[cfg(target_os = "windows")]
fn documents_dir() -> Result<PathBuf, GameLogError> {
    let profile = std::env::var_os("USERPROFILE").ok_or(GameLogError::NoDocumentsDir)?;
    Ok(PathBuf::from(profile).join("Documents"))
}

#[cfg(target_os = "linux")]
fn documents_dir() -> Result<PathBuf, GameLogError> {
    let home = std::env::var_os("HOME").ok_or(GameLogError::NoDocumentsDir)?;
    Ok(PathBuf::from(home)
        .join(".local/share/Steam/steamapps/compatdata")
        .join(STEAM_APP_ID.to_string())
        .join("pfx/drive_c/users/steamuser/Documents"))
}

#[cfg(not(any(target_os = "linux", target_os = "windows")))]
fn documents_dir() -> Result<PathBuf, GameLogError> {
    Err(GameLogError::NoDocumentsDir)
}
