//! Path utilities

use std::path::{Path, PathBuf};

/// Data directory (~/.reactant)
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".reactant"))
        .unwrap_or_else(|| PathBuf::from(".reactant"))
}

/// Default configuration file location
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

/// Where run transcripts are exported by default
pub fn transcripts_dir() -> PathBuf {
    data_dir().join("transcripts")
}

/// Ensure directory exists
pub async fn ensure_dir(path: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(path).await
}
