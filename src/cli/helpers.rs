//! Shared helper functions for CLI commands
//!
//! Data directory resolution, configuration loading and storage setup.

use formkeep_core::{error::Result, BackupEntry, DashboardReader, FileStore, TrackerConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Get the default data directory using XDG_DATA_HOME standard
pub fn get_default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("formkeep")
}

/// Get the data directory from CLI arg, env var, or default
pub fn get_data_dir(cli_path: Option<PathBuf>) -> PathBuf {
    cli_path
        .or_else(|| std::env::var("FORMKEEP_DATA_DIR").ok().map(PathBuf::from))
        .unwrap_or_else(get_default_data_dir)
}

/// Resolved settings shared by every command
pub struct CliContext {
    pub data_dir: PathBuf,
    pub config: TrackerConfig,
}

impl CliContext {
    pub fn load(data_dir: Option<PathBuf>, config_path: Option<&Path>) -> Result<Self> {
        let data_dir = get_data_dir(data_dir);
        let config = TrackerConfig::load(config_path)?;
        debug!(
            "Using data dir {} with storage key '{}'",
            data_dir.display(),
            config.storage_key
        );
        Ok(Self { data_dir, config })
    }

    pub fn storage(&self) -> Result<Arc<FileStore>> {
        Ok(Arc::new(FileStore::open(&self.data_dir)?))
    }

    pub fn dashboard(&self) -> Result<DashboardReader> {
        Ok(DashboardReader::new(self.storage()?, &self.config))
    }
}

/// One-line summary of an entry for terminal output
pub fn format_entry_line(entry: &BackupEntry) -> String {
    format!(
        "{}  {:<10} {:>3}%  {}  {} ({})",
        entry.last_updated.format("%Y-%m-%d %H:%M"),
        entry.status.as_str(),
        entry.completion_percentage,
        entry.id,
        truncate(&entry.form_title, 40),
        entry.form_id
    )
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", cut)
}
