mod config;
pub mod database;

pub use config::{AlarmConfig, AudioConfig, Config, PlaybackConfig, TimerConfig};
pub use database::{Database, SessionRecord, HISTORY_LIMIT};

use std::path::PathBuf;

use crate::error::{DatabaseError, Result};

/// Returns `~/.config/somnus[-dev]/` based on SOMNUS_ENV.
///
/// Set SOMNUS_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("SOMNUS_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("somnus-dev")
    } else {
        base_dir.join("somnus")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Persistence collaborator for finished sessions.
pub trait SessionStore {
    /// Record a completed session and return its id.
    fn save_completed_session(&mut self, duration_min: u32) -> Result<i64, DatabaseError>;

    /// Most recent first, capped at [`HISTORY_LIMIT`].
    fn list_recent_sessions(&self, limit: usize) -> Result<Vec<SessionRecord>, DatabaseError>;

    /// Every session ever completed, including pruned ones.
    fn total_completed_count(&self) -> Result<u64, DatabaseError>;
}
