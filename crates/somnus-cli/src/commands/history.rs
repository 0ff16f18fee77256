use clap::Subcommand;
use serde_json::json;
use somnus_core::storage::HISTORY_LIMIT;
use somnus_core::{Database, SessionStore};

#[derive(Subcommand)]
pub enum HistoryAction {
    /// Most recent completed sessions, newest first
    List {
        /// Maximum number of records (at most 30 are kept)
        #[arg(long, default_value_t = HISTORY_LIMIT)]
        limit: usize,
    },
    /// Number of sessions ever completed
    Total,
    /// Delete all history
    Clear,
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut db = Database::open()?;

    match action {
        HistoryAction::List { limit } => {
            let records = db.list_recent_sessions(limit)?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        HistoryAction::Total => {
            let total = db.total_completed_count()?;
            println!("{}", serde_json::to_string_pretty(&json!({ "total": total }))?);
        }
        HistoryAction::Clear => {
            let removed = db.clear_history()?;
            println!("{}", serde_json::to_string_pretty(&json!({ "removed": removed }))?);
        }
    }
    Ok(())
}
