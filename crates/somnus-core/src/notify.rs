//! Completion notifications.
//!
//! Delivery is fire-and-forget from the session's point of view: a failed
//! notification is logged and otherwise ignored.

use std::io::Write;

use chrono::{DateTime, Local};
use tracing::info;

use crate::error::NotifyError;

pub const COMPLETION_TITLE: &str = "Sleep Meditation";

pub trait Notifier {
    fn notify(&mut self, title: &str, body: &str) -> Result<(), NotifyError>;
}

/// Body of the completion notification.
pub fn completion_body(duration_min: u32, ended_at: DateTime<Local>) -> String {
    format!(
        "Meditation finished\nDuration: {duration_min} minutes\nEnded at: {}",
        ended_at.format("%H:%M:%S")
    )
}

/// Writes notifications to the `tracing` log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&mut self, title: &str, body: &str) -> Result<(), NotifyError> {
        info!(target: "somnus::notify", title, body, "notification");
        Ok(())
    }
}

/// Prints notifications to standard error, leaving stdout to event output.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&mut self, title: &str, body: &str) -> Result<(), NotifyError> {
        let mut out = std::io::stderr().lock();
        writeln!(out, "== {title} ==\n{body}").map_err(|e| NotifyError::Failed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn completion_body_formats_duration_and_time() {
        let ended = Local.with_ymd_and_hms(2024, 3, 9, 23, 5, 7).unwrap();
        assert_eq!(
            completion_body(30, ended),
            "Meditation finished\nDuration: 30 minutes\nEnded at: 23:05:07"
        );
    }

    #[test]
    fn log_notifier_never_fails() {
        assert!(LogNotifier.notify(COMPLETION_TITLE, "body").is_ok());
    }
}
