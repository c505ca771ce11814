//! Durable unanswered-questions log (JSON Lines).
//!
//! One line per unanswerable or exhausted query, with the verbatim question
//! text, for corpus/manifest gap analysis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use studybot_core::error::IndexError;
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnansweredReason {
    /// The model explicitly declared the question unanswerable
    Unanswerable,
    /// The reasoning loop hit its iteration bound
    Exhausted,
}

impl std::fmt::Display for UnansweredReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnansweredReason::Unanswerable => f.write_str("unanswerable"),
            UnansweredReason::Exhausted => f.write_str("exhausted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnansweredEntry {
    pub timestamp: DateTime<Utc>,
    pub course: String,
    pub question: String,
    pub reason: UnansweredReason,

    /// Free-text note supplied by the model, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl UnansweredEntry {
    pub fn new(course: impl Into<String>, question: impl Into<String>, reason: UnansweredReason) -> Self {
        Self {
            timestamp: Utc::now(),
            course: course.into(),
            question: question.into(),
            reason,
            note: None,
        }
    }
}

/// Append-only log file. Appends within one process are serialized.
pub struct UnansweredLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl UnansweredLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, entry: &UnansweredEntry) -> Result<(), IndexError> {
        let _guard = self.write_lock.lock().await;
        let io_err = |e: std::io::Error| IndexError::Io {
            path: self.path.clone(),
            reason: e.to_string(),
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let line = serde_json::to_string(entry).map_err(|e| IndexError::Io {
            path: self.path.clone(),
            reason: format!("Failed to serialize entry: {e}"),
        })?;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_err)?;
        writeln!(file, "{line}").map_err(io_err)?;

        debug!(course = %entry.course, reason = %entry.reason, "Unanswered question logged");
        Ok(())
    }

    /// Read all entries back. Corrupted lines are skipped.
    pub fn entries(&self) -> Result<Vec<UnansweredEntry>, IndexError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(IndexError::Io {
                    path: self.path.clone(),
                    reason: e.to_string(),
                });
            }
        };

        Ok(content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<UnansweredEntry>(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted unanswered-log entry");
                    None
                }
            })
            .collect())
    }

    pub fn entries_for(&self, course: &str) -> Result<Vec<UnansweredEntry>, IndexError> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|e| e.course == course)
            .collect())
    }
}
