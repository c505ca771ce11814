//! Log-unanswered capability.
//!
//! Bound to one reasoning session: it records the session's original
//! question verbatim, whatever phrasing the model passes in, and logs at
//! most once per session. The model's own wording is kept as a note when it
//! differs.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use studybot_core::error::ToolError;
use studybot_core::tool::{Capability, Tool, ToolResult};
use studybot_knowledge::{UnansweredEntry, UnansweredLog, UnansweredReason};
use tracing::info;

pub struct LogUnansweredTool {
    log: Arc<UnansweredLog>,
    course: String,
    question: String,
    cannot_answer: String,
    logged: Arc<AtomicBool>,
}

impl LogUnansweredTool {
    pub fn new(
        log: Arc<UnansweredLog>,
        course: impl Into<String>,
        question: impl Into<String>,
        cannot_answer: impl Into<String>,
    ) -> Self {
        Self {
            log,
            course: course.into(),
            question: question.into(),
            cannot_answer: cannot_answer.into(),
            logged: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared flag set once this session's question has been logged.
    pub fn logged_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.logged)
    }
}

#[async_trait]
impl Tool for LogUnansweredTool {
    fn name(&self) -> &str {
        Capability::LogUnanswered.tool_name()
    }

    fn description(&self) -> &str {
        "Call this when the question cannot be answered from the course documents. \
         Records the question so the documents can be improved, then the student \
         is told politely that the question cannot be answered."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "question": {
                    "type": "string",
                    "description": "The question asked by the student"
                },
                "note": {
                    "type": "string",
                    "description": "Optional: why the question could not be answered"
                }
            },
            "required": ["question"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let asked = arguments["question"]
            .as_str()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'question' argument".into()))?;

        if !self.logged.swap(true, Ordering::SeqCst) {
            let mut entry =
                UnansweredEntry::new(&self.course, &self.question, UnansweredReason::Unanswerable);

            let phrasing = Some(asked).filter(|q| *q != self.question.trim());
            let note = arguments["note"].as_str().map(str::trim).filter(|n| !n.is_empty());
            entry.note = match (phrasing, note) {
                (Some(p), Some(n)) => Some(format!("{n} (asked as: {p})")),
                (Some(p), None) => Some(format!("asked as: {p}")),
                (None, Some(n)) => Some(n.to_string()),
                (None, None) => None,
            };

            if let Err(e) = self.log.append(&entry).await {
                self.logged.store(false, Ordering::SeqCst);
                return Err(ToolError::ExecutionFailed {
                    tool_name: self.name().to_string(),
                    reason: e.to_string(),
                });
            }
            info!(course = %self.course, "Question recorded as unanswerable");
        }

        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output: self.cannot_answer.clone(),
            data: None,
        })
    }
}
