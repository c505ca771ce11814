//! Working memory: the scratchpad of one reasoning session.
//!
//! Holds the Thought / Action / Observation trace, the capability results,
//! and the iteration counter that bounds the loop. Discarded when the
//! session ends; nothing here outlives a query.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingMemory {
    pub trace: Vec<TraceEntry>,

    pub tool_results: Vec<ToolResultEntry>,

    /// Model calls made so far
    pub iterations: usize,

    pub max_iterations: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    pub kind: TraceKind,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TraceKind {
    Thought,
    Action,
    Observation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResultEntry {
    pub tool_name: String,
    pub input_summary: String,
    pub output_summary: String,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

impl WorkingMemory {
    pub fn new(max_iterations: usize) -> Self {
        Self {
            trace: Vec::new(),
            tool_results: Vec::new(),
            iterations: 0,
            max_iterations,
        }
    }

    pub fn add_thought(&mut self, thought: &str) {
        self.push_trace(TraceKind::Thought, thought);
    }

    pub fn add_action(&mut self, action: &str) {
        self.push_trace(TraceKind::Action, action);
    }

    pub fn add_observation(&mut self, observation: &str) {
        self.push_trace(TraceKind::Observation, observation);
    }

    fn push_trace(&mut self, kind: TraceKind, content: &str) {
        self.trace.push(TraceEntry {
            kind,
            content: content.to_string(),
            timestamp: Utc::now(),
        });
    }

    pub fn add_tool_result(&mut self, tool_name: &str, input: &str, output: &str, success: bool) {
        self.tool_results.push(ToolResultEntry {
            tool_name: tool_name.to_string(),
            input_summary: input.to_string(),
            output_summary: output.to_string(),
            success,
            timestamp: Utc::now(),
        });
    }

    /// Increment the iteration counter. Returns `false` if max exceeded.
    pub fn tick(&mut self) -> bool {
        self.iterations += 1;
        self.iterations <= self.max_iterations
    }

    /// Model calls actually made; `tick` overshoots by one on exhaustion.
    pub fn iterations_used(&self) -> usize {
        self.iterations.min(self.max_iterations)
    }

    /// Render the trace for debug output.
    pub fn render(&self) -> String {
        let mut out = String::new();

        if !self.trace.is_empty() {
            out.push_str("## Reasoning Trace\n");
            for entry in &self.trace {
                let label = match entry.kind {
                    TraceKind::Thought => "Thought",
                    TraceKind::Action => "Action",
                    TraceKind::Observation => "Observation",
                };
                out.push_str(&format!("[{label}] {}\n", entry.content));
            }
            out.push('\n');
        }

        if !self.tool_results.is_empty() {
            out.push_str("## Tool Results\n");
            for tr in &self.tool_results {
                let status = if tr.success { "✓" } else { "✗" };
                out.push_str(&format!("- {status} {}: {}\n", tr.tool_name, tr.output_summary));
            }
            out.push('\n');
        }

        out.push_str(&format!(
            "Iterations: {}/{}\n",
            self.iterations_used(),
            self.max_iterations
        ));
        out
    }

    /// One-line summary for logging.
    pub fn summarize(&self) -> String {
        let success = self.tool_results.iter().filter(|t| t.success).count();
        format!(
            "{} tool calls ({} successful), {} iterations used",
            self.tool_results.len(),
            success,
            self.iterations_used()
        )
    }
}
