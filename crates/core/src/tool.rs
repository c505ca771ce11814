//! Tool trait and the closed capability set of a reasoning session.
//!
//! The reasoning loop can invoke exactly two capabilities: retrieval over the
//! course index and logging a question as unanswerable. Each is a [`Tool`]
//! with a fixed argument schema; [`CapabilitySet`] selects between them by
//! [`Capability`], never by free-form lookup.

use crate::error::ToolError;
use crate::provider::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A request to execute a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the model's tool_call.id)
    pub id: String,

    /// Name of the capability to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

/// The result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    pub call_id: String,

    pub success: bool,

    /// Text handed back to the model
    pub output: String,

    /// Optional structured data (retrieval puts its scored nodes here)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// The core Tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool, as shown to the model.
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the model.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// The two things a reasoning session can do besides answering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Similarity search + priority reranking over the course index
    Retrieval,
    /// Durably record the question as unanswerable
    LogUnanswered,
}

impl Capability {
    pub const ALL: [Capability; 2] = [Capability::Retrieval, Capability::LogUnanswered];

    /// The tool name exposed to the model.
    pub fn tool_name(self) -> &'static str {
        match self {
            Capability::Retrieval => "course_retrieval",
            Capability::LogUnanswered => "log_unanswered_question",
        }
    }

    pub fn from_tool_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.tool_name() == name)
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tool_name())
    }
}

/// Exactly one tool per [`Capability`].
pub struct CapabilitySet {
    retrieval: Box<dyn Tool>,
    log_unanswered: Box<dyn Tool>,
}

impl CapabilitySet {
    pub fn new(retrieval: Box<dyn Tool>, log_unanswered: Box<dyn Tool>) -> Self {
        Self {
            retrieval,
            log_unanswered,
        }
    }

    pub fn get(&self, capability: Capability) -> &dyn Tool {
        match capability {
            Capability::Retrieval => self.retrieval.as_ref(),
            Capability::LogUnanswered => self.log_unanswered.as_ref(),
        }
    }

    /// Tool definitions in a fixed order: retrieval first.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        Capability::ALL
            .into_iter()
            .map(|c| {
                let mut def = self.get(c).to_definition();
                def.name = c.tool_name().to_string();
                def
            })
            .collect()
    }

    /// Resolve the call to a capability and execute it.
    pub async fn execute(
        &self,
        call: &ToolCall,
    ) -> std::result::Result<(Capability, ToolResult), ToolError> {
        let capability = Capability::from_tool_name(&call.name)
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;
        let mut result = self.get(capability).execute(call.arguments.clone()).await?;
        result.call_id = call.id.clone();
        Ok((capability, result))
    }
}
