//! Course retrieval capability.
//!
//! Runs similarity search plus priority reranking over one course's index
//! and hands the top passages back to the model as numbered text. The scored
//! nodes themselves travel in [`ToolResult::data`] so the caller can build
//! citations from exactly what the model saw.

use async_trait::async_trait;
use std::sync::Arc;
use studybot_core::course::CourseLayout;
use studybot_core::document::ScoredNode;
use studybot_core::error::ToolError;
use studybot_core::tool::{Capability, Tool, ToolResult};
use studybot_knowledge::Retriever;
use tracing::debug;

pub struct CourseRetrievalTool {
    retriever: Arc<Retriever>,
    layout: CourseLayout,
}

impl CourseRetrievalTool {
    pub fn new(retriever: Arc<Retriever>, layout: CourseLayout) -> Self {
        Self { retriever, layout }
    }

    /// Recover the scored nodes from a successful result's `data`.
    pub fn passages(result: &ToolResult) -> Vec<ScoredNode> {
        result
            .data
            .as_ref()
            .and_then(|d| serde_json::from_value(d.clone()).ok())
            .unwrap_or_default()
    }
}

/// Render passages as the text observation the model reads.
pub fn format_passages(nodes: &[ScoredNode]) -> String {
    if nodes.is_empty() {
        return "No relevant passages were found in the course documents.".into();
    }

    let mut out = String::new();
    for (i, scored) in nodes.iter().enumerate() {
        let meta = &scored.node.metadata;
        let name = meta.name.as_deref().unwrap_or(&meta.file_name);
        out.push_str(&format!("[{}] {name}", i + 1));
        if let Some(page) = &meta.page_label {
            out.push_str(&format!(" (page {page})"));
        }
        if let Some(priority) = meta.priority {
            out.push_str(&format!(" [priority {priority}]"));
        }
        out.push('\n');
        out.push_str(scored.node.text.trim());
        out.push_str("\n\n");
    }
    out.trim_end().to_string()
}

#[async_trait]
impl Tool for CourseRetrievalTool {
    fn name(&self) -> &str {
        Capability::Retrieval.tool_name()
    }

    fn description(&self) -> &str {
        "Search the course documents for information about the study program. \
         Pass the student's complete question as the query. Returns passages \
         ordered by relevance and source trustworthiness."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The student's complete question"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = arguments["query"]
            .as_str()
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

        let nodes = self
            .retriever
            .retrieve(&self.layout, query)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.name().to_string(),
                reason: e.to_string(),
            })?;

        debug!(course = %self.layout.id, passages = nodes.len(), "Course retrieval executed");

        let data = serde_json::to_value(&nodes).map_err(|e| ToolError::ExecutionFailed {
            tool_name: self.name().to_string(),
            reason: e.to_string(),
        })?;

        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output: format_passages(&nodes),
            data: Some(data),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{WordEmbedProvider, build_index};
    use studybot_core::document::{DocumentMetadata, Node};

    fn scored(name: &str, page: Option<&str>, text: &str) -> ScoredNode {
        ScoredNode {
            node: Node {
                id: format!("{name}#0"),
                doc_id: name.into(),
                chunk_index: 0,
                text: text.into(),
                metadata: DocumentMetadata {
                    file_name: format!("{name}.md"),
                    name: Some(name.into()),
                    priority: Some(2.0),
                    page_label: page.map(String::from),
                    ..Default::default()
                },
                embedding: vec![],
            },
            score: 0.5,
        }
    }

    #[test]
    fn passages_are_numbered_with_pages() {
        let text = format_passages(&[
            scored("Handbook", Some("4"), "Exams happen in March."),
            scored("FAQ", None, "Ask the office."),
        ]);
        assert!(text.starts_with("[1] Handbook (page 4) [priority 2]"));
        assert!(text.contains("[2] FAQ [priority 2]\nAsk the office."));
    }

    #[test]
    fn empty_result_says_so() {
        assert!(format_passages(&[]).contains("No relevant passages"));
    }

    #[tokio::test]
    async fn executes_against_course_index() {
        let (_dir, layout) = build_index(&[
            ("exams.md", "exam registration opens in march", 1.0),
            ("canteen.md", "canteen lunch menu", 1.0),
        ]);
        let retriever = Arc::new(Retriever::new(Arc::new(WordEmbedProvider), "bge-m3", 1));
        let tool = CourseRetrievalTool::new(retriever, layout);

        let result = tool
            .execute(serde_json::json!({"query": "when does exam registration open"}))
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.output.contains("exam registration"));

        let passages = CourseRetrievalTool::passages(&result);
        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].node.doc_id, "exams.md");
    }

    #[tokio::test]
    async fn missing_query_is_invalid() {
        let (_dir, layout) = build_index(&[]);
        let retriever = Arc::new(Retriever::new(Arc::new(WordEmbedProvider), "bge-m3", 3));
        let tool = CourseRetrievalTool::new(retriever, layout);
        let err = tool.execute(serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn missing_index_is_execution_failure() {
        let dir = tempfile::tempdir().unwrap();
        let layout = CourseLayout::new("wi", dir.path().join("docs"), dir.path().join("index"));
        let retriever = Arc::new(Retriever::new(Arc::new(WordEmbedProvider), "bge-m3", 3));
        let tool = CourseRetrievalTool::new(retriever, layout);

        let err = tool
            .execute(serde_json::json!({"query": "anything"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed { .. }));
    }
}
