//! Shared test helpers for reasoning and pipeline tests.

use studybot_config::{AppConfig, CourseConfig};
use studybot_core::document::{DocumentMetadata, Node, ScoredNode};
use studybot_core::error::ProviderError;
use studybot_core::message::{Message, MessageToolCall};
use studybot_core::provider::*;
use studybot_knowledge::{IndexSynchronizer, ManifestEntry, SourceManifest, SyncSettings};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue. A
/// repeating provider returns its last response forever; otherwise running
/// past the script panics. Embeddings are bag-of-words vectors so that
/// retrieval over a real index behaves sensibly.
pub struct SequentialMockProvider {
    responses: Vec<ProviderResponse>,
    repeat_last: bool,
    call_count: Mutex<usize>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses,
            repeat_last: false,
            call_count: Mutex::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider that returns the same response on every call.
    pub fn repeating(response: ProviderResponse) -> Self {
        Self {
            repeat_last: true,
            ..Self::new(vec![response])
        }
    }

    /// Create a provider that returns a single text response (no tool calls).
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![make_text_response(text)])
    }

    /// Create a provider that first returns tool calls, then a final answer.
    pub fn tool_then_answer(tool_calls: Vec<MessageToolCall>, thought: &str, answer: &str) -> Self {
        Self::new(vec![
            make_tool_call_response(tool_calls, thought),
            make_text_response(answer),
        ])
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Every completion request received so far.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let mut count = self.call_count.lock().unwrap();

        let idx = if self.repeat_last {
            (*count).min(self.responses.len() - 1)
        } else {
            *count
        };
        if idx >= self.responses.len() {
            panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                *count,
                self.responses.len()
            );
        }

        *count += 1;
        Ok(self.responses[idx].clone())
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        Ok(EmbeddingResponse {
            embeddings: request.inputs.iter().map(|t| bag_of_words(t)).collect(),
            model: request.model,
            usage: None,
        })
    }
}

/// Provider whose completions always fail.
pub struct FailingProvider;

#[async_trait::async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(ProviderError::Network("connection refused".into()))
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        Ok(EmbeddingResponse {
            embeddings: request.inputs.iter().map(|t| bag_of_words(t)).collect(),
            model: request.model,
            usage: None,
        })
    }
}

fn bag_of_words(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; 64];
    for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
        let bucket = word
            .to_lowercase()
            .bytes()
            .fold(2166136261u32, |h, b| (h ^ b as u32).wrapping_mul(16777619));
        v[bucket as usize % 64] += 1.0;
    }
    v
}

/// Create a simple text response (no tool calls).
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// Create a response with tool calls and optional thought content.
pub fn make_tool_call_response(tool_calls: Vec<MessageToolCall>, thought: &str) -> ProviderResponse {
    let mut msg = Message::assistant(thought);
    msg.tool_calls = tool_calls;
    ProviderResponse {
        message: msg,
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// Helper to create a tool call.
pub fn make_tool_call(name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: format!("call_{}", name),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}

/// A retrieved passage from document `doc_id`.
pub fn make_passage(doc_id: &str, link: &str, page: Option<&str>) -> ScoredNode {
    ScoredNode {
        node: Node {
            id: Node::node_id(doc_id, 0),
            doc_id: doc_id.into(),
            chunk_index: 0,
            text: format!("Text of {doc_id}"),
            metadata: DocumentMetadata {
                file_name: format!("{doc_id}.txt"),
                name: Some(doc_id.to_uppercase()),
                source_link: Some(link.into()),
                page_label: page.map(String::from),
                priority: Some(1.0),
                ..Default::default()
            },
            embedding: vec![],
        },
        score: 0.9,
    }
}

/// A one-course deployment on disk: corpus, manifest, config, and a synced
/// index for course `wi`.
pub struct Deployment {
    pub dir: TempDir,
    pub config: AppConfig,
}

impl Deployment {
    /// Write `docs` as `(file, text, link)` with their manifest, then sync.
    pub async fn new(docs: &[(&str, &str, &str)]) -> Self {
        let dir = tempfile::tempdir().unwrap();

        let mut config = AppConfig::default();
        config.knowledge.documents_dir = dir.path().join("data");
        config.knowledge.index_dir = dir.path().join("storage");
        config.agent.unanswered_log = dir.path().join("unanswered.jsonl");
        let mut course = CourseConfig::new("wi");
        course.name = Some("Business Informatics".into());
        config.courses = vec![course];

        let layout = config.course_layout("wi").unwrap();
        std::fs::create_dir_all(&layout.documents_dir).unwrap();

        let mut manifest = SourceManifest::default();
        for (file, text, link) in docs {
            std::fs::write(layout.documents_dir.join(file), text).unwrap();
            manifest.sources.push(ManifestEntry {
                file: file.to_string(),
                name: file.trim_end_matches(".txt").to_string(),
                priority: 1.0,
                web_link: link.to_string(),
                description: String::new(),
            });
        }
        std::fs::write(
            layout.documents_dir.join(&config.knowledge.manifest_file),
            serde_json::to_string_pretty(&manifest).unwrap(),
        )
        .unwrap();

        let sync = IndexSynchronizer::new(
            Arc::new(SequentialMockProvider::new(vec![])),
            SyncSettings::from_config(&config.provider, &config.knowledge),
        );
        sync.sync_course(&layout).await.unwrap();

        Self { dir, config }
    }
}
