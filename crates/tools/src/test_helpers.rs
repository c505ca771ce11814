use async_trait::async_trait;
use studybot_core::course::CourseLayout;
use studybot_core::document::{Document, DocumentMetadata, Node};
use studybot_core::error::ProviderError;
use studybot_core::message::Message;
use studybot_core::provider::*;
use studybot_knowledge::PersistedIndex;
use studybot_knowledge::index::content_hash;
use tempfile::TempDir;

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

pub struct WordEmbedProvider;

#[async_trait]
impl Provider for WordEmbedProvider {
    fn name(&self) -> &str {
        "word_embed"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Ok(ProviderResponse {
            message: Message::assistant(""),
            usage: None,
            model: "mock".into(),
        })
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        Ok(EmbeddingResponse {
            embeddings: request.inputs.iter().map(|t| bag_of_words(t)).collect(),
            model: request.model,
            usage: None,
        })
    }
}

/// Persist a one-node-per-document index for course `wi`.
pub fn build_index(docs: &[(&str, &str, f64)]) -> (TempDir, CourseLayout) {
    let dir = tempfile::tempdir().unwrap();
    let layout = CourseLayout::new("wi", dir.path().join("docs"), dir.path().join("index"));

    let mut index = PersistedIndex::new("wi", "bge-m3");
    for (file, text, priority) in docs {
        let doc = Document {
            id: file.to_string(),
            text: text.to_string(),
            metadata: DocumentMetadata {
                file_path: layout.documents_dir.join(file).to_string_lossy().to_string(),
                file_name: file.to_string(),
                priority: Some(*priority),
                name: Some(format!("Source {file}")),
                source_link: Some(format!("https://example.edu/{file}")),
                description: Some(String::new()),
                page_label: None,
            },
        };
        let node = Node {
            id: Node::node_id(&doc.id, 0),
            doc_id: doc.id.clone(),
            chunk_index: 0,
            text: doc.text.clone(),
            metadata: doc.metadata.clone(),
            embedding: bag_of_words(&doc.text),
        };
        index.insert_document(&doc, content_hash(&doc), vec![node]);
    }
    index.persist(&layout.index_dir).unwrap();
    (dir, layout)
}
