//! Shared test fixtures: a deterministic embedding provider and an on-disk
//! course corpus in a temporary directory.

use crate::manifest::{ManifestEntry, SourceManifest};
use async_trait::async_trait;
use std::cell::RefCell;
use studybot_core::course::CourseLayout;
use studybot_core::error::ProviderError;
use studybot_core::message::Message;
use studybot_core::provider::*;
use tempfile::TempDir;

const DIMENSIONS: usize = 64;

/// Bag-of-words embedding: each lowercase word increments one bucket.
///
/// Texts sharing words get a high cosine similarity, which is all retrieval
/// tests need.
pub fn bag_of_words(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIMENSIONS];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let word = word.to_lowercase();
        let bucket = word
            .bytes()
            .fold(2166136261u32, |h, b| (h ^ b as u32).wrapping_mul(16777619));
        v[bucket as usize % DIMENSIONS] += 1.0;
    }
    v
}

pub struct HashEmbedProvider;

impl HashEmbedProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Provider for HashEmbedProvider {
    fn name(&self) -> &str {
        "hash_embed"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Ok(ProviderResponse {
            message: Message::assistant("unused"),
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

/// A single-course corpus on disk with its manifest.
pub struct Corpus {
    _root: TempDir,
    pub layout: CourseLayout,
    manifest: RefCell<SourceManifest>,
}

impl Corpus {
    pub fn new(code: &str) -> Self {
        let root = tempfile::tempdir().unwrap();
        let documents_dir = root.path().join("documents").join(code);
        let index_dir = root.path().join("index").join(code);
        std::fs::create_dir_all(&documents_dir).unwrap();
        Self {
            layout: CourseLayout::new(code, documents_dir, index_dir),
            _root: root,
            manifest: RefCell::new(SourceManifest::default()),
        }
    }

    /// Write a document and register it in the manifest.
    pub fn add(&self, file: &str, text: &str, priority: f64) {
        self.write_file(file, text);
        self.manifest.borrow_mut().sources.push(ManifestEntry {
            file: file.into(),
            name: format!("Source {file}"),
            priority,
            web_link: format!("https://example.edu/{file}"),
            description: format!("Description of {file}"),
        });
        self.save_manifest();
    }

    pub fn write_file(&self, file: &str, text: &str) {
        std::fs::write(self.layout.documents_dir.join(file), text).unwrap();
    }

    pub fn remove_file(&self, file: &str) {
        std::fs::remove_file(self.layout.documents_dir.join(file)).unwrap();
    }

    pub fn set_priority(&self, file: &str, priority: f64) {
        for entry in self.manifest.borrow_mut().sources.iter_mut() {
            if entry.file == file {
                entry.priority = priority;
            }
        }
        self.save_manifest();
    }

    pub fn set_link(&self, file: &str, link: &str) {
        for entry in self.manifest.borrow_mut().sources.iter_mut() {
            if entry.file == file {
                entry.web_link = link.into();
            }
        }
        self.save_manifest();
    }

    pub fn drop_manifest_entry(&self, file: &str) {
        self.manifest.borrow_mut().sources.retain(|e| e.file != file);
        self.save_manifest();
    }

    fn save_manifest(&self) {
        let json = serde_json::to_string_pretty(&*self.manifest.borrow()).unwrap();
        std::fs::write(self.layout.documents_dir.join("sources.json"), json).unwrap();
    }
}
