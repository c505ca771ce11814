//! Persisted per-course index.
//!
//! One JSON file (`index.json`) per course index directory, holding every
//! indexed node plus a reverse map from document identity to the nodes
//! derived from it. Writes go to a temporary file that is renamed over the
//! old one, so readers see either the previous or the new index, never a
//! partial write.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use studybot_core::document::{Document, Node};
use studybot_core::error::IndexError;
use tracing::debug;

pub const INDEX_FILE: &str = "index.json";

const FORMAT_VERSION: u32 = 1;

/// Docstore entry for one indexed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefDocInfo {
    pub node_ids: Vec<String>,

    /// SHA-256 over text and enriched metadata
    pub content_hash: String,

    pub file_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedIndex {
    version: u32,

    pub course: String,

    /// Model the stored embeddings were produced with
    pub embedding_model: String,

    nodes: BTreeMap<String, Node>,

    ref_docs: BTreeMap<String, RefDocInfo>,
}

impl PersistedIndex {
    pub fn new(course: impl Into<String>, embedding_model: impl Into<String>) -> Self {
        Self {
            version: FORMAT_VERSION,
            course: course.into(),
            embedding_model: embedding_model.into(),
            nodes: BTreeMap::new(),
            ref_docs: BTreeMap::new(),
        }
    }

    pub fn path(index_dir: &Path) -> PathBuf {
        index_dir.join(INDEX_FILE)
    }

    /// Load the index from `index_dir`. `Ok(None)` when none was persisted yet.
    pub fn load(index_dir: &Path) -> Result<Option<Self>, IndexError> {
        let path = Self::path(index_dir);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(IndexError::Io {
                    path,
                    reason: e.to_string(),
                });
            }
        };

        let index: PersistedIndex =
            serde_json::from_str(&content).map_err(|e| IndexError::Corrupt {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        if index.version != FORMAT_VERSION {
            return Err(IndexError::Corrupt {
                path,
                reason: format!("unsupported index version {}", index.version),
            });
        }

        debug!(
            course = %index.course,
            documents = index.ref_docs.len(),
            nodes = index.nodes.len(),
            "Index loaded"
        );
        Ok(Some(index))
    }

    /// Durably write the index to `index_dir`.
    pub fn persist(&self, index_dir: &Path) -> Result<(), IndexError> {
        let path = Self::path(index_dir);
        let fail = |reason: String| IndexError::Persistence {
            path: path.clone(),
            reason,
        };

        std::fs::create_dir_all(index_dir)
            .map_err(|e| fail(format!("Failed to create index directory: {e}")))?;

        let content =
            serde_json::to_string(self).map_err(|e| fail(format!("Failed to serialize: {e}")))?;

        let tmp = index_dir.join(format!("{INDEX_FILE}.tmp"));
        std::fs::write(&tmp, content).map_err(|e| fail(format!("Failed to write: {e}")))?;
        std::fs::rename(&tmp, &path).map_err(|e| fail(format!("Failed to replace: {e}")))?;

        debug!(course = %self.course, nodes = self.nodes.len(), "Index persisted");
        Ok(())
    }

    /// Insert a document's nodes, replacing any previous version of it.
    pub fn insert_document(&mut self, doc: &Document, content_hash: String, nodes: Vec<Node>) {
        self.remove_document(&doc.id);

        let node_ids = nodes.iter().map(|n| n.id.clone()).collect();
        for node in nodes {
            self.nodes.insert(node.id.clone(), node);
        }
        self.ref_docs.insert(
            doc.id.clone(),
            RefDocInfo {
                node_ids,
                content_hash,
                file_path: doc.metadata.file_path.clone(),
            },
        );
    }

    /// Remove a document and every node derived from it. Returns the number
    /// of nodes removed, `None` if the document was not indexed.
    pub fn remove_document(&mut self, doc_id: &str) -> Option<usize> {
        let info = self.ref_docs.remove(doc_id)?;
        for node_id in &info.node_ids {
            self.nodes.remove(node_id);
        }
        Some(info.node_ids.len())
    }

    pub fn ref_doc(&self, doc_id: &str) -> Option<&RefDocInfo> {
        self.ref_docs.get(doc_id)
    }

    pub fn contains_document(&self, doc_id: &str) -> bool {
        self.ref_docs.contains_key(doc_id)
    }

    /// Indexed document identities in sorted order.
    pub fn document_ids(&self) -> Vec<String> {
        self.ref_docs.keys().cloned().collect()
    }

    pub fn document_count(&self) -> usize {
        self.ref_docs.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// All nodes in node-id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }
}

/// Change-detection hash over a document's text and metadata.
///
/// Metadata is part of the hash so that a manifest change (new priority,
/// new link) re-indexes the document.
pub fn content_hash(doc: &Document) -> String {
    let mut hasher = Sha256::new();
    hasher.update(doc.text.as_bytes());
    hasher.update([0u8]);
    // Field order is fixed by the struct definition, so this is stable.
    if let Ok(meta) = serde_json::to_vec(&doc.metadata) {
        hasher.update(&meta);
    }
    hex::encode(hasher.finalize())
}
