//! Document and node value objects.
//!
//! A [`Document`] is one physical file of a course corpus. Indexing splits it
//! into [`Node`]s that inherit the document's metadata. At query time nodes
//! come back as [`ScoredNode`]s whose score may be rescaled by postprocessors.

use serde::{Deserialize, Serialize};

/// Metadata carried by a document and copied onto each of its nodes.
///
/// `file_path` / `file_name` are set by the loader. The trust fields are
/// attached by the metadata enricher from the course manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Path of the physical file on disk
    pub file_path: String,

    /// Base filename, the manifest lookup key
    pub file_name: String,

    /// Trust weight, larger = more trusted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<f64>,

    /// Display name of the source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Canonical link to the source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_link: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Page/location label, only present on nodes of paged documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_label: Option<String>,
}

impl DocumentMetadata {
    /// The priority multiplier used for reranking; 1.0 when unset.
    pub fn priority_or_default(&self) -> f64 {
        self.priority.unwrap_or(1.0)
    }

    /// Whether all manifest-derived fields are populated.
    pub fn is_enriched(&self) -> bool {
        self.priority.is_some()
            && self.name.is_some()
            && self.source_link.is_some()
            && self.description.is_some()
    }
}

/// A loaded source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Stable identity derived from the file path relative to the course
    /// directory; the index's deduplication key.
    pub id: String,

    /// Raw text content
    pub text: String,

    pub metadata: DocumentMetadata,
}

/// An indexed chunk of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// `<doc_id>#<chunk_index>`
    pub id: String,

    /// Identity of the parent document
    pub doc_id: String,

    pub chunk_index: usize,

    pub text: String,

    pub metadata: DocumentMetadata,

    /// Embedding vector; empty on nodes handed out by retrieval
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
}

impl Node {
    pub fn node_id(doc_id: &str, chunk_index: usize) -> String {
        format!("{doc_id}#{chunk_index}")
    }
}

/// A node with a transient, per-query similarity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredNode {
    pub node: Node,
    pub score: f32,
}
