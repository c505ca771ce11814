//! Metadata enricher.
//!
//! Attaches manifest trust metadata to loaded documents. Documents without a
//! manifest entry are skipped with a warning and reported as orphans; they
//! never reach the index.

use crate::manifest::SourceManifest;
use serde::{Deserialize, Serialize};
use studybot_core::document::Document;
use tracing::{debug, warn};

/// A document on disk that has no manifest entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanDocument {
    pub file_name: String,
    pub path: String,
}

/// Result of enriching one course's documents.
#[derive(Debug, Clone, Default)]
pub struct Enrichment {
    /// Documents with every trust field populated
    pub documents: Vec<Document>,

    pub orphans: Vec<OrphanDocument>,
}

/// Enrich `documents` from `manifest`.
///
/// `manifest_file` is the manifest's own base name; a document with that
/// name is dropped silently even if a loader let it through.
pub fn enrich(documents: Vec<Document>, manifest: &SourceManifest, manifest_file: &str) -> Enrichment {
    let mut enrichment = Enrichment::default();

    for mut doc in documents {
        if doc.metadata.file_name == manifest_file {
            continue;
        }

        let Some(entry) = manifest.find(&doc.metadata.file_name) else {
            warn!(
                file = %doc.metadata.file_name,
                "Document not indexed: no entry in the source manifest"
            );
            enrichment.orphans.push(OrphanDocument {
                file_name: doc.metadata.file_name.clone(),
                path: doc.metadata.file_path.clone(),
            });
            continue;
        };

        doc.metadata.priority = Some(entry.priority);
        doc.metadata.name = Some(entry.name.clone());
        doc.metadata.source_link = Some(entry.web_link.clone());
        doc.metadata.description = Some(entry.description.clone());
        enrichment.documents.push(doc);
    }

    debug!(
        enriched = enrichment.documents.len(),
        orphans = enrichment.orphans.len(),
        "Metadata enrichment complete"
    );
    enrichment
}
