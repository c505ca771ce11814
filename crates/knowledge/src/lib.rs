//! # studybot knowledge
//!
//! The course corpus side of studybot: reading the source manifest, loading
//! and enriching documents, keeping the persisted per-course index in sync
//! with disk, and priority-ranked retrieval at query time.
//!
//! - [`manifest`]: the per-course `sources.json` trust metadata
//! - [`enricher`]: attaches manifest metadata, reports orphan documents
//! - [`sync`]: bootstrap / prune / reconcile passes per course
//! - [`retriever`]: similarity search + [`rerank::PriorityReranker`]
//! - [`unanswered`]: the durable unanswered-questions log

pub mod chunker;
pub mod enricher;
pub mod index;
pub mod loader;
pub mod manifest;
pub mod rerank;
pub mod retriever;
pub mod sync;
pub mod unanswered;
pub mod vector;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use enricher::{Enrichment, OrphanDocument};
pub use index::PersistedIndex;
pub use manifest::{ManifestEntry, SourceManifest};
pub use rerank::{NodePostprocessor, PriorityReranker};
pub use retriever::Retriever;
pub use sync::{IndexSynchronizer, SyncReport, SyncSettings};
pub use unanswered::{UnansweredEntry, UnansweredLog, UnansweredReason};
