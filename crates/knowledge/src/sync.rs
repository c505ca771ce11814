//! Index synchronizer.
//!
//! Makes a course's persisted index equal, in document membership and
//! content, to the enriched corpus on disk. Each pass runs to completion:
//!
//! 1. **Bootstrap**: no persisted index (or one built with another embedding
//!    model) ⇒ build from the enriched documents and persist.
//! 2. **Load** the persisted index.
//! 3. **Prune** documents whose file no longer exists; persist.
//! 4. **Reconcile** against the freshly enriched documents: insert new ones,
//!    replace changed ones (content hash), evict ones that lost their
//!    manifest entry; persist.
//!
//! Prune always runs before reconcile so a deleted document can never be
//! resurrected. A pass for one course holds that course's lock for its whole
//! duration; passes for different courses run independently.

use crate::chunker::Chunker;
use crate::enricher::{self, Enrichment, OrphanDocument};
use crate::index::{self, PersistedIndex};
use crate::loader::DirectoryLoader;
use crate::manifest::SourceManifest;
use chrono::Utc;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use studybot_config::{KnowledgeConfig, ProviderConfig};
use studybot_core::course::{CourseId, CourseLayout};
use studybot_core::document::{Document, Node};
use studybot_core::error::{IndexError, Result};
use studybot_core::event::{DomainEvent, EventBus};
use studybot_core::provider::{EmbeddingRequest, Provider};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Everything a synchronization pass needs besides the provider.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub manifest_file: String,
    pub supported_extensions: Vec<String>,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embedding_model: String,
    pub embedding_batch_size: usize,
}

impl SyncSettings {
    pub fn from_config(provider: &ProviderConfig, knowledge: &KnowledgeConfig) -> Self {
        Self {
            manifest_file: knowledge.manifest_file.clone(),
            supported_extensions: knowledge.supported_extensions.clone(),
            chunk_size: knowledge.chunk_size,
            chunk_overlap: knowledge.chunk_overlap,
            embedding_model: provider.embedding_model.clone(),
            embedding_batch_size: knowledge.embedding_batch_size,
        }
    }
}

/// Outcome of one synchronization pass.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub course: CourseId,

    /// The index was built from scratch in this pass
    pub bootstrapped: bool,

    pub added: Vec<String>,
    pub replaced: Vec<String>,
    pub unchanged: usize,

    /// Removed because the file disappeared from disk
    pub pruned: Vec<String>,

    /// Removed because the file lost its manifest entry
    pub evicted: Vec<String>,

    pub orphans: Vec<OrphanDocument>,

    pub document_count: usize,
    pub node_count: usize,
}

impl SyncReport {
    fn new(course: CourseId) -> Self {
        Self {
            course,
            bootstrapped: false,
            added: Vec::new(),
            replaced: Vec::new(),
            unchanged: 0,
            pruned: Vec::new(),
            evicted: Vec::new(),
            orphans: Vec::new(),
            document_count: 0,
            node_count: 0,
        }
    }

    /// Whether the pass changed the index.
    pub fn changed(&self) -> bool {
        self.bootstrapped
            || !self.added.is_empty()
            || !self.replaced.is_empty()
            || !self.pruned.is_empty()
            || !self.evicted.is_empty()
    }
}

pub struct IndexSynchronizer {
    provider: Arc<dyn Provider>,
    settings: SyncSettings,
    chunker: Chunker,
    loader: DirectoryLoader,
    locks: Mutex<HashMap<CourseId, Arc<Mutex<()>>>>,
    event_bus: Option<Arc<EventBus>>,
}

impl IndexSynchronizer {
    pub fn new(provider: Arc<dyn Provider>, settings: SyncSettings) -> Self {
        let chunker = Chunker::new(settings.chunk_size, settings.chunk_overlap);
        let loader = DirectoryLoader::new(settings.supported_extensions.iter().cloned())
            .excluding(settings.manifest_file.clone());
        Self {
            provider,
            settings,
            chunker,
            loader,
            locks: Mutex::new(HashMap::new()),
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    async fn course_lock(&self, course: &CourseId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(course.clone()).or_default().clone()
    }

    fn publish(&self, event: DomainEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }

    /// Run one full synchronization pass for a course.
    ///
    /// On error nothing after the last successful persist is kept; the caller
    /// retries the whole pass.
    pub async fn sync_course(&self, layout: &CourseLayout) -> Result<SyncReport> {
        self.run(layout, false).await
    }

    /// Discard the persisted index and build it again from scratch.
    pub async fn rebuild_course(&self, layout: &CourseLayout) -> Result<SyncReport> {
        self.run(layout, true).await
    }

    /// Synchronize (or rebuild) every course. A failing course does not
    /// stop the others.
    pub async fn sync_all(
        &self,
        layouts: &[CourseLayout],
        rebuild: bool,
    ) -> Vec<(CourseId, Result<SyncReport>)> {
        let mut results = Vec::with_capacity(layouts.len());
        for layout in layouts {
            let result = self.run(layout, rebuild).await;
            if let Err(e) = &result {
                warn!(course = %layout.id, error = %e, "Synchronization failed");
            }
            results.push((layout.id.clone(), result));
        }
        results
    }

    async fn run(&self, layout: &CourseLayout, rebuild: bool) -> Result<SyncReport> {
        let lock = self.course_lock(&layout.id).await;
        let _guard = lock.lock().await;

        info!(course = %layout.id, "Synchronizing index");
        debug!(
            documents_dir = %layout.documents_dir.display(),
            index_dir = %layout.index_dir.display(),
            "Course layout"
        );

        // A bad manifest aborts before anything is persisted.
        let manifest =
            SourceManifest::load(&layout.documents_dir.join(&self.settings.manifest_file))?;

        let existing = if rebuild {
            None
        } else {
            PersistedIndex::load(&layout.index_dir)?
        };

        let existing = match existing {
            Some(index) if index.embedding_model != self.settings.embedding_model => {
                warn!(
                    course = %layout.id,
                    stored = %index.embedding_model,
                    configured = %self.settings.embedding_model,
                    "Embedding model changed, rebuilding index"
                );
                None
            }
            other => other,
        };

        let report = match existing {
            None => self.bootstrap(layout, &manifest).await?,
            Some(mut index) => {
                // Read the corpus before touching the index: an unreadable
                // document fails the pass instead of looking deleted.
                let enrichment = self.load_enriched(layout, &manifest)?;
                let mut report = SyncReport::new(layout.id.clone());
                self.prune(layout, &mut index, &mut report)?;
                self.reconcile(layout, enrichment, &mut index, &mut report)
                    .await?;
                report
            }
        };

        info!(
            course = %layout.id,
            bootstrapped = report.bootstrapped,
            added = report.added.len(),
            replaced = report.replaced.len(),
            unchanged = report.unchanged,
            pruned = report.pruned.len(),
            evicted = report.evicted.len(),
            orphans = report.orphans.len(),
            nodes = report.node_count,
            "Index synchronized"
        );
        self.publish(DomainEvent::IndexSynchronized {
            course: layout.id.to_string(),
            added: report.added.len(),
            replaced: report.replaced.len(),
            removed: report.pruned.len() + report.evicted.len(),
            node_count: report.node_count,
            timestamp: Utc::now(),
        });

        Ok(report)
    }

    fn load_enriched(&self, layout: &CourseLayout, manifest: &SourceManifest) -> Result<Enrichment> {
        let documents = self.loader.load(&layout.documents_dir)?;
        Ok(enricher::enrich(
            documents,
            manifest,
            &self.settings.manifest_file,
        ))
    }

    async fn bootstrap(&self, layout: &CourseLayout, manifest: &SourceManifest) -> Result<SyncReport> {
        info!(course = %layout.id, "Building index from documents");
        let enrichment = self.load_enriched(layout, manifest)?;

        let mut report = SyncReport::new(layout.id.clone());
        report.bootstrapped = true;
        report.orphans = enrichment.orphans;

        let mut index = PersistedIndex::new(layout.id.as_str(), &self.settings.embedding_model);
        for doc in &enrichment.documents {
            let nodes = self.embed_document(doc).await?;
            index.insert_document(doc, index::content_hash(doc), nodes);
            report.added.push(doc.id.clone());
        }

        index.persist(&layout.index_dir)?;
        report.document_count = index.document_count();
        report.node_count = index.node_count();
        Ok(report)
    }

    fn prune(
        &self,
        layout: &CourseLayout,
        index: &mut PersistedIndex,
        report: &mut SyncReport,
    ) -> Result<()> {
        for doc_id in index.document_ids() {
            if layout.documents_dir.join(&doc_id).exists() {
                continue;
            }
            debug!(course = %layout.id, doc = %doc_id, "Deleting missing document");
            index.remove_document(&doc_id);
            self.publish(DomainEvent::DocumentPruned {
                course: layout.id.to_string(),
                doc_id: doc_id.clone(),
                timestamp: Utc::now(),
            });
            report.pruned.push(doc_id);
        }

        if !report.pruned.is_empty() {
            index.persist(&layout.index_dir)?;
        }
        Ok(())
    }

    async fn reconcile(
        &self,
        layout: &CourseLayout,
        enrichment: Enrichment,
        index: &mut PersistedIndex,
        report: &mut SyncReport,
    ) -> Result<()> {
        report.orphans = enrichment.orphans;

        let mut current = HashSet::new();
        for doc in &enrichment.documents {
            current.insert(doc.id.clone());
            let hash = index::content_hash(doc);

            let previous = index.ref_doc(&doc.id).map(|info| info.content_hash.clone());
            match previous {
                Some(prev) if prev == hash => report.unchanged += 1,
                Some(_) => {
                    let nodes = self.embed_document(doc).await?;
                    index.insert_document(doc, hash, nodes);
                    report.replaced.push(doc.id.clone());
                }
                None => {
                    let nodes = self.embed_document(doc).await?;
                    index.insert_document(doc, hash, nodes);
                    report.added.push(doc.id.clone());
                }
            }
        }

        for doc_id in index.document_ids() {
            if !current.contains(&doc_id) {
                debug!(course = %layout.id, doc = %doc_id, "Evicting document without manifest entry");
                index.remove_document(&doc_id);
                report.evicted.push(doc_id);
            }
        }

        if report.changed() {
            index.persist(&layout.index_dir)?;
        }
        report.document_count = index.document_count();
        report.node_count = index.node_count();
        Ok(())
    }

    /// Chunk a document and embed every chunk.
    async fn embed_document(&self, doc: &Document) -> Result<Vec<Node>> {
        let chunks = self.chunker.split(&doc.text);
        if chunks.is_empty() {
            warn!(doc = %doc.id, "Document has no text, indexing it without nodes");
            return Ok(Vec::new());
        }

        let mut embeddings = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.settings.embedding_batch_size.max(1)) {
            let request = EmbeddingRequest {
                model: self.settings.embedding_model.clone(),
                inputs: batch.iter().map(|c| c.text.clone()).collect(),
            };
            let response = self
                .provider
                .embed(request)
                .await
                .map_err(|e| IndexError::Embedding(e.to_string()))?;
            if response.embeddings.len() != batch.len() {
                return Err(IndexError::Embedding(format!(
                    "expected {} embeddings for '{}', got {}",
                    batch.len(),
                    doc.id,
                    response.embeddings.len()
                ))
                .into());
            }
            embeddings.extend(response.embeddings);
        }

        let nodes = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (chunk, embedding))| {
                let mut metadata = doc.metadata.clone();
                metadata.page_label = chunk.page_label;
                Node {
                    id: Node::node_id(&doc.id, i),
                    doc_id: doc.id.clone(),
                    chunk_index: i,
                    text: chunk.text,
                    metadata,
                    embedding,
                }
            })
            .collect();
        Ok(nodes)
    }
}
