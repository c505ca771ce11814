//! Query-time retrieval over a course's persisted index.
//!
//! Embeds the query, takes the `top_k` most similar nodes, then runs the
//! postprocessors (by default only the [`PriorityReranker`]). The index is
//! read from disk on every call, so a concurrent synchronization pass is
//! picked up on the next query.

use crate::index::PersistedIndex;
use crate::rerank::{NodePostprocessor, PriorityReranker};
use crate::vector;
use std::sync::Arc;
use studybot_core::course::CourseLayout;
use studybot_core::document::ScoredNode;
use studybot_core::error::{IndexError, Result};
use studybot_core::provider::{EmbeddingRequest, Provider};
use tracing::debug;

pub struct Retriever {
    provider: Arc<dyn Provider>,
    embedding_model: String,
    top_k: usize,
    postprocessors: Vec<Box<dyn NodePostprocessor>>,
}

impl Retriever {
    pub fn new(provider: Arc<dyn Provider>, embedding_model: impl Into<String>, top_k: usize) -> Self {
        Self {
            provider,
            embedding_model: embedding_model.into(),
            top_k,
            postprocessors: vec![Box::new(PriorityReranker)],
        }
    }

    /// Replace the default postprocessor chain.
    pub fn with_postprocessors(mut self, postprocessors: Vec<Box<dyn NodePostprocessor>>) -> Self {
        self.postprocessors = postprocessors;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub async fn retrieve(&self, layout: &CourseLayout, query: &str) -> Result<Vec<ScoredNode>> {
        let index = PersistedIndex::load(&layout.index_dir)?
            .ok_or_else(|| IndexError::NotBuilt(layout.id.to_string()))?;

        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.embedding_model.clone(),
                inputs: vec![query.to_string()],
            })
            .await
            .map_err(|e| IndexError::Embedding(e.to_string()))?;
        let query_embedding = response
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| IndexError::Embedding("no embedding returned for query".into()))?;

        let mut nodes = vector::vector_search(index.nodes(), &query_embedding, self.top_k);
        for postprocessor in &self.postprocessors {
            nodes = postprocessor.postprocess(nodes, query);
        }

        debug!(
            course = %layout.id,
            results = nodes.len(),
            top_score = nodes.first().map(|n| n.score).unwrap_or(0.0),
            "Retrieval complete"
        );
        Ok(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{IndexSynchronizer, SyncSettings};
    use crate::test_helpers::{Corpus, HashEmbedProvider};
    use studybot_config::{KnowledgeConfig, ProviderConfig};
    use studybot_core::error::Error;

    async fn synced(corpus: &Corpus) {
        let settings =
            SyncSettings::from_config(&ProviderConfig::default(), &KnowledgeConfig::default());
        IndexSynchronizer::new(Arc::new(HashEmbedProvider::new()), settings)
            .sync_course(&corpus.layout)
            .await
            .unwrap();
    }

    fn retriever(top_k: usize) -> Retriever {
        Retriever::new(Arc::new(HashEmbedProvider::new()), "bge-m3", top_k)
    }

    #[tokio::test]
    async fn returns_relevant_passages_without_embeddings() {
        let corpus = Corpus::new("wi");
        corpus.add("exams.md", "exam registration deadline", 1.0);
        corpus.add("canteen.md", "canteen menu lunch prices", 1.0);
        synced(&corpus).await;

        let results = retriever(1)
            .retrieve(&corpus.layout, "exam registration deadline")
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].node.doc_id, "exams.md");
        assert!(results[0].node.embedding.is_empty());
        assert_eq!(
            results[0].node.metadata.source_link.as_deref(),
            Some("https://example.edu/exams.md")
        );
    }

    #[tokio::test]
    async fn priority_reorders_equally_similar_passages() {
        let corpus = Corpus::new("wi");
        corpus.add("blog.md", "thesis submission deadline", 1.0);
        corpus.add("regulation.md", "thesis submission deadline", 3.0);
        synced(&corpus).await;

        let results = retriever(2)
            .retrieve(&corpus.layout, "thesis submission deadline")
            .await
            .unwrap();
        assert_eq!(results[0].node.doc_id, "regulation.md");
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn postprocessors_can_be_disabled() {
        let corpus = Corpus::new("wi");
        corpus.add("a.md", "thesis deadline", 1.0);
        corpus.add("b.md", "thesis deadline", 3.0);
        synced(&corpus).await;

        let results = retriever(2)
            .with_postprocessors(vec![])
            .retrieve(&corpus.layout, "thesis deadline")
            .await
            .unwrap();
        // raw cosine, input order kept on ties
        assert_eq!(results[0].node.doc_id, "a.md");
        assert!((results[0].score - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn missing_index_is_not_built() {
        let corpus = Corpus::new("it");
        let err = retriever(3).retrieve(&corpus.layout, "anything").await.unwrap_err();
        assert!(matches!(err, Error::Index(IndexError::NotBuilt(_))));
    }
}
