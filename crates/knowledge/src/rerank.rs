//! Retrieval-time node postprocessing.
//!
//! [`PriorityReranker`] multiplies each node's similarity score by its
//! source's manifest priority (1.0 when unset) and re-sorts descending.
//! The sort is stable: nodes with equal adjusted scores keep their
//! pre-rerank order, which keeps evaluation runs reproducible.

use studybot_core::document::ScoredNode;

/// A stage applied to retrieved nodes before they leave the retriever.
pub trait NodePostprocessor: Send + Sync {
    fn name(&self) -> &str;

    fn postprocess(&self, nodes: Vec<ScoredNode>, query: &str) -> Vec<ScoredNode>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PriorityReranker;

impl NodePostprocessor for PriorityReranker {
    fn name(&self) -> &str {
        "priority_reranker"
    }

    fn postprocess(&self, mut nodes: Vec<ScoredNode>, _query: &str) -> Vec<ScoredNode> {
        for scored in &mut nodes {
            let priority = scored.node.metadata.priority_or_default();
            scored.score = (scored.score as f64 * priority) as f32;
        }

        // Vec::sort_by is stable
        nodes.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studybot_core::document::{DocumentMetadata, Node};

    fn scored(id: &str, score: f32, priority: Option<f64>) -> ScoredNode {
        ScoredNode {
            node: Node {
                id: id.into(),
                doc_id: id.into(),
                chunk_index: 0,
                text: String::new(),
                metadata: DocumentMetadata {
                    priority,
                    ..Default::default()
                },
                embedding: vec![],
            },
            score,
        }
    }

    fn ids(nodes: &[ScoredNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.node.id.as_str()).collect()
    }

    #[test]
    fn equal_priority_preserves_similarity_order() {
        let nodes = vec![scored("a", 0.9, Some(2.0)), scored("b", 0.7, Some(2.0))];
        let out = PriorityReranker.postprocess(nodes, "q");
        assert_eq!(ids(&out), vec!["a", "b"]);
    }

    #[test]
    fn higher_priority_wins_on_equal_similarity() {
        let nodes = vec![scored("low", 0.8, Some(1.0)), scored("high", 0.8, Some(1.5))];
        let out = PriorityReranker.postprocess(nodes, "q");
        assert_eq!(ids(&out), vec!["high", "low"]);
    }

    #[test]
    fn trusted_source_outranks_closer_match() {
        let nodes = vec![scored("blog", 0.9, Some(0.5)), scored("regulation", 0.6, Some(3.0))];
        let out = PriorityReranker.postprocess(nodes, "q");
        assert_eq!(ids(&out), vec!["regulation", "blog"]);
        assert!((out[0].score - 1.8).abs() < 1e-6);
        assert!((out[1].score - 0.45).abs() < 1e-6);
    }

    #[test]
    fn missing_priority_defaults_to_one() {
        let out = PriorityReranker.postprocess(vec![scored("x", 0.42, None)], "q");
        assert!((out[0].score - 0.42).abs() < 1e-6);
    }

    #[test]
    fn ties_keep_original_order() {
        let nodes = vec![
            scored("first", 0.5, Some(2.0)),
            scored("second", 1.0, Some(1.0)),
            scored("third", 0.25, Some(4.0)),
        ];
        let out = PriorityReranker.postprocess(nodes, "q");
        assert_eq!(ids(&out), vec!["first", "second", "third"]);
    }
}
