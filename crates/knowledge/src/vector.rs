//! Vector similarity search over indexed nodes.

use studybot_core::document::{Node, ScoredNode};

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if either vector is zero-length or empty.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Return the `limit` nodes most similar to `query_embedding`.
///
/// Results are sorted by descending similarity; equal scores keep the input
/// order. Nodes without an embedding are skipped. Returned nodes have their
/// embedding stripped.
pub fn vector_search<'a, I>(nodes: I, query_embedding: &[f32], limit: usize) -> Vec<ScoredNode>
where
    I: IntoIterator<Item = &'a Node>,
{
    let mut scored: Vec<ScoredNode> = nodes
        .into_iter()
        .filter(|node| !node.embedding.is_empty())
        .map(|node| ScoredNode {
            score: cosine_similarity(&node.embedding, query_embedding),
            node: Node {
                embedding: Vec::new(),
                ..node.clone()
            },
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(limit);
    scored
}
