//! Citation aggregation.
//!
//! Collapses the passages that grounded an answer into one numbered entry
//! per distinct source link, in first-seen order, with the page labels of
//! all passages from that source merged.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use studybot_config::CitationConfig;
use studybot_core::document::ScoredNode;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Display name of the source
    pub name: String,

    pub link: String,

    /// Distinct page labels, numeric-aware sorted
    pub pages: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CitationAggregator {
    no_link_marker: String,
    max_sources: Option<usize>,
}

impl CitationAggregator {
    pub fn new(no_link_marker: impl Into<String>) -> Self {
        Self {
            no_link_marker: no_link_marker.into(),
            max_sources: None,
        }
    }

    pub fn from_config(config: &CitationConfig) -> Self {
        Self {
            no_link_marker: config.no_link_marker.clone(),
            max_sources: config.max_sources,
        }
    }

    pub fn with_max_sources(mut self, max: usize) -> Self {
        self.max_sources = Some(max);
        self
    }

    pub fn aggregate(&self, passages: &[ScoredNode]) -> Vec<Citation> {
        // (name, link, pages) in first-seen order of link
        let mut groups: Vec<(String, String, BTreeSet<String>)> = Vec::new();

        for scored in passages {
            let meta = &scored.node.metadata;
            let Some(link) = meta.source_link.as_deref().map(str::trim) else {
                continue;
            };
            if link.is_empty() || link == self.no_link_marker {
                continue;
            }

            let idx = match groups.iter().position(|(_, l, _)| l == link) {
                Some(idx) => idx,
                None => {
                    let name = meta.name.clone().unwrap_or_else(|| meta.file_name.clone());
                    groups.push((name, link.to_string(), BTreeSet::new()));
                    groups.len() - 1
                }
            };
            if let Some(page) = meta.page_label.as_deref().filter(|p| !p.is_empty()) {
                groups[idx].2.insert(page.to_string());
            }
        }

        let limit = self.max_sources.unwrap_or(usize::MAX);
        groups
            .into_iter()
            .take(limit)
            .map(|(name, link, pages)| Citation {
                name,
                link,
                pages: sort_page_labels(pages),
            })
            .collect()
    }
}

/// Numeric labels first in numeric order, then the rest lexically.
pub fn sort_page_labels<I: IntoIterator<Item = String>>(labels: I) -> Vec<String> {
    let mut labels: Vec<String> = labels.into_iter().collect();
    labels.sort_by(|a, b| match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    });
    labels.dedup();
    labels
}

/// Render the citation block appended to an answer. Empty when there are no
/// citations.
pub fn render_citations(citations: &[Citation], config: &CitationConfig) -> String {
    if citations.is_empty() {
        return String::new();
    }

    let mut out = format!("\n\n{}", config.heading);
    for (i, citation) in citations.iter().enumerate() {
        out.push_str(&format!("\n [{}] [{}]({})", i + 1, citation.name, citation.link));
        if !citation.pages.is_empty() {
            let label = if citation.pages.len() > 1 {
                &config.pages_label
            } else {
                &config.page_label
            };
            out.push_str(&format!(", {label}: {}", citation.pages.join(", ")));
        }
    }
    out
}
