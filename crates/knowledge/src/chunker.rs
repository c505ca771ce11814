//! Word-window chunking with page labels.
//!
//! Text is first split into pages on form feeds (`\u{c}`), the page separator
//! emitted by text extractors. Each page is then cut into windows of
//! `chunk_size` words overlapping by `overlap` words. Text without a form
//! feed is treated as a single unpaged document.

/// One chunk of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub text: String,

    /// 1-based page number, only for paged text
    pub page_label: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    /// `overlap` is clamped below `chunk_size` so every window advances.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    pub fn split(&self, text: &str) -> Vec<Chunk> {
        if !text.contains('\u{c}') {
            return self
                .windows(text)
                .into_iter()
                .map(|text| Chunk {
                    text,
                    page_label: None,
                })
                .collect();
        }

        let mut chunks = Vec::new();
        for (page_idx, page_text) in text.split('\u{c}').enumerate() {
            let label = (page_idx + 1).to_string();
            for window in self.windows(page_text) {
                chunks.push(Chunk {
                    text: window,
                    page_label: Some(label.clone()),
                });
            }
        }
        chunks
    }

    fn windows(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let step = self.chunk_size - self.overlap;

        let mut windows = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let end = (start + self.chunk_size).min(words.len());
            windows.push(words[start..end].join(" "));
            if end == words.len() {
                break;
            }
            start += step;
        }
        windows
    }
}
