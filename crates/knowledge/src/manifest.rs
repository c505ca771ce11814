//! Per-course source manifest.
//!
//! Every course directory holds one manifest (by default `sources.json`)
//! mapping physical filenames to trust metadata:
//!
//! ```json
//! { "sources": [ { "file": "handbook.md", "name": "Student Handbook",
//!                  "priority": 2.0, "web_link": "https://...",
//!                  "description": "..." } ] }
//! ```
//!
//! The manifest is re-read on every synchronization pass; nothing is cached.

use serde::{Deserialize, Serialize};
use std::path::Path;
use studybot_core::error::ManifestError;
use tracing::{debug, warn};

/// Trust metadata for one physical document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Base filename of the document this entry describes
    pub file: String,

    /// Display name
    pub name: String,

    /// Trust weight, larger = more trusted
    pub priority: f64,

    /// Canonical link, or the no-link marker
    pub web_link: String,

    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceManifest {
    pub sources: Vec<ManifestEntry>,
}

impl SourceManifest {
    /// Read and parse the manifest at `path`.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ManifestError::Missing {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => {
                return Err(ManifestError::Unreadable {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        };

        let manifest = Self::parse(path, &content)?;
        debug!(path = %path.display(), entries = manifest.sources.len(), "Manifest loaded");
        Ok(manifest)
    }

    /// Parse manifest JSON. `path` is only used for error reporting.
    pub fn parse(path: &Path, content: &str) -> Result<Self, ManifestError> {
        let manifest: SourceManifest =
            serde_json::from_str(content).map_err(|e| ManifestError::Malformed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        for entry in &manifest.sources {
            if !(entry.priority.is_finite() && entry.priority > 0.0) {
                return Err(ManifestError::Malformed {
                    path: path.to_path_buf(),
                    reason: format!(
                        "priority of '{}' must be a positive number, got {}",
                        entry.file, entry.priority
                    ),
                });
            }
        }

        let mut seen = std::collections::HashSet::new();
        for entry in &manifest.sources {
            if !seen.insert(entry.file.as_str()) {
                warn!(file = %entry.file, "Duplicate manifest entry, the first one wins");
            }
        }

        Ok(manifest)
    }

    /// Look up the entry for a physical base filename.
    pub fn find(&self, file_name: &str) -> Option<&ManifestEntry> {
        self.sources.iter().find(|e| e.file == file_name)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const MANIFEST: &str = r#"{
        "sources": [
            {"file": "handbook.md", "name": "Student Handbook", "priority": 2.0,
             "web_link": "https://example.edu/handbook", "description": "Rules"},
            {"file": "faq.txt", "name": "FAQ", "priority": 0.5,
             "web_link": "-", "description": "Student council FAQ"}
        ]
    }"#;

    #[test]
    fn parse_and_find() {
        let manifest = SourceManifest::parse(&PathBuf::from("sources.json"), MANIFEST).unwrap();
        assert_eq!(manifest.len(), 2);

        let entry = manifest.find("handbook.md").unwrap();
        assert_eq!(entry.name, "Student Handbook");
        assert_eq!(entry.priority, 2.0);
        assert!(manifest.find("missing.pdf").is_none());
    }

    #[test]
    fn missing_file_is_manifest_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SourceManifest::load(&dir.path().join("sources.json")).unwrap_err();
        assert!(matches!(err, ManifestError::Missing { .. }));
    }

    #[test]
    fn invalid_json_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sources.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = SourceManifest::load(&path).unwrap_err();
        assert!(matches!(err, ManifestError::Malformed { .. }));
    }

    #[test]
    fn missing_field_is_malformed() {
        let json = r#"{"sources": [{"file": "a.md", "name": "A", "priority": 1.0}]}"#;
        let err = SourceManifest::parse(&PathBuf::from("m.json"), json).unwrap_err();
        assert!(matches!(err, ManifestError::Malformed { .. }));
    }

    #[test]
    fn non_positive_priority_is_rejected() {
        let json = r#"{"sources": [{"file": "a.md", "name": "A", "priority": 0,
            "web_link": "-", "description": ""}]}"#;
        let err = SourceManifest::parse(&PathBuf::from("m.json"), json).unwrap_err();
        assert!(err.to_string().contains("positive"));
    }

    #[test]
    fn duplicate_entries_first_wins() {
        let json = r#"{"sources": [
            {"file": "a.md", "name": "First", "priority": 1, "web_link": "-", "description": ""},
            {"file": "a.md", "name": "Second", "priority": 3, "web_link": "-", "description": ""}
        ]}"#;
        let manifest = SourceManifest::parse(&PathBuf::from("m.json"), json).unwrap();
        assert_eq!(manifest.find("a.md").unwrap().name, "First");
    }
}
