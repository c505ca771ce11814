//! Directory loader: turns a course directory into [`Document`]s.

use std::path::Path;
use studybot_core::document::{Document, DocumentMetadata};
use studybot_core::error::IndexError;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Loads every supported file below a course directory.
///
/// Files are visited in sorted order so document lists are reproducible.
/// Hidden files and the excluded names (the manifest) are skipped.
/// Symlinks are followed. Any other entry that cannot be walked or read
/// fails the whole load, so a caller never mistakes it for a deletion.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    extensions: Vec<String>,
    excluded: Vec<String>,
}

impl DirectoryLoader {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.into().trim_start_matches('.').to_lowercase())
                .collect(),
            excluded: Vec::new(),
        }
    }

    /// Never load files with this base name.
    pub fn excluding(mut self, file_name: impl Into<String>) -> Self {
        self.excluded.push(file_name.into());
        self
    }

    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|s| s.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }

    /// True for names the walk would skip anyway. Paths without an
    /// extension may be directories and are never ignored.
    fn is_ignored(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        name.starts_with('.')
            || self.excluded.iter().any(|x| x == name)
            || (path.extension().is_some() && !self.is_supported(path))
    }

    pub fn load(&self, dir: &Path) -> Result<Vec<Document>, IndexError> {
        if !dir.is_dir() {
            return Err(IndexError::Io {
                path: dir.to_path_buf(),
                reason: "course directory does not exist".into(),
            });
        }

        let mut documents = Vec::new();
        for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.path().is_some_and(|p| self.is_ignored(p)) => {
                    debug!(error = %e, "Skipping unreadable ignored entry");
                    continue;
                }
                Err(e) => {
                    return Err(IndexError::Io {
                        path: e.path().unwrap_or(dir).to_path_buf(),
                        reason: e.to_string(),
                    });
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let file_name = entry.file_name().to_string_lossy().to_string();
            if file_name.starts_with('.')
                || self.excluded.contains(&file_name)
                || !self.is_supported(path)
            {
                continue;
            }

            let bytes = std::fs::read(path).map_err(|e| {
                warn!(path = %path.display(), error = %e, "Unreadable document");
                IndexError::Io {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                }
            })?;

            let relative = path.strip_prefix(dir).unwrap_or(path);
            let id = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            documents.push(Document {
                id,
                text: String::from_utf8_lossy(&bytes).into_owned(),
                metadata: DocumentMetadata {
                    file_path: path.to_string_lossy().to_string(),
                    file_name,
                    ..Default::default()
                },
            });
        }

        debug!(dir = %dir.display(), count = documents.len(), "Documents loaded");
        Ok(documents)
    }
}
