//! Course identifiers and their on-disk layout.
//!
//! A course is a closed set of codes declared once in configuration. Paths
//! are resolved there and travel as plain data in a [`CourseLayout`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Short course code (e.g. `wi`, `it`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseId(String);

impl CourseId {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CourseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CourseId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Where a course's corpus and persisted index live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseLayout {
    pub id: CourseId,

    /// Human-readable course name
    pub name: String,

    /// Directory holding the source documents and the manifest
    pub documents_dir: PathBuf,

    /// Directory holding the persisted index for this course
    pub index_dir: PathBuf,
}

impl CourseLayout {
    pub fn new(
        id: impl Into<CourseId>,
        documents_dir: impl Into<PathBuf>,
        index_dir: impl Into<PathBuf>,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.to_string(),
            id,
            documents_dir: documents_dir.into(),
            index_dir: index_dir.into(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}
