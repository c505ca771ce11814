//! Configuration loading, validation, and course layout resolution.
//!
//! Loads configuration from `~/.studybot/config.toml` (or an explicit path)
//! with environment variable overrides. The course-to-directory mapping is
//! resolved here, once, into [`CourseLayout`] values that every other crate
//! consumes as plain data.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use studybot_core::course::{CourseId, CourseLayout};

/// The root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Generative model and embedding endpoint
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Corpus, manifest, and index settings
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Reasoning loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Citation block rendering
    #[serde(default)]
    pub citations: CitationConfig,

    /// The closed set of courses
    #[serde(default = "default_courses")]
    pub courses: Vec<CourseConfig>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_name")]
    pub name: String,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_provider_name() -> String {
    "ollama".into()
}
fn default_api_url() -> String {
    "http://localhost:11434/v1".into()
}
fn default_model() -> String {
    "llama3.1".into()
}
fn default_embedding_model() -> String {
    "bge-m3".into()
}
fn default_temperature() -> f32 {
    0.1
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            api_url: default_api_url(),
            api_key: None,
            model: default_model(),
            embedding_model: default_embedding_model(),
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("api_url", &self.api_url)
            .field(
                "api_key",
                &if self.api_key.is_some() { "[REDACTED]" } else { "None" },
            )
            .field("model", &self.model)
            .field("embedding_model", &self.embedding_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Parent directory of the per-course corpora
    #[serde(default = "default_documents_dir")]
    pub documents_dir: PathBuf,

    /// Parent directory of the per-course persisted indexes
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,

    /// Manifest filename inside each course directory
    #[serde(default = "default_manifest_file")]
    pub manifest_file: String,

    /// Chunk size in words
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in words
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    #[serde(default = "default_embedding_batch_size")]
    pub embedding_batch_size: usize,

    /// File extensions loaded as documents (lowercase, no dot)
    #[serde(default = "default_supported_extensions")]
    pub supported_extensions: Vec<String>,
}

fn default_documents_dir() -> PathBuf {
    PathBuf::from("./data/documents")
}
fn default_index_dir() -> PathBuf {
    PathBuf::from("./data/index")
}
fn default_manifest_file() -> String {
    "sources.json".into()
}
fn default_chunk_size() -> usize {
    256
}
fn default_chunk_overlap() -> usize {
    32
}
fn default_embedding_batch_size() -> usize {
    16
}
fn default_supported_extensions() -> Vec<String> {
    ["txt", "md", "markdown", "html", "htm", "csv"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            documents_dir: default_documents_dir(),
            index_dir: default_index_dir(),
            manifest_file: default_manifest_file(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            embedding_batch_size: default_embedding_batch_size(),
            supported_extensions: default_supported_extensions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Passages returned per retrieval call
    #[serde(default = "default_similarity_top_k")]
    pub similarity_top_k: usize,

    /// Append-only JSONL log of unanswerable questions
    #[serde(default = "default_unanswered_log")]
    pub unanswered_log: PathBuf,

    #[serde(default = "default_cannot_answer_message")]
    pub cannot_answer_message: String,

    #[serde(default = "default_apology_message")]
    pub apology_message: String,

    /// Replace the built-in system preamble entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,
}

fn default_max_iterations() -> u32 {
    10
}
fn default_similarity_top_k() -> usize {
    3
}
fn default_unanswered_log() -> PathBuf {
    PathBuf::from("./data/logs/unanswered.jsonl")
}
fn default_cannot_answer_message() -> String {
    "Unfortunately I cannot answer this question.".into()
}
fn default_apology_message() -> String {
    "Sorry, something went wrong while answering your question. Please try again later.".into()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            similarity_top_k: default_similarity_top_k(),
            unanswered_log: default_unanswered_log(),
            cannot_answer_message: default_cannot_answer_message(),
            apology_message: default_apology_message(),
            system_prompt_override: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitationConfig {
    /// Keep only the first N distinct sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_sources: Option<usize>,

    #[serde(default = "default_heading")]
    pub heading: String,

    #[serde(default = "default_page_label")]
    pub page_label: String,

    #[serde(default = "default_pages_label")]
    pub pages_label: String,

    /// Manifest `web_link` value meaning "no link"
    #[serde(default = "default_no_link_marker")]
    pub no_link_marker: String,
}

fn default_heading() -> String {
    "Sources:".into()
}
fn default_page_label() -> String {
    "page".into()
}
fn default_pages_label() -> String {
    "pages".into()
}
fn default_no_link_marker() -> String {
    "-".into()
}

impl Default for CitationConfig {
    fn default() -> Self {
        Self {
            max_sources: None,
            heading: default_heading(),
            page_label: default_page_label(),
            pages_label: default_pages_label(),
            no_link_marker: default_no_link_marker(),
        }
    }
}

/// One course of the closed course set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseConfig {
    pub code: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Overrides `<knowledge.documents_dir>/<code>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents_dir: Option<PathBuf>,

    /// Overrides `<knowledge.index_dir>/<code>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_dir: Option<PathBuf>,
}

impl CourseConfig {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: None,
            documents_dir: None,
            index_dir: None,
        }
    }
}

fn default_courses() -> Vec<CourseConfig> {
    vec![CourseConfig::new("wi"), CourseConfig::new("it")]
}

impl AppConfig {
    /// Load configuration from the default path (~/.studybot/config.toml)
    /// and apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::config_dir().join("config.toml"))
    }

    /// Load from `path` and apply environment overrides.
    ///
    /// - `STUDYBOT_API_KEY`, `STUDYBOT_MODEL`, `STUDYBOT_API_URL`
    /// - `STUDYBOT_DOCUMENTS_DIR`, `STUDYBOT_INDEX_DIR`
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path. Missing file ⇒ defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("STUDYBOT_API_KEY") {
            self.provider.api_key = Some(key);
        }
        if let Some(model) = lookup("STUDYBOT_MODEL") {
            self.provider.model = model;
        }
        if let Some(url) = lookup("STUDYBOT_API_URL") {
            self.provider.api_url = url;
        }
        if let Some(dir) = lookup("STUDYBOT_DOCUMENTS_DIR") {
            self.knowledge.documents_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("STUDYBOT_INDEX_DIR") {
            self.knowledge.index_dir = PathBuf::from(dir);
        }
    }

    pub fn config_dir() -> PathBuf {
        dirs_home().join(".studybot")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.temperature < 0.0 || self.provider.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "provider.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be > 0".into(),
            ));
        }
        if self.agent.similarity_top_k == 0 {
            return Err(ConfigError::ValidationError(
                "agent.similarity_top_k must be > 0".into(),
            ));
        }
        if self.knowledge.chunk_size == 0 || self.knowledge.chunk_overlap >= self.knowledge.chunk_size
        {
            return Err(ConfigError::ValidationError(
                "knowledge.chunk_overlap must be smaller than a non-zero knowledge.chunk_size".into(),
            ));
        }
        if self.knowledge.embedding_batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "knowledge.embedding_batch_size must be > 0".into(),
            ));
        }

        let mut seen = HashSet::new();
        for course in &self.courses {
            if course.code.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "course code must not be empty".into(),
                ));
            }
            if !seen.insert(course.code.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate course code '{}'",
                    course.code
                )));
            }
        }

        Ok(())
    }

    /// Resolve every configured course into its corpus/index layout.
    pub fn course_layouts(&self) -> Vec<CourseLayout> {
        self.courses.iter().map(|c| self.layout_for(c)).collect()
    }

    /// Resolve one course by code.
    pub fn course_layout(&self, code: &str) -> Result<CourseLayout, ConfigError> {
        self.courses
            .iter()
            .find(|c| c.code == code)
            .map(|c| self.layout_for(c))
            .ok_or_else(|| ConfigError::UnknownCourse(code.to_string()))
    }

    fn layout_for(&self, course: &CourseConfig) -> CourseLayout {
        let documents_dir = course
            .documents_dir
            .clone()
            .unwrap_or_else(|| self.knowledge.documents_dir.join(&course.code));
        let index_dir = course
            .index_dir
            .clone()
            .unwrap_or_else(|| self.knowledge.index_dir.join(&course.code));
        let layout = CourseLayout::new(CourseId::new(&course.code), documents_dir, index_dir);
        match &course.name {
            Some(name) => layout.with_name(name),
            None => layout,
        }
    }

    /// Generate a default config TOML string (for `studybot config`).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            knowledge: KnowledgeConfig::default(),
            agent: AgentConfig::default(),
            citations: CitationConfig::default(),
            courses: default_courses(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Unknown course '{0}'")]
    UnknownCourse(String),
}
