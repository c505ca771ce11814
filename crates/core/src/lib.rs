//! # studybot core
//!
//! Domain types, traits, and error definitions for the studybot course
//! assistant. This crate performs no I/O; it defines the model that the
//! knowledge, tools, and agent crates implement against.
//!
//! - [`course`]: the closed set of course identifiers and their corpus/index layout
//! - [`document`]: loaded documents, indexed nodes, and retrieval scores
//! - [`provider`]: the generative model / embedding service boundary
//! - [`tool`]: the two capabilities the reasoning loop may invoke

pub mod course;
pub mod document;
pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use course::{CourseId, CourseLayout};
pub use document::{Document, DocumentMetadata, Node, ScoredNode};
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use message::{ChatHistory, Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition};
pub use tool::{Capability, CapabilitySet, Tool, ToolCall, ToolResult};
