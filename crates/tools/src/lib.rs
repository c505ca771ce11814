//! The two capabilities of a studybot reasoning session.
//!
//! - [`course_retrieval`]: similarity search + priority reranking over the
//!   course index
//! - [`log_unanswered`]: durably records the session's question as
//!   unanswerable
//!
//! Both are built fresh for every query; the log tool is bound to that
//! query's question.

pub mod course_retrieval;
pub mod log_unanswered;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use course_retrieval::CourseRetrievalTool;
pub use log_unanswered::LogUnansweredTool;

use studybot_core::tool::CapabilitySet;

/// Assemble the closed capability set for one session.
pub fn capability_set(retrieval: CourseRetrievalTool, log_unanswered: LogUnansweredTool) -> CapabilitySet {
    CapabilitySet::new(Box::new(retrieval), Box::new(log_unanswered))
}
