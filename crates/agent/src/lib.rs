//! The query side of studybot.
//!
//! A query runs a bounded **Thought → Action → Observation** cycle:
//!
//! 1. **Frame** the question with the course preamble and prior history
//! 2. **Ask** the model, offering exactly two capabilities
//! 3. **If a capability is called**: run it, append the observation, loop
//! 4. **If text comes back**: that is the answer; cite the retrieved sources
//!
//! The cycle stops at the answer, when the model declares the question
//! unanswerable, or after `max_iterations` model calls.

pub mod citations;
pub mod pipeline;
pub mod prompt;
pub mod reasoning;
pub mod working_memory;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use citations::{Citation, CitationAggregator, render_citations};
pub use pipeline::{QueryOutcome, QueryPipeline};
pub use reasoning::{LoopOutcome, LoopResult, ReasoningLoop};
pub use working_memory::WorkingMemory;
