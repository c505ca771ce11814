//! The bounded, tool-augmented reasoning loop.
//!
//! `Start → {ToolCall}* → Answer | Unanswerable | Exhausted`
//!
//! Every iteration is one model call. A reply without tool calls is the
//! answer. A reply with tool calls executes the first one only; any further
//! calls in the same reply are answered with an "ignored" observation so
//! the conversation stays well-formed. Calling the log-unanswered
//! capability ends the session. After `max_iterations` model calls without
//! an answer the session is exhausted.
//!
//! Passages returned by retrieval are collected, deduplicated by node id in
//! first-seen order, as the grounding set for citations.

use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use studybot_core::document::ScoredNode;
use studybot_core::error::{Error, ToolError};
use studybot_core::event::{DomainEvent, EventBus};
use studybot_core::message::{ChatHistory, Message, MessageToolCall};
use studybot_core::provider::{Provider, ProviderRequest};
use studybot_core::tool::{Capability, CapabilitySet, ToolCall};
use studybot_tools::CourseRetrievalTool;
use tracing::{debug, info, warn};

use crate::working_memory::WorkingMemory;

const IGNORED_CALL: &str =
    "Ignored: only one tool may be called per step. Call it again in a later step if needed.";

/// Terminal state of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopOutcome {
    Answer(String),
    Unanswerable,
    Exhausted,
}

pub struct LoopResult {
    pub outcome: LoopOutcome,

    /// Passages returned by retrieval during the session
    pub grounding: Vec<ScoredNode>,

    pub working_memory: WorkingMemory,

    /// Model calls made
    pub iterations: usize,

    pub tool_calls_made: usize,
}

pub struct ReasoningLoop {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    max_iterations: u32,
    event_bus: Option<Arc<EventBus>>,
}

impl ReasoningLoop {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            max_tokens: None,
            max_iterations: 10,
            event_bus: None,
        }
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_max_tokens(mut self, max: Option<u32>) -> Self {
        self.max_tokens = max;
        self
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    fn publish(&self, event: DomainEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }

    /// Run one session.
    ///
    /// Provider failures and capability execution failures end the session
    /// with an error. Unknown capabilities and bad arguments are reported
    /// back to the model as observations instead.
    pub async fn run(
        &self,
        preamble: &str,
        history: &ChatHistory,
        question: &str,
        capabilities: &CapabilitySet,
    ) -> Result<LoopResult, Error> {
        let mut wm = WorkingMemory::new(self.max_iterations as usize);
        let tool_defs = capabilities.definitions();
        let mut grounding: Vec<ScoredNode> = Vec::new();
        let mut seen_nodes = HashSet::new();
        let mut tool_calls_made = 0usize;

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(preamble));
        messages.extend(history.messages.iter().cloned());
        messages.push(Message::user(question));

        info!(model = %self.model, max_iter = self.max_iterations, "Reasoning loop starting");

        loop {
            if !wm.tick() {
                warn!("Reasoning loop: max iterations reached ({})", self.max_iterations);
                break;
            }
            debug!(iteration = wm.iterations, "Reasoning iteration");

            let request = ProviderRequest {
                model: self.model.clone(),
                messages: messages.clone(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: tool_defs.clone(),
            };
            let response = self.provider.complete(request).await?;

            if !response.message.content.is_empty() {
                wm.add_thought(&response.message.content);
            }

            if response.message.tool_calls.is_empty() {
                let answer = response.message.content.clone();
                info!(
                    iterations = wm.iterations,
                    tool_calls = tool_calls_made,
                    "Reasoning loop answered"
                );
                return Ok(LoopResult {
                    outcome: LoopOutcome::Answer(answer),
                    grounding,
                    iterations: wm.iterations_used(),
                    working_memory: wm,
                    tool_calls_made,
                });
            }

            let tool_calls = response.message.tool_calls.clone();
            messages.push(response.message);

            let Some((tc, rest)) = tool_calls.split_first() else {
                continue;
            };
            tool_calls_made += 1;
            let capability = self
                .execute_call(tc, capabilities, &mut wm, &mut messages, &mut grounding, &mut seen_nodes)
                .await?;

            for extra in rest {
                debug!(tool = %extra.name, "Ignoring additional tool call in the same step");
                messages.push(Message::tool_result(&extra.id, IGNORED_CALL));
            }

            if capability == Some(Capability::LogUnanswered) {
                info!(iterations = wm.iterations, "Question declared unanswerable");
                return Ok(LoopResult {
                    outcome: LoopOutcome::Unanswerable,
                    grounding,
                    iterations: wm.iterations_used(),
                    working_memory: wm,
                    tool_calls_made,
                });
            }
        }

        Ok(LoopResult {
            outcome: LoopOutcome::Exhausted,
            grounding,
            iterations: wm.iterations_used(),
            working_memory: wm,
            tool_calls_made,
        })
    }

    /// Execute one tool call and append its observation. Returns the
    /// capability that ran, `None` when the call was rejected.
    async fn execute_call(
        &self,
        tc: &MessageToolCall,
        capabilities: &CapabilitySet,
        wm: &mut WorkingMemory,
        messages: &mut Vec<Message>,
        grounding: &mut Vec<ScoredNode>,
        seen_nodes: &mut HashSet<String>,
    ) -> Result<Option<Capability>, Error> {
        wm.add_action(&format!("{}({})", tc.name, tc.arguments));

        let call = ToolCall {
            id: tc.id.clone(),
            name: tc.name.clone(),
            arguments: serde_json::from_str(&tc.arguments).unwrap_or_default(),
        };

        let start = std::time::Instant::now();
        let result = capabilities.execute(&call).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok((capability, tool_result)) => {
                wm.add_observation(&tool_result.output);
                wm.add_tool_result(&tc.name, &tc.arguments, &tool_result.output, tool_result.success);
                self.publish(DomainEvent::ToolExecuted {
                    tool_name: tc.name.clone(),
                    success: tool_result.success,
                    duration_ms,
                    timestamp: Utc::now(),
                });

                if capability == Capability::Retrieval {
                    for node in CourseRetrievalTool::passages(&tool_result) {
                        if seen_nodes.insert(node.node.id.clone()) {
                            grounding.push(node);
                        }
                    }
                }

                messages.push(Message::tool_result(&tc.id, &tool_result.output));
                Ok(Some(capability))
            }
            Err(e @ (ToolError::NotFound(_) | ToolError::InvalidArguments(_))) => {
                let error_msg = format!("Error: {e}");
                warn!(tool = %tc.name, error = %e, "Rejected tool call");
                wm.add_observation(&error_msg);
                wm.add_tool_result(&tc.name, &tc.arguments, &error_msg, false);
                self.publish(DomainEvent::ToolExecuted {
                    tool_name: tc.name.clone(),
                    success: false,
                    duration_ms,
                    timestamp: Utc::now(),
                });
                messages.push(Message::tool_result(&tc.id, &error_msg));
                Ok(None)
            }
            Err(e) => {
                self.publish(DomainEvent::ToolExecuted {
                    tool_name: tc.name.clone(),
                    success: false,
                    duration_ms,
                    timestamp: Utc::now(),
                });
                Err(e.into())
            }
        }
    }
}
