//! The query pipeline: one question in, one terminal outcome out.
//!
//! Resolves the course, builds the two capabilities for this session, runs
//! the reasoning loop, and turns its result into a [`QueryOutcome`]. Every
//! fault is caught here; callers of [`QueryPipeline::perform_query`] only
//! ever see user-safe text.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use studybot_config::AppConfig;
use studybot_core::course::CourseLayout;
use studybot_core::error::Error;
use studybot_core::event::{DomainEvent, EventBus};
use studybot_core::message::ChatHistory;
use studybot_core::provider::Provider;
use studybot_knowledge::{Retriever, UnansweredEntry, UnansweredLog, UnansweredReason};
use studybot_tools::{CourseRetrievalTool, LogUnansweredTool, capability_set};
use tracing::{debug, error, info, warn};

use crate::citations::{Citation, CitationAggregator, render_citations};
use crate::prompt::system_preamble;
use crate::reasoning::{LoopOutcome, ReasoningLoop};

/// Terminal outcome of a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum QueryOutcome {
    /// An answer; `citations` is empty when no source was attributable
    Answered {
        answer: String,
        citations: Vec<Citation>,
    },

    /// The model declared the question unanswerable from the corpus
    Unanswerable,

    /// The reasoning loop hit its iteration bound
    Exhausted,

    /// Something failed; `reason` is for logs, never for the end user
    Fault { reason: String },
}

impl QueryOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            QueryOutcome::Answered { .. } => "answered",
            QueryOutcome::Unanswerable => "unanswerable",
            QueryOutcome::Exhausted => "exhausted",
            QueryOutcome::Fault { .. } => "fault",
        }
    }

    pub fn is_answered(&self) -> bool {
        matches!(self, QueryOutcome::Answered { .. })
    }

    fn fault(reason: impl Into<String>) -> Self {
        QueryOutcome::Fault {
            reason: reason.into(),
        }
    }
}

pub struct QueryPipeline {
    config: AppConfig,
    provider: Arc<dyn Provider>,
    retriever: Arc<Retriever>,
    unanswered: Arc<UnansweredLog>,
    citations: CitationAggregator,
    event_bus: Option<Arc<EventBus>>,
}

impl QueryPipeline {
    pub fn new(config: AppConfig, provider: Arc<dyn Provider>) -> Self {
        let retriever = Arc::new(Retriever::new(
            Arc::clone(&provider),
            config.provider.embedding_model.clone(),
            config.agent.similarity_top_k,
        ));
        let unanswered = Arc::new(UnansweredLog::new(config.agent.unanswered_log.clone()));
        let citations = CitationAggregator::from_config(&config.citations);

        Self {
            config,
            provider,
            retriever,
            unanswered,
            citations,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn unanswered_log(&self) -> &UnansweredLog {
        &self.unanswered
    }

    /// Answer `query` for `course` and render the result as text.
    pub async fn perform_query(&self, query: &str, course: &str) -> String {
        let outcome = self.run_query(query, course, &ChatHistory::new()).await;
        self.render(&outcome)
    }

    /// Answer `query` for `course`, with optional prior conversation.
    pub async fn run_query(&self, query: &str, course: &str, history: &ChatHistory) -> QueryOutcome {
        let (outcome, iterations) = match self.try_query(query, course, history).await {
            Ok(done) => done,
            Err(e) => {
                error!(course = %course, error = %e, "Query failed");
                (QueryOutcome::fault(e.to_string()), 0)
            }
        };

        info!(
            target: "messages",
            course = %course,
            query = %query,
            outcome = outcome.label(),
            iterations,
            "Query completed"
        );
        if let QueryOutcome::Answered { answer, .. } = &outcome {
            info!(target: "messages", course = %course, answer = %answer, "Response");
        }

        if let Some(bus) = &self.event_bus {
            bus.publish(DomainEvent::QueryCompleted {
                course: course.to_string(),
                outcome: outcome.label().to_string(),
                iterations,
                timestamp: Utc::now(),
            });
        }

        outcome
    }

    async fn try_query(
        &self,
        query: &str,
        course: &str,
        history: &ChatHistory,
    ) -> Result<(QueryOutcome, usize), Error> {
        if query.trim().is_empty() {
            return Ok((QueryOutcome::fault("empty query"), 0));
        }

        let layout = self.config.course_layout(course).map_err(|e| Error::Config {
            message: e.to_string(),
        })?;

        let agent = &self.config.agent;
        let retrieval = CourseRetrievalTool::new(Arc::clone(&self.retriever), layout.clone());
        let log_tool = LogUnansweredTool::new(
            Arc::clone(&self.unanswered),
            course,
            query,
            agent.cannot_answer_message.clone(),
        );
        let logged = log_tool.logged_flag();
        let capabilities = capability_set(retrieval, log_tool);

        let preamble = system_preamble(&layout.name, agent.system_prompt_override.as_deref());
        let mut reasoning = ReasoningLoop::new(
            Arc::clone(&self.provider),
            self.config.provider.model.clone(),
            self.config.provider.temperature,
        )
        .with_max_iterations(agent.max_iterations)
        .with_max_tokens(self.config.provider.max_tokens);
        if let Some(bus) = &self.event_bus {
            reasoning = reasoning.with_event_bus(Arc::clone(bus));
        }

        let result = reasoning.run(&preamble, history, query, &capabilities).await?;
        debug!(course = %course, "{}", result.working_memory.summarize());

        let outcome = match result.outcome {
            LoopOutcome::Answer(text) => {
                let answer = text.trim();
                if answer.is_empty() {
                    QueryOutcome::fault("model returned an empty answer")
                } else {
                    QueryOutcome::Answered {
                        answer: answer.to_string(),
                        citations: self.citations.aggregate(&result.grounding),
                    }
                }
            }
            LoopOutcome::Unanswerable => QueryOutcome::Unanswerable,
            LoopOutcome::Exhausted => {
                if !logged.load(Ordering::SeqCst) {
                    self.log_exhausted(&layout, query).await;
                }
                QueryOutcome::Exhausted
            }
        };

        Ok((outcome, result.iterations))
    }

    async fn log_exhausted(&self, layout: &CourseLayout, query: &str) {
        let entry = UnansweredEntry::new(layout.id.as_str(), query, UnansweredReason::Exhausted);
        if let Err(e) = self.unanswered.append(&entry).await {
            warn!(course = %layout.id, error = %e, "Failed to log exhausted question");
        }
    }

    /// User-facing text for an outcome.
    pub fn render(&self, outcome: &QueryOutcome) -> String {
        let agent = &self.config.agent;
        match outcome {
            QueryOutcome::Answered { answer, citations } => {
                format!("{answer}{}", render_citations(citations, &self.config.citations))
            }
            QueryOutcome::Unanswerable | QueryOutcome::Exhausted => agent.cannot_answer_message.clone(),
            QueryOutcome::Fault { .. } => agent.apology_message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    const DOCS: &[(&str, &str, &str)] = &[
        (
            "exams.txt",
            "The written exams take place in March and September.",
            "https://example.edu/exams",
        ),
        (
            "internship.txt",
            "The internship lasts twenty weeks in the fifth semester.",
            "https://example.edu/internship",
        ),
    ];

    fn retrieval_call(query: &str) -> studybot_core::message::MessageToolCall {
        make_tool_call("course_retrieval", serde_json::json!({ "query": query }))
    }

    #[tokio::test]
    async fn answered_query_carries_citations() {
        let deployment = Deployment::new(DOCS).await;
        let provider = Arc::new(SequentialMockProvider::tool_then_answer(
            vec![retrieval_call("When are the written exams?")],
            "",
            "The exams are in March and September.",
        ));
        let pipeline = QueryPipeline::new(deployment.config.clone(), provider);

        let outcome = pipeline
            .run_query("When are the written exams?", "wi", &ChatHistory::new())
            .await;
        let QueryOutcome::Answered { answer, citations } = &outcome else {
            panic!("expected an answer, got {outcome:?}");
        };
        assert_eq!(answer, "The exams are in March and September.");
        assert_eq!(citations[0].link, "https://example.edu/exams");

        let text = pipeline.render(&outcome);
        assert!(text.starts_with("The exams are in March and September.\n\nSources:\n [1] [exams]"));
    }

    #[tokio::test]
    async fn unanswerable_query_logs_exactly_once_verbatim() {
        let deployment = Deployment::new(DOCS).await;
        let question = "What is the capital of Mars?";
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_tool_call_response(vec![retrieval_call(question)], ""),
            make_tool_call_response(
                vec![make_tool_call(
                    "log_unanswered_question",
                    serde_json::json!({ "question": "capital of mars" }),
                )],
                "",
            ),
        ]));
        let pipeline = QueryPipeline::new(deployment.config.clone(), provider);

        let text = pipeline.perform_query(question, "wi").await;
        assert_eq!(text, deployment.config.agent.cannot_answer_message);

        let entries = pipeline.unanswered_log().entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].question, question);
        assert_eq!(entries[0].course, "wi");
        assert_eq!(entries[0].reason, UnansweredReason::Unanswerable);
    }

    #[tokio::test]
    async fn exhaustion_returns_cannot_answer_and_is_logged() {
        let deployment = Deployment::new(DOCS).await;
        let provider = Arc::new(SequentialMockProvider::repeating(make_tool_call_response(
            vec![retrieval_call("exams")],
            "Searching again",
        )));
        let mut config = deployment.config.clone();
        config.agent.max_iterations = 4;
        let pipeline = QueryPipeline::new(config, provider.clone());

        let outcome = pipeline
            .run_query("When are the exams?", "wi", &ChatHistory::new())
            .await;
        assert_eq!(outcome, QueryOutcome::Exhausted);
        assert_eq!(provider.call_count(), 4);
        assert_eq!(pipeline.render(&outcome), deployment.config.agent.cannot_answer_message);

        let entries = pipeline.unanswered_log().entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].reason, UnansweredReason::Exhausted);
        assert_eq!(entries[0].question, "When are the exams?");
    }

    #[tokio::test]
    async fn logged_question_keeps_surrounding_whitespace() {
        let deployment = Deployment::new(DOCS).await;
        let question = "  When is the thesis deadline?\n";

        let provider = Arc::new(SequentialMockProvider::new(vec![make_tool_call_response(
            vec![make_tool_call(
                "log_unanswered_question",
                serde_json::json!({ "question": "When is the thesis deadline?" }),
            )],
            "",
        )]));
        let pipeline = QueryPipeline::new(deployment.config.clone(), provider);
        let outcome = pipeline.run_query(question, "wi", &ChatHistory::new()).await;
        assert_eq!(outcome, QueryOutcome::Unanswerable);

        let provider = Arc::new(SequentialMockProvider::repeating(make_tool_call_response(
            vec![retrieval_call("thesis")],
            "",
        )));
        let mut config = deployment.config.clone();
        config.agent.max_iterations = 2;
        let pipeline = QueryPipeline::new(config, provider);
        let outcome = pipeline.run_query(question, "wi", &ChatHistory::new()).await;
        assert_eq!(outcome, QueryOutcome::Exhausted);

        let entries = pipeline.unanswered_log().entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.question == question));
        assert_eq!(entries[0].reason, UnansweredReason::Unanswerable);
        assert_eq!(entries[0].note, None);
        assert_eq!(entries[1].reason, UnansweredReason::Exhausted);
    }

    #[tokio::test]
    async fn provider_failure_becomes_apology() {
        let deployment = Deployment::new(DOCS).await;
        let pipeline = QueryPipeline::new(deployment.config.clone(), Arc::new(FailingProvider));

        let outcome = pipeline.run_query("Anything?", "wi", &ChatHistory::new()).await;
        let QueryOutcome::Fault { reason } = &outcome else {
            panic!("expected a fault, got {outcome:?}");
        };
        assert!(reason.contains("connection refused"));
        assert_eq!(pipeline.render(&outcome), deployment.config.agent.apology_message);
    }

    #[tokio::test]
    async fn unknown_course_is_a_fault() {
        let deployment = Deployment::new(DOCS).await;
        let provider = Arc::new(SequentialMockProvider::new(vec![]));
        let pipeline = QueryPipeline::new(deployment.config.clone(), provider.clone());

        let text = pipeline.perform_query("When are the exams?", "physics").await;
        assert_eq!(text, deployment.config.agent.apology_message);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn empty_query_and_empty_answer_are_faults() {
        let deployment = Deployment::new(DOCS).await;
        let provider = Arc::new(SequentialMockProvider::single_text("   "));
        let pipeline = QueryPipeline::new(deployment.config.clone(), provider.clone());

        let outcome = pipeline.run_query("  ", "wi", &ChatHistory::new()).await;
        assert_eq!(outcome.label(), "fault");
        assert_eq!(provider.call_count(), 0);

        let outcome = pipeline.run_query("Hello?", "wi", &ChatHistory::new()).await;
        assert_eq!(outcome.label(), "fault");
    }

    #[tokio::test]
    async fn missing_index_is_a_fault() {
        let deployment = Deployment::new(DOCS).await;
        let layout = deployment.config.course_layout("wi").unwrap();
        std::fs::remove_dir_all(&layout.index_dir).unwrap();

        let provider = Arc::new(SequentialMockProvider::tool_then_answer(
            vec![retrieval_call("exams")],
            "",
            "unused",
        ));
        let pipeline = QueryPipeline::new(deployment.config.clone(), provider);

        let outcome = pipeline.run_query("When are exams?", "wi", &ChatHistory::new()).await;
        assert_eq!(outcome.label(), "fault");
    }

    #[tokio::test]
    async fn answer_without_linked_sources_has_no_citation_block() {
        let deployment = Deployment::new(&[("notes.txt", "Lectures start at nine.", "-")]).await;
        let provider = Arc::new(SequentialMockProvider::tool_then_answer(
            vec![retrieval_call("lectures")],
            "",
            "Lectures start at nine.",
        ));
        let pipeline = QueryPipeline::new(deployment.config.clone(), provider);

        let text = pipeline.perform_query("When do lectures start?", "wi").await;
        assert_eq!(text, "Lectures start at nine.");
    }

    #[tokio::test]
    async fn completion_event_is_published() {
        let deployment = Deployment::new(DOCS).await;
        let bus = Arc::new(EventBus::new(32));
        let mut rx = bus.subscribe();
        let provider = Arc::new(SequentialMockProvider::single_text("Hi there."));
        let pipeline = QueryPipeline::new(deployment.config.clone(), provider).with_event_bus(bus);

        pipeline.perform_query("Hello", "wi").await;

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            DomainEvent::QueryCompleted { course, outcome, iterations, .. } => {
                assert_eq!(course, "wi");
                assert_eq!(outcome, "answered");
                assert_eq!(*iterations, 1);
            }
            other => panic!("Expected QueryCompleted, got {other:?}"),
        }
    }

    #[test]
    fn outcome_serializes_with_tag() {
        let json = serde_json::to_value(QueryOutcome::Exhausted).unwrap();
        assert_eq!(json["outcome"], "exhausted");
    }
}
