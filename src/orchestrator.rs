//! Query orchestrator for Kart.
//!
//! Drives the tool-calling exchange with the model: submit the transcript,
//! run whatever tools the model asks for, feed the results back, and repeat
//! until it produces an answer.

use crate::agent::{Completion, CompletionService, Conversation, OpenAiCompletion, ToolRequest, Turn};
use crate::config::{Prompts, Settings};
use crate::error::{KartError, Result};
use crate::providers::default_providers;
use crate::tools::{ErrorCode, ToolRegistry, ToolResult};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Answer returned when the model does not respond within the request budget.
pub const TIMEOUT_MESSAGE: &str =
    "Request timed out. The API took too long to respond. Please try again.";

/// Answer returned when the model rejects even the trimmed transcript as too large.
pub const CAPACITY_MESSAGE: &str =
    "The request is too large for the model to process, even after trimming the conversation. Please try a shorter question.";

/// Answer returned when the configured iteration ceiling is reached.
pub const ITERATION_LIMIT_MESSAGE: &str =
    "Stopped after reaching the maximum number of tool rounds. Please try a more specific question.";

/// Loop tuning.
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub system_prompt: String,
    /// Budget for a single model call.
    pub request_timeout: Duration,
    /// Transcripts longer than this are collapsed before submission.
    pub prune_threshold: usize,
    /// `None` lets the loop run until the model answers. Settings reject
    /// `Some(0)`, which would end every query before the first submission.
    pub max_iterations: Option<usize>,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            system_prompt: Prompts::default().system_prompt(),
            request_timeout: Duration::from_secs(60),
            prune_threshold: 14,
            max_iterations: None,
        }
    }
}

impl OrchestratorOptions {
    pub fn from_settings(settings: &Settings, prompts: &Prompts) -> Self {
        Self {
            system_prompt: prompts.system_prompt(),
            request_timeout: settings.llm.request_timeout(),
            prune_threshold: settings.agent.prune_threshold,
            max_iterations: settings.agent.max_iterations,
        }
    }
}

/// How a query ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Completed,
    TimedOut,
    CapacityExceeded,
    IterationLimit,
}

/// One executed tool invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallRecord {
    pub tool_name: String,
    /// Decoded arguments, or the raw text when it was not a JSON object.
    pub input_arguments: Value,
    pub result: ToolResult,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.tool_name, self.input_arguments)
    }
}

/// Result of [`Orchestrator::process_query`].
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    /// Every tool call made, in invocation order.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of model submissions, not counting a capacity retry.
    pub iterations: usize,
    pub outcome: Outcome,
}

enum Submission {
    Answered(Completion),
    TimedOut,
    OverCapacity,
}

/// Runs natural-language queries against the registered tools.
///
/// Holds no per-query state; each call to [`process_query`](Self::process_query)
/// owns its own transcript, so one orchestrator can serve queries concurrently.
pub struct Orchestrator {
    completion: Arc<dyn CompletionService>,
    registry: Arc<ToolRegistry>,
    options: OrchestratorOptions,
}

impl Orchestrator {
    /// Create an orchestrator with the standard providers and the OpenAI model.
    pub fn new(settings: &Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let registry = ToolRegistry::new(default_providers(settings)?)?;
        let completion = OpenAiCompletion::from_settings(&settings.llm)?;

        info!(
            "Orchestrator ready: model {}, {} tools",
            settings.llm.model,
            registry.catalog().len()
        );

        Ok(Self::with_parts(
            Arc::new(completion),
            Arc::new(registry),
            OrchestratorOptions::from_settings(settings, &prompts),
        ))
    }

    /// Create an orchestrator with custom components.
    pub fn with_parts(
        completion: Arc<dyn CompletionService>,
        registry: Arc<ToolRegistry>,
        options: OrchestratorOptions,
    ) -> Self {
        Self {
            completion,
            registry,
            options,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn options(&self) -> &OrchestratorOptions {
        &self.options
    }

    /// Answer one user query, calling tools as the model requests them.
    ///
    /// Tool failures are handed back to the model as data. A model timeout or
    /// an unrecoverable capacity overflow ends the query with a fixed message
    /// and the tool calls made so far; any other model error is returned.
    #[instrument(skip(self), fields(query = %user_text))]
    pub async fn process_query(&self, user_text: &str) -> Result<QueryResponse> {
        let mut conversation = Conversation::new(self.options.system_prompt.clone(), user_text);
        let mut records: Vec<ToolCallRecord> = Vec::new();
        let mut iterations = 0;

        loop {
            if let Some(max) = self.options.max_iterations {
                if iterations >= max {
                    warn!("Reached the iteration ceiling ({})", max);
                    return Ok(QueryResponse {
                        answer: ITERATION_LIMIT_MESSAGE.to_string(),
                        tool_calls: records,
                        iterations,
                        outcome: Outcome::IterationLimit,
                    });
                }
            }

            iterations += 1;
            debug!(
                "Orchestrator iteration {} ({} turns)",
                iterations,
                conversation.len()
            );

            if conversation.needs_pruning(self.options.prune_threshold) {
                warn!(
                    "Transcript has {} turns, collapsing to the original query",
                    conversation.len()
                );
                conversation.prune();
            }

            let (answer, outcome) = match self.submit(&mut conversation).await? {
                Submission::Answered(completion) => match completion {
                    Completion::ToolCalls { text, requests } if !requests.is_empty() => {
                        self.run_tools(&mut conversation, &mut records, text, requests)
                            .await;
                        continue;
                    }
                    Completion::ToolCalls { text, .. } | Completion::Final { text } => {
                        (text.unwrap_or_default(), Outcome::Completed)
                    }
                },
                Submission::TimedOut => (TIMEOUT_MESSAGE.to_string(), Outcome::TimedOut),
                Submission::OverCapacity => {
                    (CAPACITY_MESSAGE.to_string(), Outcome::CapacityExceeded)
                }
            };

            return Ok(QueryResponse {
                answer,
                tool_calls: records,
                iterations,
                outcome,
            });
        }
    }

    /// Submit the transcript, retrying once on a collapsed transcript if the
    /// model rejects it as too large.
    async fn submit(&self, conversation: &mut Conversation) -> Result<Submission> {
        match self.complete_within_budget(conversation.snapshot()).await {
            Ok(Some(completion)) => Ok(Submission::Answered(completion)),
            Ok(None) => {
                warn!("Model call timed out after {:?}", self.options.request_timeout);
                Ok(Submission::TimedOut)
            }
            Err(KartError::CapacityExceeded(reason)) => {
                warn!(
                    "Model rejected {} turns ({}), retrying with the original query only",
                    conversation.len(),
                    reason
                );
                conversation.prune();

                match self.complete_within_budget(conversation.snapshot()).await {
                    Ok(Some(completion)) => Ok(Submission::Answered(completion)),
                    Ok(None) => {
                        warn!("Capacity retry timed out");
                        Ok(Submission::TimedOut)
                    }
                    Err(KartError::CapacityExceeded(reason)) => {
                        warn!("Capacity retry rejected as well: {}", reason);
                        Ok(Submission::OverCapacity)
                    }
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// `Ok(None)` when the call outlives the request budget, or the
    /// transport times out before the budget does.
    async fn complete_within_budget(&self, transcript: &[Turn]) -> Result<Option<Completion>> {
        let call = self.completion.complete(transcript, self.registry.catalog());
        match tokio::time::timeout(self.options.request_timeout, call).await {
            Ok(Err(KartError::ModelTimeout(reason))) => {
                debug!("Model transport timed out: {}", reason);
                Ok(None)
            }
            Ok(result) => result.map(Some),
            Err(_) => Ok(None),
        }
    }

    /// Record the assistant's requests, then run them one at a time in order.
    async fn run_tools(
        &self,
        conversation: &mut Conversation,
        records: &mut Vec<ToolCallRecord>,
        text: Option<String>,
        requests: Vec<ToolRequest>,
    ) {
        conversation.append(Turn::Assistant {
            text,
            tool_requests: requests.clone(),
        });

        for request in &requests {
            let record = self.dispatch(request).await;
            conversation.append(Turn::tool(request.id.clone(), record.result.to_payload()));
            records.push(record);
        }
    }

    async fn dispatch(&self, request: &ToolRequest) -> ToolCallRecord {
        let owner = self.registry.owner_of(&request.name);
        info!(
            "Calling tool {} on {} with args: {}",
            request.name,
            owner.as_ref().map_or("no provider", |info| info.name.as_str()),
            request.arguments
        );

        let (input_arguments, result) = if owner.is_none() {
            let input = request
                .parsed_arguments()
                .map(Value::Object)
                .unwrap_or_else(|_| Value::String(request.arguments.clone()));
            (input, ToolResult::unknown_tool(&request.name))
        } else {
            match request.parsed_arguments() {
                Ok(arguments) => {
                    let result = self.registry.execute(&request.name, &arguments).await;
                    (Value::Object(arguments), result)
                }
                Err(e) => (
                    Value::String(request.arguments.clone()),
                    ToolResult::error(ErrorCode::InvalidInput, e.to_string()),
                ),
            }
        };

        if let Some(message) = result.message().filter(|_| !result.is_success()) {
            debug!("Tool {} failed: {}", request.name, message);
        }

        ToolCallRecord {
            tool_name: request.name.clone(),
            input_arguments,
            result,
        }
    }
}
