//! Request orchestration: model, tools and answer policy.
//!
//! [`Services`] holds everything immutable (backend, tools, prompts, policy)
//! and is shared between conversations. Each conversation owns one
//! [`Orchestrator`] and with it one [`ConversationContext`].

use crate::catalog::ReturnMode;
use crate::config::{AgentSettings, Domain, DomainPrompts, Prompts, Settings, FALLBACK_ANSWER};
use crate::error::{ConciergeError, Result};
use crate::events::{AgentEvent, EventSink, NullSink};
use crate::formatter::OutputMode;
use crate::model::{ChatMessage, ModelBackend, OpenAiBackend, RequestedCall};
use crate::relevance::RelevanceValidator;
use crate::tools::{ToolBox, WhisperTranscriber, YtDlpFetcher};
use crate::travel::AmadeusClient;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Result of one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "output", rename_all = "snake_case")]
pub enum ToolOutcome {
    Success(String),
    Failure(String),
}

impl ToolOutcome {
    pub fn text(&self) -> &str {
        match self {
            ToolOutcome::Success(s) | ToolOutcome::Failure(s) => s,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success(_))
    }
}

/// A recorded tool invocation. Never modified once logged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolInvocation {
    pub tool_name: String,
    pub arguments: Value,
    pub outcome: ToolOutcome,
}

/// One request and its answer, with the messages exchanged for it.
#[derive(Debug, Clone)]
pub struct Turn {
    pub request: String,
    pub answer: String,
    messages: Vec<ChatMessage>,
}

/// Per-conversation state.
#[derive(Debug, Clone, Default)]
pub struct ConversationContext {
    turns: Vec<Turn>,
    session_log: Vec<ToolInvocation>,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Every tool invocation of the conversation, in execution order.
    pub fn session_log(&self) -> &[ToolInvocation] {
        &self.session_log
    }

    /// Messages of the last `max_turns` turns.
    ///
    /// Whole turns only, so a tool call always travels with its result.
    pub fn replay(&self, max_turns: usize) -> Vec<ChatMessage> {
        let skip = self.turns.len().saturating_sub(max_turns);
        self.turns[skip..]
            .iter()
            .flat_map(|turn| turn.messages.iter().cloned())
            .collect()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
        self.session_log.clear();
    }
}

/// Immutable collaborators shared by every conversation.
pub struct Services {
    backend: Arc<dyn ModelBackend>,
    toolbox: ToolBox,
    prompts: Arc<Prompts>,
    policy: AgentSettings,
    relevance: RelevanceValidator,
}

impl Services {
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        toolbox: ToolBox,
        prompts: Prompts,
        policy: AgentSettings,
    ) -> Self {
        let prompts = Arc::new(prompts);
        let relevance = RelevanceValidator::new(backend.clone(), prompts.clone());
        Self {
            backend,
            toolbox,
            prompts,
            policy,
            relevance,
        }
    }

    /// Build the production services for the configured domain.
    ///
    /// Fails with a configuration error when a required credential is missing.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let backend: Arc<dyn ModelBackend> = Arc::new(OpenAiBackend::new(&settings.model)?);

        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let output_mode = OutputMode::from_json_flag(settings.agent.respond_json);
        let toolbox = match settings.agent.domain {
            Domain::Video => ToolBox::video(
                Arc::new(YtDlpFetcher::new(settings.temp_dir())),
                Arc::new(WhisperTranscriber::new(&settings.model, &settings.transcription)?),
                output_mode,
                settings.agent.formatter_return_mode,
            )?,
            Domain::Travel => ToolBox::travel(
                Arc::new(AmadeusClient::from_settings(&settings.travel)?),
                settings.travel.clone(),
                output_mode,
            )?,
        };

        Ok(Self::new(backend, toolbox, prompts, settings.agent.clone()))
    }

    pub fn domain(&self) -> Domain {
        self.policy.domain
    }

    pub fn toolbox(&self) -> &ToolBox {
        &self.toolbox
    }

    fn domain_prompts(&self) -> &DomainPrompts {
        self.prompts.for_domain(self.policy.domain)
    }

    /// Wrap a raw request in the domain's scoping instruction.
    fn scope(&self, request: &str) -> String {
        let prompts = self.domain_prompts();
        let mut vars = HashMap::new();
        vars.insert("request".to_string(), request.to_string());
        vars.insert("refusal".to_string(), prompts.refusal.clone());
        self.prompts.render_with_custom(&prompts.scope, &vars)
    }

    fn system_prompt(&self) -> String {
        self.prompts
            .render_with_custom(&self.domain_prompts().system, &HashMap::new())
    }

    fn return_mode(&self, tool: &str) -> ReturnMode {
        self.toolbox
            .catalog()
            .get(tool)
            .map(|spec| spec.return_mode)
            .unwrap_or_default()
    }

    /// Run one requested call. Every failure becomes a recorded outcome.
    async fn invoke(&self, call: &RequestedCall) -> ToolInvocation {
        info!("Calling tool: {} with args: {}", call.name, call.arguments);

        let arguments = if call.arguments.trim().is_empty() {
            Ok(Value::Object(Default::default()))
        } else {
            serde_json::from_str::<Value>(&call.arguments).map_err(|e| {
                ConciergeError::InvalidArguments {
                    tool: call.name.clone(),
                    reason: format!("arguments are not valid JSON: {}", e),
                }
            })
        };

        let (arguments, result) = match arguments {
            Ok(args) => {
                let result = self.toolbox.invoke(&call.name, &args).await;
                (args, result)
            }
            Err(e) => (Value::String(call.arguments.clone()), Err(e)),
        };

        let outcome = match result {
            Ok(output) => ToolOutcome::Success(output),
            Err(e @ (ConciergeError::UnknownTool(_) | ConciergeError::InvalidArguments { .. })) => {
                warn!("Rejected tool call: {}", e);
                ToolOutcome::Failure(e.to_string())
            }
            Err(ConciergeError::Formatting(message)) => {
                warn!("Tool {} could not format its output: {}", call.name, message);
                ToolOutcome::Failure(message)
            }
            Err(e) => {
                warn!("Tool {} failed: {}", call.name, e);
                ToolOutcome::Failure(format!("Tool error: {}", e))
            }
        };

        ToolInvocation {
            tool_name: call.name.clone(),
            arguments,
            outcome,
        }
    }

    /// Run the calls of one model turn, in request order.
    async fn invoke_all(&self, calls: &[RequestedCall]) -> Vec<ToolInvocation> {
        if self.policy.parallel_tool_calls && calls.len() > 1 {
            futures::future::join_all(calls.iter().map(|call| self.invoke(call))).await
        } else {
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                results.push(self.invoke(call).await);
            }
            results
        }
    }

    /// Apply the refusal and relevance policy to a candidate answer.
    async fn finalize(&self, request: &str, answer: String) -> String {
        let refusal = &self.domain_prompts().refusal;
        if !refusal.is_empty() && answer.contains(refusal.as_str()) {
            debug!("Request is out of domain");
            return refusal.clone();
        }

        if answer.trim().is_empty() || answer == FALLBACK_ANSWER {
            return FALLBACK_ANSWER.to_string();
        }

        if self.policy.relevance_check && !self.relevance.is_relevant(request, &answer).await {
            info!("Answer failed the relevance check");
            return FALLBACK_ANSWER.to_string();
        }

        answer
    }
}

/// Drives one conversation.
pub struct Orchestrator {
    services: Arc<Services>,
    context: ConversationContext,
    sink: Arc<dyn EventSink>,
}

impl Orchestrator {
    pub fn new(services: Arc<Services>) -> Self {
        Self {
            services,
            context: ConversationContext::new(),
            sink: Arc::new(NullSink),
        }
    }

    /// Where events go when reasoning is shown.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn context(&self) -> &ConversationContext {
        &self.context
    }

    /// Forget the conversation so far.
    pub fn reset(&mut self) {
        self.context.clear();
    }

    /// Answer a request.
    ///
    /// With `show_reasoning`, tool calls and text deltas go to the configured
    /// sink as they happen. The answer is the same either way.
    pub async fn handle(&mut self, request: &str, show_reasoning: bool) -> Result<String> {
        let sink = if show_reasoning {
            self.sink.clone()
        } else {
            Arc::new(NullSink) as Arc<dyn EventSink>
        };
        self.handle_with_sink(request, sink.as_ref()).await
    }

    /// Answer a request, sending events to `sink`.
    #[instrument(skip_all, fields(domain = %self.services.domain()))]
    pub async fn handle_with_sink(&mut self, request: &str, sink: &dyn EventSink) -> Result<String> {
        let services = Arc::clone(&self.services);
        let policy = &services.policy;

        let mut messages = vec![ChatMessage::system(services.system_prompt())];
        messages.extend(self.context.replay(policy.max_history_turns));
        let turn_start = messages.len();
        messages.push(ChatMessage::user(services.scope(request)));

        let mut answer = None;

        for iteration in 1..=policy.max_iterations {
            debug!("Iteration {}", iteration);

            let reply = services
                .backend
                .generate(&messages, services.toolbox.catalog(), sink)
                .await?;

            if reply.tool_calls.is_empty() {
                answer = Some(reply.final_text().to_string());
                break;
            }

            messages.push(ChatMessage::Assistant {
                content: reply.joined_text(),
                tool_calls: reply.tool_calls.clone(),
            });

            let invocations = services.invoke_all(&reply.tool_calls).await;

            let mut direct = None;
            for (call, invocation) in reply.tool_calls.iter().zip(invocations) {
                sink.emit(AgentEvent::ToolCall {
                    name: invocation.tool_name.clone(),
                    arguments: invocation.arguments.clone(),
                    output: invocation.outcome.text().to_string(),
                    success: invocation.outcome.is_success(),
                });

                messages.push(ChatMessage::tool_result(&call.id, invocation.outcome.text()));

                if direct.is_none()
                    && invocation.outcome.is_success()
                    && services.return_mode(&call.name) == ReturnMode::ReturnDirect
                {
                    direct = Some(invocation.outcome.text().to_string());
                }

                self.context.session_log.push(invocation);
            }

            if direct.is_some() {
                answer = direct;
                break;
            }
        }

        let answer = match answer {
            Some(answer) => services.finalize(request, answer).await,
            None => {
                warn!(
                    "No answer after {} iterations, returning fallback",
                    policy.max_iterations
                );
                FALLBACK_ANSWER.to_string()
            }
        };

        messages.push(ChatMessage::assistant(answer.clone()));
        self.context.turns.push(Turn {
            request: request.to_string(),
            answer: answer.clone(),
            messages: messages.split_off(turn_start),
        });

        Ok(answer)
    }
}
