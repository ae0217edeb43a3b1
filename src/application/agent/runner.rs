use super::directive::AgentDirective;
use super::errors::AgentError;
use super::models::{AgentOptions, AgentOutcome, AgentStep};
use super::runtime::ToolRuntime;
use crate::application::client::{ChatRequest, ChatClient};
use crate::application::telemetry::{ConversationTracker, EventType};
use crate::application::tooling::LazyToolBinder;
use crate::model::ModelProvider;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Drives one conversation through the model, binding tools lazily on the
/// first run and dispatching tool directives until the model answers.
pub struct Agent<P: ModelProvider> {
    client: Arc<ChatClient<P>>,
    binder: Arc<LazyToolBinder>,
    tracker: Arc<ConversationTracker>,
    require_tools: bool,
}

impl<P: ModelProvider> Agent<P> {
    pub fn new(client: Arc<ChatClient<P>>, binder: Arc<LazyToolBinder>) -> Self {
        Self {
            client,
            binder,
            tracker: Arc::new(ConversationTracker::disabled()),
            require_tools: false,
        }
    }

    pub fn with_tracker(mut self, tracker: Arc<ConversationTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    /// Abort the run instead of degrading when tool acquisition fails.
    pub fn require_tools(mut self, required: bool) -> Self {
        self.require_tools = required;
        self
    }

    pub async fn run(
        &self,
        prompt: String,
        mut options: AgentOptions,
    ) -> Result<AgentOutcome, AgentError> {
        info!("Agent run started");
        let session_id = options
            .session_id
            .take()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        self.tracker.track(
            EventType::SessionStart,
            &session_id,
            json!({ "require_tools": self.require_tools }),
        );

        let (tools, degraded) = match self.binder.ensure_loaded().await {
            Ok(tools) => (tools, false),
            Err(err) if self.require_tools => {
                self.tracker.track(
                    EventType::Error,
                    &session_id,
                    json!({ "error": err.user_message() }),
                );
                return Err(err.into());
            }
            Err(err) => {
                warn!(%err, "Tool acquisition failed; continuing without tools");
                self.tracker.track(
                    EventType::Error,
                    &session_id,
                    json!({ "error": err.user_message(), "degraded": true }),
                );
                (Vec::new(), true)
            }
        };

        let runtime = ToolRuntime::new(tools);
        let context = runtime.build_context();
        let instructions = runtime.compose_system_instructions(&context);
        let system_prompt = match options.system_prompt.take() {
            Some(existing) if !existing.trim().is_empty() => {
                format!("{existing}\n\n{instructions}")
            }
            _ => instructions,
        };

        self.tracker.track(
            EventType::UserMessage,
            &session_id,
            json!({ "message": prompt }),
        );

        let mut steps = Vec::new();
        let model_override = options.model.clone();
        let mut next_prompt = runtime.initial_user_prompt(prompt, &context);
        let mut remaining_steps = options.max_steps;
        let mut system_prompt_to_send = Some(system_prompt);
        let mut first_call = true;
        let mut session_id = session_id;

        loop {
            debug!(
                session = session_id.as_str(),
                remaining_steps, "Submitting agent turn to model provider"
            );
            let request = ChatRequest {
                prompt: next_prompt.clone(),
                model: model_override.clone(),
                system_prompt: if first_call {
                    system_prompt_to_send.take()
                } else {
                    None
                },
                session_id: Some(session_id.clone()),
            };

            let result = self.client.chat(request).await?;
            session_id = result.session_id.clone();
            first_call = false;

            match runtime.parse_agent_action(&result.content)? {
                AgentDirective::Final { response } => {
                    info!(
                        session_id = session_id.as_str(),
                        "Agent returned final response"
                    );
                    self.tracker.track(
                        EventType::AgentResponse,
                        &session_id,
                        json!({ "response": response }),
                    );
                    return Ok(AgentOutcome {
                        session_id,
                        response,
                        steps,
                        degraded,
                    });
                }
                AgentDirective::CallTool { tool, input } => {
                    if remaining_steps == 0 {
                        warn!("Agent exceeded max tool interactions");
                        return Err(AgentError::InvalidResponse(
                            "agent exceeded the maximum number of tool interactions".into(),
                        ));
                    }
                    remaining_steps -= 1;
                    info!(tool = %tool, "Agent requested tool execution");
                    self.tracker.track(
                        EventType::ToolCall,
                        &session_id,
                        json!({ "tool": tool, "input": input }),
                    );
                    let execution = runtime.execute(&tool, input).await?;
                    self.tracker.track(
                        EventType::ToolResponse,
                        &session_id,
                        json!({ "tool": execution.tool, "success": execution.success }),
                    );

                    steps.push(AgentStep {
                        tool: execution.tool.clone(),
                        input: execution.input.clone(),
                        success: execution.success,
                        output: execution.output.clone(),
                        message: execution.message.clone(),
                    });

                    next_prompt = json!({
                        "tool_result": {
                            "tool": execution.tool,
                            "input": execution.input,
                            "success": execution.success,
                            "output": execution.output,
                            "message": execution.message,
                        }
                    })
                    .to_string();
                }
            }
        }
    }

    /// Release the bound tool resources. Safe on every exit path, including
    /// when no run ever happened or the last run failed.
    pub async fn shutdown(&self) {
        self.binder.teardown().await;
    }
}
