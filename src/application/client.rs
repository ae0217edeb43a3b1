use crate::config::DEFAULT_PROMPT_TEMPLATE;
use crate::model::{ModelError, ModelProvider, ModelRequest};
use crate::types::{ChatMessage, MessageRole};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub default_model: String,
    pub default_system_prompt: Option<String>,
    pub prompt_template: Option<String>,
}

impl ClientConfig {
    pub fn new(default_model: impl Into<String>) -> Self {
        Self {
            default_model: default_model.into(),
            default_system_prompt: None,
            prompt_template: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.default_system_prompt = Some(prompt.into());
        self
    }

    pub fn with_prompt_template(mut self, template: Option<String>) -> Self {
        self.prompt_template = template;
        self
    }
}

#[derive(Debug)]
pub struct ChatRequest {
    pub prompt: String,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChatResult {
    pub content: String,
    pub session_id: String,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl ClientError {
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Model(err) => err.user_message(),
        }
    }
}

/// Session-aware chat front to the model provider.
///
/// Session histories live in process memory only and vanish on exit.
pub struct ChatClient<P: ModelProvider> {
    provider: P,
    config: ClientConfig,
    sessions: Mutex<HashMap<String, Vec<ChatMessage>>>,
}

impl<P: ModelProvider> ChatClient<P> {
    pub fn new(provider: P, config: ClientConfig) -> Self {
        Self {
            provider,
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResult, ClientError> {
        let model = request
            .model
            .unwrap_or_else(|| self.config.default_model.clone());
        let session_id = request.session_id.unwrap_or_else(new_session_id);
        let system = request
            .system_prompt
            .or_else(|| self.config.default_system_prompt.clone());

        let history = {
            let mut sessions = self.sessions.lock().await;
            sessions.entry(session_id.clone()).or_default().clone()
        };
        debug!(
            session_id = session_id.as_str(),
            history_count = history.len(),
            "Preparing chat request with prior history"
        );

        let mut messages = Vec::with_capacity(history.len() + 2);
        let system_prompt = self.compose_system_prompt(system);
        if !system_prompt.is_empty() {
            messages.push(ChatMessage::new(MessageRole::System, system_prompt));
        }
        messages.extend(history.iter().cloned());
        messages.push(ChatMessage::new(MessageRole::User, request.prompt.clone()));

        let response = self
            .provider
            .chat(ModelRequest {
                model,
                messages,
                session_id: Some(session_id.clone()),
            })
            .await?;

        let final_session = response
            .session_id
            .clone()
            .unwrap_or_else(|| session_id.clone());
        info!(
            session_id = final_session.as_str(),
            "Received response from model provider"
        );
        let assistant_message = response.message.clone();

        self.persist_exchange(&final_session, request.prompt, assistant_message)
            .await;

        Ok(ChatResult {
            content: response.message.content,
            session_id: final_session,
        })
    }

    fn compose_system_prompt(&self, override_prompt: Option<String>) -> String {
        let template = self
            .config
            .prompt_template
            .clone()
            .unwrap_or_else(|| DEFAULT_PROMPT_TEMPLATE.to_string());

        let custom_instruction = override_prompt.unwrap_or_default();
        let mut prompt = template.replace("{{custom_instruction}}", custom_instruction.trim());

        // The tool guidance slot is filled by the agent runtime; plain chat
        // leaves it empty. Clean any placeholder the template still carries.
        prompt = prompt.replace("{{tool_guidance}}", "");

        // Normalise whitespace while preserving intentional blank lines.
        let mut cleaned = Vec::new();
        let mut previous_blank = false;
        for line in prompt.lines().map(|line| line.trim_end()) {
            let trimmed = line.trim();
            let is_blank = trimmed.is_empty();
            if is_blank {
                if !previous_blank {
                    cleaned.push(String::new());
                }
                previous_blank = true;
            } else {
                cleaned.push(trimmed.to_string());
                previous_blank = false;
            }
        }

        cleaned.join("\n").trim().to_string()
    }

    async fn persist_exchange(
        &self,
        session_id: &str,
        user_prompt: String,
        assistant: ChatMessage,
    ) {
        let mut sessions = self.sessions.lock().await;
        let history = sessions.entry(session_id.to_string()).or_default();
        history.push(ChatMessage::new(MessageRole::User, user_prompt));
        history.push(assistant);
        debug!(
            session_id,
            total_messages = history.len(),
            "Persisted chat exchange to session history"
        );
    }
}

fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}
