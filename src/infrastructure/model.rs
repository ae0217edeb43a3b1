use crate::types::{ChatMessage, MessageRole};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info};

const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ModelResponse {
    pub message: ChatMessage,
    pub session_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("model provider returned invalid response: {0}")]
    InvalidResponse(String),
}

impl ModelError {
    pub fn user_message(&self) -> String {
        match self {
            ModelError::Network(err) => {
                if err.is_connect() {
                    "Could not reach the model service. Check your network connection."
                        .to_string()
                } else if err.is_timeout() {
                    "The model service took too long to answer. Try again shortly.".to_string()
                } else if let Some(status) = err.status() {
                    match status {
                        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                            "The model service rejected the API key. Check GOOGLE_API_KEY."
                                .to_string()
                        }
                        StatusCode::NOT_FOUND => {
                            "The requested model was not found. Check the model name in the config."
                                .to_string()
                        }
                        StatusCode::TOO_MANY_REQUESTS => {
                            "The model service is rate limiting requests. Try again later."
                                .to_string()
                        }
                        _ => format!(
                            "The model request failed with status {}. Try again later.",
                            status.as_u16()
                        ),
                    }
                } else {
                    "A network error occurred while contacting the model service.".to_string()
                }
            }
            ModelError::InvalidResponse(_) => {
                "The model returned a response that could not be processed. Try again."
                    .to_string()
            }
        }
    }
}

#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn chat(&self, request: ModelRequest) -> Result<ModelResponse, ModelError>;
}

/// Google AI `generateContent` client.
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    endpoint: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_endpoint(api_key, DEFAULT_GEMINI_ENDPOINT)
    }

    pub fn with_endpoint(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    fn model_url(&self, model: &str) -> String {
        let base = self.endpoint.trim_end_matches('/');
        format!("{base}/{model}:generateContent")
    }
}

#[async_trait]
impl ModelProvider for GeminiClient {
    async fn chat(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        let url = self.model_url(&request.model);
        let (system_text, contents) = to_gemini_format(&request.messages);

        let mut payload = json!({ "contents": contents });
        if let Some(system) = system_text {
            payload["system_instruction"] = json!({
                "parts": [{ "text": system }]
            });
        }

        info!(
            model = request.model.as_str(),
            messages = request.messages.len(),
            "Sending request to Gemini"
        );
        let response: GeminiResponse = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!("Received response from Gemini");

        let content = response
            .candidates
            .unwrap_or_default()
            .into_iter()
            .flat_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.text)
            .ok_or_else(|| ModelError::InvalidResponse("missing candidate text".into()))?;

        Ok(ModelResponse {
            message: ChatMessage::new(MessageRole::Assistant, content),
            session_id: request.session_id,
        })
    }
}

/// System messages become the `system_instruction`; the rest map onto
/// Gemini's user/model turns.
fn to_gemini_format(messages: &[ChatMessage]) -> (Option<String>, Vec<Value>) {
    let mut system_parts = Vec::new();
    let mut contents = Vec::new();

    for message in messages {
        match message.role {
            MessageRole::System => system_parts.push(message.content.clone()),
            MessageRole::User | MessageRole::Assistant => {
                let role = match message.role {
                    MessageRole::User => "user",
                    _ => "model",
                };
                contents.push(json!({
                    "role": role,
                    "parts": [{ "text": message.content }]
                }));
            }
        }
    }

    let system_text = if system_parts.is_empty() {
        None
    } else {
        Some(system_parts.join("\n\n"))
    };
    (system_text, contents)
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    text: Option<String>,
}
