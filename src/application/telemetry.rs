use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Mutex;
use tracing::info;

/// Conversation lifecycle events worth recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    SessionStart,
    UserMessage,
    AgentResponse,
    ToolCall,
    ToolResponse,
    Error,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::SessionStart => "session_start",
            EventType::UserMessage => "user_message",
            EventType::AgentResponse => "agent_response",
            EventType::ToolCall => "tool_call",
            EventType::ToolResponse => "tool_response",
            EventType::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationEvent {
    pub event_type: EventType,
    pub session_id: String,
    pub detail: Value,
    pub at: DateTime<Utc>,
}

/// Records conversation events as structured logs plus an in-memory trail.
///
/// Tracking is best-effort by construction: nothing here returns an error,
/// so a conversation never fails because of its own bookkeeping.
pub struct ConversationTracker {
    enabled: bool,
    events: Mutex<Vec<ConversationEvent>>,
}

impl ConversationTracker {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn track(&self, event_type: EventType, session_id: &str, detail: Value) {
        if !self.enabled {
            return;
        }
        info!(
            event = event_type.as_str(),
            session_id, %detail, "Conversation event"
        );
        let event = ConversationEvent {
            event_type,
            session_id: session_id.to_string(),
            detail,
            at: Utc::now(),
        };
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    pub fn events(&self) -> Vec<ConversationEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}
