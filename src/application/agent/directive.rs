use serde::Deserialize;
use serde_json::Value;

/// What the model asked for, decoded from its JSON reply.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AgentDirective {
    Final {
        response: String,
    },
    CallTool {
        tool: String,
        #[serde(default)]
        input: Value,
    },
}
