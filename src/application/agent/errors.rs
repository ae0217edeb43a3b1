use crate::application::client::ClientError;
use crate::application::tooling::{AcquireError, ToolInvokeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error(transparent)]
    Acquire(#[from] AcquireError),
    #[error("invalid agent response: {0}")]
    InvalidResponse(String),
}

impl AgentError {
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Client(err) => err.user_message(),
            AgentError::Tool(err) => err.user_message(),
            AgentError::Acquire(err) => err.user_message(),
            AgentError::InvalidResponse(_) => {
                "The model gave a response the agent could not follow. Please try again."
                    .to_string()
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool requested: {0}")]
    UnknownTool(String),
    #[error("failed to execute tool '{tool}': {source}")]
    Execution {
        tool: String,
        #[source]
        source: ToolInvokeError,
    },
}

impl ToolError {
    pub fn user_message(&self) -> String {
        match self {
            ToolError::UnknownTool(name) => {
                format!("The tool \"{name}\" is not available to this agent.")
            }
            ToolError::Execution { source, .. } => source.user_message(),
        }
    }
}
