use std::io;
use thiserror::Error;

/// Failures while acquiring the tool catalogue from a provider.
///
/// Providers flatten their internal failures into one of these kinds; the
/// binder never sees provider-specific aggregate shapes.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("failed to spawn tool server '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("tool provider failed: {message}")]
    Provider { message: String },
    #[error("required environment variable {name} is not set")]
    MissingCredential { name: String },
    #[error("tool acquisition timed out after {seconds}s")]
    Timeout { seconds: u64 },
    #[error("tool binder is already closed")]
    Closed,
}

impl AcquireError {
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            AcquireError::Spawn { command, source } => format!(
                "Could not start the tool server command \"{command}\": {source}. \
                 Check that the command is installed and on PATH."
            ),
            AcquireError::Provider { message } => {
                format!("The tool provider could not be initialised: {message}")
            }
            AcquireError::MissingCredential { name } => format!(
                "The environment variable {name} is not set. \
                 Set it before starting the agent."
            ),
            AcquireError::Timeout { seconds } => format!(
                "The tool server did not become ready within {seconds} seconds. \
                 Increase load_timeout_secs or check the server."
            ),
            AcquireError::Closed => {
                "Tools were already shut down for this agent.".to_string()
            }
        }
    }
}

/// A failure while releasing an acquired resource. Logged, never re-raised.
#[derive(Debug, Error)]
#[error("cleanup failed: {message}")]
pub struct CleanupError {
    message: String,
}

impl CleanupError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<io::Error> for CleanupError {
    fn from(source: io::Error) -> Self {
        Self::new(source.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ToolInvokeError {
    #[error("unknown tool requested: {0}")]
    UnknownTool(String),
    #[error("tool '{tool}' is no longer available: its server was shut down")]
    Released { tool: String },
    #[error("invalid arguments for tool '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },
    #[error("tool '{tool}' execution failed: {message}")]
    Execution { tool: String, message: String },
}

impl ToolInvokeError {
    pub fn user_message(&self) -> String {
        match self {
            ToolInvokeError::UnknownTool(name) => {
                format!("The tool \"{name}\" is not available.")
            }
            ToolInvokeError::Released { tool } => format!(
                "The tool \"{tool}\" cannot be used any more because its server was shut down."
            ),
            ToolInvokeError::InvalidArguments { tool, message } => {
                format!("The tool \"{tool}\" rejected its input: {message}")
            }
            ToolInvokeError::Execution { tool, message } => {
                format!("Running the tool \"{tool}\" failed: {message}")
            }
        }
    }
}
