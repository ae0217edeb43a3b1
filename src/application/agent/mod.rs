mod context;
mod directive;
mod errors;
mod models;
mod runner;
mod runtime;


pub use context::{ToolContext, ToolDescriptor};
pub use errors::{AgentError, ToolError};
pub use models::{AgentOptions, AgentOutcome, AgentStep};
pub use runner::Agent;
pub(crate) use runtime::ToolRuntime;
