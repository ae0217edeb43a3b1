mod execution;
mod instructions;
mod parser;

use std::collections::HashMap;

pub(super) use super::context::{ToolContext, ToolDescriptor};
pub(super) use super::directive::AgentDirective;
pub(super) use super::errors::{AgentError, ToolError};
pub(super) use crate::application::tooling::ToolHandle;
pub(super) use serde_json::{Value, json};

/// Dispatch layer between the directive loop and the loaded tool handles.
pub struct ToolRuntime {
    handles: Vec<ToolHandle>,
    index: HashMap<String, ToolHandle>,
}

impl ToolRuntime {
    pub fn new(handles: Vec<ToolHandle>) -> Self {
        let index = handles
            .iter()
            .cloned()
            .map(|handle| (handle.name.to_lowercase(), handle))
            .collect();
        Self { handles, index }
    }

    pub fn build_context(&self) -> ToolContext {
        ToolContext {
            tools: self
                .handles
                .iter()
                .map(|handle| ToolDescriptor {
                    name: handle.name.clone(),
                    description: handle.description.clone(),
                    input_schema: handle.input_schema.clone(),
                })
                .collect(),
        }
    }

    pub fn initial_user_prompt(&self, prompt: String, context: &ToolContext) -> String {
        if context.is_empty() {
            return prompt;
        }
        json!({
            "request": prompt,
            "tool_context": context,
        })
        .to_string()
    }
}
