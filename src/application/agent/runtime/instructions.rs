use super::{ToolContext, ToolRuntime};

const DIRECTIVE_PROTOCOL: &str = r#"Respond with exactly one JSON object per turn, no prose around it:
- {"action":"final","response":"<answer for the user>"} when you are done.
- {"action":"call_tool","tool":"<tool name>","input":{...}} to run a tool.
After a tool call you receive a {"tool_result": ...} message and continue.
You may call the built-in tool "list_tools" to see the catalogue again."#;

const FALLBACK_GUIDANCE: &str = "No tools are available right now. Answer from your own \
knowledge, mention that live tool access is unavailable when it matters, and suggest what \
the user can do manually instead.";

impl ToolRuntime {
    pub fn compose_system_instructions(&self, context: &ToolContext) -> String {
        let mut text = String::from(DIRECTIVE_PROTOCOL);
        text.push_str("\n\n");

        if context.is_empty() {
            text.push_str(FALLBACK_GUIDANCE);
            return text;
        }

        text.push_str("These tools are available:\n");
        for tool in &context.tools {
            let description = tool.description.as_deref().unwrap_or("No description.");
            text.push_str(&format!("- {}: {}\n", tool.name, description));
        }
        text.push_str(
            "Call a tool only when it actually helps with the request. If the request is \
             not covered by any tool, say so and answer as well as you can.",
        );
        text
    }
}
