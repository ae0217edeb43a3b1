use super::{AgentDirective, AgentError, ToolRuntime, Value};

impl ToolRuntime {
    /// Decode the model's reply into a directive.
    ///
    /// Models wrap the JSON in prose or code fences often enough that plain
    /// `from_str` is not sufficient; the raw text, the fence body, and the
    /// widest brace span are each tried until one parses.
    pub fn parse_agent_action(&self, content: &str) -> Result<AgentDirective, AgentError> {
        let value = json_candidates(content)
            .find_map(|slice| serde_json::from_str::<Value>(slice).ok())
            .ok_or_else(|| {
                AgentError::InvalidResponse(
                    "expected a JSON directive in the model response".into(),
                )
            })?;
        decode_directive(value)
    }
}

fn decode_directive(value: Value) -> Result<AgentDirective, AgentError> {
    // Some models quote the whole object; unwrap one level of string.
    let value = match value {
        Value::String(inner) => serde_json::from_str(&inner).map_err(|_| {
            AgentError::InvalidResponse(format!("model replied with plain text: {inner}"))
        })?,
        other => other,
    };
    serde_json::from_value(value)
        .map_err(|err| AgentError::InvalidResponse(format!("malformed agent directive: {err}")))
}

fn json_candidates(content: &str) -> impl Iterator<Item = &str> {
    let trimmed = content.trim();

    let fenced = trimmed.strip_prefix("```").map(|rest| {
        let body = rest.trim_start_matches(|c: char| c.is_ascii_alphabetic());
        match body.rfind("```") {
            Some(end) => body[..end].trim(),
            None => body.trim(),
        }
    });

    let braced = match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => Some(trimmed[start..=end].trim()),
        _ => None,
    };

    std::iter::once(trimmed).chain(fenced).chain(braced)
}
