use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::debug;

use super::error::{AcquireError, ToolInvokeError};
use super::interface::{ToolBundle, ToolExecutor, ToolHandle, ToolProvider};

/// In-process time tools. Used when no tool server is configured, and as the
/// reduced-capability fallback when one fails to start.
///
/// Carries no cleanup handle: nothing external is opened.
pub struct LocalToolProvider;

#[async_trait]
impl ToolProvider for LocalToolProvider {
    async fn acquire(&self) -> Result<ToolBundle, AcquireError> {
        debug!("Providing built-in time tools");
        Ok(ToolBundle::new(vec![
            ToolHandle::new(
                "get_current_time",
                Some("Current UTC time in ISO 8601 format.".to_string()),
                Arc::new(CurrentTime),
            )
            .with_schema(json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            })),
            ToolHandle::new(
                "get_time_difference",
                Some("Difference in seconds between two ISO 8601 timestamps.".to_string()),
                Arc::new(TimeDifference),
            )
            .with_schema(json!({
                "type": "object",
                "properties": {
                    "start": { "type": "string" },
                    "end": { "type": "string" }
                },
                "required": ["start", "end"]
            })),
        ]))
    }
}

struct CurrentTime;

#[async_trait]
impl ToolExecutor for CurrentTime {
    async fn invoke(&self, _arguments: Value) -> Result<Value, ToolInvokeError> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        Ok(text_result(now))
    }
}

struct TimeDifference;

#[async_trait]
impl ToolExecutor for TimeDifference {
    async fn invoke(&self, arguments: Value) -> Result<Value, ToolInvokeError> {
        let start = parse_timestamp(&arguments, "start")?;
        let end = parse_timestamp(&arguments, "end")?;
        let delta = end.signed_duration_since(start);
        Ok(text_result(format!("{} seconds", delta.num_seconds())))
    }
}

fn parse_timestamp(
    arguments: &Value,
    field: &str,
) -> Result<DateTime<FixedOffset>, ToolInvokeError> {
    let raw = arguments
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolInvokeError::InvalidArguments {
            tool: "get_time_difference".to_string(),
            message: format!("missing field '{field}'"),
        })?;
    DateTime::parse_from_rfc3339(raw).map_err(|err| ToolInvokeError::InvalidArguments {
        tool: "get_time_difference".to_string(),
        message: format!("'{field}' is not an ISO 8601 timestamp: {err}"),
    })
}

fn text_result(text: impl Into<String>) -> Value {
    json!({
        "content": [
            { "type": "text", "text": text.into() }
        ],
        "isError": false
    })
}
