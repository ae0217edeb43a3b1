use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use super::error::{AcquireError, CleanupError, ToolInvokeError};

/// A named capability the agent may invoke.
///
/// Handles are cheap to clone; the executor behind them is shared.
#[derive(Clone)]
pub struct ToolHandle {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Option<Value>,
    executor: Arc<dyn ToolExecutor>,
}

impl ToolHandle {
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        executor: Arc<dyn ToolExecutor>,
    ) -> Self {
        Self {
            name: name.into(),
            description,
            input_schema: None,
            executor,
        }
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = Some(schema);
        self
    }

    pub async fn invoke(&self, arguments: Value) -> Result<Value, ToolInvokeError> {
        self.executor.invoke(arguments).await
    }
}

impl fmt::Debug for ToolHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolHandle")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn invoke(&self, arguments: Value) -> Result<Value, ToolInvokeError>;
}

/// Everything a successful acquisition hands over: the tool catalogue and,
/// when the provider opened an external resource to produce it, the handle
/// that releases that resource.
pub struct ToolBundle {
    pub tools: Vec<ToolHandle>,
    pub cleanup: Option<CleanupHandle>,
}

impl ToolBundle {
    pub fn new(tools: Vec<ToolHandle>) -> Self {
        Self {
            tools,
            cleanup: None,
        }
    }

    pub fn with_cleanup(mut self, cleanup: CleanupHandle) -> Self {
        self.cleanup = Some(cleanup);
        self
    }
}

/// External source of the tool catalogue. One call acquires everything;
/// failures are flattened into [`AcquireError`] kinds.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    async fn acquire(&self) -> Result<ToolBundle, AcquireError>;
}

#[async_trait]
pub trait ResourceCleanup: Send {
    async fn release(&mut self) -> Result<(), CleanupError>;
}

/// Owned handle to a resource that must be released exactly once.
///
/// `release` consumes the handle, so a second release cannot compile.
pub struct CleanupHandle {
    label: String,
    inner: Box<dyn ResourceCleanup>,
}

impl CleanupHandle {
    pub fn new(label: impl Into<String>, inner: Box<dyn ResourceCleanup>) -> Self {
        Self {
            label: label.into(),
            inner,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub async fn release(mut self) -> Result<(), CleanupError> {
        self.inner.release().await
    }
}

impl fmt::Debug for CleanupHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CleanupHandle")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}
