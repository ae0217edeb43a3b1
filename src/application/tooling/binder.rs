use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::error::AcquireError;
use super::interface::{CleanupHandle, ToolHandle, ToolProvider};

/// Defers tool acquisition until first use, caches the catalogue, and
/// guarantees the provider's resource is released on shutdown.
///
/// States move `Empty -> Loaded -> Closed`; a failed acquisition leaves the
/// binder `Empty` so a later call can retry, and `Closed` is terminal.
/// The whole check-then-load sequence runs under one async mutex, so
/// concurrent callers serialize and acquisition happens at most once.
pub struct LazyToolBinder {
    provider: Arc<dyn ToolProvider>,
    timeout: Option<Duration>,
    state: Mutex<BinderState>,
}

enum BinderState {
    Empty,
    Loaded {
        tools: Vec<ToolHandle>,
        cleanup: Option<CleanupHandle>,
    },
    Closed,
}

impl LazyToolBinder {
    pub fn new(provider: Arc<dyn ToolProvider>) -> Self {
        Self {
            provider,
            timeout: None,
            state: Mutex::new(BinderState::Empty),
        }
    }

    /// Bound the provider call. Without this the binder waits as long as the
    /// provider does.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Load the tool catalogue if it has not been loaded yet.
    ///
    /// Idempotent: once loaded, later calls return the cached catalogue
    /// without touching the provider.
    pub async fn ensure_loaded(&self) -> Result<Vec<ToolHandle>, AcquireError> {
        let mut state = self.state.lock().await;
        match &*state {
            BinderState::Loaded { tools, .. } => {
                debug!(tools = tools.len(), "Tool catalogue already loaded");
                return Ok(tools.clone());
            }
            BinderState::Closed => return Err(AcquireError::Closed),
            BinderState::Empty => {}
        }

        let acquisition = self.provider.acquire();
        let bundle = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, acquisition).await {
                Ok(result) => result?,
                Err(_) => {
                    return Err(AcquireError::Timeout {
                        seconds: limit.as_secs(),
                    });
                }
            },
            None => acquisition.await?,
        };

        info!(
            tools = bundle.tools.len(),
            cleanup = bundle.cleanup.is_some(),
            "Tool catalogue loaded"
        );
        let tools = bundle.tools.clone();
        *state = BinderState::Loaded {
            tools: bundle.tools,
            cleanup: bundle.cleanup,
        };
        Ok(tools)
    }

    /// Snapshot of the loaded catalogue; empty before the first successful
    /// load and after teardown.
    pub async fn current_tools(&self) -> Vec<ToolHandle> {
        match &*self.state.lock().await {
            BinderState::Loaded { tools, .. } => tools.clone(),
            _ => Vec::new(),
        }
    }

    pub async fn is_loaded(&self) -> bool {
        matches!(&*self.state.lock().await, BinderState::Loaded { .. })
    }

    /// Release the provider's resource, if one was acquired.
    ///
    /// Safe before any load and safe to call twice; a release failure is
    /// logged and swallowed because teardown usually runs during shutdown or
    /// error unwinding, where a second error would mask the first.
    pub async fn teardown(&self) {
        let previous = {
            let mut state = self.state.lock().await;
            std::mem::replace(&mut *state, BinderState::Closed)
        };

        match previous {
            BinderState::Loaded {
                cleanup: Some(handle),
                ..
            } => {
                let label = handle.label().to_string();
                match handle.release().await {
                    Ok(()) => debug!(resource = label.as_str(), "Tool resource released"),
                    Err(err) => {
                        warn!(resource = label.as_str(), %err, "Tool resource release failed")
                    }
                }
            }
            BinderState::Loaded { cleanup: None, .. } => {
                debug!("Binder closed; no owned resource to release")
            }
            BinderState::Empty | BinderState::Closed => {}
        }
    }
}
