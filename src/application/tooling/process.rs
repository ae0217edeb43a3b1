use async_trait::async_trait;
use serde_json::Value;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info};

use super::error::{AcquireError, CleanupError, ToolInvokeError};
use super::interface::{
    CleanupHandle, ResourceCleanup, ToolBundle, ToolExecutor, ToolHandle, ToolProvider,
};
use crate::config::ServerConfig;

/// The conversation with a running tool server. The wire protocol behind it
/// is not this crate's concern; embedders supply an implementation backed by
/// whatever transport their server speaks.
#[async_trait]
pub trait ServerBridge: Send + Sync {
    async fn invoke(&self, tool: &str, arguments: Value) -> Result<Value, ToolInvokeError>;
}

/// Builds the bridge for a freshly spawned server. Called once per
/// acquisition with the child's ends of the stdio pipes; the bridge owns
/// them from then on, including draining stdout.
#[async_trait]
pub trait BridgeFactory: Send + Sync {
    async fn connect(
        &self,
        stdin: ChildStdin,
        stdout: ChildStdout,
    ) -> Result<Arc<dyn ServerBridge>, AcquireError>;
}

/// Acquires tools by launching the configured server command.
///
/// The spawned child is the owned resource: the returned cleanup handle
/// kills and reaps it. The tool catalogue comes from the server's config
/// declaration, and every handle forwards invocations to the bridge the
/// factory built over the child's pipes.
pub struct StdioServerProvider {
    server: ServerConfig,
    factory: Arc<dyn BridgeFactory>,
}

impl StdioServerProvider {
    pub fn new(server: ServerConfig, factory: Arc<dyn BridgeFactory>) -> Self {
        Self { server, factory }
    }
}

#[async_trait]
impl ToolProvider for StdioServerProvider {
    async fn acquire(&self) -> Result<ToolBundle, AcquireError> {
        if self.server.tools.is_empty() {
            return Err(AcquireError::provider(format!(
                "server '{}' declares no tools; add them to its [server] config section",
                self.server.name
            )));
        }

        let mut command = Command::new(&self.server.command);
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        if let Some(dir) = &self.server.workdir {
            command.current_dir(dir);
        }
        if !self.server.args.is_empty() {
            command.args(&self.server.args);
        }
        for (key, value) in &self.server.env {
            command.env(key, resolve_env_value(value)?);
        }

        let mut child = command.spawn().map_err(|source| AcquireError::Spawn {
            command: self.server.command.clone(),
            source,
        })?;
        info!(
            server = self.server.name.as_str(),
            command = self.server.command.as_str(),
            pid = ?child.id(),
            "Tool server process started"
        );

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = child.start_kill();
                return Err(AcquireError::provider(format!(
                    "server '{}' did not expose stdio pipes",
                    self.server.name
                )));
            }
        };
        let bridge = match self.factory.connect(stdin, stdout).await {
            Ok(bridge) => bridge,
            Err(err) => {
                // The child must not outlive a failed acquisition.
                let _ = child.start_kill();
                return Err(err);
            }
        };

        let released = Arc::new(AtomicBool::new(false));
        let tools = self
            .server
            .tools
            .iter()
            .map(|tool| {
                ToolHandle::new(
                    tool.name.clone(),
                    tool.description.clone(),
                    Arc::new(BridgeExecutor {
                        tool: tool.name.clone(),
                        bridge: bridge.clone(),
                        released: released.clone(),
                    }),
                )
            })
            .collect();

        let cleanup = CleanupHandle::new(
            self.server.name.clone(),
            Box::new(ProcessCleanup {
                server: self.server.name.clone(),
                child,
                released,
            }),
        );
        Ok(ToolBundle::new(tools).with_cleanup(cleanup))
    }
}

/// Stand-in for builds that configure a tool server without linking a
/// transport bridge. Acquisition always fails, so the caller's
/// degrade-or-abort policy decides what happens, same as any other
/// acquisition failure.
pub struct UnlinkedServerProvider {
    server_name: String,
}

impl UnlinkedServerProvider {
    pub fn new(server_name: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
        }
    }
}

#[async_trait]
impl ToolProvider for UnlinkedServerProvider {
    async fn acquire(&self) -> Result<ToolBundle, AcquireError> {
        Err(AcquireError::provider(format!(
            "no transport bridge linked for server '{}'",
            self.server_name
        )))
    }
}

/// `${VAR}` values are credentials taken from the agent's own environment,
/// checked before the server is spawned.
fn resolve_env_value(raw: &str) -> Result<String, AcquireError> {
    match raw.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
        Some(name) => std::env::var(name)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| AcquireError::MissingCredential {
                name: name.to_string(),
            }),
        None => Ok(raw.to_string()),
    }
}

struct BridgeExecutor {
    tool: String,
    bridge: Arc<dyn ServerBridge>,
    released: Arc<AtomicBool>,
}

#[async_trait]
impl ToolExecutor for BridgeExecutor {
    async fn invoke(&self, arguments: Value) -> Result<Value, ToolInvokeError> {
        if self.released.load(Ordering::SeqCst) {
            return Err(ToolInvokeError::Released {
                tool: self.tool.clone(),
            });
        }
        self.bridge.invoke(&self.tool, arguments).await
    }
}

struct ProcessCleanup {
    server: String,
    child: Child,
    released: Arc<AtomicBool>,
}

#[async_trait]
impl ResourceCleanup for ProcessCleanup {
    async fn release(&mut self) -> Result<(), CleanupError> {
        self.released.store(true, Ordering::SeqCst);
        let kill_result = self.child.kill().await;
        // Reap even when kill failed; the process may have exited already.
        let _ = self.child.wait().await;
        match kill_result {
            Ok(()) => {
                debug!(server = self.server.as_str(), "Tool server process stopped");
                Ok(())
            }
            Err(source) => Err(CleanupError::new(format!(
                "could not stop tool server '{}': {source}",
                self.server
            ))),
        }
    }
}
