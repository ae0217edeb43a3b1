// Stdio server provider tests - spawning, pipe handover, and cleanup.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use sundial_agent::config::{ServerConfig, ToolConfig};
use sundial_agent::tooling::{
    AcquireError, BridgeFactory, LazyToolBinder, ServerBridge, StdioServerProvider,
    ToolInvokeError, ToolProvider, UnlinkedServerProvider,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, ChildStdout};

struct RecordingBridge {
    invocations: Arc<AtomicUsize>,
}

#[async_trait]
impl ServerBridge for RecordingBridge {
    async fn invoke(&self, tool: &str, _arguments: Value) -> Result<Value, ToolInvokeError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        Ok(json!({
            "content": [{ "type": "text", "text": format!("{tool} ran") }],
            "isError": false
        }))
    }
}

/// Parks the child's stdin so the spawned process stays alive for the
/// duration of the test.
struct RecordingFactory {
    invocations: Arc<AtomicUsize>,
    stdin: std::sync::Mutex<Option<ChildStdin>>,
}

#[async_trait]
impl BridgeFactory for RecordingFactory {
    async fn connect(
        &self,
        stdin: ChildStdin,
        _stdout: ChildStdout,
    ) -> Result<Arc<dyn ServerBridge>, AcquireError> {
        *self.stdin.lock().expect("stdin slot") = Some(stdin);
        Ok(Arc::new(RecordingBridge {
            invocations: self.invocations.clone(),
        }))
    }
}

fn factory() -> (Arc<RecordingFactory>, Arc<AtomicUsize>) {
    let invocations = Arc::new(AtomicUsize::new(0));
    (
        Arc::new(RecordingFactory {
            invocations: invocations.clone(),
            stdin: std::sync::Mutex::new(None),
        }),
        invocations,
    )
}

fn server(command: &str, tools: Vec<&str>) -> ServerConfig {
    ServerConfig {
        name: "test-server".to_string(),
        command: command.to_string(),
        tools: tools
            .into_iter()
            .map(|name| ToolConfig {
                name: name.to_string(),
                description: None,
            })
            .collect(),
        ..ServerConfig::default()
    }
}

#[tokio::test]
async fn spawn_failure_names_the_command() {
    let (factory, _) = factory();
    let provider = StdioServerProvider::new(
        server("/nonexistent/tool-server-binary", vec!["toolA"]),
        factory,
    );

    let result = provider.acquire().await;
    match result {
        Err(AcquireError::Spawn { command, .. }) => {
            assert_eq!(command, "/nonexistent/tool-server-binary");
        }
        Err(other) => panic!("expected spawn error, got {other:?}"),
        Ok(_) => panic!("expected spawn error, got a bundle"),
    }
}

#[tokio::test]
async fn empty_catalogue_is_rejected_before_spawning() {
    let (factory, _) = factory();
    let provider = StdioServerProvider::new(server("cat", vec![]), factory);

    let result = provider.acquire().await;
    assert!(matches!(result, Err(AcquireError::Provider { .. })));
}

#[tokio::test]
async fn unset_credential_placeholder_fails_before_spawn() {
    let (factory, _) = factory();
    let mut config = server("cat", vec!["toolA"]);
    config.env.insert(
        "API_TOKEN".to_string(),
        "${SUNDIAL_TEST_TOKEN_THAT_IS_UNSET}".to_string(),
    );
    let provider = StdioServerProvider::new(config, factory);

    let result = provider.acquire().await;
    assert!(matches!(
        result,
        Err(AcquireError::MissingCredential { ref name })
            if name == "SUNDIAL_TEST_TOKEN_THAT_IS_UNSET"
    ));
}

#[tokio::test]
async fn factory_receives_live_pipes_to_the_child() {
    struct RoundTripFactory {
        echoed: Arc<std::sync::Mutex<Option<String>>>,
    }

    #[async_trait]
    impl BridgeFactory for RoundTripFactory {
        async fn connect(
            &self,
            mut stdin: ChildStdin,
            stdout: ChildStdout,
        ) -> Result<Arc<dyn ServerBridge>, AcquireError> {
            stdin
                .write_all(b"ping\n")
                .await
                .map_err(|err| AcquireError::provider(err.to_string()))?;
            stdin
                .flush()
                .await
                .map_err(|err| AcquireError::provider(err.to_string()))?;

            let mut line = String::new();
            BufReader::new(stdout)
                .read_line(&mut line)
                .await
                .map_err(|err| AcquireError::provider(err.to_string()))?;
            *self.echoed.lock().expect("echo slot") = Some(line.trim().to_string());

            Ok(Arc::new(RecordingBridge {
                invocations: Arc::new(AtomicUsize::new(0)),
            }))
        }
    }

    let echoed = Arc::new(std::sync::Mutex::new(None));
    let provider = StdioServerProvider::new(
        server("cat", vec!["toolA"]),
        Arc::new(RoundTripFactory {
            echoed: echoed.clone(),
        }),
    );
    let binder = LazyToolBinder::new(Arc::new(provider));

    binder.ensure_loaded().await.expect("spawn and connect");
    assert_eq!(echoed.lock().expect("echo slot").as_deref(), Some("ping"));

    binder.teardown().await;
}

#[tokio::test]
async fn failed_bridge_connect_surfaces_the_error() {
    struct RefusingFactory;

    #[async_trait]
    impl BridgeFactory for RefusingFactory {
        async fn connect(
            &self,
            _stdin: ChildStdin,
            _stdout: ChildStdout,
        ) -> Result<Arc<dyn ServerBridge>, AcquireError> {
            Err(AcquireError::provider("handshake refused"))
        }
    }

    let provider =
        StdioServerProvider::new(server("cat", vec!["toolA"]), Arc::new(RefusingFactory));

    let result = provider.acquire().await;
    assert!(matches!(
        result,
        Err(AcquireError::Provider { ref message }) if message.contains("handshake refused")
    ));
}

#[tokio::test]
async fn spawned_tools_forward_to_bridge_until_released() {
    let (factory, invocations) = factory();
    // `cat` blocks on its piped stdin, standing in for a long-running server.
    let provider = Arc::new(StdioServerProvider::new(
        server("cat", vec!["toolA", "toolB"]),
        factory.clone(),
    ));
    let binder = LazyToolBinder::new(provider);

    let tools = binder.ensure_loaded().await.expect("spawn and load");
    assert_eq!(tools.len(), 2);
    assert!(factory.stdin.lock().expect("stdin slot").is_some());

    let output = tools[0].invoke(json!({})).await.expect("invoke");
    assert_eq!(output["content"][0]["text"], "toolA ran");
    assert_eq!(invocations.load(Ordering::SeqCst), 1);

    binder.teardown().await;

    let result = tools[1].invoke(json!({})).await;
    assert!(matches!(result, Err(ToolInvokeError::Released { .. })));
    // The bridge must not have been consulted after release.
    assert_eq!(invocations.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unlinked_server_fails_acquisition_and_stays_retryable() {
    let provider = Arc::new(UnlinkedServerProvider::new("github"));
    let binder = LazyToolBinder::new(provider);

    let result = binder.ensure_loaded().await;
    match result {
        Err(AcquireError::Provider { message }) => assert!(message.contains("github")),
        Err(other) => panic!("expected provider error, got {other:?}"),
        Ok(_) => panic!("expected provider error, got a bundle"),
    }
    assert!(!binder.is_loaded().await);
    assert!(binder.current_tools().await.is_empty());
}
