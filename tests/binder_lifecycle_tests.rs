// Binder lifecycle tests - lazy acquisition, idempotence, and teardown.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use sundial_agent::tooling::{
    AcquireError, CleanupError, CleanupHandle, LazyToolBinder, ResourceCleanup, ToolBundle,
    ToolExecutor, ToolHandle, ToolInvokeError, ToolProvider,
};

struct CountingCleanup {
    releases: Arc<AtomicUsize>,
    released: Arc<AtomicBool>,
    fail: bool,
}

#[async_trait]
impl ResourceCleanup for CountingCleanup {
    async fn release(&mut self) -> Result<(), CleanupError> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.released.store(true, Ordering::SeqCst);
        if self.fail {
            return Err(CleanupError::new("connection already gone"));
        }
        Ok(())
    }
}

struct GuardedExecutor {
    released: Arc<AtomicBool>,
}

#[async_trait]
impl ToolExecutor for GuardedExecutor {
    async fn invoke(&self, _arguments: Value) -> Result<Value, ToolInvokeError> {
        if self.released.load(Ordering::SeqCst) {
            return Err(ToolInvokeError::Released {
                tool: "toolA".to_string(),
            });
        }
        Ok(json!({"ok": true}))
    }
}

/// Succeeds on the first acquisition and fails on any later one, so a test
/// can prove the provider was consulted exactly once.
struct OnceProvider {
    acquisitions: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
    released: Arc<AtomicBool>,
    fail_cleanup: bool,
}

impl OnceProvider {
    fn new() -> Self {
        Self {
            acquisitions: Arc::new(AtomicUsize::new(0)),
            releases: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicBool::new(false)),
            fail_cleanup: false,
        }
    }

    fn with_failing_cleanup() -> Self {
        Self {
            fail_cleanup: true,
            ..Self::new()
        }
    }
}

#[async_trait]
impl ToolProvider for OnceProvider {
    async fn acquire(&self) -> Result<ToolBundle, AcquireError> {
        if self.acquisitions.fetch_add(1, Ordering::SeqCst) > 0 {
            return Err(AcquireError::provider("provider invoked more than once"));
        }
        let tools = vec![ToolHandle::new(
            "toolA",
            None,
            Arc::new(GuardedExecutor {
                released: self.released.clone(),
            }),
        )];
        let cleanup = CleanupHandle::new(
            "toolA-server",
            Box::new(CountingCleanup {
                releases: self.releases.clone(),
                released: self.released.clone(),
                fail: self.fail_cleanup,
            }),
        );
        Ok(ToolBundle::new(tools).with_cleanup(cleanup))
    }
}

struct FailingProvider {
    acquisitions: Arc<AtomicUsize>,
}

#[async_trait]
impl ToolProvider for FailingProvider {
    async fn acquire(&self) -> Result<ToolBundle, AcquireError> {
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        Err(AcquireError::provider("handshake failed"))
    }
}

/// Fails on the first call, then succeeds: state must not be poisoned by
/// the failure.
struct FlakyProvider {
    acquisitions: Arc<AtomicUsize>,
}

#[async_trait]
impl ToolProvider for FlakyProvider {
    async fn acquire(&self) -> Result<ToolBundle, AcquireError> {
        if self.acquisitions.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(AcquireError::provider("server not ready"));
        }
        Ok(ToolBundle::new(vec![ToolHandle::new(
            "toolA",
            None,
            Arc::new(GuardedExecutor {
                released: Arc::new(AtomicBool::new(false)),
            }),
        )]))
    }
}

#[tokio::test]
async fn ensure_loaded_twice_acquires_once() {
    let provider = Arc::new(OnceProvider::new());
    let binder = LazyToolBinder::new(provider.clone());

    let first = binder.ensure_loaded().await.expect("first load");
    let second = binder.ensure_loaded().await.expect("second load is cached");

    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    assert_eq!(provider.acquisitions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn teardown_before_any_load_is_a_noop() {
    let provider = Arc::new(OnceProvider::new());
    let binder = LazyToolBinder::new(provider.clone());

    binder.teardown().await;

    assert_eq!(provider.releases.load(Ordering::SeqCst), 0);
    assert!(binder.current_tools().await.is_empty());
}

#[tokio::test]
async fn second_teardown_is_a_noop() {
    let provider = Arc::new(OnceProvider::new());
    let binder = LazyToolBinder::new(provider.clone());

    binder.ensure_loaded().await.expect("load");
    binder.teardown().await;
    binder.teardown().await;

    assert_eq!(provider.releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_acquisition_leaves_binder_retryable() {
    let provider = Arc::new(FlakyProvider {
        acquisitions: Arc::new(AtomicUsize::new(0)),
    });
    let binder = LazyToolBinder::new(provider.clone());

    let first = binder.ensure_loaded().await;
    assert!(first.is_err());
    assert!(binder.current_tools().await.is_empty());

    let second = binder.ensure_loaded().await.expect("retry succeeds");
    assert_eq!(second.len(), 1);
    assert_eq!(provider.acquisitions.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn two_loads_and_one_teardown_release_exactly_once() {
    let provider = Arc::new(OnceProvider::new());
    let binder = LazyToolBinder::new(provider.clone());

    binder.ensure_loaded().await.expect("first load");
    binder.ensure_loaded().await.expect("second load");
    binder.teardown().await;

    assert_eq!(provider.acquisitions.load(Ordering::SeqCst), 1);
    assert_eq!(provider.releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn always_failing_provider_never_populates_tools() {
    let provider = Arc::new(FailingProvider {
        acquisitions: Arc::new(AtomicUsize::new(0)),
    });
    let binder = LazyToolBinder::new(provider.clone());

    for _ in 0..3 {
        let result = binder.ensure_loaded().await;
        assert!(matches!(result, Err(AcquireError::Provider { .. })));
        assert!(binder.current_tools().await.is_empty());
    }
    assert_eq!(provider.acquisitions.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn released_tools_reject_invocation_after_teardown() {
    let provider = Arc::new(OnceProvider::new());
    let binder = LazyToolBinder::new(provider.clone());

    let tools = binder.ensure_loaded().await.expect("load");
    assert_eq!(
        tools[0].invoke(Value::Null).await.expect("invoke works"),
        json!({"ok": true})
    );

    binder.teardown().await;

    let result = tools[0].invoke(Value::Null).await;
    assert!(matches!(result, Err(ToolInvokeError::Released { .. })));
}

#[tokio::test]
async fn concurrent_callers_share_a_single_acquisition() {
    let provider = Arc::new(OnceProvider::new());
    let binder = Arc::new(LazyToolBinder::new(provider.clone()));

    let left = {
        let binder = binder.clone();
        tokio::spawn(async move { binder.ensure_loaded().await })
    };
    let right = {
        let binder = binder.clone();
        tokio::spawn(async move { binder.ensure_loaded().await })
    };

    let left = left.await.expect("task").expect("load");
    let right = right.await.expect("task").expect("load");

    assert_eq!(left.len(), 1);
    assert_eq!(right.len(), 1);
    assert_eq!(provider.acquisitions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cleanup_failure_is_swallowed() {
    let provider = Arc::new(OnceProvider::with_failing_cleanup());
    let binder = LazyToolBinder::new(provider.clone());

    binder.ensure_loaded().await.expect("load");
    // Must not panic or propagate even though release errors.
    binder.teardown().await;

    assert_eq!(provider.releases.load(Ordering::SeqCst), 1);
    assert!(binder.current_tools().await.is_empty());
}
