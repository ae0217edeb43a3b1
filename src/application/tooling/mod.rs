mod binder;
mod error;
mod interface;
mod local;
mod process;

pub use binder::LazyToolBinder;
pub use error::{AcquireError, CleanupError, ToolInvokeError};
pub use interface::{
    CleanupHandle, ResourceCleanup, ToolBundle, ToolExecutor, ToolHandle, ToolProvider,
};
pub use local::LocalToolProvider;
pub use process::{BridgeFactory, ServerBridge, StdioServerProvider, UnlinkedServerProvider};
