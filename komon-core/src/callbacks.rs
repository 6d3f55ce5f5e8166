use crate::{Result, ToolContext};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A finished tool execution, as seen by after-tool callbacks.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub tool_name: String,
    pub args: Value,
    pub response: Value,
}

/// Runs after every tool execution. Returning `Some(value)` replaces the
/// response sent back to the model; `None` keeps it.
pub type AfterToolCallback = Box<
    dyn Fn(
            Arc<dyn ToolContext>,
            ToolInvocation,
        ) -> Pin<Box<dyn Future<Output = Result<Option<Value>>> + Send>>
        + Send
        + Sync,
>;
