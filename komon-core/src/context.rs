use crate::types::Content;
use async_trait::async_trait;

#[async_trait]
pub trait ReadonlyContext: Send + Sync {
    fn invocation_id(&self) -> &str;
    fn agent_name(&self) -> &str;
    fn user_id(&self) -> &str;
    fn app_name(&self) -> &str;
    fn session_id(&self) -> &str;
    fn user_content(&self) -> &Content;
}

#[async_trait]
pub trait InvocationContext: ReadonlyContext {
    /// Contents of earlier turns in the session, oldest first, excluding the
    /// current user message.
    fn history(&self) -> &[Content];
}
