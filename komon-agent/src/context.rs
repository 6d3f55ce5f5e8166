use async_trait::async_trait;
use komon_core::{Content, InvocationContext, ReadonlyContext, ToolContext};
use std::sync::Arc;

/// Context for one agent turn, built by the runner from the session.
pub struct AgentInvocation {
    invocation_id: String,
    agent_name: String,
    user_id: String,
    app_name: String,
    session_id: String,
    user_content: Content,
    history: Vec<Content>,
}

impl AgentInvocation {
    pub fn new(
        invocation_id: impl Into<String>,
        agent_name: impl Into<String>,
        user_id: impl Into<String>,
        app_name: impl Into<String>,
        session_id: impl Into<String>,
        user_content: Content,
        history: Vec<Content>,
    ) -> Self {
        Self {
            invocation_id: invocation_id.into(),
            agent_name: agent_name.into(),
            user_id: user_id.into(),
            app_name: app_name.into(),
            session_id: session_id.into(),
            user_content,
            history,
        }
    }
}

#[async_trait]
impl ReadonlyContext for AgentInvocation {
    fn invocation_id(&self) -> &str {
        &self.invocation_id
    }

    fn agent_name(&self) -> &str {
        &self.agent_name
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn app_name(&self) -> &str {
        &self.app_name
    }

    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn user_content(&self) -> &Content {
        &self.user_content
    }
}

#[async_trait]
impl InvocationContext for AgentInvocation {
    fn history(&self) -> &[Content] {
        &self.history
    }
}

/// Wraps the parent invocation so tools see the real user and session.
pub(crate) struct AgentToolContext {
    parent_ctx: Arc<dyn InvocationContext>,
    function_call_id: String,
}

impl AgentToolContext {
    pub(crate) fn new(parent_ctx: Arc<dyn InvocationContext>, function_call_id: String) -> Self {
        Self { parent_ctx, function_call_id }
    }
}

#[async_trait]
impl ReadonlyContext for AgentToolContext {
    fn invocation_id(&self) -> &str {
        self.parent_ctx.invocation_id()
    }

    fn agent_name(&self) -> &str {
        self.parent_ctx.agent_name()
    }

    fn user_id(&self) -> &str {
        self.parent_ctx.user_id()
    }

    fn app_name(&self) -> &str {
        self.parent_ctx.app_name()
    }

    fn session_id(&self) -> &str {
        self.parent_ctx.session_id()
    }

    fn user_content(&self) -> &Content {
        self.parent_ctx.user_content()
    }
}

#[async_trait]
impl ToolContext for AgentToolContext {
    fn function_call_id(&self) -> &str {
        &self.function_call_id
    }
}
