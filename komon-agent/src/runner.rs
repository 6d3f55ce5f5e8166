use crate::context::AgentInvocation;
use crate::session::{GetRequest, SessionService};
use async_stream::stream;
use futures::StreamExt;
use komon_core::{Agent, Content, Event, EventStream, InvocationContext, Result};
use std::sync::Arc;
use tracing::Instrument;

pub struct RunnerConfig {
    pub app_name: String,
    pub agent: Arc<dyn Agent>,
    pub session_service: Arc<dyn SessionService>,
}

/// Drives one agent against a session store. Every user message and every
/// complete agent event is persisted, so later turns see the whole exchange.
pub struct Runner {
    app_name: String,
    root_agent: Arc<dyn Agent>,
    session_service: Arc<dyn SessionService>,
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            app_name: config.app_name,
            root_agent: config.agent,
            session_service: config.session_service,
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn session_service(&self) -> &Arc<dyn SessionService> {
        &self.session_service
    }

    pub async fn run(
        &self,
        user_id: String,
        session_id: String,
        user_content: Content,
    ) -> Result<EventStream> {
        let app_name = self.app_name.clone();
        let agent = self.root_agent.clone();
        let session_service = self.session_service.clone();

        let get_req = GetRequest {
            app_name: app_name.clone(),
            user_id: user_id.clone(),
            session_id: session_id.clone(),
        };
        let session = session_service.get(get_req.clone()).await?;
        let history = session.conversation_history();

        let invocation_id = format!("e-{}", uuid::Uuid::new_v4());
        let user_event = Event::new(&invocation_id)
            .with_author("user")
            .with_content(user_content.clone());
        session_service.append_event(get_req.clone(), user_event).await?;

        let ctx: Arc<dyn InvocationContext> = Arc::new(AgentInvocation::new(
            invocation_id.clone(),
            agent.name(),
            user_id.clone(),
            app_name.clone(),
            session_id.clone(),
            user_content,
            history,
        ));

        let span = tracing::info_span!(
            "agent.run",
            agent.name = %agent.name(),
            invocation.id = %invocation_id,
            session.id = %session_id
        );

        let s = stream! {
            // Model and tool work happens while the agent stream is polled.
            let mut agent_stream = match agent.run(ctx).instrument(span.clone()).await {
                Ok(s) => s,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            while let Some(result) = agent_stream.next().instrument(span.clone()).await {
                match result {
                    Ok(event) => {
                        if !event.is_partial() {
                            let appended =
                                session_service.append_event(get_req.clone(), event.clone()).await;
                            if let Err(e) = appended {
                                yield Err(e);
                                return;
                            }
                        }
                        yield Ok(event);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "agent turn failed");
                        yield Err(e);
                        return;
                    }
                }
            }
        };

        Ok(Box::pin(s))
    }
}
