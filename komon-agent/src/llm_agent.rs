use crate::context::AgentToolContext;
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use komon_core::{
    AfterToolCallback, Agent, Content, Event, EventStream, GenerateContentConfig,
    InvocationContext, KomonError, Llm, LlmRequest, Part, Result, Tool, ToolContext,
    ToolInvocation, function_declaration,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::Instrument;

/// Model calls allowed in one turn before the agent gives up.
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

pub struct LlmAgent {
    name: String,
    description: String,
    model: Arc<dyn Llm>,
    instruction: Option<String>,
    tools: Vec<Arc<dyn Tool>>,
    generate_config: Option<GenerateContentConfig>,
    max_iterations: usize,
    after_tool_callbacks: Arc<Vec<AfterToolCallback>>,
}

impl std::fmt::Debug for LlmAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmAgent")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("model", &self.model.name())
            .field("instruction", &self.instruction)
            .field("tools_count", &self.tools.len())
            .field("max_iterations", &self.max_iterations)
            .finish()
    }
}

impl LlmAgent {
    pub fn model(&self) -> &Arc<dyn Llm> {
        &self.model
    }

    pub fn instruction(&self) -> Option<&str> {
        self.instruction.as_deref()
    }

    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }
}

pub struct LlmAgentBuilder {
    name: String,
    description: Option<String>,
    model: Option<Arc<dyn Llm>>,
    instruction: Option<String>,
    tools: Vec<Arc<dyn Tool>>,
    generate_config: Option<GenerateContentConfig>,
    max_iterations: usize,
    after_tool_callbacks: Vec<AfterToolCallback>,
}

impl LlmAgentBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            model: None,
            instruction: None,
            tools: Vec::new(),
            generate_config: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            after_tool_callbacks: Vec::new(),
        }
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn model(mut self, model: Arc<dyn Llm>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn tools(mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn generate_content_config(mut self, config: GenerateContentConfig) -> Self {
        self.generate_config = Some(config);
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn after_tool_callback(mut self, callback: AfterToolCallback) -> Self {
        self.after_tool_callbacks.push(callback);
        self
    }

    pub fn build(self) -> Result<LlmAgent> {
        let model = self.model.ok_or_else(|| KomonError::Agent("Model is required".to_string()))?;

        let mut seen = std::collections::HashSet::new();
        for tool in &self.tools {
            if !seen.insert(tool.name().to_string()) {
                return Err(KomonError::Agent(format!("duplicate tool name: {}", tool.name())));
            }
        }

        Ok(LlmAgent {
            name: self.name,
            description: self.description.unwrap_or_default(),
            model,
            instruction: self.instruction,
            tools: self.tools,
            generate_config: self.generate_config,
            max_iterations: self.max_iterations,
            after_tool_callbacks: Arc::new(self.after_tool_callbacks),
        })
    }
}

#[async_trait]
impl Agent for LlmAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn run(&self, ctx: Arc<dyn InvocationContext>) -> Result<EventStream> {
        tracing::info!(
            agent.name = %self.name,
            invocation.id = %ctx.invocation_id(),
            user.id = %ctx.user_id(),
            session.id = %ctx.session_id(),
            "starting agent turn"
        );

        let agent_name = self.name.clone();
        let invocation_id = ctx.invocation_id().to_string();
        let model = self.model.clone();
        let tools = self.tools.clone();
        let instruction = self.instruction.clone();
        let generate_config = self.generate_config.clone();
        let max_iterations = self.max_iterations;
        let after_tool_callbacks = self.after_tool_callbacks.clone();

        let s = stream! {
            let mut conversation_history = Vec::new();
            if let Some(instruction) = instruction.filter(|i| !i.trim().is_empty()) {
                conversation_history.push(Content::new("user").with_text(instruction));
            }
            conversation_history.extend(ctx.history().iter().cloned());
            conversation_history.push(ctx.user_content().clone());

            let tool_declarations: HashMap<String, serde_json::Value> = tools
                .iter()
                .map(|t| (t.name().to_string(), function_declaration(t.as_ref())))
                .collect();

            let mut iteration = 0;
            loop {
                iteration += 1;
                if iteration > max_iterations {
                    yield Err(KomonError::Agent(format!(
                        "Max iterations ({}) exceeded",
                        max_iterations
                    )));
                    return;
                }

                let request = LlmRequest {
                    model: model.name().to_string(),
                    contents: conversation_history.clone(),
                    config: generate_config.clone(),
                    tools: tool_declarations.clone(),
                };

                let span = tracing::info_span!("model.call", model.name = %model.name(), iteration);
                let call = model.generate_content(request, false).instrument(span);
                let mut response_stream = match call.await {
                    Ok(s) => s,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };

                let mut accumulated: Option<Content> = None;
                while let Some(chunk) = response_stream.next().await {
                    let chunk = match chunk {
                        Ok(chunk) => chunk,
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    };
                    if let Some(message) = chunk.error_message {
                        yield Err(KomonError::Model(message));
                        return;
                    }
                    if let Some(content) = chunk.content {
                        match accumulated.as_mut() {
                            Some(acc) => acc.parts.extend(content.parts),
                            None => accumulated = Some(content),
                        }
                    }
                    if chunk.turn_complete {
                        break;
                    }
                }

                let Some(content) = accumulated.filter(|c| !c.is_empty()) else {
                    tracing::debug!(agent.name = %agent_name, "empty model reply, ending turn");
                    break;
                };

                yield Ok(Event::new(&invocation_id)
                    .with_author(&agent_name)
                    .with_content(content.clone()));
                conversation_history.push(content.clone());

                let calls: Vec<(String, serde_json::Value)> = content
                    .function_calls()
                    .into_iter()
                    .map(|(name, args)| (name.to_string(), args.clone()))
                    .collect();
                if calls.is_empty() {
                    break;
                }

                let mut response_parts = Vec::with_capacity(calls.len());
                for (index, (name, args)) in calls.into_iter().enumerate() {
                    let Some(tool) = tools.iter().find(|t| t.name() == name) else {
                        tracing::warn!(tool.name = %name, "model called an unknown tool");
                        response_parts.push(Part::function_response(
                            name.clone(),
                            serde_json::json!({ "error": format!("tool not found: {}", name) }),
                        ));
                        continue;
                    };

                    let tool_ctx: Arc<dyn ToolContext> = Arc::new(AgentToolContext::new(
                        ctx.clone(),
                        format!("{}_{}_{}", invocation_id, name, index),
                    ));

                    let span = tracing::info_span!("tool.execute", tool.name = %name);
                    let execution = tool.execute(tool_ctx.clone(), args.clone()).instrument(span);
                    let mut response = match execution.await {
                        Ok(value) => value,
                        Err(e) => {
                            tracing::warn!(tool.name = %name, error = %e, "tool execution failed");
                            serde_json::json!({ "error": e.to_string() })
                        }
                    };

                    for callback in after_tool_callbacks.iter() {
                        let invocation = ToolInvocation {
                            tool_name: name.clone(),
                            args: args.clone(),
                            response: response.clone(),
                        };
                        match callback(tool_ctx.clone(), invocation).await {
                            Ok(Some(replacement)) => response = replacement,
                            Ok(None) => {}
                            Err(e) => {
                                yield Err(e);
                                return;
                            }
                        }
                    }

                    response_parts.push(Part::function_response(name, response));
                }

                let responses = Content { role: "user".to_string(), parts: response_parts };
                yield Ok(Event::new(&invocation_id)
                    .with_author(&agent_name)
                    .with_content(responses.clone()));
                conversation_history.push(responses);
            }
        };

        Ok(Box::pin(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use komon_model::MockLlm;

    #[test]
    fn test_build_requires_model() {
        let err = LlmAgentBuilder::new("agent").build().unwrap_err();
        assert!(matches!(err, KomonError::Agent(_)));
    }

    #[test]
    fn test_build_rejects_duplicate_tool_names() {
        let registry = Arc::new(komon_tool::ClientRegistry::new(["株式会社青空"]));
        let err = LlmAgentBuilder::new("agent")
            .model(Arc::new(MockLlm::new("mock")))
            .tool(Arc::new(komon_tool::step1_tool(registry.clone())))
            .tool(Arc::new(komon_tool::step1_tool(registry)))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("duplicate tool name"));
    }

    #[test]
    fn test_builder_defaults() {
        let agent = LlmAgentBuilder::new("agent")
            .description("desc")
            .model(Arc::new(MockLlm::new("mock")))
            .build()
            .unwrap();
        assert_eq!(agent.name(), "agent");
        assert_eq!(agent.description(), "desc");
        assert!(agent.instruction().is_none());
        assert_eq!(agent.max_iterations, DEFAULT_MAX_ITERATIONS);
    }
}
