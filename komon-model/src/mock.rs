use komon_core::{
    Content, FinishReason, Llm, LlmRequest, LlmResponse, LlmResponseStream, Part, Result,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Replays scripted responses, one per model call, in order. Once the script
/// runs out every call answers with a plain text turn, so an agent loop
/// driven by it always terminates.
pub struct MockLlm {
    name: String,
    responses: Arc<Mutex<VecDeque<LlmResponse>>>,
    requests: Arc<Mutex<Vec<LlmRequest>>>,
}

impl MockLlm {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            responses: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_response(self, response: LlmResponse) -> Self {
        self.push(response);
        self
    }

    pub fn with_text(self, text: &str) -> Self {
        self.with_response(Self::text_response(text))
    }

    pub fn with_function_call(self, name: &str, args: Value) -> Self {
        self.with_response(Self::function_call_response(name, args))
    }

    pub fn push(&self, response: LlmResponse) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(response);
        }
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn text_response(text: &str) -> LlmResponse {
        LlmResponse::new(Content::new("model").with_text(text))
    }

    pub fn function_call_response(name: &str, args: Value) -> LlmResponse {
        LlmResponse {
            content: Some(Content::new("model").with_part(Part::function_call(name, args))),
            finish_reason: Some(FinishReason::Stop),
            turn_complete: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl Llm for MockLlm {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_content(&self, req: LlmRequest, _stream: bool) -> Result<LlmResponseStream> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(req);
        }
        let response = self
            .responses
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
            .unwrap_or_else(|| Self::text_response("done"));
        let stream = async_stream::stream! {
            yield Ok(response);
        };
        Ok(Box::pin(stream))
    }
}
