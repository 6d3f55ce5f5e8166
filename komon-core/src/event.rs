use crate::model::LlmResponse;
use crate::types::{Content, FunctionResponseData};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A single step of a conversation: the user's message, a model reply,
/// or the function responses produced by running tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub invocation_id: String,
    pub author: String,
    #[serde(flatten)]
    pub llm_response: LlmResponse,
}

impl Event {
    pub fn new(invocation_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            invocation_id: invocation_id.into(),
            author: String::new(),
            llm_response: LlmResponse::default(),
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_content(mut self, content: Content) -> Self {
        self.llm_response.content = Some(content);
        self
    }

    pub fn content(&self) -> Option<&Content> {
        self.llm_response.content.as_ref()
    }

    pub fn set_content(&mut self, content: Content) {
        self.llm_response.content = Some(content);
    }

    pub fn is_partial(&self) -> bool {
        self.llm_response.partial
    }

    /// Text of this event, empty if it carries none.
    pub fn text(&self) -> String {
        self.content().map(Content::text).unwrap_or_default()
    }

    pub fn function_calls(&self) -> Vec<(&str, &Value)> {
        self.content().map(Content::function_calls).unwrap_or_default()
    }

    pub fn function_responses(&self) -> Vec<&FunctionResponseData> {
        self.content().map(Content::function_responses).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Part;
    use serde_json::json;

    #[test]
    fn test_event_creation() {
        let event = Event::new("inv-123");
        assert_eq!(event.invocation_id, "inv-123");
        assert!(!event.id.is_empty());
        assert!(event.content().is_none());
        assert_eq!(event.text(), "");
    }

    #[test]
    fn test_event_function_parts() {
        let event = Event::new("inv-1").with_author("gov_doc_parser").with_content(
            Content::new("model")
                .with_part(Part::function_call(
                    "step1_get_client_info",
                    json!({"client_name": "A"}),
                )),
        );
        assert_eq!(event.author, "gov_doc_parser");
        assert_eq!(event.function_calls()[0].0, "step1_get_client_info");
        assert!(event.function_responses().is_empty());
    }
}
