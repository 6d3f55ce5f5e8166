use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponseData {
    pub name: String,
    pub response: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    FunctionCall {
        name: String,
        args: Value,
        /// Provider call ID. None for Gemini.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    FunctionResponse {
        function_response: FunctionResponseData,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn function_call(name: impl Into<String>, args: Value) -> Self {
        Self::FunctionCall { name: name.into(), args, id: None }
    }

    pub fn function_response(name: impl Into<String>, response: Value) -> Self {
        Self::FunctionResponse {
            function_response: FunctionResponseData { name: name.into(), response },
            id: None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}

impl Content {
    pub fn new(role: impl Into<String>) -> Self {
        Self { role: role.into(), parts: Vec::new() }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(Part::text(text));
        self
    }

    pub fn with_part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Concatenation of every text part, in order.
    pub fn text(&self) -> String {
        self.parts.iter().filter_map(Part::as_text).collect()
    }

    /// `(name, args)` of every function call part, in order.
    pub fn function_calls(&self) -> Vec<(&str, &Value)> {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::FunctionCall { name, args, .. } => Some((name.as_str(), args)),
                _ => None,
            })
            .collect()
    }

    pub fn function_responses(&self) -> Vec<&FunctionResponseData> {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::FunctionResponse { function_response, .. } => Some(function_response),
                _ => None,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_text_concatenates_parts() {
        let content = Content::new("model")
            .with_text("顧問先を")
            .with_part(Part::function_call("step1_get_client_info", json!({})))
            .with_text("確認します");
        assert_eq!(content.text(), "顧問先を確認します");
    }

    #[test]
    fn test_function_calls_in_order() {
        let content = Content::new("model")
            .with_part(Part::function_call("a", json!({"x": 1})))
            .with_part(Part::function_call("b", json!({"x": 2})));
        let calls = content.function_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "a");
        assert_eq!(calls[1].1["x"], 2);
    }

    #[test]
    fn test_function_response_serializes_camel_case() {
        let part = Part::function_response("step1_get_client_info", json!({"count": 1}));
        let value = serde_json::to_value(&part).unwrap();
        assert_eq!(value["functionResponse"]["name"], "step1_get_client_info");
        assert!(value.get("id").is_none());
    }

    #[test]
    fn test_part_untagged_deserialize() {
        let part: Part = serde_json::from_value(json!({"text": "hello"})).unwrap();
        assert_eq!(part.as_text(), Some("hello"));

        let part: Part =
            serde_json::from_value(json!({"name": "step2_process_client_data", "args": {}}))
                .unwrap();
        assert!(matches!(part, Part::FunctionCall { id: None, .. }));
    }
}
