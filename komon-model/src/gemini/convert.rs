//! Type conversion between komon contents and the Gemini REST format.

use komon_core::{Content, FinishReason, LlmRequest, LlmResponse, Part, UsageMetadata};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<GeminiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<GeminiFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_response: Option<GeminiFunctionResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiFunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiFunctionResponse {
    pub name: String,
    pub response: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiTool {
    pub function_declarations: Vec<Value>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub usage_metadata: Option<GeminiUsage>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<GeminiContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiUsage {
    #[serde(default)]
    pub prompt_token_count: i32,
    #[serde(default)]
    pub candidates_token_count: i32,
    #[serde(default)]
    pub total_token_count: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

/// Gemini only knows `user` and `model`; function responses travel as `user`.
fn gemini_role(role: &str) -> &'static str {
    if role == "model" { "model" } else { "user" }
}

pub fn content_to_gemini(content: &Content) -> GeminiContent {
    let parts = content
        .parts
        .iter()
        .map(|part| match part {
            Part::Text { text } => GeminiPart { text: Some(text.clone()), ..Default::default() },
            Part::FunctionCall { name, args, .. } => GeminiPart {
                function_call: Some(GeminiFunctionCall { name: name.clone(), args: args.clone() }),
                ..Default::default()
            },
            Part::FunctionResponse { function_response, .. } => GeminiPart {
                function_response: Some(GeminiFunctionResponse {
                    name: function_response.name.clone(),
                    response: response_object(&function_response.response),
                }),
                ..Default::default()
            },
        })
        .collect();

    GeminiContent { role: Some(gemini_role(&content.role).to_string()), parts }
}

/// The API requires a JSON object as the function response.
fn response_object(value: &Value) -> Value {
    if value.is_object() { value.clone() } else { json!({ "result": value }) }
}

pub fn build_request(
    request: &LlmRequest,
    temperature: Option<f32>,
    max_output_tokens: Option<i32>,
) -> GenerateContentRequest {
    let contents = request.contents.iter().map(content_to_gemini).collect();

    let tools = if request.tools.is_empty() {
        None
    } else {
        let mut declarations: Vec<Value> = request.tools.values().cloned().collect();
        declarations.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));
        Some(vec![GeminiTool { function_declarations: declarations }])
    };

    let config = request.config.clone().unwrap_or_default();
    let generation_config = GenerationConfig {
        temperature: config.temperature.or(temperature),
        top_p: config.top_p,
        top_k: config.top_k,
        max_output_tokens: config.max_output_tokens.or(max_output_tokens),
    };
    let has_config = generation_config.temperature.is_some()
        || generation_config.top_p.is_some()
        || generation_config.top_k.is_some()
        || generation_config.max_output_tokens.is_some();

    GenerateContentRequest {
        contents,
        tools,
        generation_config: has_config.then_some(generation_config),
    }
}

fn finish_reason(reason: &str) -> FinishReason {
    match reason {
        "STOP" => FinishReason::Stop,
        "MAX_TOKENS" => FinishReason::MaxTokens,
        "SAFETY" => FinishReason::Safety,
        "RECITATION" => FinishReason::Recitation,
        _ => FinishReason::Other,
    }
}

pub fn from_response(response: &GenerateContentResponse) -> LlmResponse {
    let usage_metadata = response.usage_metadata.as_ref().map(|u| UsageMetadata {
        prompt_token_count: u.prompt_token_count,
        candidates_token_count: u.candidates_token_count,
        total_token_count: u.total_token_count,
    });

    let Some(candidate) = response.candidates.first() else {
        let reason = response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.clone())
            .unwrap_or_else(|| "NO_CANDIDATES".to_string());
        return LlmResponse {
            usage_metadata,
            turn_complete: true,
            error_code: Some(reason.clone()),
            error_message: Some(format!("Gemini returned no candidates ({reason})")),
            ..Default::default()
        };
    };

    let parts: Vec<Part> = candidate
        .content
        .as_ref()
        .map(|c| {
            c.parts
                .iter()
                .filter_map(|p| {
                    if let Some(call) = &p.function_call {
                        Some(Part::function_call(call.name.clone(), call.args.clone()))
                    } else if let Some(resp) = &p.function_response {
                        Some(Part::function_response(resp.name.clone(), resp.response.clone()))
                    } else {
                        p.text.as_ref().map(|t| Part::text(t.clone()))
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    LlmResponse {
        content: (!parts.is_empty()).then(|| Content { role: "model".to_string(), parts }),
        usage_metadata,
        finish_reason: candidate.finish_reason.as_deref().map(finish_reason),
        partial: false,
        turn_complete: true,
        error_code: None,
        error_message: None,
    }
}
