//! Tool-call recording.
//!
//! Two ways to get the same trajectory: [`ToolCallRecorder`] hooks the agent's
//! after-tool callback, [`ToolCallRecord::from_events`] rebuilds it from the
//! function call / response parts of an event stream.

use komon_core::{AfterToolCallback, Event, KomonError, Part};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub tool_name: String,
    pub args: Value,
    /// `Null` when the call never got a response.
    pub result: Value,
}

impl ToolCallRecord {
    pub fn new(tool_name: impl Into<String>, args: Value, result: Value) -> Self {
        Self { tool_name: tool_name.into(), args, result }
    }

    /// `args.client_name` as a string, or `""`.
    pub fn client_name(&self) -> &str {
        self.args.get("client_name").and_then(Value::as_str).unwrap_or_default()
    }

    /// Pairs every function call with the next response of the same name,
    /// in call order.
    pub fn from_events(events: &[Event]) -> Vec<ToolCallRecord> {
        let mut records: Vec<ToolCallRecord> = Vec::new();
        let mut pending: Vec<usize> = Vec::new();

        for part in events.iter().filter_map(Event::content).flat_map(|c| c.parts.iter()) {
            match part {
                Part::FunctionCall { name, args, .. } => {
                    pending.push(records.len());
                    records.push(ToolCallRecord::new(name.clone(), args.clone(), Value::Null));
                }
                Part::FunctionResponse { function_response, .. } => {
                    let slot = pending
                        .iter()
                        .position(|&i| records[i].tool_name == function_response.name);
                    if let Some(slot) = slot {
                        let index = pending.remove(slot);
                        records[index].result = function_response.response.clone();
                    }
                }
                Part::Text { .. } => {}
            }
        }

        records
    }
}

/// Collects every tool execution of an agent. Share one recorder between the
/// agent (through [`ToolCallRecorder::callback`]) and whoever reads the calls.
#[derive(Debug, Clone, Default)]
pub struct ToolCallRecorder {
    calls: Arc<Mutex<Vec<ToolCallRecord>>>,
}

impl ToolCallRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// After-tool callback that records the call and leaves the response as is.
    pub fn callback(&self) -> AfterToolCallback {
        let calls = self.calls.clone();
        Box::new(move |_ctx, invocation| {
            let calls = calls.clone();
            Box::pin(async move {
                tracing::debug!(
                    tool.name = %invocation.tool_name,
                    args = %invocation.args,
                    "tool call recorded"
                );
                if let Ok(mut calls) = calls.lock() {
                    calls.push(ToolCallRecord::new(
                        invocation.tool_name,
                        invocation.args,
                        invocation.response,
                    ));
                }
                Ok::<_, KomonError>(None)
            })
        })
    }

    pub fn calls(&self) -> Vec<ToolCallRecord> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use komon_core::{Content, ToolInvocation};
    use serde_json::json;

    fn event(content: Content) -> Event {
        Event::new("inv").with_author("gov_doc_parser").with_content(content)
    }

    #[test]
    fn test_from_events_pairs_calls_with_responses() {
        let events = vec![
            event(Content::new("model").with_part(Part::function_call(
                "step1_get_client_info",
                json!({"client_name": "株式会社青空"}),
            ))),
            event(Content::new("user").with_part(Part::function_response(
                "step1_get_client_info",
                json!({"success": true, "count": 1}),
            ))),
            event(Content::new("model").with_text("よろしいですか？")),
            event(Content::new("model").with_part(Part::function_call(
                "step2_process_client_data",
                json!({"client_name": "株式会社青空"}),
            ))),
        ];

        let records = ToolCallRecord::from_events(&events);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].tool_name, "step1_get_client_info");
        assert_eq!(records[0].client_name(), "株式会社青空");
        assert_eq!(records[0].result["count"], 1);
        assert_eq!(records[1].result, Value::Null);
    }

    #[test]
    fn test_parallel_calls_match_by_name() {
        let events = vec![
            event(
                Content::new("model")
                    .with_part(Part::function_call("a", json!({})))
                    .with_part(Part::function_call("b", json!({}))),
            ),
            event(
                Content::new("user")
                    .with_part(Part::function_response("b", json!({"r": "b"})))
                    .with_part(Part::function_response("a", json!({"r": "a"}))),
            ),
        ];

        let records = ToolCallRecord::from_events(&events);
        assert_eq!(records[0].result, json!({"r": "a"}));
        assert_eq!(records[1].result, json!({"r": "b"}));
    }

    #[test]
    fn test_client_name_defaults_to_empty() {
        let record =
            ToolCallRecord::new("step1_get_client_info", json!({"client_name": 3}), Value::Null);
        assert_eq!(record.client_name(), "");
    }

    #[tokio::test]
    async fn test_callback_records_without_replacing() {
        struct Ctx(Content);

        #[async_trait::async_trait]
        impl komon_core::ReadonlyContext for Ctx {
            fn invocation_id(&self) -> &str {
                "inv"
            }
            fn agent_name(&self) -> &str {
                "agent"
            }
            fn user_id(&self) -> &str {
                "user"
            }
            fn app_name(&self) -> &str {
                "app"
            }
            fn session_id(&self) -> &str {
                "session"
            }
            fn user_content(&self) -> &Content {
                &self.0
            }
        }

        #[async_trait::async_trait]
        impl komon_core::ToolContext for Ctx {
            fn function_call_id(&self) -> &str {
                "call"
            }
        }

        let recorder = ToolCallRecorder::new();
        let callback = recorder.callback();
        let ctx: Arc<dyn komon_core::ToolContext> = Arc::new(Ctx(Content::new("user")));
        let replaced = callback(
            ctx,
            ToolInvocation {
                tool_name: "step2_process_client_data".into(),
                args: json!({"client_name": "有限会社みどり"}),
                response: json!({"success": true}),
            },
        )
        .await
        .unwrap();

        assert!(replaced.is_none());
        assert_eq!(recorder.len(), 1);
        assert_eq!(recorder.calls()[0].client_name(), "有限会社みどり");

        recorder.clear();
        assert!(recorder.is_empty());
    }
}
