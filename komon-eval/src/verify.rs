//! Verdict for one test case: did step 2 receive the name the user typed?

use crate::recorder::ToolCallRecord;
use komon_tool::{STEP1_TOOL_NAME, STEP2_TOOL_NAME};
use serde_json::Value;
use std::fmt;

/// What the agent did with the two tools. When a tool ran more than once the
/// last call wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepSummary {
    pub step1_called: bool,
    pub step1_client_name: String,
    pub step1_result: Option<Value>,
    pub step2_called: bool,
    pub step2_client_name: String,
    pub step2_result: Option<Value>,
}

impl StepSummary {
    pub fn from_calls(calls: &[ToolCallRecord]) -> Self {
        let mut summary = Self::default();
        for call in calls {
            if call.tool_name.contains(STEP1_TOOL_NAME) {
                summary.step1_called = true;
                summary.step1_client_name = call.client_name().to_string();
                summary.step1_result = Some(call.result.clone());
            } else if call.tool_name.contains(STEP2_TOOL_NAME) {
                summary.step2_called = true;
                summary.step2_client_name = call.client_name().to_string();
                summary.step2_result = Some(call.result.clone());
            }
        }
        summary
    }

    pub fn step1_success(&self) -> bool {
        result_flag(&self.step1_result, "success")
    }

    pub fn step1_match_count(&self) -> u64 {
        self.step1_result
            .as_ref()
            .and_then(|r| r.get("count"))
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }

    pub fn step2_success(&self) -> bool {
        result_flag(&self.step2_result, "success")
    }

    pub fn step2_verified(&self) -> bool {
        result_flag(&self.step2_result, "verified")
    }

    /// Compares the name step 2 received with `expected`, byte for byte.
    pub fn verify(&self, expected: &str) -> Verification {
        if !self.step2_called || self.step2_client_name.is_empty() {
            Verification::Undecidable
        } else if self.step2_client_name == expected {
            Verification::Match
        } else {
            Verification::Mismatch
        }
    }
}

fn result_flag(result: &Option<Value>, key: &str) -> bool {
    result.as_ref().and_then(|r| r.get(key)).and_then(Value::as_bool).unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Match,
    Mismatch,
    Undecidable,
    Error,
}

impl Verification {
    /// Label written to the `verification_result` column.
    pub fn label(self) -> &'static str {
        match self {
            Self::Match => "一致",
            Self::Mismatch => "不一致",
            Self::Undecidable => "判定不可",
            Self::Error => "エラー",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "一致" => Some(Self::Match),
            "不一致" => Some(Self::Mismatch),
            "判定不可" => Some(Self::Undecidable),
            "エラー" => Some(Self::Error),
            _ => None,
        }
    }

    /// `Some(true)` pass, `Some(false)` fail, `None` when nothing can be said.
    pub fn outcome(self) -> Option<bool> {
        match self {
            Self::Match => Some(true),
            Self::Mismatch | Self::Error => Some(false),
            Self::Undecidable => None,
        }
    }
}

impl fmt::Display for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(tool: &str, name: &str, result: Value) -> ToolCallRecord {
        ToolCallRecord::new(tool, json!({"client_name": name}), result)
    }

    #[test]
    fn test_last_call_of_each_tool_wins() {
        let calls = vec![
            call(STEP1_TOOL_NAME, "青空", json!({"success": false, "count": 0})),
            call(STEP1_TOOL_NAME, "株式会社青空", json!({"success": true, "count": 1})),
            call(STEP2_TOOL_NAME, "株式会社青空", json!({"success": true, "verified": true})),
        ];
        let summary = StepSummary::from_calls(&calls);
        assert!(summary.step1_called && summary.step2_called);
        assert_eq!(summary.step1_client_name, "株式会社青空");
        assert!(summary.step1_success());
        assert_eq!(summary.step1_match_count(), 1);
        assert!(summary.step2_verified());
        assert_eq!(summary.verify("株式会社青空"), Verification::Match);
    }

    #[test]
    fn test_mismatch_and_undecidable() {
        let calls = vec![call(STEP2_TOOL_NAME, "株式会社 青空", json!({"success": false}))];
        let summary = StepSummary::from_calls(&calls);
        assert_eq!(summary.verify("株式会社青空"), Verification::Mismatch);
        assert!(!summary.step2_verified());

        let step1_only = StepSummary::from_calls(&[call(STEP1_TOOL_NAME, "株式会社青空", json!({}))]);
        assert_eq!(step1_only.verify("株式会社青空"), Verification::Undecidable);

        let empty_name = StepSummary::from_calls(&[call(STEP2_TOOL_NAME, "", json!({}))]);
        assert_eq!(empty_name.verify(""), Verification::Undecidable);
    }

    #[test]
    fn test_labels_and_outcomes() {
        let all = [
            Verification::Match,
            Verification::Mismatch,
            Verification::Undecidable,
            Verification::Error,
        ];
        for v in all {
            assert_eq!(Verification::from_label(v.label()), Some(v));
        }
        assert_eq!(Verification::Match.outcome(), Some(true));
        assert_eq!(Verification::Error.outcome(), Some(false));
        assert_eq!(Verification::Undecidable.outcome(), None);
        assert_eq!(Verification::Mismatch.to_string(), "不一致");
    }
}
