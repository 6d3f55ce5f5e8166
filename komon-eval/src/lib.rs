//! # komon-eval
//!
//! Verification harness for the `gov_doc_parser` agent.
//!
//! - [`TestCaseDriver`] runs end-to-end cases and records one CSV row each
//! - [`ToolCallRecorder`] captures the agent's tool trajectory
//! - [`ResultStore`] appends and reads the results file
//! - [`analyze`] samples step-2 rows and reports name agreement

pub mod analysis;
pub mod driver;
pub mod error;
pub mod recorder;
pub mod store;
pub mod verify;

pub use analysis::{
    AnalysisReport, DEFAULT_SAMPLE_SIZE, Mismatch, SAMPLED_RESULTS_FILE, analyze,
    default_output_path,
};
pub use driver::{
    CONFIRMATION_MESSAGES, CaseOutcome, RunSummary, TEST_USER_ID, TestCaseDriver, agent_replies,
    asks_for_confirmation, user_message,
};
pub use error::{EvalError, Result};
pub use recorder::{ToolCallRecord, ToolCallRecorder};
pub use store::{RESULT_HEADERS, ResultRow, ResultStore};
pub use verify::{StepSummary, Verification};
