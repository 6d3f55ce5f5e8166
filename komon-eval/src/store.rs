//! Append-only CSV log of test case results.

use crate::error::Result;
use crate::verify::{StepSummary, Verification};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// Column order of every results file.
pub const RESULT_HEADERS: [&str; 14] = [
    "test_case_id",
    "timestamp",
    "expected_client_name",
    "step1_called",
    "step1_client_name",
    "step1_success",
    "step1_match_count",
    "step2_called",
    "step2_client_name",
    "step2_success",
    "step2_verified",
    "verification_result",
    "confirmation_message",
    "error",
];

/// One line of the results file. Field order is column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub test_case_id: u64,
    pub timestamp: String,
    pub expected_client_name: String,
    #[serde(with = "title_bool")]
    pub step1_called: bool,
    pub step1_client_name: String,
    #[serde(with = "title_bool")]
    pub step1_success: bool,
    pub step1_match_count: u64,
    #[serde(with = "title_bool")]
    pub step2_called: bool,
    pub step2_client_name: String,
    #[serde(with = "title_bool")]
    pub step2_success: bool,
    #[serde(with = "title_bool")]
    pub step2_verified: bool,
    pub verification_result: String,
    pub confirmation_message: String,
    pub error: String,
}

impl ResultRow {
    pub fn new(
        test_case_id: u64,
        expected_client_name: &str,
        summary: &StepSummary,
        verification: Verification,
        confirmation_message: &str,
        error: &str,
    ) -> Self {
        Self {
            test_case_id,
            timestamp: local_timestamp(),
            expected_client_name: expected_client_name.to_string(),
            step1_called: summary.step1_called,
            step1_client_name: summary.step1_client_name.clone(),
            step1_success: summary.step1_success(),
            step1_match_count: summary.step1_match_count(),
            step2_called: summary.step2_called,
            step2_client_name: summary.step2_client_name.clone(),
            step2_success: summary.step2_success(),
            step2_verified: summary.step2_verified(),
            verification_result: verification.label().to_string(),
            confirmation_message: confirmation_message.to_string(),
            error: error.to_string(),
        }
    }

    pub fn verification(&self) -> Option<Verification> {
        Verification::from_label(&self.verification_result)
    }
}

fn local_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// `True` / `False` on write; any casing of `true` / `false` on read, empty as `false`.
mod title_bool {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "True" } else { "False" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" | "" => Ok(false),
            other => Err(D::Error::custom(format!("expected True or False, got {other:?}"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResultStore {
    path: PathBuf,
}

impl ResultStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one row, writing the header first if the file is new or empty.
    pub fn append(&self, row: &ResultRow) -> Result<()> {
        let is_new = std::fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new().has_headers(is_new).from_writer(file);
        writer.serialize(row)?;
        writer.flush()?;
        tracing::debug!(
            path = %self.path.display(),
            test_case_id = row.test_case_id,
            "result row appended"
        );
        Ok(())
    }

    pub fn read_all(&self) -> Result<Vec<ResultRow>> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        let rows = reader.deserialize().collect::<std::result::Result<Vec<ResultRow>, _>>()?;
        Ok(rows)
    }
}
