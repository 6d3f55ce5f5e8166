//! Sampled agreement analysis over a results file.
//!
//! Keeps the rows where step 2 ran, samples them without replacement and
//! counts how often the expected name, the step 1 name and the step 2 name
//! are all identical.

use crate::error::{EvalError, Result};
use rand::Rng;
use rand::seq::SliceRandom;
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_SAMPLE_SIZE: usize = 5000;
pub const SAMPLED_RESULTS_FILE: &str = "sampled_results.csv";

/// Mismatches listed in the report.
const REPORTED_MISMATCHES: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub test_case_id: String,
    pub expected: String,
    pub step1: String,
    pub step2: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    /// Rows with `step2_called` true in the input.
    pub step2_rows: usize,
    pub sample_size: usize,
    pub match_count: usize,
    pub mismatches: Vec<Mismatch>,
    /// `None` when there was nothing to sample.
    pub output_path: Option<PathBuf>,
}

impl AnalysisReport {
    /// Percentage of sampled rows where all three names agree.
    pub fn match_rate(&self) -> f64 {
        if self.sample_size == 0 {
            return 0.0;
        }
        self.match_count as f64 / self.sample_size as f64 * 100.0
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "step2_called=Trueの総行数: {}", self.step2_rows)?;
        if self.step2_rows == 0 {
            return write!(f, "step2_called=Trueの行が見つかりませんでした");
        }
        if let Some(path) = &self.output_path {
            writeln!(f, "抽出したデータを保存: {}", path.display())?;
        }
        writeln!(f, "サンプル数: {}", self.sample_size)?;
        writeln!(f, "3つの値が全て一致: {} 件", self.match_count)?;
        writeln!(f, "不一致: {} 件", self.mismatches.len())?;
        write!(f, "一致率: {:.2}%", self.match_rate())?;

        if !self.mismatches.is_empty() {
            write!(f, "\n\n不一致ケース（最初の{}件）:", REPORTED_MISMATCHES)?;
            for (i, case) in self.mismatches.iter().take(REPORTED_MISMATCHES).enumerate() {
                write!(f, "\n\n{}. テストケースID: {}", i + 1, case.test_case_id)?;
                write!(f, "\n   expected_client_name: 「{}」", case.expected)?;
                write!(f, "\n   step1_client_name:    「{}」", case.step1)?;
                write!(f, "\n   step2_client_name:    「{}」", case.step2)?;
            }
        }
        Ok(())
    }
}

struct Columns {
    test_case_id: usize,
    step2_called: usize,
    expected: Option<usize>,
    step1: Option<usize>,
    step2: Option<usize>,
}

impl Columns {
    fn locate(headers: &csv::StringRecord) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| EvalError::Format(format!("missing column {name}")))
        };
        Ok(Self {
            test_case_id: require("test_case_id")?,
            step2_called: require("step2_called")?,
            expected: find("expected_client_name"),
            step1: find("step1_client_name"),
            step2: find("step2_client_name"),
        })
    }
}

fn field(record: &csv::StringRecord, index: Option<usize>) -> &str {
    index.and_then(|i| record.get(i)).unwrap_or_default()
}

/// Samples up to `sample_size` step-2 rows from `input`, writes them to
/// `output` renumbered from 1 under the input's header, and reports agreement.
pub fn analyze<R: Rng + ?Sized>(
    input: &Path,
    output: &Path,
    sample_size: usize,
    rng: &mut R,
) -> Result<AnalysisReport> {
    let mut reader = csv::Reader::from_path(input)?;
    let headers = reader.headers()?.clone();
    let columns = Columns::locate(&headers)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if field(&record, Some(columns.step2_called)).trim().eq_ignore_ascii_case("true") {
            rows.push(record);
        }
    }
    tracing::info!(input = %input.display(), step2_rows = rows.len(), "results loaded");

    if rows.is_empty() {
        return Ok(AnalysisReport {
            step2_rows: 0,
            sample_size: 0,
            match_count: 0,
            mismatches: Vec::new(),
            output_path: None,
        });
    }

    let step2_rows = rows.len();
    let take = sample_size.min(step2_rows);
    rows.shuffle(rng);
    rows.truncate(take);

    let sampled: Vec<csv::StringRecord> = rows
        .into_iter()
        .enumerate()
        .map(|(i, record)| {
            record
                .iter()
                .enumerate()
                .map(|(col, value)| {
                    if col == columns.test_case_id {
                        (i + 1).to_string()
                    } else {
                        value.to_string()
                    }
                })
                .collect()
        })
        .collect();

    let mut writer = csv::Writer::from_path(output)?;
    writer.write_record(&headers)?;
    for record in &sampled {
        writer.write_record(record)?;
    }
    writer.flush()?;

    let mut match_count = 0;
    let mut mismatches = Vec::new();
    for record in &sampled {
        let expected = field(record, columns.expected);
        let step1 = field(record, columns.step1);
        let step2 = field(record, columns.step2);
        if expected == step1 && step1 == step2 {
            match_count += 1;
        } else {
            mismatches.push(Mismatch {
                test_case_id: field(record, Some(columns.test_case_id)).to_string(),
                expected: expected.to_string(),
                step1: step1.to_string(),
                step2: step2.to_string(),
            });
        }
    }

    tracing::info!(
        sample_size = take,
        match_count,
        mismatch_count = mismatches.len(),
        output = %output.display(),
        "analysis finished"
    );

    Ok(AnalysisReport {
        step2_rows,
        sample_size: take,
        match_count,
        mismatches,
        output_path: Some(output.to_path_buf()),
    })
}

/// `sampled_results.csv` in the directory of `input`.
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_file_name(SAMPLED_RESULTS_FILE)
}
