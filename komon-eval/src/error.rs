//! Error types for the verification harness

use komon_core::KomonError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EvalError>;

#[derive(Error, Debug)]
pub enum EvalError {
    /// Agent, model or session failure surfaced by the runtime
    #[error(transparent)]
    Agent(#[from] KomonError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A results file is missing a column the analysis needs
    #[error("Invalid results file: {0}")]
    Format(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl EvalError {
    /// Variant name recorded in the `error` column of a results row.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Agent(e) => e.kind(),
            Self::Csv(_) => "CsvError",
            Self::Io(_) => "IoError",
            Self::Format(_) => "FormatError",
            Self::Config(_) => "ConfigError",
        }
    }

    /// `"{kind}: {message}"`, the form results files carry.
    pub fn describe(&self) -> String {
        format!("{}: {}", self.kind(), self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_uses_runtime_kind() {
        let err = EvalError::from(KomonError::Model("quota exceeded".into()));
        assert_eq!(err.kind(), "ModelError");
        assert_eq!(err.describe(), "ModelError: Model error: quota exceeded");
    }

    #[test]
    fn test_describe_local_errors() {
        let err = EvalError::Format("missing column step2_called".into());
        assert_eq!(
            err.describe(),
            "FormatError: Invalid results file: missing column step2_called"
        );
    }
}
