#[derive(Debug, thiserror::Error)]
pub enum KomonError {
    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl KomonError {
    /// Short variant name, used when an error is recorded as data
    /// (for example in a results file) rather than displayed.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Agent(_) => "AgentError",
            Self::Model(_) => "ModelError",
            Self::Tool(_) => "ToolError",
            Self::Session(_) => "SessionError",
            Self::Config(_) => "ConfigError",
            Self::Io(_) => "IoError",
            Self::Serde(_) => "SerdeError",
        }
    }
}

pub type Result<T> = std::result::Result<T, KomonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = KomonError::Agent("test error".to_string());
        assert_eq!(err.to_string(), "Agent error: test error");
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(KomonError::Model("x".into()).kind(), "ModelError");
        assert_eq!(KomonError::Session("x".into()).kind(), "SessionError");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: KomonError = io.into();
        assert!(matches!(err, KomonError::Io(_)));
        assert_eq!(err.kind(), "IoError");
    }
}
