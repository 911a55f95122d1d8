/// Domain-specific error types for the metrics engine.
/// Bad numeric input is never an error -- calculators return None and move on.
/// Errors here are for the boundaries: store access, configuration, and
/// per-position evaluation failures that must be isolated, not propagated.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("database error: {0}")]
    Database(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("malformed position {key}: {reason}")]
    MalformedPosition { key: String, reason: String },

    #[error("channel closed: {0}")]
    ChannelClosed(String),
}

impl From<rusqlite::Error> for EngineError {
    fn from(e: rusqlite::Error) -> Self {
        EngineError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Parse(e.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Database(e.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
