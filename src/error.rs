use thiserror::Error;

#[derive(Error, Debug)]
pub enum CleanerError {
    #[error("Data source unavailable ({location}): {reason}")]
    SourceUnavailable { location: String, reason: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Sink error: {0}")]
    Sink(String),

    #[error("Pipeline error in stage '{stage}': {message}")]
    Pipeline { stage: String, message: String },
}

impl CleanerError {
    pub fn source_unavailable(location: impl Into<String>, reason: impl ToString) -> Self {
        CleanerError::SourceUnavailable {
            location: location.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CleanerError>;
