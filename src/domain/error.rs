//! Domain error types.

use chrono::NaiveDateTime;

/// Top-level error type for aitrader.
#[derive(Debug, thiserror::Error)]
pub enum AitraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("invalid bar at index {index}: {reason}")]
    InvalidBar { index: usize, reason: String },

    #[error("non-monotonic timestamp at index {index}: {timestamp} does not follow {previous}")]
    NonMonotonic {
        index: usize,
        previous: NaiveDateTime,
        timestamp: NaiveDateTime,
    },

    #[error("oracle error: {reason}")]
    Oracle { reason: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AitraderError {
    pub fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        AitraderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&AitraderError> for std::process::ExitCode {
    fn from(err: &AitraderError) -> Self {
        let code: u8 = match err {
            AitraderError::Io(_) => 1,
            AitraderError::ConfigParse { .. }
            | AitraderError::ConfigMissing { .. }
            | AitraderError::ConfigInvalid { .. } => 2,
            AitraderError::Data { .. }
            | AitraderError::InvalidBar { .. }
            | AitraderError::NonMonotonic { .. } => 3,
            AitraderError::Oracle { .. } => 4,
            AitraderError::Report { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
