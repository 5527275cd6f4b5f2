//! Domain error types.

use chrono::NaiveDateTime;

/// Top-level error type for barsmith.
#[derive(Debug, thiserror::Error)]
pub enum BarsmithError {
    #[error("unsupported timeframe: {value}")]
    UnsupportedTimeframe { value: String },

    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    #[error("failed to parse config {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no trading session found within {horizon_days} days of {instant}")]
    CalendarSearchExhausted {
        instant: NaiveDateTime,
        horizon_days: u32,
    },

    #[error("stream error in feed {feed}: {reason}")]
    Stream { feed: String, reason: String },

    #[error("CSV error: {reason}")]
    Csv { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BarsmithError {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        BarsmithError::Configuration {
            reason: reason.into(),
        }
    }

    pub(crate) fn stream(feed: &str, reason: impl Into<String>) -> Self {
        BarsmithError::Stream {
            feed: feed.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&BarsmithError> for std::process::ExitCode {
    fn from(err: &BarsmithError) -> Self {
        let code: u8 = match err {
            BarsmithError::Io(_) => 1,
            BarsmithError::UnsupportedTimeframe { .. }
            | BarsmithError::Configuration { .. }
            | BarsmithError::ConfigParse { .. }
            | BarsmithError::ConfigMissing { .. }
            | BarsmithError::ConfigInvalid { .. } => 2,
            BarsmithError::CalendarSearchExhausted { .. } => 3,
            BarsmithError::Stream { .. } => 4,
            BarsmithError::Csv { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
