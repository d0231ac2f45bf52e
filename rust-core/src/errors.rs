//! Error types. `thiserror` only; one enum per concern.

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to parse config {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("Invalid config value for {field}: {message}")]
    ValidationFailed { field: String, message: String },
}

/// Crate-level error.
#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Record {record_id} is missing required field `{field}`")]
    MissingField {
        record_id: String,
        field: &'static str,
    },

    #[error("Failed to build phrase matcher: {0}")]
    Matcher(String),
}

pub type TriageResult<T> = Result<T, TriageError>;

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }
}
