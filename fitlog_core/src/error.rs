//! Error types for the fitlog_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for fitlog_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// An operation needed a signed-in user and there was none
    #[error("No authenticated user")]
    MissingSession,

    /// Required field missing or value out of range
    #[error("Validation error: {0}")]
    Validation(String),

    /// The table store rejected a call
    #[error("Store error: {0}")]
    Store(String),

    /// A row addressed by id does not exist
    #[error("{table} row {id} not found")]
    NotFound { table: &'static str, id: i64 },
}

impl Error {
    /// The single line shown to the user when an action fails.
    ///
    /// Validation messages are shown verbatim; everything else collapses
    /// into a generic retry prompt since the details are only useful in logs.
    pub fn user_message(&self) -> String {
        match self {
            Error::MissingSession => "You must be logged in to do that".into(),
            Error::Validation(msg) => msg.clone(),
            Error::NotFound { table, id } => format!("No {} entry with id {}", table, id),
            Error::Config(msg) => format!("Invalid configuration: {}", msg),
            _ => "Something went wrong. Please try again.".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_is_shown_verbatim() {
        let err = Error::Validation("Food name and calories are required".into());
        assert_eq!(err.user_message(), "Food name and calories are required");
    }

    #[test]
    fn test_store_failures_are_opaque() {
        let err = Error::Store("connection reset".into());
        assert!(!err.user_message().contains("connection reset"));
        assert!(err.to_string().contains("connection reset"));
    }
}
