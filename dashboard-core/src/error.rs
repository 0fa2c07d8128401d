//! Error types for the dashboard feed

use thiserror::Error;

/// Feed-wide error type
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Fetch error ({source_name}): {message}")]
    Fetch { source_name: String, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FeedError {
    pub fn fetch(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        FeedError::Fetch {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn network(msg: impl Into<String>) -> Self {
        FeedError::Network(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        FeedError::Parse(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        FeedError::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        FeedError::Internal(msg.into())
    }
}

/// Result type alias for feed operations
pub type FeedResult<T> = Result<T, FeedError>;
