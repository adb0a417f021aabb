//! Error types for refinery configuration.
//!
//! Every variant here is raised while a refinery is being configured
//! (`bring`, catalog lookups, definition loading). Refining itself never
//! fails for registry reasons.

use thiserror::Error;

/// Main error type for refinery operations
#[derive(Error, Debug)]
pub enum Error {
    /// `bring` named an attachment the template never declared
    #[error("Attachment method '{name}' is not defined on {refinery}")]
    AttachmentMethodNotFound { refinery: String, name: String },

    /// A target identifier could not be resolved to a constructible refinery
    #[error("Attachment target '{target}' could not be resolved")]
    AttachmentTargetNotFound { target: String },

    /// A target factory re-entered itself while being constructed
    #[error("Attachment cycle detected: {}", .chain.join(" -> "))]
    AttachmentCycle { chain: Vec<String> },

    /// Invalid configuration document
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn method_not_found(refinery: impl Into<String>, name: impl Into<String>) -> Self {
        Error::AttachmentMethodNotFound {
            refinery: refinery.into(),
            name: name.into(),
        }
    }

    pub fn target_not_found(target: impl Into<String>) -> Self {
        Error::AttachmentTargetNotFound {
            target: target.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::method_not_found("PostTemplate", "author");
        assert_eq!(
            err.to_string(),
            "Attachment method 'author' is not defined on PostTemplate"
        );

        let err = Error::target_not_found("Comment");
        assert_eq!(err.to_string(), "Attachment target 'Comment' could not be resolved");

        let err = Error::AttachmentCycle {
            chain: vec!["User".to_string(), "Post".to_string(), "User".to_string()],
        };
        assert_eq!(err.to_string(), "Attachment cycle detected: User -> Post -> User");
    }
}
