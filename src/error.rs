//! # Structured Error Handling
//!
//! Closed error-variant set for the reliability core. Errors are tagged at the
//! boundary where they originate (LLM client wrappers, database adapters) so
//! classification is a total function over the variant set. The [`External`]
//! variant carries opaque third-party errors whose retryability can only be
//! judged by message inspection; the classifier documents that fallback.
//!
//! [`External`]: CoreError::External

use serde::{Deserialize, Serialize};

/// Errors produced or wrapped by the reliability core.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CoreError {
    /// Credential or session failure. Never retryable.
    #[error("authentication failed: {message}")]
    Authentication { message: String },

    /// Constraint or referential-integrity violation from the store. Never retryable.
    #[error("integrity violation: {message}")]
    Integrity { message: String },

    /// Transient infrastructure failure (timeouts, dropped connections,
    /// rate limits). Retryable by definition.
    #[error("transient failure: {message}")]
    Transient { message: String },

    /// The LLM produced tool output the backend rejected. Retrying the same
    /// request usually yields a well-formed response.
    #[error("tool validation failed: {message}")]
    ToolValidation {
        message: String,
        code: Option<String>,
    },

    /// The referenced record does not exist. Expected under normal operation.
    #[error("not found: {message}")]
    NotFound { message: String },

    /// Opaque error from a third-party client that could not be tagged at its
    /// origin. Classified by message/code inspection.
    #[error("{message}")]
    External {
        message: String,
        code: Option<String>,
    },
}

impl CoreError {
    /// Wrap an untagged third-party error message.
    pub fn external(message: impl Into<String>) -> Self {
        CoreError::External {
            message: message.into(),
            code: None,
        }
    }

    /// Wrap an untagged third-party error carrying a provider error code.
    pub fn external_with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        CoreError::External {
            message: message.into(),
            code: Some(code.into()),
        }
    }

    /// The raw message, preserved verbatim for logs.
    pub fn message(&self) -> &str {
        match self {
            CoreError::Authentication { message }
            | CoreError::Integrity { message }
            | CoreError::Transient { message }
            | CoreError::ToolValidation { message, .. }
            | CoreError::NotFound { message }
            | CoreError::External { message, .. } => message,
        }
    }

    /// Provider error code, when one was captured.
    pub fn code(&self) -> Option<&str> {
        match self {
            CoreError::ToolValidation { code, .. } | CoreError::External { code, .. } => {
                code.as_deref()
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_preserved_verbatim() {
        let err = CoreError::external("ECONNRESET while calling provider");
        assert_eq!(err.message(), "ECONNRESET while calling provider");
        assert_eq!(err.code(), None);
    }

    #[test]
    fn test_external_with_code() {
        let err = CoreError::external_with_code("rate limited", "429");
        assert_eq!(err.code(), Some("429"));
        assert_eq!(err.to_string(), "rate limited");
    }

    #[test]
    fn test_display_includes_variant_context() {
        let err = CoreError::NotFound {
            message: "student 42".to_string(),
        };
        assert_eq!(err.to_string(), "not found: student 42");
    }
}
