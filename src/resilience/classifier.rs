//! Error severity/retryability taxonomy.
//!
//! Classification is total over the tagged [`CoreError`] variants. Opaque
//! [`External`](CoreError::External) errors go through a prioritized,
//! first-match substring decision list; earlier rules take precedence even
//! when a later rule would also match.

use crate::error::CoreError;
use crate::resilience::retry::matches_retryable_pattern;
use serde::{Deserialize, Serialize};

/// How bad the failure is for the request that hit it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// Failure taxonomy shared with route handlers and log pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Authentication,
    DatabaseIntegrity,
    Transient,
    ToolValidation,
    NotFound,
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ErrorCategory::Authentication => "authentication",
            ErrorCategory::DatabaseIntegrity => "database_integrity",
            ErrorCategory::Transient => "transient",
            ErrorCategory::ToolValidation => "tool_validation",
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::Unknown => "unknown",
        };
        write!(f, "{label}")
    }
}

/// Result of classifying one error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorClassification {
    pub severity: ErrorSeverity,
    pub category: ErrorCategory,
    pub retryable: bool,
    /// Fixed per-category template, safe to show to the end user.
    pub user_message: String,
    /// The raw error message, preserved verbatim for logs.
    pub technical_message: String,
}

fn classification(
    severity: ErrorSeverity,
    category: ErrorCategory,
    retryable: bool,
    technical_message: &str,
) -> ErrorClassification {
    let user_message = match category {
        ErrorCategory::Authentication => "Your session has expired. Please sign in again.",
        ErrorCategory::DatabaseIntegrity => {
            "This change conflicts with existing records. Please refresh and try again."
        }
        ErrorCategory::Transient => "The service is busy. Please retry shortly.",
        ErrorCategory::ToolValidation => {
            "The assistant produced an invalid response. Please try again."
        }
        ErrorCategory::NotFound => "The requested record could not be found.",
        ErrorCategory::Unknown => "Something went wrong. Please try again.",
    };
    ErrorClassification {
        severity,
        category,
        retryable,
        user_message: user_message.to_string(),
        technical_message: technical_message.to_string(),
    }
}

/// Classify an error into severity, category, retryability, and messages.
pub fn classify_error(error: &CoreError) -> ErrorClassification {
    match error {
        CoreError::Authentication { message } => classification(
            ErrorSeverity::Critical,
            ErrorCategory::Authentication,
            false,
            message,
        ),
        CoreError::Integrity { message } => classification(
            ErrorSeverity::High,
            ErrorCategory::DatabaseIntegrity,
            false,
            message,
        ),
        CoreError::Transient { message } => classification(
            ErrorSeverity::Medium,
            ErrorCategory::Transient,
            true,
            message,
        ),
        CoreError::ToolValidation { message, .. } => classification(
            ErrorSeverity::Medium,
            ErrorCategory::ToolValidation,
            true,
            message,
        ),
        CoreError::NotFound { message } => classification(
            ErrorSeverity::Low,
            ErrorCategory::NotFound,
            false,
            message,
        ),
        CoreError::External { message, code } => classify_opaque(message, code.as_deref()),
    }
}

/// Substring fallback for errors originating from an opaque third-party
/// client. First match wins.
fn classify_opaque(message: &str, code: Option<&str>) -> ErrorClassification {
    let lowered = message.to_lowercase();

    if lowered.contains("authentication") || lowered.contains("unauthorized") {
        return classification(
            ErrorSeverity::Critical,
            ErrorCategory::Authentication,
            false,
            message,
        );
    }

    if lowered.contains("constraint") || lowered.contains("foreign key") {
        return classification(
            ErrorSeverity::High,
            ErrorCategory::DatabaseIntegrity,
            false,
            message,
        );
    }

    if matches_retryable_pattern(message, code, &[]) {
        return classification(
            ErrorSeverity::Medium,
            ErrorCategory::Transient,
            true,
            message,
        );
    }

    if code == Some("invalid_tool_results") || lowered.contains("tool_call_id") {
        return classification(
            ErrorSeverity::Medium,
            ErrorCategory::ToolValidation,
            true,
            message,
        );
    }

    if lowered.contains("not found") || code == Some("404") {
        return classification(
            ErrorSeverity::Low,
            ErrorCategory::NotFound,
            false,
            message,
        );
    }

    // Conservative default: unclassified errors are not silently retried.
    classification(ErrorSeverity::Medium, ErrorCategory::Unknown, false, message)
}
