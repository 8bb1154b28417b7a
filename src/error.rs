//! Error types
//!
//! Provides a unified error type hierarchy for all admin operations.
//!
//! # Design
//! Uses thiserror for ergonomic error definitions. Field-path errors are
//! raised synchronously while parsing or navigating a document and indicate
//! a logical bug or stale client state, so nothing here is retried.
//! HTTP failures are classified into coarse [`ApiErrorKind`] categories
//! that the UI surfaces as a single message per failed operation.

use thiserror::Error;

/// Top-level error type
///
/// Wraps module-specific errors into a unified type.
/// Supports conversion from all module-specific errors via `From` trait.
///
/// # Example
/// ```
/// use gcp_emulator_admin::{AdminError, FieldPathError};
///
/// let err: AdminError = FieldPathError::EmptyPath.into();
/// ```
#[derive(Debug, Error)]
pub enum AdminError {
    /// Field path parsing or navigation errors
    #[error("Field path error: {0}")]
    FieldPath(#[from] FieldPathError),

    /// Emulator REST API returned an error response
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Network/HTTP errors (connection refused, timeouts)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Local storage I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Field form input rejected before any mutation
    #[error("Invalid form: {0}")]
    InvalidForm(String),

    /// Resource path does not follow the Firestore document layout
    #[error("Invalid document path: {0}")]
    InvalidDocumentPath(String),

    /// Field action requested without a selected document
    #[error("No document selected")]
    NoDocumentSelected,

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised while parsing a field path or walking a document tree
///
/// Every variant that concerns a specific location carries the offending
/// segment and the original path text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldPathError {
    /// A `[` has no matching `]`
    #[error("Malformed field path '{path}': missing closing ']'")]
    MalformedPath {
        /// Original path text
        path: String,
    },

    /// Index is not a non-negative integer, or is out of range
    #[error("Invalid array index '{index}' in path '{path}': {reason}")]
    InvalidIndex {
        /// Index text as written, or the numeric index
        index: String,
        /// Original path text
        path: String,
        /// Why the index was rejected
        reason: String,
    },

    /// Map key absent from the current container
    #[error("Field '{field}' not found in path '{path}' (available: {})", .available.join(", "))]
    FieldNotFound {
        /// Missing key
        field: String,
        /// Original path text
        path: String,
        /// Keys present at that level
        available: Vec<String>,
    },

    /// Container at the segment has no `fields`/`values` to descend into
    #[error("Value at '{segment}' in path '{path}' is undefined")]
    UndefinedValue {
        /// Segment whose container is empty
        segment: String,
        /// Original path text
        path: String,
    },

    /// Index segment applied to something other than an array
    #[error("Cannot index into {found} value with '{segment}' in path '{path}'")]
    NotAnArray {
        /// Offending segment
        segment: String,
        /// Original path text
        path: String,
        /// Kind of the value that was found
        found: &'static str,
    },

    /// Field segment applied to something other than a map
    #[error("Cannot read field '{segment}' of {found} value in path '{path}'")]
    NotAMap {
        /// Offending segment
        segment: String,
        /// Original path text
        path: String,
        /// Kind of the value that was found
        found: &'static str,
    },

    /// Write target given with zero segments
    #[error("Field path is empty")]
    EmptyPath,
}

/// Coarse category of a failed emulator API call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// Resource already exists (409 / `ALREADY_EXISTS`)
    AlreadyExists,
    /// Resource not found (404 / `NOT_FOUND`)
    NotFound,
    /// Malformed or rejected request (400 / `INVALID_ARGUMENT`)
    InvalidRequest,
    /// Not allowed (401, 403 / `PERMISSION_DENIED`)
    PermissionDenied,
    /// Emulator-side failure (5xx / `INTERNAL`)
    InternalError,
    /// Any other non-success response
    HttpError,
}

impl ApiErrorKind {
    /// Stable code string for this category
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::NotFound => "NOT_FOUND",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::InternalError => "INTERNAL_ERROR",
            Self::HttpError => "HTTP_ERROR",
        }
    }

    /// Create from a Google API error `status` string
    pub fn from_status_code(status: &str) -> Option<Self> {
        match status {
            "ALREADY_EXISTS" => Some(Self::AlreadyExists),
            "NOT_FOUND" => Some(Self::NotFound),
            "INVALID_ARGUMENT" | "FAILED_PRECONDITION" | "OUT_OF_RANGE" => {
                Some(Self::InvalidRequest)
            }
            "PERMISSION_DENIED" | "UNAUTHENTICATED" => Some(Self::PermissionDenied),
            "INTERNAL" | "UNKNOWN" | "UNAVAILABLE" | "DATA_LOSS" => Some(Self::InternalError),
            _ => None,
        }
    }

    /// Create from an HTTP status code
    pub fn from_http_status(status: u16) -> Self {
        match status {
            409 => Self::AlreadyExists,
            404 => Self::NotFound,
            400 | 422 => Self::InvalidRequest,
            401 | 403 => Self::PermissionDenied,
            500..=599 => Self::InternalError,
            _ => Self::HttpError,
        }
    }
}

/// Error response returned by an emulator REST API
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{} (HTTP {status}): {message}", .kind.code())]
pub struct ApiError {
    /// Classified category
    pub kind: ApiErrorKind,
    /// HTTP status code
    pub status: u16,
    /// Server-provided message, or the raw body
    pub message: String,
}

impl ApiError {
    /// Classify a non-success response
    ///
    /// Google APIs answer with `{"error": {"code", "message", "status"}}`.
    /// The `status` string wins over the HTTP code when both are present.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
        let error = parsed.as_ref().map(|v| &v["error"]);

        let status_code = error.and_then(|e| e["status"].as_str());
        let kind = status_code
            .and_then(ApiErrorKind::from_status_code)
            .unwrap_or_else(|| ApiErrorKind::from_http_status(status));

        let message = match error.and_then(|e| e["message"].as_str()) {
            Some(message) => message.to_string(),
            None => body.trim().to_string(),
        };

        Self {
            kind,
            status,
            message,
        }
    }

    /// Human-readable message suitable for a toast
    pub fn user_message(&self) -> String {
        let summary = match self.kind {
            ApiErrorKind::AlreadyExists => "Resource already exists",
            ApiErrorKind::NotFound => "Resource not found",
            ApiErrorKind::InvalidRequest => "Invalid request",
            ApiErrorKind::PermissionDenied => "Permission denied",
            ApiErrorKind::InternalError => "Emulator internal error",
            ApiErrorKind::HttpError => "Request failed",
        };
        if self.message.is_empty() {
            return summary.to_string();
        }
        format!("{}: {}", summary, self.message)
    }
}

impl AdminError {
    /// Create an internal error from a string
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Category of the failed API call, if this is an API error
    pub fn api_kind(&self) -> Option<ApiErrorKind> {
        match self {
            Self::Api(err) => Some(err.kind),
            _ => None,
        }
    }

    /// Check if the emulator reported that the resource already exists
    pub fn is_already_exists(&self) -> bool {
        self.api_kind() == Some(ApiErrorKind::AlreadyExists)
    }

    /// Check if the request failed before reaching the emulator
    pub fn is_connection_failure(&self) -> bool {
        match self {
            Self::Network(err) => err.is_connect() || err.is_timeout(),
            _ => false,
        }
    }

    /// Human-readable message suitable for a toast
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(err) => err.user_message(),
            Self::Network(err) if err.is_timeout() => "Request timed out".to_string(),
            Self::Network(_) => "Cannot reach the emulator".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_path_error_into_admin_error() {
        let err: AdminError = FieldPathError::EmptyPath.into();
        assert!(matches!(err, AdminError::FieldPath(FieldPathError::EmptyPath)));
    }

    #[test]
    fn test_api_error_from_google_body() {
        let body = r#"{"error":{"code":409,"message":"Document already exists: projects/p/databases/(default)/documents/users/a","status":"ALREADY_EXISTS"}}"#;
        let err = ApiError::from_response(409, body);
        assert_eq!(err.kind, ApiErrorKind::AlreadyExists);
        assert!(err.message.starts_with("Document already exists"));
    }

    #[test]
    fn test_api_error_status_string_wins() {
        let body = r#"{"error":{"code":400,"message":"no","status":"NOT_FOUND"}}"#;
        assert_eq!(ApiError::from_response(400, body).kind, ApiErrorKind::NotFound);
    }

    #[test]
    fn test_api_error_falls_back_to_http_status() {
        assert_eq!(ApiError::from_response(404, "").kind, ApiErrorKind::NotFound);
        assert_eq!(ApiError::from_response(403, "nope").kind, ApiErrorKind::PermissionDenied);
        assert_eq!(ApiError::from_response(503, "<html>").kind, ApiErrorKind::InternalError);
        assert_eq!(ApiError::from_response(418, "teapot").kind, ApiErrorKind::HttpError);
    }

    #[test]
    fn test_api_error_raw_body_message() {
        let err = ApiError::from_response(400, "  bad field  ");
        assert_eq!(err.kind, ApiErrorKind::InvalidRequest);
        assert_eq!(err.message, "bad field");
        assert_eq!(err.user_message(), "Invalid request: bad field");
    }

    #[test]
    fn test_is_already_exists() {
        let err: AdminError = ApiError::from_response(409, "").into();
        assert!(err.is_already_exists());
        assert!(!AdminError::NoDocumentSelected.is_already_exists());
    }

    #[test]
    fn test_kind_codes() {
        assert_eq!(ApiErrorKind::InvalidRequest.code(), "INVALID_REQUEST");
        assert_eq!(ApiErrorKind::HttpError.code(), "HTTP_ERROR");
    }

    #[test]
    fn test_field_not_found_display_lists_keys() {
        let err = FieldPathError::FieldNotFound {
            field: "c".to_string(),
            path: "a.c".to_string(),
            available: vec!["b".to_string(), "d".to_string()],
        };
        let display = format!("{}", err);
        assert!(display.contains("'c'"));
        assert!(display.contains("a.c"));
        assert!(display.contains("b, d"));
    }
}
