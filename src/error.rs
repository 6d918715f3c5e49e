use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Marker carried by failures caused by a denied permission.
///
/// The dispatcher looks for this type anywhere in a failure's source chain,
/// so it survives being wrapped in `anyhow` context.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Access denied: {0}")]
pub struct AccessViolation(pub String);

/// Classified failure returned by request handlers
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The requested item (or a parent it depends on) does not exist
    #[error("{0}")]
    ItemNotFound(String),

    /// Malformed or semantically invalid input
    #[error("{0}")]
    InvalidArgument(String),

    /// A backing service (search index, repository) could not serve the request
    #[error("{message}")]
    Unavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Permission denied by item security
    #[error(transparent)]
    AccessViolation(#[from] AccessViolation),

    /// Anything else
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        ServiceError::Unavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Whether an access-violation marker appears anywhere in this failure
    pub fn is_access_violation(&self) -> bool {
        match self {
            ServiceError::AccessViolation(_) => true,
            ServiceError::Other(err) => err.chain().any(|cause| cause.is::<AccessViolation>()),
            ServiceError::Unavailable {
                source: Some(source),
                ..
            } => {
                let first: &(dyn std::error::Error + 'static) = source.as_ref();
                let mut cause = Some(first);
                while let Some(err) = cause {
                    if err.is::<AccessViolation>() {
                        return true;
                    }
                    cause = err.source();
                }
                false
            }
            _ => false,
        }
    }
}

/// Conversion from validator::ValidationErrors
impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::InvalidArgument(err.to_string())
    }
}

/// Builds the message used when a request parameter carries an unusable value
pub fn invalid_parameter_message(parameter: &str, value: &str) -> String {
    format!("Invalid {} parameter value: '{}'", parameter, value)
}

/// API-facing outcome of a failed request
///
/// Every handler failure is translated into exactly one of these kinds at the
/// dispatch boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Invalid argument or malformed input
    #[error("{0}")]
    InvalidArgument(String),

    /// Item not found
    #[error("Item Not Found: {0}")]
    NotFound(String),

    /// Backing service unavailable
    #[error("{0}")]
    ServiceUnavailable(String),

    /// Access denied; no detail is returned to the caller
    #[error("Access denied")]
    AccessDenied,

    /// Internal server error; no detail is returned to the caller
    #[error("Internal server error")]
    Internal,
}

impl AppError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::AccessDenied => StatusCode::FORBIDDEN,
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &str {
        match self {
            AppError::InvalidArgument(_) => "INVALID_ARGUMENT",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            AppError::AccessDenied => "ACCESS_DENIED",
            AppError::Internal => "INTERNAL_ERROR",
        }
    }
}

/// Convert AppError to HTTP response
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        tracing::debug!(
            error_code = error_code,
            status_code = status.as_u16(),
            message = %message,
            "Request failed"
        );

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
                "status": status.as_u16(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AppError::NotFound("test".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::InvalidArgument("test".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::ServiceUnavailable("test".to_string()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(AppError::AccessDenied.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::Internal.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::NotFound("test".to_string()).error_code(),
            "NOT_FOUND"
        );
        assert_eq!(AppError::AccessDenied.error_code(), "ACCESS_DENIED");
        assert_eq!(AppError::Internal.error_code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_generic_messages_do_not_leak_detail() {
        assert_eq!(AppError::AccessDenied.to_string(), "Access denied");
        assert_eq!(AppError::Internal.to_string(), "Internal server error");
    }

    #[test]
    fn test_access_violation_detected_through_context() {
        let err: anyhow::Error = Err::<(), _>(AccessViolation("item:write".to_string()))
            .context("updating /sitecore/content/home")
            .unwrap_err();
        assert!(ServiceError::Other(err).is_access_violation());

        let plain = ServiceError::Other(anyhow::anyhow!("disk full"));
        assert!(!plain.is_access_violation());
    }

    #[test]
    fn test_access_violation_detected_in_unavailable_source() {
        let err = ServiceError::Unavailable {
            message: "repository".to_string(),
            source: Some(Box::new(AccessViolation("item:read".to_string()))),
        };
        assert!(err.is_access_violation());
        assert!(!ServiceError::unavailable("index offline").is_access_violation());
    }

    #[test]
    fn test_invalid_parameter_message() {
        assert_eq!(
            invalid_parameter_message("Database", "staging"),
            "Invalid Database parameter value: 'staging'"
        );
    }
}
