//! API error responses.
//!
//! Every failure leaves the server as `{ code, message, details? }` with a
//! status derived from `code`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

use crate::core::{AskError, ErrorKind, RecipeError};
use crate::store::StoreError;

#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    fn new(code: &str, message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", msg, None)
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new("INVALID_INPUT", msg, None)
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", format!("{} not found", resource.into()), None)
    }

    pub fn unavailable(msg: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new("UNAVAILABLE", msg, Some(details.into()))
    }

    pub fn internal(details: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", "An internal error occurred.", Some(details.into()))
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self.code.as_str() {
            "BAD_REQUEST" | "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "INVALID_INPUT" => StatusCode::UNPROCESSABLE_ENTITY,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "TIMEOUT" => StatusCode::GATEWAY_TIMEOUT,
            "GENERATION_ERROR" | "EXECUTION_ERROR" | "UNAVAILABLE" => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AskError> for ApiError {
    fn from(error: AskError) -> Self {
        match error.kind() {
            ErrorKind::Validation => Self::new("VALIDATION_ERROR", error.to_string(), None),
            ErrorKind::Timeout => Self::new("TIMEOUT", error.to_string(), None),
            ErrorKind::Generation => Self::new(
                "GENERATION_ERROR",
                "The assistant could not produce a query.",
                Some(error.to_string()),
            ),
            ErrorKind::Execution => Self::new(
                "EXECUTION_ERROR",
                "The query could not be executed.",
                Some(error.to_string()),
            ),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::UnknownColumns(_) => Self::bad_request(error.to_string()),
            other => Self::unavailable("The food catalog is unavailable.", other.to_string()),
        }
    }
}

impl From<RecipeError> for ApiError {
    fn from(error: RecipeError) -> Self {
        match error {
            RecipeError::NoFoods => Self::not_found("Foods for the given codes"),
            RecipeError::Timeout => Self::new("TIMEOUT", error.to_string(), None),
            RecipeError::Store(e) => e.into(),
            other => Self::new(
                "GENERATION_ERROR",
                "The recipe could not be generated.",
                Some(other.to_string()),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_ask_error_statuses() {
        let cases = [
            (AskError::Validation, StatusCode::BAD_REQUEST),
            (AskError::Generation("down".into()), StatusCode::SERVICE_UNAVAILABLE),
            (AskError::Timeout(Duration::from_secs(30)), StatusCode::GATEWAY_TIMEOUT),
            (
                AskError::Execution {
                    attempts: 3,
                    source: StoreError::NotReadOnly,
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (AskError::Unexpected("panic".into()), StatusCode::SERVICE_UNAVAILABLE),
        ];

        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status_code(), status);
        }
    }

    #[test]
    fn test_validation_has_no_details() {
        let api = ApiError::from(AskError::Validation);
        assert!(api.details.is_none());
        let body = serde_json::to_value(&api).unwrap();
        assert!(body.get("details").is_none());
    }

    #[test]
    fn test_unknown_columns_is_bad_request() {
        let api = ApiError::from(StoreError::UnknownColumns(vec!["sugar".into()]));
        assert_eq!(api.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::from(RecipeError::NoFoods).status_code(),
            StatusCode::NOT_FOUND
        );
    }
}
