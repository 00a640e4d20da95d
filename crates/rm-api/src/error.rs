//! API error handling
//!
//! Maps the engine error taxonomy onto HTTP responses with a machine
//! readable body: error code, message, and any conflict codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rm_core::error::RmError;
use serde::Serialize;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    /// An engine error, mapped via its own status/error codes
    Engine(RmError),
    Unauthorized(String),
    BadRequest(String),
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        ApiError::Unauthorized(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Engine(err) => StatusCode::from_u16(err.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<RmError> for ApiError {
    fn from(err: RmError) -> Self {
        ApiError::Engine(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    codes: Vec<&'static str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            ApiError::Engine(err) => {
                let codes = match err {
                    RmError::Validation(errors) => {
                        errors.codes.iter().map(|c| c.as_str()).collect()
                    }
                    _ => Vec::new(),
                };
                ErrorBody {
                    error: err.error_code(),
                    message: err.to_string(),
                    codes,
                }
            }
            ApiError::Unauthorized(msg) => ErrorBody {
                error: "unauthorized",
                message: msg.clone(),
                codes: Vec::new(),
            },
            ApiError::BadRequest(msg) => ErrorBody {
                error: "bad_request",
                message: msg.clone(),
                codes: Vec::new(),
            },
        };

        if status.is_server_error() {
            tracing::error!("request failed: {}", body.message);
        }

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rm_core::error::ConflictCode;

    #[test]
    fn test_engine_errors_keep_their_status() {
        let err = ApiError::from(RmError::not_found("Resource", 7));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err = ApiError::from(RmError::validation(
            ConflictCode::ProjectClosed,
            "closed",
        ));
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let err = ApiError::from(RmError::state_conflict("not pending"));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }
}
