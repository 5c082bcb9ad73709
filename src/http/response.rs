//! Error responses.
//!
//! # Responsibilities
//! - Map pipeline rejections to 401/429 with the right challenge headers
//! - Map handler errors to HTTP status codes
//! - Render every error as `{ "error": <code>, "message": <text> }`

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::security::RejectReason;
use crate::store::CatalogError;

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

fn error_response(status: StatusCode, code: &'static str, message: String) -> Response {
    (
        status,
        Json(ErrorBody {
            error: code,
            message,
        }),
    )
        .into_response()
}

impl RejectReason {
    pub fn status(&self) -> StatusCode {
        match self {
            RejectReason::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            RejectReason::Unauthenticated
            | RejectReason::Malformed
            | RejectReason::InvalidSignature
            | RejectReason::Expired => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for RejectReason {
    fn into_response(self) -> Response {
        let mut response = error_response(self.status(), self.code(), self.to_string());

        let challenge = match self {
            RejectReason::RateLimited { retry_after } => {
                // Round up so clients never retry early
                let secs = retry_after
                    .as_secs()
                    .saturating_add(u64::from(retry_after.subsec_nanos() > 0));
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(secs.max(1)));
                None
            }
            RejectReason::Unauthenticated => Some(HeaderValue::from_static("Bearer")),
            _ => Some(HeaderValue::from_static("Bearer error=\"invalid_token\"")),
        };

        if let Some(value) = challenge {
            response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
        }
        response
    }
}

/// Errors returned by business handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("internal error")]
    Internal,
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::InvalidRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            ApiError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };
        error_response(status, code, self.to_string())
    }
}
