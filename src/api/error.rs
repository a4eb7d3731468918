//! HTTP error boundary.
//!
//! Handlers return `Result<_, ApiError>`; every variant renders as a JSON body
//! of the form `{"detail": "..."}` with a fixed status code.

use crate::store::StoreError;
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};
use utoipa::ToSchema;

use super::handlers::auth::token::TokenError;

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Malformed request (unparseable JSON, bad path segment).
    #[error("{0}")]
    BadRequest(String),
    /// Well-formed request that fails field validation.
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InvalidTransition(String),
    #[error("{0}")]
    ServiceUnavailable(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::InvalidTransition(_) => StatusCode::BAD_REQUEST,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Internal(message) => error!("Internal error: {message}"),
            Self::ServiceUnavailable(message) => warn!("Service unavailable: {message}"),
            _ => {}
        }

        let body = Json(ErrorBody {
            detail: self.to_string(),
        });

        if matches!(self, Self::Unauthorized(_)) {
            let mut response = (status, body).into_response();
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            response
        } else {
            (status, body).into_response()
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unconfigured => {
                Self::ServiceUnavailable("data service is not configured".to_string())
            }
            StoreError::Timeout => {
                Self::ServiceUnavailable("data service request timed out".to_string())
            }
            StoreError::Unreachable(message) => {
                error!("Data service unreachable: {message}");
                Self::ServiceUnavailable("data service is unavailable".to_string())
            }
            StoreError::Rejected { status, message } => {
                Self::Internal(format!("data service error ({status}): {message}"))
            }
            StoreError::Decode(message) => {
                Self::Internal(format!("unexpected data service payload: {message}"))
            }
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid | TokenError::Expired => Self::Unauthorized(err.to_string()),
            TokenError::Signing(message) => Self::Internal(format!("failed to sign token: {message}")),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => Self::Validation(err.body_text()),
            other => Self::BadRequest(other.body_text()),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(err: ApiError) -> (StatusCode, Option<HeaderValue>, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let challenge = response.headers().get(WWW_AUTHENTICATE).cloned();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap_or_default();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, challenge, json)
    }

    #[tokio::test]
    async fn unauthorized_carries_bearer_challenge() {
        let (status, challenge, json) = body_of(ApiError::Unauthorized("invalid token".into())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(challenge, Some(HeaderValue::from_static("Bearer")));
        assert_eq!(json, serde_json::json!({"detail": "invalid token"}));
    }

    #[tokio::test]
    async fn not_found_has_no_challenge() {
        let (status, challenge, json) = body_of(ApiError::not_found("report not found")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(challenge.is_none());
        assert_eq!(json["detail"], "report not found");
    }

    #[test]
    fn status_mapping() {
        assert_eq!(ApiError::validation("x").status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(ApiError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::InvalidTransition("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::ServiceUnavailable("x".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn store_errors_map_to_service_unavailable_or_internal() {
        assert!(matches!(
            ApiError::from(StoreError::Unconfigured),
            ApiError::ServiceUnavailable(_)
        ));
        assert!(matches!(
            ApiError::from(StoreError::Timeout),
            ApiError::ServiceUnavailable(_)
        ));
        assert!(matches!(
            ApiError::from(StoreError::Unreachable("down".into())),
            ApiError::ServiceUnavailable(_)
        ));
        let internal = ApiError::from(StoreError::Rejected {
            status: 400,
            message: "column missing".into(),
        });
        assert!(matches!(internal, ApiError::Internal(ref m) if m.contains("column missing")));
    }

    #[test]
    fn token_errors_are_unauthorized() {
        assert!(matches!(
            ApiError::from(TokenError::Expired),
            ApiError::Unauthorized(_)
        ));
        assert!(matches!(
            ApiError::from(TokenError::Invalid),
            ApiError::Unauthorized(_)
        ));
    }
}
