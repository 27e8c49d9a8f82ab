//! REST error taxonomy and its HTTP rendering.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{debug, error};

use lounge_auth::RateLimited;
use lounge_db::StoreError;
use lounge_types::api::ErrorBody;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing input the caller can fix.
    #[error("{0}")]
    ValidationFailed(String),

    #[error("{0}")]
    DuplicateIdentity(String),

    /// Same answer for an unknown user and a wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// No user identity on the session.
    #[error("Not logged in")]
    Unauthenticated,

    /// The session lacks the role the operation needs.
    #[error("Not authorized")]
    Unauthorized,

    #[error("Too many requests, please try again later")]
    RateLimited { retry_after_secs: u64 },

    #[error("Not found")]
    NotFound,

    /// Store or runtime failure. Details are logged, never sent.
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationFailed(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            ApiError::DuplicateIdentity(_) => StatusCode::CONFLICT,
            ApiError::InvalidCredentials | ApiError::Unauthenticated | ApiError::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            ApiError::Internal(e) => error!("Internal error: {:#}", e),
            other => debug!("Request rejected ({}): {}", status, other),
        }

        let mut response = (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response();

        if let ApiError::RateLimited { retry_after_secs } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Invalid(msg) => ApiError::ValidationFailed(msg.to_string()),
            StoreError::Duplicate => ApiError::DuplicateIdentity("Username already taken".into()),
            StoreError::Backend(e) => ApiError::Internal(e),
        }
    }
}

impl From<RateLimited> for ApiError {
    fn from(e: RateLimited) -> Self {
        ApiError::RateLimited {
            retry_after_secs: e.retry_after.as_secs().max(1),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        debug!("Rejected request body: {}", e);
        ApiError::ValidationFailed("Invalid request body".into())
    }
}
