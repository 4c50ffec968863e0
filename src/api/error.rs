//! HTTP error mapping for the auth API.
//!
//! Every error body is `{"message": "..."}` so clients can surface the
//! server's text in their login forms.

use crate::token;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Session expired")]
    RefreshRejected,
    #[error("Unknown user")]
    UnknownUser,
    #[error("Forbidden")]
    Forbidden,
    #[error(transparent)]
    Token(#[from] token::Error),
    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials | Self::RefreshRejected | Self::UnknownUser => {
                StatusCode::UNAUTHORIZED
            }
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Token(err) => match err {
                token::Error::Expired
                | token::Error::Malformed
                | token::Error::VerificationFailed
                | token::Error::MissingOrMalformed => StatusCode::UNAUTHORIZED,
                token::Error::MissingSigningKey
                | token::Error::MissingIdentity
                | token::Error::InvalidTtl(_)
                | token::Error::Signing => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Token(token::Error::Expired) => "Token expired".to_string(),
            Self::Token(token::Error::Malformed) => "Malformed token".to_string(),
            Self::Token(token::Error::VerificationFailed) => "Token verification failed".to_string(),
            Self::Token(token::Error::MissingOrMalformed) => {
                "Missing or malformed authorization header".to_string()
            }
            Self::Token(_) | Self::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {self:?}");
        }
        (status, Json(ErrorBody { message: self.message() })).into_response()
    }
}
