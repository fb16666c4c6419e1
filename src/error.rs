/*
 * Responsibility
 * - アプリ共通の AppError 定義
 * - IntoResponse 実装 (HTTP status / JSON error body)
 * - validation / auth / access / repo error を統一的に変換
 */
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::repos::RepoError;
use crate::services::accounts::AccountError;
use crate::services::auth::AuthError;
use crate::services::tasks::{AccessError, TaskError};
use crate::services::validation::ValidationError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("not found: {resource}")]
    NotFound { resource: &'static str },
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("conflict: {resource}")]
    Conflict { resource: &'static str },
    #[error("request timed out")]
    Timeout,
    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn not_found(resource: &'static str) -> Self {
        Self::NotFound { resource }
    }

    pub fn conflict(resource: &'static str) -> Self {
        Self::Conflict { resource }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(e) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string()),
            AppError::Auth(AuthError::Missing) => (
                StatusCode::UNAUTHORIZED,
                "TOKEN_MISSING",
                "authentication required".into(),
            ),
            AppError::Auth(AuthError::Invalid) => (
                StatusCode::UNAUTHORIZED,
                "TOKEN_INVALID",
                "invalid access token".into(),
            ),
            AppError::Auth(AuthError::Expired) => (
                StatusCode::UNAUTHORIZED,
                "TOKEN_EXPIRED",
                "access token expired".into(),
            ),
            AppError::NotFound { resource } => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{resource} not found."),
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "invalid username or password".into(),
            ),
            AppError::Conflict { resource } => (
                StatusCode::CONFLICT,
                "CONFLICT",
                format!("{resource} already exists."),
            ),
            AppError::Timeout => (
                StatusCode::REQUEST_TIMEOUT,
                "REQUEST_TIMEOUT",
                "request timed out".into(),
            ),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "internal server error".into(),
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        let mut response = (status, Json(body)).into_response();
        if let AppError::Auth(kind) = self {
            let challenge = match kind {
                AuthError::Missing => "Bearer",
                AuthError::Invalid | AuthError::Expired => "Bearer error=\"invalid_token\"",
            };
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(challenge));
        }
        response
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Conflict => AppError::conflict("resource"),
            RepoError::Db(err) => {
                error!(error = ?err, "database error");
                AppError::Internal
            }
        }
    }
}

// Forbidden and NotFound leave the server as the same response.
impl From<AccessError> for AppError {
    fn from(_: AccessError) -> Self {
        AppError::not_found("task")
    }
}

impl From<TaskError> for AppError {
    fn from(e: TaskError) -> Self {
        match e {
            TaskError::Validation(e) => e.into(),
            TaskError::Access(e) => e.into(),
            TaskError::Store(e) => e.into(),
        }
    }
}

impl From<AccountError> for AppError {
    fn from(e: AccountError) -> Self {
        match e {
            AccountError::Validation(e) => e.into(),
            AccountError::UsernameTaken => AppError::conflict("username"),
            AccountError::InvalidCredentials => AppError::InvalidCredentials,
            AccountError::Store(e) => e.into(),
            other => {
                error!(error = ?other, "account operation failed");
                AppError::Internal
            }
        }
    }
}
