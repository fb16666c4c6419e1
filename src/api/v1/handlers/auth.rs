/*
 * Responsibility
 * - POST /auth/register, POST /auth/login
 * - 認証不要。AccountService に渡して DTO に詰め替えるだけ
 */
use axum::{Json, extract::State, http::StatusCode};

use crate::{
    api::v1::{
        dto::auth::{CredentialsRequest, TokenResponse, UserResponse},
        extractors::JsonBody,
    },
    error::AppError,
    state::AppState,
};

pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CredentialsRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let (username, password) = req.into_parts()?;
    let user = state.accounts.register(&username, &password).await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CredentialsRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let (username, password) = req.into_parts()?;
    let issued = state.accounts.login(&username, &password).await?;

    Ok(Json(issued.into()))
}
