//! Authorization guard: bearer access token -> `AuthCtx` in request extensions.
//!
//! Runs in front of every protected route (see `api::v1::routes`). Task
//! handlers never see a request that did not pass `authenticate`.

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::{self, Next},
    response::Response,
};

use crate::api::v1::extractors::AuthCtx;
use crate::error::AppError;
use crate::services::auth::{AuthError, TokenService};
use crate::state::AppState;

/// Attach the guard to every route of `router`.
///
/// `route_layer` so that unmatched paths still 404 instead of 401.
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // axum 0.8 の from_fn は State extractor を受け取れないため、`from_fn_with_state` で明示的に state を渡す
    router.route_layer(middleware::from_fn_with_state(state, access_middleware))
}

/// Extract and validate the bearer token from `Authorization`.
///
/// - header absent or blank -> `Missing`
/// - not `Bearer <token>` -> `Invalid`
/// - otherwise whatever `TokenService::verify` says
///
/// Needs no storage access: header + process signing key only.
pub fn authenticate(tokens: &TokenService, headers: &HeaderMap) -> Result<AuthCtx, AuthError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Err(AuthError::Missing);
    };

    let value = value.to_str().map_err(|_| AuthError::Invalid)?.trim();
    if value.is_empty() {
        return Err(AuthError::Missing);
    }

    let (scheme, token) = value.split_once(' ').ok_or(AuthError::Invalid)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::Invalid);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::Invalid);
    }

    let verified = tokens.verify(token)?;

    Ok(AuthCtx::new(verified.user_id).with_token_id(verified.token_id))
}

async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_ctx = match authenticate(&state.tokens, req.headers()) {
        Ok(ctx) => ctx,
        Err(err) => {
            tracing::warn!(
                error = %err,
                method = %req.method(),
                path = %req.uri().path(),
                "access token verification failed"
            );
            return Err(err.into());
        }
    };

    tracing::debug!(user_id = %auth_ctx.user_id, jti = ?auth_ctx.token_id, "authenticated");

    // middleware → extractor への受け渡し
    req.extensions_mut().insert(auth_ctx);

    Ok(next.run(req).await)
}
