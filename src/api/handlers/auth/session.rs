//! Session endpoints: refresh, logout, and the current-user probe.

use super::{
    cookies::{clear_refresh_cookie, read_cookie},
    types::RefreshResponse,
};
use crate::{
    api::{
        error::{ApiError, ErrorBody},
        state::AuthState,
    },
    role::Role,
    token::{TokenKind, extract_bearer, now_unix_seconds},
    user::UserRecord,
};
use axum::{
    extract::{Extension, Json, Path},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

#[utoipa::path(
    post,
    path = "/auth/{persona}/refresh",
    params(("persona" = Role, Path, description = "Auth namespace: admin or staff")),
    responses(
        (status = 200, description = "New access token", body = RefreshResponse),
        (status = 401, description = "Refresh cookie missing, expired, or revoked", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip_all, fields(persona = %persona.0))]
pub async fn refresh(
    persona: Path<Role>,
    headers: HeaderMap,
    auth: Extension<Arc<AuthState>>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let role = persona.0;
    let token = read_cookie(&headers, role.refresh_cookie()).ok_or(ApiError::RefreshRejected)?;

    let claims = auth
        .tokens()
        .verify_kind(&token, TokenKind::Refresh, now_unix_seconds())
        .map_err(|err| {
            debug!(error = %err, "refresh token rejected");
            ApiError::RefreshRejected
        })?;

    if claims.role != role || auth.is_revoked(&claims.jti).await {
        return Err(ApiError::RefreshRejected);
    }

    // the user may have been removed or changed persona since the cookie was issued
    let user = auth
        .directory()
        .find(&claims.sub)
        .filter(|user| user.role == role)
        .cloned()
        .ok_or(ApiError::RefreshRejected)?;

    let access_token = auth.tokens().issue(&user, false)?;
    debug!(user_id = %user.id, "access token refreshed");

    Ok(Json(RefreshResponse { access_token }))
}

#[utoipa::path(
    post,
    path = "/auth/{persona}/logout",
    params(("persona" = Role, Path, description = "Auth namespace: admin or staff")),
    responses(
        (status = 204, description = "Refresh token revoked and cookie cleared")
    ),
    tag = "auth"
)]
#[instrument(skip_all, fields(persona = %persona.0))]
pub async fn logout(
    persona: Path<Role>,
    headers: HeaderMap,
    auth: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let role = persona.0;
    if let Some(token) = read_cookie(&headers, role.refresh_cookie()) {
        let now = now_unix_seconds();
        match auth.tokens().verify_kind(&token, TokenKind::Refresh, now) {
            Ok(claims) if claims.role == role => {
                auth.revoke(&claims.jti, claims.exp, now).await;
                info!(user_id = %claims.sub, "refresh token revoked");
            }
            Ok(_) => debug!("refresh cookie belongs to another persona"),
            Err(err) => debug!(error = %err, "ignoring invalid refresh cookie on logout"),
        }
    }

    // Always clear the cookie, even if the token was missing or invalid.
    let mut response_headers = HeaderMap::new();
    match clear_refresh_cookie(auth.config(), role) {
        Ok(cookie) => {
            response_headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => error!("Failed to build logout cookie: {err}"),
    }

    (StatusCode::NO_CONTENT, response_headers)
}

#[utoipa::path(
    get,
    path = "/auth/{persona}/current-user",
    params(("persona" = Role, Path, description = "Auth namespace: admin or staff")),
    responses(
        (status = 200, description = "Authenticated user", body = UserRecord),
        (status = 401, description = "Missing, expired, or invalid bearer token", body = ErrorBody),
        (status = 403, description = "Token belongs to another persona", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
#[instrument(skip_all, fields(persona = %persona.0))]
pub async fn current_user(
    persona: Path<Role>,
    headers: HeaderMap,
    auth: Extension<Arc<AuthState>>,
) -> Result<Json<UserRecord>, ApiError> {
    let token = extract_bearer(&headers)?;
    let claims = auth
        .tokens()
        .verify_kind(token, TokenKind::Access, now_unix_seconds())?;

    if claims.role != persona.0 {
        return Err(ApiError::Forbidden);
    }

    auth.directory()
        .find(&claims.sub)
        .cloned()
        .map(Json)
        .ok_or(ApiError::UnknownUser)
}
