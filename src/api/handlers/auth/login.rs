use super::{
    cookies::refresh_cookie,
    types::{LoginRequest, LoginResponse},
};
use crate::{
    api::{
        directory::{normalize_login_id, valid_email},
        error::{ApiError, ErrorBody},
        state::AuthState,
    },
    role::Role,
};
use axum::{
    extract::{Extension, Json, Path},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[utoipa::path(
    post,
    path = "/auth/{persona}/login",
    params(("persona" = Role, Path, description = "Auth namespace: admin or staff")),
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued; refresh cookie set", body = LoginResponse),
        (status = 400, description = "Missing or malformed credentials", body = ErrorBody),
        (status = 401, description = "Invalid credentials", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip_all, fields(persona = %persona.0))]
pub async fn login(
    persona: Path<Role>,
    auth: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<Response, ApiError> {
    let role = persona.0;
    let Some(Json(LoginRequest {
        login_id,
        password,
        remember_me,
    })) = payload
    else {
        return Err(ApiError::BadRequest("Missing payload".to_string()));
    };

    let login_id = normalize_login_id(&login_id);
    if login_id.is_empty() || password.is_empty() {
        return Err(ApiError::BadRequest(
            "Missing login id or password".to_string(),
        ));
    }
    if role == Role::Staff && !valid_email(&login_id) {
        return Err(ApiError::BadRequest("Invalid email".to_string()));
    }

    // argon2 verification is CPU bound
    let state = Arc::clone(&auth.0);
    let user = tokio::task::spawn_blocking(move || {
        state.directory().authenticate(role, &login_id, &password)
    })
    .await
    .map_err(|err| ApiError::Internal(err.into()))?;

    let Some(user) = user else {
        warn!("login rejected");
        return Err(ApiError::InvalidCredentials);
    };

    let access_token = auth.tokens().issue(&user, remember_me)?;
    let refresh_token = auth.tokens().issue_refresh(&user)?;
    let cookie = refresh_cookie(
        auth.config(),
        role,
        &refresh_token,
        auth.tokens().ttl().refresh.as_secs(),
    )
    .map_err(|err| ApiError::Internal(err.into()))?;

    info!(user_id = %user.id, remember_me, "login succeeded");

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);

    Ok((
        StatusCode::OK,
        headers,
        Json(LoginResponse { access_token, user }),
    )
        .into_response())
}
