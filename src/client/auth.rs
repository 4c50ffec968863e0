//! Auth client: one instance per persona, same code for both.

use super::{
    Error,
    events::{AuthEvent, Dispatcher},
    guard::AuthGuard,
    navigator::Navigator,
    refresh::RefreshLayer,
    session::{Session, SessionContext},
    transport::{ApiRequest, ApiResponse, Transport},
};
use crate::{role::Role, user::UserRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Shown when the server gives no usable message.
pub const GENERIC_LOGIN_ERROR: &str = "Login failed. Please try again.";

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub login_id: String,
    pub password: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub remember_me: bool,
}

impl Credentials {
    pub fn new(login_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login_id: login_id.into(),
            password: password.into(),
            remember_me: false,
        }
    }

    #[must_use]
    pub fn remember_me(mut self, remember_me: bool) -> Self {
        self.remember_me = remember_me;
        self
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("login_id", &self.login_id)
            .field("password", &"***")
            .field("remember_me", &self.remember_me)
            .finish()
    }
}

/// What a successful login hands back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionPayload {
    pub token: String,
    pub user: UserRecord,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginEnvelope {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    user: Option<UserRecord>,
}

#[async_trait]
pub trait AuthService: Send + Sync {
    fn role(&self) -> Role;

    /// Exchange credentials for a session and store it.
    ///
    /// # Errors
    /// `Error::LoginFailed` on transport or server errors,
    /// `Error::InvalidServerResponse` when the payload is incomplete,
    /// `Error::Store` when the session cannot be persisted.
    async fn login(&self, credentials: &Credentials) -> Result<SessionPayload, Error>;

    /// Best-effort server logout, then clear the local session and redirect.
    async fn logout(&self, redirect_to: &str);

    /// Identity probe; `None` on any failure.
    async fn current_user(&self) -> Option<UserRecord>;
}

pub struct AuthClient<T> {
    role: Role,
    layer: RefreshLayer<T>,
}

impl<T: Transport> AuthClient<T> {
    pub fn new(
        role: Role,
        transport: T,
        session: SessionContext,
        dispatcher: Dispatcher,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            role,
            layer: RefreshLayer::new(transport, role, session, dispatcher, navigator),
        }
    }

    pub fn admin(
        transport: T,
        session: SessionContext,
        dispatcher: Dispatcher,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self::new(Role::Admin, transport, session, dispatcher, navigator)
    }

    pub fn staff(
        transport: T,
        session: SessionContext,
        dispatcher: Dispatcher,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self::new(Role::Staff, transport, session, dispatcher, navigator)
    }

    pub const fn session(&self) -> &SessionContext {
        self.layer.session()
    }

    pub const fn dispatcher(&self) -> &Dispatcher {
        self.layer.dispatcher()
    }

    /// Guard over the same session, events, and redirect sink.
    #[must_use]
    pub fn guard(&self) -> AuthGuard {
        AuthGuard::new(
            self.role,
            self.session().clone(),
            self.dispatcher().clone(),
            self.layer.navigator(),
        )
    }

    /// Any authenticated API call, through the refresh layer.
    ///
    /// # Errors
    /// See [`RefreshLayer::send`].
    pub async fn request(&self, request: ApiRequest) -> Result<ApiResponse, Error> {
        self.layer.send(request).await
    }

    fn login_failed(&self, message: String) -> Error {
        self.dispatcher()
            .dispatch(AuthEvent::LoginFail { message: message.clone() });
        Error::LoginFailed(message)
    }

    fn invalid_response(&self) -> Error {
        let err = Error::InvalidServerResponse;
        self.dispatcher().dispatch(AuthEvent::LoginFail {
            message: err.to_string(),
        });
        err
    }
}

#[async_trait]
impl<T: Transport> AuthService for AuthClient<T> {
    fn role(&self) -> Role {
        self.role
    }

    #[instrument(skip_all, fields(persona = %self.role))]
    async fn login(&self, credentials: &Credentials) -> Result<SessionPayload, Error> {
        let body = serde_json::to_value(credentials)
            .map_err(|err| Error::LoginFailed(format!("Failed to encode request: {err}")))?;
        let request = ApiRequest::post(self.role.endpoint("login")).with_json(body);

        let response = match self.layer.inner().send(request).await {
            Ok(response) => response,
            Err(err) => {
                warn!("Login request failed: {err}");
                return Err(self.login_failed(GENERIC_LOGIN_ERROR.to_string()));
            }
        };

        if !response.is_success() {
            debug!(status = response.status, "login rejected");
            let message = response
                .message()
                .unwrap_or_else(|| GENERIC_LOGIN_ERROR.to_string());
            return Err(self.login_failed(message));
        }

        let envelope: LoginEnvelope = response.json().map_err(|err| {
            warn!("Unexpected login payload: {err}");
            self.invalid_response()
        })?;
        let (Some(token), Some(user)) = (
            envelope.access_token.filter(|token| !token.is_empty()),
            envelope.user,
        ) else {
            return Err(self.invalid_response());
        };
        if user.role != self.role {
            warn!(user_role = %user.role, "login payload is for another persona");
            return Err(self.invalid_response());
        }

        {
            let _guard = self.session().lock().await;
            let store = self.session().store();
            store.clear()?;
            store.set(&Session {
                token: token.clone(),
                user: user.clone(),
                role: self.role,
            })?;
        }

        info!(user_id = %user.id, "logged in");
        self.dispatcher().dispatch(AuthEvent::LoginSuccess {
            user: user.clone(),
            role: self.role,
        });

        Ok(SessionPayload { token, user })
    }

    #[instrument(skip_all, fields(persona = %self.role))]
    async fn logout(&self, redirect_to: &str) {
        let mut request = ApiRequest::post(self.role.endpoint("logout"));
        if let Some(token) = self.session().token() {
            request = request.with_bearer(token);
        }

        match self.layer.inner().send(request).await {
            Ok(response) if response.is_success() => debug!("server session closed"),
            Ok(response) => warn!(status = response.status, "server logout failed"),
            Err(err) => warn!("Logout request failed: {err}"),
        }

        {
            let _guard = self.session().lock().await;
            if let Err(err) = self.session().store().clear() {
                warn!("Failed to clear session: {err}");
            }
        }

        info!("logged out");
        self.dispatcher().dispatch(AuthEvent::Logout);
        self.layer.navigator().redirect(redirect_to);
    }

    async fn current_user(&self) -> Option<UserRecord> {
        if self.session().token().is_none() {
            return None;
        }

        match self
            .layer
            .send(ApiRequest::get(self.role.endpoint("current-user")))
            .await
        {
            Ok(response) if response.is_success() => response
                .json::<UserRecord>()
                .map_err(|err| debug!("Unexpected current-user payload: {err}"))
                .ok(),
            Ok(response) => {
                debug!(status = response.status, "current-user probe failed");
                None
            }
            Err(err) => {
                debug!("current-user probe failed: {err}");
                None
            }
        }
    }
}
