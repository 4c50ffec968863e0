//! Refresh-on-401 decorator around a [`Transport`].
//!
//! A request carries an explicit [`Attempt`]. A `First` attempt that comes
//! back 401 triggers one refresh; on success the request is replayed as a
//! `Replay`, whose response is returned as is. A replay never refreshes, so
//! sustained 401s cannot loop. A failed refresh tears the session down and
//! sends the user to the persona's login route.

use super::{
    Error,
    events::{AuthEvent, Dispatcher},
    navigator::Navigator,
    session::SessionContext,
    transport::{ApiRequest, ApiResponse, Transport},
};
use crate::role::Role;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attempt {
    First,
    Replay,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshEnvelope {
    #[serde(default)]
    access_token: Option<String>,
}

pub struct RefreshLayer<T> {
    inner: T,
    role: Role,
    session: SessionContext,
    dispatcher: Dispatcher,
    navigator: Arc<dyn Navigator>,
}

impl<T: Transport> RefreshLayer<T> {
    pub fn new(
        inner: T,
        role: Role,
        session: SessionContext,
        dispatcher: Dispatcher,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            inner,
            role,
            session,
            dispatcher,
            navigator,
        }
    }

    /// The undecorated transport, for calls that must not refresh (login,
    /// logout).
    pub const fn inner(&self) -> &T {
        &self.inner
    }

    pub const fn session(&self) -> &SessionContext {
        &self.session
    }

    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn navigator(&self) -> Arc<dyn Navigator> {
        Arc::clone(&self.navigator)
    }

    /// Send with the stored bearer token, refreshing once on 401.
    ///
    /// # Errors
    /// Transport errors pass through; `Error::RefreshFailed` when the session
    /// could not be refreshed (the session is cleared by then).
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, Error> {
        self.send_with(request, Attempt::First).await
    }

    /// # Errors
    /// See [`RefreshLayer::send`].
    pub async fn send_with(
        &self,
        request: ApiRequest,
        attempt: Attempt,
    ) -> Result<ApiResponse, Error> {
        let (response, bearer) = self.attach_and_send(request.clone()).await?;
        if !response.is_unauthorized() || attempt == Attempt::Replay {
            return Ok(response);
        }

        self.refresh(bearer.as_deref()).await?;

        let (replayed, _) = self.attach_and_send(request).await?;
        if replayed.is_unauthorized() {
            debug!(persona = %self.role, "replayed request unauthorized, not retrying");
        }
        Ok(replayed)
    }

    async fn attach_and_send(
        &self,
        mut request: ApiRequest,
    ) -> Result<(ApiResponse, Option<String>), Error> {
        let bearer = self.session.token();
        if bearer.is_some() {
            request.bearer.clone_from(&bearer);
        }
        let response = self.inner.send(request).await?;
        Ok((response, bearer))
    }

    /// Exchange the refresh cookie for a new access token and store it.
    /// `stale` is the token the failed request carried.
    async fn refresh(&self, stale: Option<&str>) -> Result<(), Error> {
        let _guard = self.session.lock().await;

        if let Some(current) = self.session.token() {
            if stale != Some(current.as_str()) {
                debug!(persona = %self.role, "session changed while waiting, replaying");
                return Ok(());
            }
        }

        let stored = match self.exchange().await {
            Ok(token) => self.session.store().set_token(&token),
            Err(err) => Err(err),
        };

        match stored {
            Ok(()) => {
                info!(persona = %self.role, "session refreshed");
                Ok(())
            }
            Err(err) => {
                warn!(persona = %self.role, "Refresh failed: {err}");
                Err(self.teardown())
            }
        }
    }

    async fn exchange(&self) -> Result<String, Error> {
        let response = self
            .inner
            .send(ApiRequest::post(self.role.endpoint("refresh")))
            .await?
            .error_for_status()?;
        response
            .json::<RefreshEnvelope>()?
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or(Error::InvalidServerResponse)
    }

    /// Clear the session, announce the logout, and go to the login route.
    /// Callers hold the session lock.
    fn teardown(&self) -> Error {
        if let Err(err) = self.session.store().clear() {
            error!("Failed to clear session: {err}");
        }
        self.dispatcher.dispatch(AuthEvent::Logout);
        self.navigator.redirect(self.role.login_route());
        Error::RefreshFailed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        client::{
            navigator::RecordingNavigator,
            session::{MemoryStore, Session},
            testing::{ScriptedTransport, ok, status},
        },
        user::UserRecord,
    };
    use serde_json::json;

    struct Harness {
        layer: RefreshLayer<Arc<ScriptedTransport>>,
        transport: Arc<ScriptedTransport>,
        navigator: RecordingNavigator,
        session: SessionContext,
        dispatcher: Dispatcher,
    }

    fn harness(script: Vec<Result<ApiResponse, Error>>) -> Result<Harness, Error> {
        let transport = Arc::new(ScriptedTransport::new(script));
        let navigator = RecordingNavigator::new();
        let session = SessionContext::new(MemoryStore::new());
        session.store().set(&Session {
            token: "old".to_string(),
            user: UserRecord::new("u1", Role::Admin),
            role: Role::Admin,
        })?;
        let dispatcher = Dispatcher::default();
        let layer = RefreshLayer::new(
            Arc::clone(&transport),
            Role::Admin,
            session.clone(),
            dispatcher.clone(),
            Arc::new(navigator.clone()),
        );
        Ok(Harness {
            layer,
            transport,
            navigator,
            session,
            dispatcher,
        })
    }

    fn unauthorized() -> Result<ApiResponse, Error> {
        status(401, json!({"message": "Token expired"}))
    }

    #[tokio::test]
    async fn attaches_the_stored_token() -> Result<(), Error> {
        let h = harness(vec![ok(json!({"ok": true}))])?;
        let response = h.layer.send(ApiRequest::get("/tasks")).await?;
        assert_eq!(response.status, 200);

        let requests = h.transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].bearer.as_deref(), Some("old"));
        Ok(())
    }

    #[tokio::test]
    async fn refreshes_once_and_replays_with_new_token() -> Result<(), Error> {
        let h = harness(vec![
            unauthorized(),
            ok(json!({"accessToken": "new"})),
            ok(json!({"ok": true})),
        ])?;

        let response = h.layer.send(ApiRequest::get("/tasks")).await?;
        assert_eq!(response.status, 200);
        assert_eq!(
            h.transport.paths(),
            vec!["/tasks", "/auth/admin/refresh", "/tasks"]
        );
        assert_eq!(h.transport.requests()[2].bearer.as_deref(), Some("new"));

        let stored = h.session.snapshot().complete().ok_or(Error::RefreshFailed)?;
        assert_eq!(stored.token, "new");
        assert_eq!(stored.user.id, "u1");
        assert!(h.navigator.visits().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn unauthorized_replay_is_not_refreshed_again() -> Result<(), Error> {
        let h = harness(vec![
            unauthorized(),
            ok(json!({"accessToken": "new"})),
            unauthorized(),
            ok(json!({"accessToken": "newer"})),
        ])?;

        let response = h.layer.send(ApiRequest::get("/tasks")).await?;
        assert_eq!(response.status, 401);

        let paths = h.transport.paths();
        assert_eq!(paths, vec!["/tasks", "/auth/admin/refresh", "/tasks"]);
        let refreshes = paths.iter().filter(|path| path.ends_with("/refresh")).count();
        assert_eq!(refreshes, 1);
        // the session survives; only a failed refresh tears it down
        assert_eq!(h.session.token().as_deref(), Some("new"));
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_401s_share_one_refresh() -> Result<(), Error> {
        let h = harness(vec![
            unauthorized(),
            unauthorized(),
            ok(json!({"accessToken": "new"})),
            ok(json!({"ok": 1})),
            ok(json!({"ok": 2})),
        ])?;

        let (first, second) = tokio::join!(
            h.layer.send(ApiRequest::get("/tasks")),
            h.layer.send(ApiRequest::get("/leaves")),
        );
        assert_eq!(first?.status, 200);
        assert_eq!(second?.status, 200);

        let requests = h.transport.requests();
        assert_eq!(requests.len(), 5);
        let refreshes: Vec<_> = requests
            .iter()
            .filter(|request| request.path == "/auth/admin/refresh")
            .collect();
        assert_eq!(refreshes.len(), 1);

        // both originals went out with the stale token, both replays with the new one
        let bearers: Vec<_> = requests
            .iter()
            .filter(|request| request.path != "/auth/admin/refresh")
            .map(|request| request.bearer.as_deref())
            .collect();
        assert_eq!(bearers, vec![Some("old"), Some("old"), Some("new"), Some("new")]);

        assert_eq!(h.session.token().as_deref(), Some("new"));
        assert!(h.navigator.visits().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn explicit_replay_never_refreshes() -> Result<(), Error> {
        let h = harness(vec![unauthorized()])?;
        let response = h
            .layer
            .send_with(ApiRequest::get("/tasks"), Attempt::Replay)
            .await?;
        assert_eq!(response.status, 401);
        assert_eq!(h.transport.paths(), vec!["/tasks"]);
        Ok(())
    }

    #[tokio::test]
    async fn failed_refresh_clears_session_and_redirects() -> Result<(), Error> {
        let h = harness(vec![
            unauthorized(),
            status(401, json!({"message": "Session expired"})),
        ])?;
        let mut events = h.dispatcher.subscribe();

        let result = h.layer.send(ApiRequest::get("/tasks")).await;
        assert_eq!(result, Err(Error::RefreshFailed));
        assert_eq!(h.transport.paths(), vec!["/tasks", "/auth/admin/refresh"]);
        assert!(h.session.snapshot().is_empty());
        assert_eq!(h.navigator.visits(), vec!["/admin/login"]);
        assert_eq!(events.try_recv().ok(), Some(AuthEvent::Logout));
        Ok(())
    }

    #[tokio::test]
    async fn refresh_without_token_in_body_fails() -> Result<(), Error> {
        let h = harness(vec![unauthorized(), ok(json!({"accessToken": ""}))])?;
        let result = h.layer.send(ApiRequest::get("/tasks")).await;
        assert_eq!(result, Err(Error::RefreshFailed));
        assert!(h.session.snapshot().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn network_failure_during_refresh_tears_down() -> Result<(), Error> {
        let h = harness(vec![
            unauthorized(),
            Err(Error::Network("connection refused".to_string())),
        ])?;
        let result = h.layer.send(ApiRequest::get("/tasks")).await;
        assert_eq!(result, Err(Error::RefreshFailed));
        assert_eq!(h.navigator.visits(), vec!["/admin/login"]);
        Ok(())
    }
}
