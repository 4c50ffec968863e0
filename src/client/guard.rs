//! Session precondition check for application boundaries.

use super::{
    events::{AuthEvent, Dispatcher},
    navigator::Navigator,
    session::{Session, SessionContext},
};
use crate::role::Role;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Session present and owned by this persona; nothing happened.
    Authenticated(Session),
    /// Session missing or partial; store cleared and sent to login.
    Redirected,
    /// Complete session for the other persona. Nothing is cleared and no
    /// redirect happens; routing is left to the caller.
    WrongPersona(Role),
}

pub struct AuthGuard {
    role: Role,
    session: SessionContext,
    dispatcher: Dispatcher,
    navigator: Arc<dyn Navigator>,
}

impl AuthGuard {
    #[must_use]
    pub fn new(
        role: Role,
        session: SessionContext,
        dispatcher: Dispatcher,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            role,
            session,
            dispatcher,
            navigator,
        }
    }

    pub async fn ensure(&self) -> GuardOutcome {
        let _guard = self.session.lock().await;

        let snapshot = match self.session.store().get() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!("Failed to read session: {err}");
                Default::default()
            }
        };

        match snapshot.complete() {
            Some(session) if session.role == self.role => {
                debug!(persona = %self.role, "session present");
                GuardOutcome::Authenticated(session)
            }
            Some(session) => {
                info!(persona = %self.role, owner = %session.role, "session belongs to another persona");
                GuardOutcome::WrongPersona(session.role)
            }
            None => {
                if let Err(err) = self.session.store().clear() {
                    warn!("Failed to clear session: {err}");
                }
                info!(persona = %self.role, "no session, redirecting to login");
                self.dispatcher.dispatch(AuthEvent::Logout);
                self.navigator.redirect(self.role.login_route());
                GuardOutcome::Redirected
            }
        }
    }
}
