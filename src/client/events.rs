//! Auth events and the view state they drive.

use super::session::SessionSnapshot;
use crate::{role::Role, user::UserRecord};
use tokio::sync::broadcast;
use tracing::trace;

const DEFAULT_CAPACITY: usize = 16;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthEvent {
    LoginSuccess { user: UserRecord, role: Role },
    LoginFail { message: String },
    Logout,
}

/// Fan-out of auth events to any number of UI state containers.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    sender: broadcast::Sender<AuthEvent>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Dispatcher {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.sender.subscribe()
    }

    pub fn dispatch(&self, event: AuthEvent) {
        // no subscribers is fine
        if self.sender.send(event).is_err() {
            trace!("auth event dropped, no subscribers");
        }
    }
}

/// What the UI needs to render auth state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthView {
    pub user: Option<UserRecord>,
    pub role: Option<Role>,
    pub authenticated: bool,
    pub error: Option<String>,
}

impl AuthView {
    /// Initial state from whatever the store holds; partial sessions render
    /// as signed out.
    #[must_use]
    pub fn hydrate(snapshot: &SessionSnapshot) -> Self {
        match snapshot.clone().complete() {
            Some(session) => Self {
                user: Some(session.user),
                role: Some(session.role),
                authenticated: true,
                error: None,
            },
            None => Self::default(),
        }
    }

    pub fn apply(&mut self, event: &AuthEvent) {
        match event {
            AuthEvent::LoginSuccess { user, role } => {
                *self = Self {
                    user: Some(user.clone()),
                    role: Some(*role),
                    authenticated: true,
                    error: None,
                };
            }
            AuthEvent::LoginFail { message } => {
                *self = Self {
                    error: Some(message.clone()),
                    ..Self::default()
                };
            }
            AuthEvent::Logout => *self = Self::default(),
        }
    }
}
