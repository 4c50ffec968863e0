//! Client side of the session lifecycle.
//!
//! [`AuthClient`] talks to one persona's auth namespace through a
//! [`Transport`], wrapped in a [`RefreshLayer`](refresh::RefreshLayer) for
//! authenticated calls. Session state lives behind a [`SessionContext`] that
//! the client, its refresh layer, and the [`AuthGuard`] share.

pub mod auth;
pub mod events;
pub mod guard;
pub mod navigator;
pub mod refresh;
pub mod session;
pub mod transport;

mod error;
#[cfg(test)]
pub(crate) mod testing;

pub use auth::{AuthClient, AuthService, Credentials, SessionPayload};
pub use error::Error;
pub use events::{AuthEvent, AuthView, Dispatcher};
pub use guard::{AuthGuard, GuardOutcome};
pub use navigator::{LogNavigator, Navigator, RecordingNavigator};
pub use session::{FileStore, MemoryStore, Session, SessionContext, SessionSnapshot, SessionStore};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport};
