//! # Staffdesk (admin and staff sessions)
//!
//! `staffdesk` covers the session lifecycle of the staff desk application for
//! its two personas, `admin` and `staff`.
//!
//! ## Server
//!
//! The [`api`] module serves `/auth/{persona}/{login,logout,refresh,current-user}`.
//! Logins return a short-lived HS256 access token plus an `HttpOnly` refresh
//! cookie scoped to the persona's auth prefix. Tokens carry the user id, role
//! and permission list; the signing key must be configured at startup.
//!
//! ## Client
//!
//! The [`client`] module holds one parameterised [`client::AuthClient`] per
//! persona. Sessions are stored as the triple (token, user, role), all or
//! nothing. Authenticated calls go through a refresh layer that exchanges the
//! refresh cookie once on a 401 and replays the request once; a failed
//! refresh clears the session and redirects to the persona's login route.

pub mod api;
pub mod cli;
pub mod client;
pub mod role;
pub mod token;
pub mod user;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
