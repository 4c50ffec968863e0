//! Auth handlers for the admin and staff namespaces.
//!
//! Both personas share one set of handlers mounted under `/auth/{persona}`.
//! Login returns a bearer access token in the body and sets an `HttpOnly`
//! refresh cookie scoped to the persona's prefix. Refresh exchanges that
//! cookie for a new access token; logout revokes it and clears the cookie.
//! A token issued for one persona is never accepted by the other.

mod cookies;
pub mod login;
pub mod session;
pub mod types;

pub use login::login;
pub use session::{current_user, logout, refresh};
