//! User roles and the persona each one maps to.
//!
//! A role selects the auth namespace on the server (`/auth/{role}/*`), the
//! route namespace on the client (`/{role}/*`), and the login route a client
//! is sent back to when its session ends.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Staff => "staff",
        }
    }

    /// Server-side prefix for this persona's auth endpoints.
    #[must_use]
    pub const fn auth_base(self) -> &'static str {
        match self {
            Self::Admin => "/auth/admin",
            Self::Staff => "/auth/staff",
        }
    }

    /// Client route namespace guarded by this persona's session.
    #[must_use]
    pub const fn namespace(self) -> &'static str {
        match self {
            Self::Admin => "/admin",
            Self::Staff => "/staff",
        }
    }

    /// Where a client lands when its session is torn down.
    #[must_use]
    pub const fn login_route(self) -> &'static str {
        match self {
            Self::Admin => "/admin/login",
            Self::Staff => "/staff/login",
        }
    }

    #[must_use]
    pub fn endpoint(self, action: &str) -> String {
        format!("{}/{}", self.auth_base(), action.trim_start_matches('/'))
    }

    /// Name of the `HttpOnly` cookie carrying this persona's refresh token.
    #[must_use]
    pub const fn refresh_cookie(self) -> &'static str {
        match self {
            Self::Admin => "staffdesk_admin_refresh",
            Self::Staff => "staffdesk_staff_refresh",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role: {}", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "staff" => Ok(Self::Staff),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}
