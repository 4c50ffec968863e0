//! Signed session tokens.
//!
//! Tokens are HS256 JWTs carrying the user id, role, and permission list.
//! Access tokens are presented as `Authorization: Bearer <token>`; refresh
//! tokens carry the same identity with a longer lifetime and are exchanged
//! for new access tokens. Expiry is checked against an explicit clock so the
//! boundary is exact (`exp <= now` is expired, no leeway).

mod error;
mod ttl;

pub use error::Error;
pub use ttl::{
    DEFAULT_ACCESS_TTL, DEFAULT_REFRESH_TTL, DEFAULT_REMEMBER_ME_TTL, TokenTtl, parse_ttl,
};

use crate::{role::Role, user::UserRecord};
use axum::http::{HeaderMap, header::AUTHORIZATION};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use ulid::Ulid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: TokenTtl,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Build the service from the process signing key.
    ///
    /// # Errors
    /// Returns `Error::MissingSigningKey` when the secret is empty.
    pub fn new(secret: &SecretString, ttl: TokenTtl) -> Result<Self, Error> {
        let key = secret.expose_secret().trim();
        if key.is_empty() {
            return Err(Error::MissingSigningKey);
        }

        Ok(Self {
            encoding: EncodingKey::from_secret(key.as_bytes()),
            decoding: DecodingKey::from_secret(key.as_bytes()),
            ttl,
        })
    }

    #[must_use]
    pub const fn ttl(&self) -> &TokenTtl {
        &self.ttl
    }

    /// Issue an access token; `remember_me` selects the long horizon.
    ///
    /// # Errors
    /// Returns `Error::MissingIdentity` if the user has no id.
    pub fn issue(&self, user: &UserRecord, remember_me: bool) -> Result<String, Error> {
        self.issue_at(user, remember_me, now_unix_seconds())
    }

    /// # Errors
    /// Same as [`TokenService::issue`].
    pub fn issue_at(
        &self,
        user: &UserRecord,
        remember_me: bool,
        now: i64,
    ) -> Result<String, Error> {
        self.sign(user, TokenKind::Access, self.ttl.for_session(remember_me), now)
    }

    /// # Errors
    /// Returns `Error::MissingIdentity` if the user has no id.
    pub fn issue_refresh(&self, user: &UserRecord) -> Result<String, Error> {
        self.issue_refresh_at(user, now_unix_seconds())
    }

    /// # Errors
    /// Same as [`TokenService::issue_refresh`].
    pub fn issue_refresh_at(&self, user: &UserRecord, now: i64) -> Result<String, Error> {
        self.sign(user, TokenKind::Refresh, self.ttl.refresh, now)
    }

    fn sign(
        &self,
        user: &UserRecord,
        kind: TokenKind,
        ttl: Duration,
        now: i64,
    ) -> Result<String, Error> {
        if user.id.trim().is_empty() {
            return Err(Error::MissingIdentity);
        }

        let lifetime =
            i64::try_from(ttl.as_secs()).map_err(|_| Error::InvalidTtl(format!("{ttl:?}")))?;
        let claims = Claims {
            sub: user.id.clone(),
            role: user.role,
            permissions: user.permissions.clone(),
            kind,
            iat: now,
            exp: now.saturating_add(lifetime),
            jti: Ulid::new().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|_| Error::Signing)
    }

    /// Verify a token of any kind and return its claims.
    ///
    /// # Errors
    /// `Expired` past `exp`, `Malformed` for structural problems,
    /// `VerificationFailed` for bad signatures or unexpected algorithms.
    pub fn verify(&self, token: &str) -> Result<Claims, Error> {
        self.verify_at(token, now_unix_seconds())
    }

    /// # Errors
    /// Same as [`TokenService::verify`].
    pub fn verify_at(&self, token: &str, now: i64) -> Result<Claims, Error> {
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::Malformed);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        // exp is checked below against the supplied clock
        validation.validate_exp = false;

        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        if data.claims.exp <= now {
            return Err(Error::Expired);
        }

        Ok(data.claims)
    }

    /// Verify and require a specific token kind.
    ///
    /// # Errors
    /// As [`TokenService::verify`], plus `VerificationFailed` on a kind mismatch.
    pub fn verify_kind(&self, token: &str, kind: TokenKind, now: i64) -> Result<Claims, Error> {
        let claims = self.verify_at(token, now)?;
        if claims.kind != kind {
            return Err(Error::VerificationFailed);
        }
        Ok(claims)
    }
}

/// Pull the raw token out of an `Authorization: Bearer <token>` header.
///
/// # Errors
/// Returns `Error::MissingOrMalformed` when the header is absent, not a bearer
/// credential, or empty.
pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, Error> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(Error::MissingOrMalformed)?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))
        .ok_or(Error::MissingOrMalformed)?
        .trim();
    if token.is_empty() {
        Err(Error::MissingOrMalformed)
    } else {
        Ok(token)
    }
}

/// Unix seconds used for `iat`/`exp`.
#[must_use]
pub fn now_unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
}
