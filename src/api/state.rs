//! Shared auth state: token service, user directory, revoked refresh tokens.

use super::directory::UserDirectory;
use crate::token::TokenService;
use std::collections::HashMap;
use tokio::sync::RwLock;
use url::Url;

const DEFAULT_FRONTEND_BASE_URL: &str = "http://localhost:5173";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    cookie_secure: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new(DEFAULT_FRONTEND_BASE_URL.to_string())
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        // Only mark cookies secure when the frontend is served over HTTPS.
        let cookie_secure = Url::parse(&frontend_base_url)
            .map(|url| url.scheme() == "https")
            .unwrap_or(false);

        Self {
            frontend_base_url,
            cookie_secure,
        }
    }

    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub const fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }
}

#[derive(Debug)]
pub struct AuthState {
    config: AuthConfig,
    tokens: TokenService,
    directory: UserDirectory,
    /// Revoked refresh token ids mapped to their expiry.
    revoked: RwLock<HashMap<String, i64>>,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, tokens: TokenService, directory: UserDirectory) -> Self {
        Self {
            config,
            tokens,
            directory,
            revoked: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub const fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    #[must_use]
    pub const fn directory(&self) -> &UserDirectory {
        &self.directory
    }

    /// Record a refresh token id as revoked until `exp`; expired entries are
    /// pruned on the way in.
    pub async fn revoke(&self, jti: &str, exp: i64, now: i64) {
        let mut revoked = self.revoked.write().await;
        revoked.retain(|_, expires| *expires > now);
        revoked.insert(jti.to_string(), exp);
    }

    pub async fn is_revoked(&self, jti: &str) -> bool {
        self.revoked.read().await.contains_key(jti)
    }

    #[cfg(test)]
    pub(crate) async fn revoked_len(&self) -> usize {
        self.revoked.read().await.len()
    }
}
