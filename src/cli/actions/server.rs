use crate::{
    api::{
        self,
        directory::UserDirectory,
        state::{AuthConfig, AuthState},
    },
    token::{TokenService, TokenTtl},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use tracing::{debug, info};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub jwt_secret: SecretString,
    pub access_ttl: String,
    pub remember_me_ttl: String,
    pub refresh_ttl: String,
    pub users_file: String,
    pub frontend_base_url: String,
}

fn log_startup_args(args: &Args) {
    debug!(
        port = args.port,
        access_ttl = %args.access_ttl,
        remember_me_ttl = %args.remember_me_ttl,
        refresh_ttl = %args.refresh_ttl,
        users_file = %args.users_file,
        frontend_base_url = %args.frontend_base_url,
        "startup arguments"
    );
}

/// Build the auth state from the arguments.
///
/// # Errors
/// Returns an error for a missing signing key, bad TTLs, or an unreadable
/// users file.
pub fn auth_state(args: Args) -> Result<AuthState> {
    let ttl = TokenTtl::parse(&args.access_ttl, &args.remember_me_ttl, &args.refresh_ttl)
        .context("Invalid token lifetime")?;
    let tokens = TokenService::new(&args.jwt_secret, ttl).context("JWT_SECRET is required")?;
    let directory = UserDirectory::load(&args.users_file)?;
    info!(users = directory.len(), "user directory loaded");

    Ok(AuthState::new(
        AuthConfig::new(args.frontend_base_url),
        tokens,
        directory,
    ))
}

/// Execute the server action.
/// # Errors
/// Returns an error if configuration is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);
    let port = args.port;
    let state = auth_state(args)?;
    api::new(port, state).await
}
