use crate::{
    cli::commands::client::ClientCommand,
    client::{
        ApiRequest, AuthClient, AuthService, Credentials, Dispatcher, FileStore, GuardOutcome,
        HttpTransport, LogNavigator, SessionContext,
    },
    role::Role,
};
use anyhow::{Result, anyhow, bail};
use secrecy::ExposeSecret;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub api_url: String,
    pub session_file: PathBuf,
    pub persona: Role,
    pub timeout: Duration,
    pub command: ClientCommand,
}

/// Execute a client command against the configured API.
/// # Errors
/// Returns an error when the command fails or there is no usable session.
pub async fn execute(args: Args) -> Result<()> {
    debug!(api_url = %args.api_url, persona = %args.persona, "client command");

    let transport = HttpTransport::new(&args.api_url, args.timeout)?;
    let session = SessionContext::new(FileStore::new(&args.session_file));
    let client = AuthClient::new(
        args.persona,
        transport,
        session,
        Dispatcher::default(),
        Arc::new(LogNavigator),
    );

    match args.command {
        ClientCommand::Login {
            login_id,
            password,
            remember_me,
        } => {
            let credentials =
                Credentials::new(login_id, password.expose_secret()).remember_me(remember_me);
            let payload = client.login(&credentials).await?;
            println!(
                "Signed in as {} ({})",
                payload.user.login_id.as_deref().unwrap_or(&payload.user.id),
                payload.user.role
            );
        }
        ClientCommand::Logout => {
            client.logout(args.persona.login_route()).await;
            println!("Signed out");
        }
        ClientCommand::Whoami => {
            let user = client
                .current_user()
                .await
                .ok_or_else(|| anyhow!("Not signed in as {}", args.persona))?;
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        ClientCommand::Check => match client.guard().ensure().await {
            GuardOutcome::Authenticated(session) => {
                println!("Session OK: {} ({})", session.user.id, session.role);
            }
            GuardOutcome::Redirected => bail!("No session for {}", args.persona),
            GuardOutcome::WrongPersona(owner) => {
                bail!(
                    "Stored session belongs to {owner} ({}), not {}",
                    owner.namespace(),
                    args.persona
                )
            }
        },
        ClientCommand::Request { method, path, body } => {
            let mut request = ApiRequest::new(method, path);
            if let Some(body) = body {
                request = request.with_json(body);
            }
            let response = client.request(request).await?.error_for_status()?;
            if let Some(body) = response.body {
                println!("{}", serde_json::to_string_pretty(&body)?);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        client::{Session, SessionStore},
        user::UserRecord,
    };

    fn args(session_file: PathBuf, command: ClientCommand) -> Args {
        Args {
            api_url: "http://127.0.0.1:9".to_string(),
            session_file,
            persona: Role::Admin,
            timeout: Duration::from_secs(1),
            command,
        }
    }

    #[tokio::test]
    async fn check_without_session_fails() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let session_file = dir.path().join("session.json");

        let err = execute(args(session_file.clone(), ClientCommand::Check))
            .await
            .err()
            .ok_or_else(|| anyhow!("check should fail"))?;
        assert_eq!(err.to_string(), "No session for admin");
        assert!(!session_file.exists());
        Ok(())
    }

    #[tokio::test]
    async fn check_reports_other_persona_without_touching_it() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let session_file = dir.path().join("session.json");
        let store = FileStore::new(&session_file);
        store.set(&Session {
            token: "abc".to_string(),
            user: UserRecord::new("u2", Role::Staff),
            role: Role::Staff,
        })?;

        let err = execute(args(session_file.clone(), ClientCommand::Check))
            .await
            .err()
            .ok_or_else(|| anyhow!("check should fail"))?;
        assert_eq!(
            err.to_string(),
            "Stored session belongs to staff (/staff), not admin"
        );
        assert!(session_file.exists());
        Ok(())
    }
}
