//! Map parsed arguments to the action the binary runs.

use crate::cli::actions::{Action, client, server};
use crate::cli::commands;
use anyhow::{Result, anyhow};

/// Map validated CLI matches to an action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some(("server", sub)) => {
            let options = commands::server::Options::parse(sub)?;
            Ok(Action::Server(server::Args {
                port: options.port,
                jwt_secret: options.jwt_secret,
                access_ttl: options.access_ttl,
                remember_me_ttl: options.remember_me_ttl,
                refresh_ttl: options.refresh_ttl,
                users_file: options.users_file,
                frontend_base_url: options.frontend_base_url,
            }))
        }
        Some(("client", sub)) => {
            let options = commands::client::Options::parse(sub)?;
            Ok(Action::Client(client::Args {
                api_url: options.api_url,
                session_file: options.session_file,
                persona: options.persona,
                timeout: options.timeout,
                command: options.command,
            }))
        }
        _ => Err(anyhow!("no command given, see --help")),
    }
}
