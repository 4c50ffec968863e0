use crate::role::Role;
use anyhow::{Context, Result, anyhow};
use clap::{Arg, ArgAction, ArgMatches, Command};
use reqwest::Method;
use secrecy::SecretString;
use serde_json::Value;
use std::{path::PathBuf, time::Duration};

pub const ARG_API_URL: &str = "api-url";
pub const ARG_SESSION_FILE: &str = "session-file";
pub const ARG_PERSONA: &str = "persona";
pub const ARG_TIMEOUT: &str = "timeout";

#[derive(Debug)]
pub enum ClientCommand {
    Login {
        login_id: String,
        password: SecretString,
        remember_me: bool,
    },
    Logout,
    Whoami,
    Check,
    Request {
        method: Method,
        path: String,
        body: Option<Value>,
    },
}

#[derive(Debug)]
pub struct Options {
    pub api_url: String,
    pub session_file: PathBuf,
    pub persona: Role,
    pub timeout: Duration,
    pub command: ClientCommand,
}

impl Options {
    /// # Errors
    /// Returns an error if arguments are missing or a request body is not JSON.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let api_url = matches
            .get_one::<String>(ARG_API_URL)
            .cloned()
            .context("missing required argument: --api-url")?;
        let session_file = matches
            .get_one::<String>(ARG_SESSION_FILE)
            .map(PathBuf::from)
            .context("missing required argument: --session-file")?;
        let persona = matches
            .get_one::<Role>(ARG_PERSONA)
            .copied()
            .context("missing required argument: --persona")?;
        let timeout = Duration::from_secs(matches.get_one::<u64>(ARG_TIMEOUT).copied().unwrap_or(10));

        let command = match matches.subcommand() {
            Some(("login", sub)) => ClientCommand::Login {
                login_id: sub
                    .get_one::<String>("login-id")
                    .cloned()
                    .context("missing required argument: --login-id")?,
                password: sub
                    .get_one::<String>("password")
                    .cloned()
                    .map(SecretString::from)
                    .context("missing required argument: --password")?,
                remember_me: sub.get_flag("remember-me"),
            },
            Some(("logout", _)) => ClientCommand::Logout,
            Some(("whoami", _)) => ClientCommand::Whoami,
            Some(("check", _)) => ClientCommand::Check,
            Some(("request", sub)) => {
                let method = sub
                    .get_one::<String>("method")
                    .map_or("GET", String::as_str)
                    .to_uppercase();
                let body = sub
                    .get_one::<String>("data")
                    .map(|data| serde_json::from_str::<Value>(data))
                    .transpose()
                    .context("--data must be valid JSON")?;
                ClientCommand::Request {
                    method: Method::from_bytes(method.as_bytes())
                        .map_err(|_| anyhow!("invalid method: {method}"))?,
                    path: sub
                        .get_one::<String>("path")
                        .cloned()
                        .context("missing request path")?,
                    body,
                }
            }
            _ => return Err(anyhow!("no client command given")),
        };

        Ok(Self {
            api_url,
            session_file,
            persona,
            timeout,
            command,
        })
    }
}

#[must_use]
pub fn subcommand() -> Command {
    Command::new("client")
        .about("Sign in and call the API as an admin or staff user")
        .subcommand_required(true)
        .arg(
            Arg::new(ARG_API_URL)
                .long(ARG_API_URL)
                .help("Base URL of the staffdesk API")
                .env("STAFFDESK_API_URL")
                .default_value("http://localhost:8080"),
        )
        .arg(
            Arg::new(ARG_SESSION_FILE)
                .long(ARG_SESSION_FILE)
                .help("Where the session (token, user, role) is kept")
                .env("STAFFDESK_SESSION_FILE")
                .default_value(".staffdesk/session.json"),
        )
        .arg(
            Arg::new(ARG_PERSONA)
                .long(ARG_PERSONA)
                .help("Persona to act as: admin or staff")
                .env("STAFFDESK_PERSONA")
                .required(true)
                .value_parser(|value: &str| value.parse::<Role>()),
        )
        .arg(
            Arg::new(ARG_TIMEOUT)
                .long(ARG_TIMEOUT)
                .help("Request timeout in seconds")
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .subcommand(
            Command::new("login")
                .about("Sign in and store the session")
                .arg(
                    Arg::new("login-id")
                        .long("login-id")
                        .help("Username (admin) or email (staff)")
                        .required(true),
                )
                .arg(
                    Arg::new("password")
                        .long("password")
                        .help("Password")
                        .env("STAFFDESK_PASSWORD")
                        .hide_env_values(true)
                        .required(true),
                )
                .arg(
                    Arg::new("remember-me")
                        .long("remember-me")
                        .help("Ask for the long-lived token")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("logout").about("End the session"))
        .subcommand(Command::new("whoami").about("Show the signed-in user"))
        .subcommand(Command::new("check").about("Verify a complete session is stored"))
        .subcommand(
            Command::new("request")
                .about("Call an API path with the session token")
                .arg(Arg::new("path").required(true).help("API path, e.g. /tasks"))
                .arg(
                    Arg::new("method")
                        .short('X')
                        .long("method")
                        .default_value("GET")
                        .ignore_case(true)
                        .value_parser(["GET", "POST", "PUT", "PATCH", "DELETE"]),
                )
                .arg(
                    Arg::new("data")
                        .short('d')
                        .long("data")
                        .help("JSON request body"),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn parse(args: &[&str]) -> Result<Options> {
        let matches = subcommand().try_get_matches_from(args)?;
        Options::parse(&matches)
    }

    #[test]
    fn login_with_defaults() -> Result<()> {
        temp_env::with_vars(
            [
                ("STAFFDESK_API_URL", None::<&str>),
                ("STAFFDESK_SESSION_FILE", None),
                ("STAFFDESK_PERSONA", None),
                ("STAFFDESK_PASSWORD", None),
            ],
            || -> Result<()> {
                let options = parse(&[
                    "client",
                    "--persona",
                    "Staff",
                    "login",
                    "--login-id",
                    "jane@example.com",
                    "--password",
                    "pw",
                    "--remember-me",
                ])?;
                assert_eq!(options.api_url, "http://localhost:8080");
                assert_eq!(options.session_file, PathBuf::from(".staffdesk/session.json"));
                assert_eq!(options.persona, Role::Staff);
                assert_eq!(options.timeout, Duration::from_secs(10));
                let ClientCommand::Login {
                    login_id,
                    password,
                    remember_me,
                } = options.command
                else {
                    return Err(anyhow!("expected login"));
                };
                assert_eq!(login_id, "jane@example.com");
                assert_eq!(password.expose_secret(), "pw");
                assert!(remember_me);
                Ok(())
            },
        )
    }

    #[test]
    fn persona_is_validated() {
        temp_env::with_var("STAFFDESK_PERSONA", None::<&str>, || {
            assert!(parse(&["client", "--persona", "owner", "whoami"]).is_err());
            assert!(parse(&["client", "whoami"]).is_err());
        });
    }

    #[test]
    fn request_parses_method_and_body() -> Result<()> {
        temp_env::with_var("STAFFDESK_PERSONA", Some("admin"), || -> Result<()> {
            let options = parse(&[
                "client",
                "request",
                "/tasks",
                "-X",
                "post",
                "--data",
                r#"{"title":"x"}"#,
            ])?;
            let ClientCommand::Request { method, path, body } = options.command else {
                return Err(anyhow!("expected request"));
            };
            assert_eq!(method, Method::POST);
            assert_eq!(path, "/tasks");
            assert_eq!(body, Some(serde_json::json!({"title": "x"})));

            assert!(parse(&["client", "request", "/tasks", "--data", "{nope"]).is_err());
            Ok(())
        })
    }
}
