use crate::token::{DEFAULT_ACCESS_TTL, DEFAULT_REFRESH_TTL, DEFAULT_REMEMBER_ME_TTL};
use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_PORT: &str = "port";
pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_JWT_EXPIRES_IN: &str = "jwt-expires-in";
pub const ARG_JWT_REMEMBER_ME_EXPIRES_IN: &str = "jwt-remember-me-expires-in";
pub const ARG_REFRESH_EXPIRES_IN: &str = "refresh-expires-in";
pub const ARG_USERS_FILE: &str = "users-file";
pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";

#[derive(Debug)]
pub struct Options {
    pub port: u16,
    pub jwt_secret: SecretString,
    pub access_ttl: String,
    pub remember_me_ttl: String,
    pub refresh_ttl: String,
    pub users_file: String,
    pub frontend_base_url: String,
}

impl Options {
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let string = |name: &str| -> Result<String> {
            matches
                .get_one::<String>(name)
                .cloned()
                .with_context(|| format!("missing required argument: --{name}"))
        };

        Ok(Self {
            port: matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080),
            jwt_secret: SecretString::from(string(ARG_JWT_SECRET)?),
            access_ttl: string(ARG_JWT_EXPIRES_IN)?,
            remember_me_ttl: string(ARG_JWT_REMEMBER_ME_EXPIRES_IN)?,
            refresh_ttl: string(ARG_REFRESH_EXPIRES_IN)?,
            users_file: string(ARG_USERS_FILE)?,
            frontend_base_url: string(ARG_FRONTEND_BASE_URL)?,
        })
    }
}

#[must_use]
pub fn subcommand() -> Command {
    Command::new("server")
        .about("Serve the admin and staff auth API")
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("STAFFDESK_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long(ARG_JWT_SECRET)
                .help("HS256 signing key for session tokens")
                .env("JWT_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_JWT_EXPIRES_IN)
                .long(ARG_JWT_EXPIRES_IN)
                .help("Access token lifetime, e.g. 15m, 12h, 7d")
                .env("JWT_EXPIRES_IN")
                .default_value(DEFAULT_ACCESS_TTL),
        )
        .arg(
            Arg::new(ARG_JWT_REMEMBER_ME_EXPIRES_IN)
                .long(ARG_JWT_REMEMBER_ME_EXPIRES_IN)
                .help("Access token lifetime when \"remember me\" is set")
                .env("JWT_REMEMBER_ME_EXPIRES_IN")
                .default_value(DEFAULT_REMEMBER_ME_TTL),
        )
        .arg(
            Arg::new(ARG_REFRESH_EXPIRES_IN)
                .long(ARG_REFRESH_EXPIRES_IN)
                .help("Refresh token lifetime")
                .env("STAFFDESK_REFRESH_EXPIRES_IN")
                .default_value(DEFAULT_REFRESH_TTL),
        )
        .arg(
            Arg::new(ARG_USERS_FILE)
                .long(ARG_USERS_FILE)
                .help("JSON seed file with admin and staff accounts")
                .env("STAFFDESK_USERS_FILE")
                .required(true),
        )
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Frontend origin allowed by CORS; https also marks cookies Secure")
                .env("STAFFDESK_FRONTEND_BASE_URL")
                .default_value("http://localhost:5173"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn defaults_and_required() -> Result<()> {
        temp_env::with_vars(
            [
                ("JWT_SECRET", None::<&str>),
                ("JWT_EXPIRES_IN", None),
                ("JWT_REMEMBER_ME_EXPIRES_IN", None),
                ("STAFFDESK_REFRESH_EXPIRES_IN", None),
                ("STAFFDESK_PORT", None),
                ("STAFFDESK_USERS_FILE", None),
                ("STAFFDESK_FRONTEND_BASE_URL", None),
            ],
            || -> Result<()> {
                let matches = subcommand().try_get_matches_from([
                    "server",
                    "--jwt-secret",
                    "s3cret",
                    "--users-file",
                    "users.json",
                ])?;
                let options = Options::parse(&matches)?;
                assert_eq!(options.port, 8080);
                assert_eq!(options.jwt_secret.expose_secret(), "s3cret");
                assert_eq!(options.access_ttl, "7d");
                assert_eq!(options.remember_me_ttl, "30d");
                assert_eq!(options.refresh_ttl, "30d");
                assert_eq!(options.frontend_base_url, "http://localhost:5173");

                // a missing signing key is a startup error
                assert!(
                    subcommand()
                        .try_get_matches_from(["server", "--users-file", "users.json"])
                        .is_err()
                );
                Ok(())
            },
        )
    }

    #[test]
    fn reads_environment() -> Result<()> {
        temp_env::with_vars(
            [
                ("JWT_SECRET", Some("from-env")),
                ("JWT_EXPIRES_IN", Some("15m")),
                ("JWT_REMEMBER_ME_EXPIRES_IN", Some("14d")),
                ("STAFFDESK_REFRESH_EXPIRES_IN", Some("60d")),
                ("STAFFDESK_PORT", Some("9090")),
                ("STAFFDESK_USERS_FILE", Some("/etc/staffdesk/users.json")),
                ("STAFFDESK_FRONTEND_BASE_URL", Some("https://desk.example.com")),
            ],
            || -> Result<()> {
                let matches = subcommand().try_get_matches_from(["server"])?;
                let options = Options::parse(&matches)?;
                assert_eq!(options.port, 9090);
                assert_eq!(options.jwt_secret.expose_secret(), "from-env");
                assert_eq!(options.access_ttl, "15m");
                assert_eq!(options.remember_me_ttl, "14d");
                assert_eq!(options.refresh_ttl, "60d");
                assert_eq!(options.users_file, "/etc/staffdesk/users.json");
                assert_eq!(options.frontend_base_url, "https://desk.example.com");
                Ok(())
            },
        )
    }
}
