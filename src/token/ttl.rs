use super::Error;
use std::time::Duration;

pub const DEFAULT_ACCESS_TTL: &str = "7d";
pub const DEFAULT_REMEMBER_ME_TTL: &str = "30d";
pub const DEFAULT_REFRESH_TTL: &str = "30d";

/// Parse a lifetime such as `45s`, `15m`, `12h`, `7d`, or bare seconds.
///
/// # Errors
/// Returns `Error::InvalidTtl` for empty, zero, overflowing, or unknown-unit input.
pub fn parse_ttl(value: &str) -> Result<Duration, Error> {
    let trimmed = value.trim();
    let invalid = || Error::InvalidTtl(value.to_string());

    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split);
    let amount: u64 = digits.parse().map_err(|_| invalid())?;

    let multiplier = match unit.trim().to_lowercase().as_str() {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        _ => return Err(invalid()),
    };

    let seconds = amount.checked_mul(multiplier).ok_or_else(invalid)?;
    if seconds == 0 {
        return Err(invalid());
    }

    Ok(Duration::from_secs(seconds))
}

/// Token lifetimes: normal sessions, "remember me" sessions, refresh tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenTtl {
    pub access: Duration,
    pub remember_me: Duration,
    pub refresh: Duration,
}

impl Default for TokenTtl {
    fn default() -> Self {
        Self {
            access: Duration::from_secs(7 * 24 * 60 * 60),
            remember_me: Duration::from_secs(30 * 24 * 60 * 60),
            refresh: Duration::from_secs(30 * 24 * 60 * 60),
        }
    }
}

impl TokenTtl {
    /// # Errors
    /// Returns `Error::InvalidTtl` if any value fails to parse.
    pub fn parse(access: &str, remember_me: &str, refresh: &str) -> Result<Self, Error> {
        Ok(Self {
            access: parse_ttl(access)?,
            remember_me: parse_ttl(remember_me)?,
            refresh: parse_ttl(refresh)?,
        })
    }

    #[must_use]
    pub const fn for_session(&self, remember_me: bool) -> Duration {
        if remember_me {
            self.remember_me
        } else {
            self.access
        }
    }
}
