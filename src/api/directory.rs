//! In-memory user directory loaded from a JSON seed file.
//!
//! Passwords are stored as argon2id PHC strings. Seed entries may carry a
//! plaintext `password` (hashed on load) or a ready `passwordHash`. Lookups
//! are keyed by role and normalized login id, so the same login id can exist
//! once per persona.

use crate::{role::Role, user::UserRecord};
use anyhow::{Context, Result, anyhow, bail};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use rand::rngs::OsRng;
use regex::Regex;
use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path};
use tracing::debug;
use uuid::Uuid;

const DUMMY_PASSWORD: &str = "staffdesk-dummy-password";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedUser {
    #[serde(default)]
    id: Option<String>,
    login_id: String,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    password_hash: Option<String>,
    role: Role,
    #[serde(default)]
    permissions: Vec<String>,
    #[serde(default)]
    name: Option<String>,
}

struct StoredUser {
    record: UserRecord,
    password_hash: String,
}

pub struct UserDirectory {
    users: HashMap<String, StoredUser>,
    logins: HashMap<(Role, String), String>,
    dummy_hash: String,
}

impl std::fmt::Debug for UserDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserDirectory")
            .field("users", &self.users.len())
            .finish_non_exhaustive()
    }
}

/// Trim and lowercase a login id for lookups.
#[must_use]
pub fn normalize_login_id(login_id: &str) -> String {
    login_id.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
#[must_use]
pub fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| anyhow!("failed to hash password"))
}

fn verify_password(password: &[u8], stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .is_ok_and(|parsed| Argon2::default().verify_password(password, &parsed).is_ok())
}

impl UserDirectory {
    /// Create an empty directory.
    ///
    /// # Errors
    /// Returns an error if the timing-equalization hash cannot be computed.
    pub fn new() -> Result<Self> {
        Ok(Self {
            users: HashMap::new(),
            logins: HashMap::new(),
            dummy_hash: hash_password(DUMMY_PASSWORD)?,
        })
    }

    /// Load the seed file at `path`.
    ///
    /// # Errors
    /// Returns an error if the file is unreadable or its contents are invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read users file: {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("Invalid users file: {}", path.display()))
    }

    /// # Errors
    /// Returns an error for invalid JSON, missing credentials, or duplicates.
    pub fn from_json(json: &str) -> Result<Self> {
        let seeds: Vec<SeedUser> = serde_json::from_str(json).context("Invalid users JSON")?;
        let mut directory = Self::new()?;

        for seed in seeds {
            let id = seed
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string());
            let login_id = normalize_login_id(&seed.login_id);

            let password_hash = match (seed.password_hash, seed.password) {
                (Some(hash), _) => {
                    PasswordHash::new(&hash)
                        .map_err(|_| anyhow!("Invalid password hash for {login_id}"))?;
                    hash
                }
                (None, Some(password)) => hash_password(&password)?,
                (None, None) => bail!("User {login_id} has neither password nor passwordHash"),
            };

            let mut record = UserRecord::new(id, seed.role)
                .with_login_id(login_id)
                .with_permissions(seed.permissions);
            record.name = seed.name;

            directory.insert_hashed(record, password_hash)?;
        }

        debug!(users = directory.len(), "user directory loaded");

        Ok(directory)
    }

    /// Add a user with a plaintext password.
    ///
    /// # Errors
    /// Returns an error on duplicate ids/login ids or hashing failure.
    pub fn insert(&mut self, record: UserRecord, password: &str) -> Result<()> {
        let hash = hash_password(password)?;
        self.insert_hashed(record, hash)
    }

    fn insert_hashed(&mut self, mut record: UserRecord, password_hash: String) -> Result<()> {
        let login_id = normalize_login_id(record.login_id.as_deref().unwrap_or_default());
        if login_id.is_empty() {
            bail!("User {} has no login id", record.id);
        }
        if record.role == Role::Staff && !valid_email(&login_id) {
            bail!("Staff login id must be an email: {login_id}");
        }
        if self.users.contains_key(&record.id) {
            bail!("Duplicate user id: {}", record.id);
        }
        let key = (record.role, login_id.clone());
        if self.logins.contains_key(&key) {
            bail!("Duplicate {} login id: {login_id}", record.role);
        }

        record.login_id = Some(login_id);
        self.logins.insert(key, record.id.clone());
        self.users.insert(
            record.id.clone(),
            StoredUser {
                record,
                password_hash,
            },
        );
        Ok(())
    }

    /// Check a password for a persona; `None` covers unknown users and bad
    /// passwords alike.
    #[must_use]
    pub fn authenticate(&self, role: Role, login_id: &str, password: &str) -> Option<UserRecord> {
        let key = (role, normalize_login_id(login_id));
        let Some(user) = self.logins.get(&key).and_then(|id| self.users.get(id)) else {
            // keep the miss path as slow as the hit path
            let _ = verify_password(password.as_bytes(), &self.dummy_hash);
            return None;
        };

        verify_password(password.as_bytes(), &user.password_hash).then(|| user.record.clone())
    }

    #[must_use]
    pub fn find(&self, id: &str) -> Option<&UserRecord> {
        self.users.get(id).map(|user| &user.record)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SEED: &str = r#"[
        {"id": "u1", "loginId": "Admin1", "password": "secret", "role": "admin",
         "permissions": ["tasks:write"], "name": "Root"},
        {"id": "u2", "loginId": "jane@example.com", "password": "hunter2", "role": "staff"}
    ]"#;

    #[test]
    fn authenticates_by_persona_and_normalized_login() -> Result<()> {
        let directory = UserDirectory::from_json(SEED)?;
        assert_eq!(directory.len(), 2);

        let admin = directory
            .authenticate(Role::Admin, " admin1 ", "secret")
            .context("admin should authenticate")?;
        assert_eq!(admin.id, "u1");
        assert_eq!(admin.login_id.as_deref(), Some("admin1"));
        assert_eq!(admin.permissions, vec!["tasks:write"]);
        assert_eq!(admin.name.as_deref(), Some("Root"));

        assert!(directory.authenticate(Role::Admin, "admin1", "wrong").is_none());
        assert!(directory.authenticate(Role::Staff, "admin1", "secret").is_none());
        assert!(directory.authenticate(Role::Staff, "nobody@example.com", "x").is_none());
        assert!(
            directory
                .authenticate(Role::Staff, "JANE@example.com", "hunter2")
                .is_some()
        );
        Ok(())
    }

    #[test]
    fn accepts_precomputed_hashes() -> Result<()> {
        let hash = hash_password("pw")?;
        let json = format!(
            r#"[{{"id": "u9", "loginId": "ops", "passwordHash": "{hash}", "role": "admin"}}]"#
        );
        let directory = UserDirectory::from_json(&json)?;
        assert!(directory.authenticate(Role::Admin, "ops", "pw").is_some());
        assert_eq!(directory.find("u9").map(|user| user.role), Some(Role::Admin));
        Ok(())
    }

    #[test]
    fn rejects_invalid_seeds() {
        let cases = [
            r#"[{"loginId": "a", "role": "admin"}]"#,
            r#"[{"loginId": "a", "passwordHash": "nope", "role": "admin"}]"#,
            r#"[{"loginId": "not-an-email", "password": "x", "role": "staff"}]"#,
            r#"[{"id": "1", "loginId": "a", "password": "x", "role": "admin"},
                {"id": "1", "loginId": "b", "password": "x", "role": "admin"}]"#,
            r#"[{"loginId": "a", "password": "x", "role": "admin"},
                {"loginId": "A", "password": "y", "role": "admin"}]"#,
            r#"[{"loginId": "a", "password": "x", "role": "owner"}]"#,
        ];
        for json in cases {
            assert!(UserDirectory::from_json(json).is_err(), "{json}");
        }
    }

    #[test]
    fn generates_ids_when_missing() -> Result<()> {
        let directory =
            UserDirectory::from_json(r#"[{"loginId": "a", "password": "x", "role": "admin"}]"#)?;
        let user = directory
            .authenticate(Role::Admin, "a", "x")
            .context("user should authenticate")?;
        assert!(Uuid::parse_str(&user.id).is_ok());
        Ok(())
    }

    #[test]
    fn loads_from_file() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(SEED.as_bytes())?;
        let directory = UserDirectory::load(file.path())?;
        assert_eq!(directory.len(), 2);
        assert!(UserDirectory::load("/nonexistent/users.json").is_err());
        Ok(())
    }

    #[test]
    fn email_validation() {
        assert!(valid_email("a@example.com"));
        assert!(!valid_email("missing-at.example.com"));
        assert!(!valid_email("missing-domain@"));
    }
}
