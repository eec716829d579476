//! Flat-file user database.
//!
//! One `user:secret` entry per line. Blank lines and lines starting with
//! `#` are ignored. The secret is used both as the PASS password and as
//! the APOP shared secret.

use std::collections::HashMap;
use std::path::Path;

use md5::{Digest, Md5};

use crate::error::{Error, Result};

/// Known users and their secrets.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    users: HashMap<String, String>,
}

impl Credentials {
    /// Reads a credentials file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or an entry is invalid.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| Error::CredentialsFile {
                path: path.to_path_buf(),
                source,
            })?;
        let credentials = Self::parse(&contents)?;
        tracing::debug!(path = %path.display(), users = credentials.len(), "loaded credentials");
        Ok(credentials)
    }

    /// Parses credentials from text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Credentials`] for a line without a `:` separator, an
    /// unusable user name, or a user listed twice.
    pub fn parse(contents: &str) -> Result<Self> {
        let mut users = HashMap::new();

        for (index, raw) in contents.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let invalid = |reason: &str| Error::Credentials {
                line: index + 1,
                reason: reason.to_string(),
            };

            let (user, secret) = line
                .split_once(':')
                .ok_or_else(|| invalid("expected user:secret"))?;
            let user = user.trim();
            if !is_valid_user(user) {
                return Err(invalid("user name must be a plain, non-hidden path segment"));
            }
            if users.insert(user.to_string(), secret.to_string()).is_some() {
                return Err(invalid("duplicate user"));
            }
        }

        Ok(Self { users })
    }

    /// Adds or replaces a user.
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>, secret: impl Into<String>) -> Self {
        self.users.insert(user.into(), secret.into());
        self
    }

    /// Number of known users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Returns true if no users are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Returns true if the user exists.
    #[must_use]
    pub fn contains(&self, user: &str) -> bool {
        self.users.contains_key(user)
    }

    /// Checks a USER/PASS pair.
    #[must_use]
    pub fn verify_pass(&self, user: &str, password: &str) -> bool {
        self.users.get(user).is_some_and(|secret| secret == password)
    }

    /// Checks an APOP digest against `md5(banner + secret)`.
    ///
    /// The digest comparison ignores case.
    #[must_use]
    pub fn verify_apop(&self, user: &str, banner: &str, digest: &str) -> bool {
        self.users
            .get(user)
            .is_some_and(|secret| apop_digest(banner, secret).eq_ignore_ascii_case(digest))
    }
}

/// Computes the APOP digest: lowercase hex MD5 of the banner followed by
/// the shared secret (RFC 1939 section 7).
#[must_use]
pub fn apop_digest(banner: &str, secret: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(banner.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// User names double as directory names.
fn is_valid_user(user: &str) -> bool {
    !user.is_empty()
        && !user.starts_with('.')
        && !user.contains(['/', '\\'])
        && !user.chars().any(char::is_whitespace)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let creds = Credentials::parse("# users\n\nalice:secret\n  bob:hunter2  \n").unwrap();
        assert_eq!(creds.len(), 2);
        assert!(creds.verify_pass("alice", "secret"));
        assert!(creds.verify_pass("bob", "hunter2"));
    }

    #[test]
    fn test_secret_may_contain_colons_and_spaces() {
        let creds = Credentials::parse("alice:a b:c\n").unwrap();
        assert!(creds.verify_pass("alice", "a b:c"));
    }

    #[test]
    fn test_wrong_password_or_user() {
        let creds = Credentials::parse("alice:secret").unwrap();
        assert!(!creds.verify_pass("alice", "Secret"));
        assert!(!creds.verify_pass("mallory", "secret"));
    }

    #[test]
    fn test_missing_separator() {
        let err = Credentials::parse("alice:x\nbroken\n").unwrap_err();
        assert!(matches!(err, Error::Credentials { line: 2, .. }));
    }

    #[test]
    fn test_unsafe_user_names_rejected() {
        assert!(Credentials::parse("../etc:x").is_err());
        assert!(Credentials::parse(".hidden:x").is_err());
        assert!(Credentials::parse(":x").is_err());
        assert!(Credentials::parse("a/b:x").is_err());
    }

    #[test]
    fn test_duplicate_user_rejected() {
        assert!(Credentials::parse("alice:x\nalice:y").is_err());
    }

    #[test]
    fn test_rfc1939_apop_example() {
        let banner = "<1896.697170952@dbc.mtview.ca.us>";
        assert_eq!(
            apop_digest(banner, "tanstaaf"),
            "c4c9334bac560ecc979e58001b3e22fb"
        );

        let creds = Credentials::default().with_user("mrose", "tanstaaf");
        assert!(creds.verify_apop("mrose", banner, "c4c9334bac560ecc979e58001b3e22fb"));
        assert!(creds.verify_apop("mrose", banner, "C4C9334BAC560ECC979E58001B3E22FB"));
        assert!(!creds.verify_apop("mrose", "<other@host>", "c4c9334bac560ecc979e58001b3e22fb"));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users");
        tokio::fs::write(&path, "alice:secret\n").await.unwrap();
        let creds = Credentials::load(&path).await.unwrap();
        assert!(creds.contains("alice"));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Credentials::load(dir.path().join("nope")).await.unwrap_err();
        assert!(matches!(err, Error::CredentialsFile { .. }));
    }
}
