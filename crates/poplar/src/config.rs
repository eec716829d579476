//! Server configuration types.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::Capability;

/// Shortest inactivity timeout allowed by RFC 1939 section 3.
pub const MIN_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Default implementation name announced in CAPA.
pub const DEFAULT_IMPLEMENTATION: &str = "poplar";

/// Default message expiration policy announced in CAPA.
pub const DEFAULT_EXPIRE: &str = "NEVER";

/// POP3 server configuration shared by all sessions.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host name used in the APOP banner.
    pub hostname: String,
    /// Inactivity autologout timer.
    pub timeout: Duration,
    /// Implementation name announced in CAPA.
    pub implementation: String,
    /// Expiration policy announced in CAPA.
    pub expire: String,
    /// Whether APOP authentication is offered.
    pub apop: bool,
    capabilities: Vec<Capability>,
}

impl ServerConfig {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::new()
    }

    /// Returns the capability list sent in response to CAPA.
    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Generates a session-unique APOP banner (RFC 1939 section 7).
    ///
    /// The banner has the shape of a message id: `<pid.clock.nonce@host>`.
    #[must_use]
    pub fn banner(&self) -> String {
        format!(
            "<{}.{}.{}@{}>",
            std::process::id(),
            chrono::Utc::now().timestamp(),
            rand::random::<u32>(),
            self.hostname,
        )
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        let expire = DEFAULT_EXPIRE.to_string();
        let implementation = DEFAULT_IMPLEMENTATION.to_string();
        Self {
            hostname: "localhost".to_string(),
            timeout: MIN_TIMEOUT,
            capabilities: capabilities(&expire, &implementation),
            implementation,
            expire,
            apop: false,
        }
    }
}

fn capabilities(expire: &str, implementation: &str) -> Vec<Capability> {
    vec![
        Capability::Top,
        Capability::User,
        Capability::Pipelining,
        Capability::Expire(expire.to_string()),
        Capability::Uidl,
        Capability::Implementation(implementation.to_string()),
    ]
}

/// Builder for server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    hostname: String,
    timeout: Duration,
    implementation: Option<String>,
    expire: Option<String>,
    apop: bool,
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerConfigBuilder {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            hostname: "localhost".to_string(),
            timeout: MIN_TIMEOUT,
            implementation: None,
            expire: None,
            apop: false,
        }
    }

    /// Sets the host name used in the APOP banner.
    #[must_use]
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Sets the inactivity timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the implementation name announced in CAPA.
    #[must_use]
    pub fn implementation(mut self, implementation: impl Into<String>) -> Self {
        self.implementation = Some(implementation.into());
        self
    }

    /// Sets the expiration policy announced in CAPA.
    #[must_use]
    pub fn expire(mut self, expire: impl Into<String>) -> Self {
        self.expire = Some(expire.into());
        self
    }

    /// Enables or disables APOP.
    #[must_use]
    pub const fn apop(mut self, enabled: bool) -> Self {
        self.apop = enabled;
        self
    }

    /// Validates the settings and builds the configuration.
    ///
    /// Empty implementation or expire values fall back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the timeout is shorter than
    /// [`MIN_TIMEOUT`] or the host name is empty.
    pub fn build(self) -> Result<ServerConfig> {
        if self.timeout < MIN_TIMEOUT {
            return Err(Error::Config(format!(
                "inactivity timeout must be at least {} minutes",
                MIN_TIMEOUT.as_secs() / 60
            )));
        }
        if self.hostname.trim().is_empty() {
            return Err(Error::Config("hostname must not be empty".to_string()));
        }

        let expire = with_default(self.expire, DEFAULT_EXPIRE);
        let implementation = with_default(self.implementation, DEFAULT_IMPLEMENTATION);

        Ok(ServerConfig {
            hostname: self.hostname,
            timeout: self.timeout,
            capabilities: capabilities(&expire, &implementation),
            implementation,
            expire,
            apop: self.apop,
        })
    }
}

fn with_default(value: Option<String>, fallback: &str) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
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
    fn test_defaults() {
        let config = ServerConfig::builder().build().unwrap();
        assert_eq!(config.hostname, "localhost");
        assert_eq!(config.timeout, MIN_TIMEOUT);
        assert_eq!(config.implementation, "poplar");
        assert_eq!(config.expire, "NEVER");
        assert!(!config.apop);
    }

    #[test]
    fn test_builder_settings() {
        let config = ServerConfig::builder()
            .hostname("pop.example.com")
            .timeout(Duration::from_secs(900))
            .implementation("acme-pop")
            .expire("30")
            .apop(true)
            .build()
            .unwrap();
        assert_eq!(config.hostname, "pop.example.com");
        assert_eq!(config.timeout, Duration::from_secs(900));
        assert!(config.apop);
        assert!(
            config
                .capabilities()
                .contains(&Capability::Implementation("acme-pop".to_string()))
        );
        assert!(
            config
                .capabilities()
                .contains(&Capability::Expire("30".to_string()))
        );
    }

    #[test]
    fn test_short_timeout_rejected() {
        let err = ServerConfig::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_empty_hostname_rejected() {
        assert!(ServerConfig::builder().hostname("  ").build().is_err());
    }

    #[test]
    fn test_empty_values_fall_back() {
        let config = ServerConfig::builder()
            .implementation("")
            .expire("")
            .build()
            .unwrap();
        assert_eq!(config.implementation, "poplar");
        assert_eq!(config.expire, "NEVER");
    }

    #[test]
    fn test_capability_order() {
        let config = ServerConfig::default();
        let caps: Vec<String> = config.capabilities().iter().map(ToString::to_string).collect();
        assert_eq!(
            caps,
            vec![
                "TOP",
                "USER",
                "PIPELINING",
                "EXPIRE NEVER",
                "UIDL",
                "IMPLEMENTATION poplar"
            ]
        );
    }

    #[test]
    fn test_banners_are_unique() {
        let config = ServerConfig::builder()
            .hostname("pop.example.com")
            .build()
            .unwrap();
        let a = config.banner();
        let b = config.banner();
        assert!(a.starts_with('<'));
        assert!(a.ends_with("@pop.example.com>"));
        assert_ne!(a, b);
    }
}
