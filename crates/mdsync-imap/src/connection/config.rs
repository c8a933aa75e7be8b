//! Connection configuration types.

use std::time::Duration;

use super::stream::{ImapStream, connect_plain, connect_tls};
use crate::Result;

/// Default bound on establishing the TCP (and TLS) connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound on any single read from the server.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// No encryption (port 143).
    #[default]
    None,
    /// Start with plaintext, upgrade with STARTTLS (port 143).
    StartTls,
    /// TLS from the start (port 993).
    Implicit,
}

impl Security {
    /// Picks the mode from the two account switches.
    ///
    /// Implicit TLS wins when both are set.
    #[must_use]
    pub const fn from_flags(use_tls: bool, use_starttls: bool) -> Self {
        match (use_tls, use_starttls) {
            (true, _) => Self::Implicit,
            (false, true) => Self::StartTls,
            (false, false) => Self::None,
        }
    }

    /// Returns the default port for this security mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None | Self::StartTls => 143,
            Self::Implicit => 993,
        }
    }
}

/// IMAP connection configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Read timeout.
    pub io_timeout: Duration,
}

impl Config {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(host)
    }

    /// Opens the transport described by this configuration.
    ///
    /// For [`Security::StartTls`] the returned stream is still plaintext; the
    /// upgrade happens on the client once the greeting has been read.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or TLS handshake fails or does not
    /// finish within `connect_timeout`.
    pub async fn connect(&self) -> Result<ImapStream> {
        match self.security {
            Security::Implicit => connect_tls(&self.host, self.port, self.connect_timeout).await,
            Security::None | Security::StartTls => {
                connect_plain(&self.host, self.port, self.connect_timeout).await
            }
        }
    }
}

/// Builder for connection configuration.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    host: String,
    port: Option<u16>,
    security: Security,
    connect_timeout: Duration,
    io_timeout: Duration,
}

impl ConfigBuilder {
    /// Creates a new builder with the given hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            security: Security::None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    /// Sets the port. Zero means "the default for the security mode".
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = if port == 0 { None } else { Some(port) };
        self
    }

    /// Sets the security mode.
    #[must_use]
    pub const fn security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the read timeout.
    #[must_use]
    pub const fn io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        Config {
            host: self.host,
            port: self.port.unwrap_or_else(|| self.security.default_port()),
            security: self.security,
            connect_timeout: self.connect_timeout,
            io_timeout: self.io_timeout,
        }
    }
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
    fn test_default_ports() {
        assert_eq!(Security::None.default_port(), 143);
        assert_eq!(Security::StartTls.default_port(), 143);
        assert_eq!(Security::Implicit.default_port(), 993);
    }

    #[test]
    fn test_security_from_flags() {
        assert_eq!(Security::from_flags(false, false), Security::None);
        assert_eq!(Security::from_flags(false, true), Security::StartTls);
        assert_eq!(Security::from_flags(true, false), Security::Implicit);
        assert_eq!(Security::from_flags(true, true), Security::Implicit);
    }

    #[test]
    fn test_config_builder() {
        let config = Config::builder("imap.example.com")
            .port(1143)
            .security(Security::StartTls)
            .connect_timeout(Duration::from_secs(10))
            .build();

        assert_eq!(config.host, "imap.example.com");
        assert_eq!(config.port, 1143);
        assert_eq!(config.security, Security::StartTls);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.io_timeout, DEFAULT_IO_TIMEOUT);
    }

    #[test]
    fn test_zero_port_selects_default() {
        let config = Config::builder("imap.example.com")
            .security(Security::Implicit)
            .port(0)
            .build();
        assert_eq!(config.port, 993);

        let config = Config::builder("imap.example.com").build();
        assert_eq!(config.port, 143);
    }
}
