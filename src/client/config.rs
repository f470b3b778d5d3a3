use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::sasl::{SaslCredentials, SaslMechanism};
use crate::server::ServerDescriptor;

/// Interval between liveness checks.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(30);
/// Lag above which the connection is dropped.
pub const DEFAULT_MAX_LAG: Duration = Duration::from_secs(60);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
/// Base of the reconnect backoff.
pub const DEFAULT_RECONNECT_BASE: Duration = Duration::from_secs(2);

/// Construction-time client settings.
///
/// ```
/// use slirc_engine::{ClientConfig, ServerDescriptor};
///
/// let config = ClientConfig::new("nick", vec![ServerDescriptor::tcp("irc.example.com", 6667)])
///     .with_sasl_plain("account", "secret");
/// assert_eq!(config.user(), "nick");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ClientConfig {
    /// Candidate servers, tried in order.
    pub servers: Vec<ServerDescriptor>,
    pub nick: String,
    /// Defaults to the nick.
    pub user: Option<String>,
    /// Defaults to the nick.
    pub realname: Option<String>,
    /// PEM client certificate presented on TLS connections.
    pub certpath: Option<PathBuf>,
    pub sasl_mechanism: Option<SaslMechanism>,
    pub sasl_credentials: Option<SaslCredentials>,
    pub ping_interval: Duration,
    pub max_lag: Duration,
    pub connect_timeout: Duration,
    pub reconnect_base: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            nick: String::new(),
            user: None,
            realname: None,
            certpath: None,
            sasl_mechanism: None,
            sasl_credentials: None,
            ping_interval: DEFAULT_PING_INTERVAL,
            max_lag: DEFAULT_MAX_LAG,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            reconnect_base: DEFAULT_RECONNECT_BASE,
        }
    }
}

impl ClientConfig {
    pub fn new(nick: impl Into<String>, servers: Vec<ServerDescriptor>) -> Self {
        Self {
            servers,
            nick: nick.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    #[must_use]
    pub fn with_realname(mut self, realname: impl Into<String>) -> Self {
        self.realname = Some(realname.into());
        self
    }

    #[must_use]
    pub fn with_certpath(mut self, certpath: impl Into<PathBuf>) -> Self {
        self.certpath = Some(certpath.into());
        self
    }

    /// Authenticate with SASL PLAIN.
    #[must_use]
    pub fn with_sasl_plain(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.sasl_mechanism = Some(SaslMechanism::Plain);
        self.sasl_credentials = Some(SaslCredentials::new(username, password));
        self
    }

    /// Authenticate with SASL EXTERNAL, using the TLS client certificate.
    #[must_use]
    pub fn with_sasl_external(mut self) -> Self {
        self.sasl_mechanism = Some(SaslMechanism::External);
        self
    }

    #[must_use]
    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    #[must_use]
    pub fn with_max_lag(mut self, max_lag: Duration) -> Self {
        self.max_lag = max_lag;
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_reconnect_base(mut self, base: Duration) -> Self {
        self.reconnect_base = base;
        self
    }

    pub fn user(&self) -> &str {
        self.user.as_deref().unwrap_or(&self.nick)
    }

    pub fn realname(&self) -> &str {
        self.realname.as_deref().unwrap_or(&self.nick)
    }

    /// Check the settings that would otherwise only fail mid-connection.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.servers.is_empty() {
            return Err(ConfigError::NoServers);
        }
        if self.nick.is_empty() {
            return Err(ConfigError::EmptyNick);
        }
        match &self.sasl_mechanism {
            Some(SaslMechanism::Plain) if self.sasl_credentials.is_none() => {
                Err(ConfigError::MissingSaslCredentials)
            }
            Some(mechanism) if !mechanism.is_supported() => {
                Err(ConfigError::UnsupportedSaslMechanism(mechanism.to_string()))
            }
            _ => Ok(()),
        }
    }
}
