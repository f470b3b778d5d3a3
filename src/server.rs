//! Connection targets.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Where to open the byte stream.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Endpoint {
    Tcp { host: String, port: u16 },
    /// A local (Unix domain) socket.
    Unix { path: PathBuf },
}

/// TLS settings for one server.
#[derive(Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TlsOptions {
    /// A complete rustls configuration, used as-is when present.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub config: Option<Arc<tokio_rustls::rustls::ClientConfig>>,
    /// PEM file holding a client certificate chain followed by its key.
    pub certpath: Option<PathBuf>,
    /// Name to verify and send as SNI instead of the endpoint host.
    pub server_name: Option<String>,
}

impl fmt::Debug for TlsOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsOptions")
            .field("config", &self.config.as_ref().map(|_| ".."))
            .field("certpath", &self.certpath)
            .field("server_name", &self.server_name)
            .finish()
    }
}

/// An immutable connection target.
///
/// ```
/// use slirc_engine::ServerDescriptor;
///
/// let server = ServerDescriptor::tcp("irc.libera.chat", 6697).with_tls();
/// assert_eq!(server.to_string(), "irc.libera.chat:+6697");
/// ```
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServerDescriptor {
    endpoint: Endpoint,
    tls: Option<TlsOptions>,
    password: Option<String>,
}

impl ServerDescriptor {
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::from_endpoint(Endpoint::Tcp {
            host: host.into(),
            port,
        })
    }

    pub fn unix(path: impl Into<PathBuf>) -> Self {
        Self::from_endpoint(Endpoint::Unix { path: path.into() })
    }

    fn from_endpoint(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            tls: None,
            password: None,
        }
    }

    /// Enable TLS with default verification against the webpki roots.
    #[must_use]
    pub fn with_tls(self) -> Self {
        self.with_tls_options(TlsOptions::default())
    }

    #[must_use]
    pub fn with_tls_options(mut self, options: TlsOptions) -> Self {
        self.tls = Some(options);
        self
    }

    /// Send `PASS <password>` during the handshake.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn tls(&self) -> Option<&TlsOptions> {
        self.tls.as_ref()
    }

    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Host name used to verify the server certificate.
    pub fn tls_server_name(&self) -> Option<&str> {
        let options = self.tls.as_ref()?;
        match (&options.server_name, &self.endpoint) {
            (Some(name), _) => Some(name),
            (None, Endpoint::Tcp { host, .. }) => Some(host),
            (None, Endpoint::Unix { .. }) => None,
        }
    }
}

impl fmt::Display for ServerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.endpoint {
            Endpoint::Tcp { host, port } => {
                let sep = if self.is_tls() { "+" } else { "" };
                write!(f, "{}:{}{}", host, sep, port)
            }
            Endpoint::Unix { path } => {
                write!(f, "{}", path.display())?;
                if self.is_tls() {
                    f.write_str(" (tls)")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            ServerDescriptor::tcp("irc.example.com", 6667).to_string(),
            "irc.example.com:6667"
        );
        assert_eq!(
            ServerDescriptor::tcp("irc.example.com", 6697).with_tls().to_string(),
            "irc.example.com:+6697"
        );
        assert_eq!(ServerDescriptor::unix("/run/ircd.sock").to_string(), "/run/ircd.sock");
        assert_eq!(
            ServerDescriptor::unix("/run/ircd.sock").with_tls().to_string(),
            "/run/ircd.sock (tls)"
        );
    }

    #[test]
    fn test_tls_server_name() {
        let plain = ServerDescriptor::tcp("irc.example.com", 6667);
        assert_eq!(plain.tls_server_name(), None);

        let tls = plain.clone().with_tls();
        assert_eq!(tls.tls_server_name(), Some("irc.example.com"));

        let overridden = plain.with_tls_options(TlsOptions {
            server_name: Some("irc.example.net".into()),
            ..TlsOptions::default()
        });
        assert_eq!(overridden.tls_server_name(), Some("irc.example.net"));

        let unix = ServerDescriptor::unix("/tmp/irc").with_tls();
        assert_eq!(unix.tls_server_name(), None);
    }

    #[test]
    fn test_password() {
        let server = ServerDescriptor::tcp("localhost", 6667).with_password("hunter2");
        assert_eq!(server.password(), Some("hunter2"));
    }
}
