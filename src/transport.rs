//! Byte stream establishment.
//!
//! The connection core only needs an async byte stream per
//! [`ServerDescriptor`]; how it is opened is behind [`Connector`].
//! [`NetConnector`] covers TCP, TLS and Unix sockets.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::rustls::pki_types::pem::PemObject;
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName};
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

use crate::server::{Endpoint, ServerDescriptor, TlsOptions};

/// A bidirectional byte stream.
pub trait AsyncStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> AsyncStream for T {}

pub type BoxedStream = Box<dyn AsyncStream>;

/// Opens byte streams to servers.
pub trait Connector: Send + Sync + 'static {
    fn connect<'a>(
        &'a self,
        server: &'a ServerDescriptor,
    ) -> BoxFuture<'a, io::Result<BoxedStream>>;
}

/// Connects over the network using tokio and tokio-rustls.
#[derive(Clone, Debug, Default)]
pub struct NetConnector {
    certpath: Option<PathBuf>,
}

impl NetConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Present the client certificate in this PEM file on TLS servers that
    /// do not set their own.
    #[must_use]
    pub fn with_certpath(mut self, certpath: Option<PathBuf>) -> Self {
        self.certpath = certpath;
        self
    }

    fn tls_config(&self, options: &TlsOptions) -> io::Result<Arc<ClientConfig>> {
        if let Some(config) = &options.config {
            return Ok(Arc::clone(config));
        }

        let roots = RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let builder = ClientConfig::builder().with_root_certificates(roots);
        let config = match options.certpath.as_deref().or(self.certpath.as_deref()) {
            Some(path) => {
                let (certs, key) = load_client_cert(path)?;
                builder
                    .with_client_auth_cert(certs, key)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?
            }
            None => builder.with_no_client_auth(),
        };
        Ok(Arc::new(config))
    }

    async fn start_tls<S>(
        &self,
        server: &ServerDescriptor,
        options: &TlsOptions,
        stream: S,
    ) -> io::Result<BoxedStream>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let name = server.tls_server_name().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "tls over a local socket needs a server name",
            )
        })?;
        let name = ServerName::try_from(name.to_owned())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let connector = TlsConnector::from(self.tls_config(options)?);
        let stream = connector.connect(name, stream).await?;
        debug!(%server, "tls established");
        Ok(Box::new(stream))
    }

    async fn open(&self, server: &ServerDescriptor) -> io::Result<BoxedStream> {
        match server.endpoint() {
            Endpoint::Tcp { host, port } => {
                let stream = TcpStream::connect((host.as_str(), *port)).await?;
                if let Err(e) = enable_keepalive(&stream) {
                    warn!("failed to enable TCP keepalive: {}", e);
                }
                match server.tls() {
                    Some(options) => self.start_tls(server, options, stream).await,
                    None => Ok(Box::new(stream)),
                }
            }
            #[cfg(unix)]
            Endpoint::Unix { path } => {
                let stream = tokio::net::UnixStream::connect(path).await?;
                match server.tls() {
                    Some(options) => self.start_tls(server, options, stream).await,
                    None => Ok(Box::new(stream)),
                }
            }
            #[cfg(not(unix))]
            Endpoint::Unix { .. } => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "unix sockets are not supported on this platform",
            )),
        }
    }
}

impl Connector for NetConnector {
    fn connect<'a>(
        &'a self,
        server: &'a ServerDescriptor,
    ) -> BoxFuture<'a, io::Result<BoxedStream>> {
        Box::pin(self.open(server))
    }
}

fn enable_keepalive(stream: &TcpStream) -> io::Result<()> {
    use socket2::{SockRef, TcpKeepalive};

    let sock = SockRef::from(stream);
    let keepalive = TcpKeepalive::new()
        .with_time(Duration::from_secs(120))
        .with_interval(Duration::from_secs(30));

    sock.set_tcp_keepalive(&keepalive)
}

/// Read a certificate chain and private key from one PEM file.
fn load_client_cert(
    path: &Path,
) -> io::Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>)> {
    let invalid = |e: tokio_rustls::rustls::pki_types::pem::Error| {
        io::Error::new(io::ErrorKind::InvalidData, format!("{}: {}", path.display(), e))
    };

    let certs = CertificateDer::pem_file_iter(path)
        .map_err(invalid)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(invalid)?;
    if certs.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{}: no certificates found", path.display()),
        ));
    }
    let key = PrivateKeyDer::from_pem_file(path).map_err(invalid)?;
    Ok((certs, key))
}
