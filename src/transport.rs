use std::collections::BTreeMap;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use rustls::{ClientConfig, RootCertStore};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tracing::warn;

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Options handed to a connector: the target overlaid onto whatever
/// opaque extras the caller put in `SessionConfig::connect_options`.
/// The session builds its own copy; the caller's config is untouched.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    pub extra: BTreeMap<String, String>,
}

impl ConnectOptions {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            host: config.server.clone(),
            port: config.port,
            extra: config.connect_options.clone(),
        }
    }

    /// `connect_timeout_ms` extra, or 30 seconds.
    pub fn connect_timeout(&self) -> Duration {
        self.extra
            .get("connect_timeout_ms")
            .and_then(|value| value.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT)
    }
}

/// The injected transport seam. The session owns the stream a
/// connector produces for the lifetime of the connection; anything
/// that reads and writes bytes qualifies — plain TCP, a finished TLS
/// stream, or an in-memory pipe in tests.
pub trait Connector: Send + 'static {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    fn connect(
        &mut self,
        options: &ConnectOptions,
    ) -> impl Future<Output = Result<Self::Stream>> + Send;
}

/// Plaintext TCP with Nagle disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&mut self, options: &ConnectOptions) -> Result<TcpStream> {
        let stream = tokio::time::timeout(
            options.connect_timeout(),
            TcpStream::connect((options.host.as_str(), options.port)),
        )
        .await
        .map_err(|_| {
            SessionError::Io(io::Error::new(io::ErrorKind::TimedOut, "connect timeout"))
        })??;

        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

/// TLS over TCP using the platform-independent webpki root set.
#[derive(Debug, Clone, Copy)]
pub struct TlsConnector {
    verify_certificates: bool,
}

impl TlsConnector {
    pub fn new() -> Self {
        Self {
            verify_certificates: true,
        }
    }

    /// Accept any server certificate. Only for servers with
    /// self-signed certificates that the operator explicitly trusts.
    pub fn dangerously_without_verification() -> Self {
        Self {
            verify_certificates: false,
        }
    }
}

impl Default for TlsConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for TlsConnector {
    type Stream = TlsStream<TcpStream>;

    async fn connect(&mut self, options: &ConnectOptions) -> Result<Self::Stream> {
        let tcp = TcpConnector.connect(options).await?;

        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let mut config = ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();

        if !self.verify_certificates {
            warn!("certificate verification disabled - this is insecure!");
            config
                .dangerous()
                .set_certificate_verifier(Arc::new(NoCertificateVerification));
        }

        let server_name = rustls::pki_types::ServerName::try_from(options.host.clone())
            .map_err(|err| SessionError::Tls(format!("invalid server name: {}", err)))?;

        let connector = tokio_rustls::TlsConnector::from(Arc::new(config));
        connector
            .connect(server_name, tcp)
            .await
            .map_err(|err| SessionError::Tls(format!("TLS handshake failed: {}", err)))
    }
}

#[derive(Debug)]
struct NoCertificateVerification;

impl rustls::client::danger::ServerCertVerifier for NoCertificateVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP521_SHA512,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
            rustls::SignatureScheme::ED25519,
        ]
    }
}
