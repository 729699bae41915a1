//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! TLS transport implementation.
//!
//! Wraps any [`Transport`] with `tokio-rustls`. Agents trust the collector
//! through a PEM trust bundle (see [`SslConfig`](crate::client::SslConfig))
//! or the platform's native roots; the collector presents a PEM certificate
//! chain and private key.
//!
//! # Examples
//!
//! ```rust,no_run
//! use apmrpc::transport::{TcpTransport, TlsConfig, TlsTransport};
//!
//! # async fn example(trust_pem: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
//! let tcp = TcpTransport::connect("collector.example.com:9443").await?;
//! let config = TlsConfig::client_with_trust(trust_pem, "collector.example.com")?;
//! let tls = TlsTransport::connect(tcp, config).await?;
//! # Ok(())
//! # }
//! ```

use crate::transport::{ShutdownFuture, Transport, TransportError, TransportMetadata};
use rustls::pki_types::{CertificateDer, ServerName};
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_rustls::{TlsAcceptor, TlsConnector, TlsStream};
use tracing::debug;

/// TLS configuration for one side of a connection.
#[derive(Clone)]
pub enum TlsConfig {
    /// Client (agent) side.
    Client {
        /// The connector built from the trust store
        connector: TlsConnector,
        /// Name the collector certificate must be valid for
        server_name: ServerName<'static>,
    },
    /// Server (collector) side.
    Server {
        /// The acceptor built from the certificate chain and key
        acceptor: TlsAcceptor,
    },
}

impl TlsConfig {
    /// Builds a client configuration that trusts only the certificates in `trust_pem`.
    pub fn client_with_trust(trust_pem: &[u8], server_name: &str) -> Result<Self, TransportError> {
        let certs = parse_certificates(trust_pem)?;
        if certs.is_empty() {
            return Err(TransportError::Tls {
                reason: "trust bundle contains no certificates".to_string(),
            });
        }

        let mut roots = rustls::RootCertStore::empty();
        for cert in certs {
            roots.add(cert).map_err(tls_error)?;
        }
        Self::client_from_roots(roots, server_name)
    }

    /// Builds a client configuration that trusts the platform's root certificates.
    pub fn client_native_roots(server_name: &str) -> Result<Self, TransportError> {
        let mut roots = rustls::RootCertStore::empty();
        let native = rustls_native_certs::load_native_certs().map_err(|e| TransportError::Tls {
            reason: format!("failed to load native roots: {e}"),
        })?;
        let (added, ignored) = roots.add_parsable_certificates(native);
        debug!(added, ignored, "loaded native root certificates");
        Self::client_from_roots(roots, server_name)
    }

    fn client_from_roots(
        roots: rustls::RootCertStore,
        server_name: &str,
    ) -> Result<Self, TransportError> {
        let config = rustls::ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();

        let server_name =
            ServerName::try_from(server_name.to_string()).map_err(|e| TransportError::Tls {
                reason: format!("invalid server name {server_name:?}: {e}"),
            })?;

        Ok(Self::Client {
            connector: TlsConnector::from(Arc::new(config)),
            server_name,
        })
    }

    /// Builds a server configuration from a PEM certificate chain and private key.
    pub fn server_from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<Self, TransportError> {
        let certs = parse_certificates(cert_pem)?;
        let key = rustls_pemfile::private_key(&mut &key_pem[..])
            .map_err(|e| TransportError::Tls {
                reason: format!("unreadable private key: {e}"),
            })?
            .ok_or_else(|| TransportError::Tls {
                reason: "no private key found".to_string(),
            })?;

        let config = rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(tls_error)?;

        Ok(Self::Server {
            acceptor: TlsAcceptor::from(Arc::new(config)),
        })
    }
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Client { server_name, .. } => f
                .debug_struct("TlsConfig::Client")
                .field("server_name", server_name)
                .finish(),
            Self::Server { .. } => f.debug_struct("TlsConfig::Server").finish(),
        }
    }
}

fn parse_certificates(pem: &[u8]) -> Result<Vec<CertificateDer<'static>>, TransportError> {
    rustls_pemfile::certs(&mut &pem[..])
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TransportError::Tls {
            reason: format!("unreadable certificate: {e}"),
        })
}

fn tls_error(error: rustls::Error) -> TransportError {
    TransportError::Tls {
        reason: error.to_string(),
    }
}

/// A transport encrypted with TLS.
///
/// The wrapped transport's identity is kept, so a connection keeps one
/// [`TransportId`](crate::transport::TransportId) before and after the handshake.
pub struct TlsTransport<T> {
    stream: TlsStream<T>,
    metadata: TransportMetadata,
}

impl<T> TlsTransport<T>
where
    T: Transport,
{
    /// Performs the client side of the handshake over `transport`.
    pub async fn connect(transport: T, config: TlsConfig) -> Result<Self, TransportError> {
        let TlsConfig::Client {
            connector,
            server_name,
        } = config
        else {
            return Err(TransportError::InvalidConfiguration {
                reason: "expected client tls config, got server config".to_string(),
            });
        };

        let metadata = tls_metadata(transport.metadata());
        let stream = connector
            .connect(server_name, transport)
            .await
            .map_err(|e| TransportError::Tls {
                reason: format!("client handshake failed: {e}"),
            })?;

        debug!(transport_id = %metadata.id, "tls client handshake complete");
        Ok(Self {
            stream: TlsStream::Client(stream),
            metadata,
        })
    }

    /// Performs the server side of the handshake over `transport`.
    pub async fn accept(transport: T, config: TlsConfig) -> Result<Self, TransportError> {
        let TlsConfig::Server { acceptor } = config else {
            return Err(TransportError::InvalidConfiguration {
                reason: "expected server tls config, got client config".to_string(),
            });
        };

        let metadata = tls_metadata(transport.metadata());
        let stream = acceptor
            .accept(transport)
            .await
            .map_err(|e| TransportError::Tls {
                reason: format!("server handshake failed: {e}"),
            })?;

        debug!(transport_id = %metadata.id, "tls server handshake complete");
        Ok(Self {
            stream: TlsStream::Server(stream),
            metadata,
        })
    }
}

fn tls_metadata(base: &TransportMetadata) -> TransportMetadata {
    let mut metadata = TransportMetadata::new(base.id, "tls");
    metadata.local_addr = base.local_addr;
    metadata.peer_addr = base.peer_addr;
    metadata
}

impl<T> Transport for TlsTransport<T>
where
    T: Transport,
{
    fn metadata(&self) -> &TransportMetadata {
        &self.metadata
    }

    fn shutdown(&mut self) -> ShutdownFuture<'_> {
        Box::pin(async move {
            use tokio::io::AsyncWriteExt;

            self.stream.shutdown().await?;
            Ok(())
        })
    }
}

impl<T> AsyncRead for TlsTransport<T>
where
    T: Transport,
{
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl<T> AsyncWrite for TlsTransport<T>
where
    T: Transport,
{
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn self_signed() -> (String, String) {
        let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        (cert.serialize_pem().unwrap(), cert.serialize_private_key_pem())
    }

    #[test]
    fn test_empty_trust_bundle_is_rejected() {
        let result = TlsConfig::client_with_trust(b"", "localhost");
        assert!(matches!(result, Err(TransportError::Tls { .. })));
    }

    #[test]
    fn test_client_config_debug() {
        let (cert, _) = self_signed();
        let config = TlsConfig::client_with_trust(cert.as_bytes(), "localhost").unwrap();
        assert!(format!("{:?}", config).contains("TlsConfig::Client"));
    }

    #[tokio::test]
    async fn test_handshake_over_memory_transport() {
        let (cert, key) = self_signed();
        let client_config = TlsConfig::client_with_trust(cert.as_bytes(), "localhost").unwrap();
        let server_config = TlsConfig::server_from_pem(cert.as_bytes(), key.as_bytes()).unwrap();

        let (agent, collector) = MemoryTransport::pair_default();
        let agent_id = agent.metadata().id;

        let server = tokio::spawn(async move {
            let mut tls = TlsTransport::accept(collector, server_config).await.unwrap();
            let mut buf = [0u8; 4];
            tls.read_exact(&mut buf).await.unwrap();
            tls.write_all(&buf).await.unwrap();
            tls.flush().await.unwrap();
        });

        let mut tls = TlsTransport::connect(agent, client_config).await.unwrap();
        assert_eq!(tls.metadata().id, agent_id);
        assert_eq!(tls.metadata().transport_type, "tls");

        tls.write_all(b"ping").await.unwrap();
        tls.flush().await.unwrap();
        let mut buf = [0u8; 4];
        tls.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");

        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_with_server_config_is_rejected() {
        let (cert, key) = self_signed();
        let server_config = TlsConfig::server_from_pem(cert.as_bytes(), key.as_bytes()).unwrap();
        let (agent, _collector) = MemoryTransport::pair_default();

        let result = TlsTransport::connect(agent, server_config).await;
        assert!(matches!(
            result,
            Err(TransportError::InvalidConfiguration { .. })
        ));
    }
}
