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

//! TCP transport implementation.
//!
//! Agents connect to the collector with [`TcpTransport::connect_timeout`];
//! the collector binds with [`TcpTransport::bind`] and accepts with
//! [`TcpTransport::accept`].

use crate::transport::{ShutdownFuture, Transport, TransportError, TransportId, TransportMetadata};
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, instrument, warn};

/// TCP-based transport implementation.
///
/// # Examples
///
/// ```rust,no_run
/// use apmrpc::transport::TcpTransport;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let addr = "127.0.0.1:9991".parse()?;
/// let transport = TcpTransport::connect_timeout(addr, Duration::from_secs(3)).await?;
/// # Ok(())
/// # }
/// ```
pub struct TcpTransport {
    stream: TcpStream,
    metadata: TransportMetadata,
}

impl TcpTransport {
    /// Wraps an already-connected stream, allocating a fresh transport ID.
    pub fn from_stream(stream: TcpStream) -> io::Result<Self> {
        let id = TransportId::next();
        let local_addr = stream.local_addr()?;
        let peer_addr = stream.peer_addr()?;

        debug!(transport_id = %id, %local_addr, %peer_addr, "created tcp transport");

        let metadata = TransportMetadata::new(id, "tcp")
            .with_local_addr(local_addr)
            .with_peer_addr(peer_addr);

        Ok(Self { stream, metadata })
    }

    /// Connects to a remote address given as `host:port`.
    #[instrument(skip(addr), fields(address))]
    pub async fn connect(addr: impl Into<String>) -> Result<Self, TransportError> {
        let address = addr.into();
        tracing::Span::current().record("address", address.as_str());

        let stream = TcpStream::connect(&address)
            .await
            .map_err(|source| TransportError::ConnectionFailed {
                address: address.clone(),
                source,
            })?;

        info!("tcp connection established");
        Ok(Self::from_stream(stream)?)
    }

    /// Connects to a resolved address, giving up after `timeout`.
    pub async fn connect_timeout(
        addr: SocketAddr,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let stream = match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                warn!(address = %addr, error = %source, "tcp connect failed");
                return Err(TransportError::ConnectionFailed {
                    address: addr.to_string(),
                    source,
                });
            }
            Err(_) => {
                warn!(address = %addr, ?timeout, "tcp connect timed out");
                return Err(TransportError::Timeout { duration: timeout });
            }
        };

        Ok(Self::from_stream(stream)?)
    }

    /// Binds a listener to `host:port`. Use port `0` for an ephemeral port.
    #[instrument(skip(addr), fields(address))]
    pub async fn bind(addr: impl Into<String>) -> Result<TcpListener, TransportError> {
        let address = addr.into();
        tracing::Span::current().record("address", address.as_str());

        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| TransportError::BindFailed {
                address: address.clone(),
                source,
            })?;

        info!("tcp listener bound");
        Ok(listener)
    }

    /// Accepts the next connection from `listener`.
    pub async fn accept(listener: &TcpListener) -> Result<(Self, SocketAddr), TransportError> {
        let (stream, peer_addr) = listener.accept().await?;
        let transport = Self::from_stream(stream)?;
        Ok((transport, peer_addr))
    }

    /// Enables or disables Nagle's algorithm.
    pub fn set_nodelay(&self, nodelay: bool) -> io::Result<()> {
        self.stream.set_nodelay(nodelay)
    }

    /// Returns the current `TCP_NODELAY` setting.
    pub fn nodelay(&self) -> io::Result<bool> {
        self.stream.nodelay()
    }
}

impl Transport for TcpTransport {
    fn metadata(&self) -> &TransportMetadata {
        &self.metadata
    }

    fn shutdown(&mut self) -> ShutdownFuture<'_> {
        Box::pin(async move {
            use tokio::io::AsyncWriteExt;

            debug!(transport_id = %self.metadata.id, "shutting down tcp transport");
            self.stream.shutdown().await?;
            Ok(())
        })
    }
}

impl AsyncRead for TcpTransport {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for TcpTransport {
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
