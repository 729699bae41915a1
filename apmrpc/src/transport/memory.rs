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

//! In-memory transport implementation for testing.
//!
//! A [`MemoryTransport`] pair behaves like a connected socket pair without
//! touching the network, which lets the collector loop and client channel be
//! exercised deterministically in tests.

use crate::transport::{ShutdownFuture, Transport, TransportId, TransportMetadata};
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tracing::debug;

const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// In-memory transport backed by a tokio duplex pipe.
///
/// # Examples
///
/// ```rust
/// use apmrpc::transport::{MemoryTransport, Transport};
/// use tokio::io::{AsyncReadExt, AsyncWriteExt};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (mut agent, mut collector) = MemoryTransport::pair_default();
///
/// agent.write_all(b"hello").await?;
/// let mut buf = [0u8; 5];
/// collector.read_exact(&mut buf).await?;
/// assert_eq!(&buf, b"hello");
/// # Ok(())
/// # }
/// ```
pub struct MemoryTransport {
    stream: DuplexStream,
    metadata: TransportMetadata,
}

impl MemoryTransport {
    /// Creates a connected pair with `buffer_size` bytes of buffering per direction.
    pub fn pair(buffer_size: usize) -> (Self, Self) {
        let (a, b) = tokio::io::duplex(buffer_size);
        let first = Self {
            stream: a,
            metadata: TransportMetadata::new(TransportId::next(), "memory"),
        };
        let second = Self {
            stream: b,
            metadata: TransportMetadata::new(TransportId::next(), "memory"),
        };

        debug!(
            first = %first.metadata.id,
            second = %second.metadata.id,
            "created memory transport pair"
        );
        (first, second)
    }

    /// Creates a connected pair with the default buffer size.
    pub fn pair_default() -> (Self, Self) {
        Self::pair(DEFAULT_BUFFER_SIZE)
    }
}

impl Transport for MemoryTransport {
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

impl AsyncRead for MemoryTransport {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for MemoryTransport {
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
