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

use crate::transport::{TransportError, TransportMetadata};
use std::future::Future;
use std::pin::Pin;
use tokio::io::{AsyncRead, AsyncWrite};

/// Boxed future returned by [`Transport::shutdown`].
pub type ShutdownFuture<'a> = Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + 'a>>;

/// Core transport abstraction for bi-directional byte streams.
///
/// Both the agent-side [`ClientChannel`](crate::client::ClientChannel) and the
/// collector-side accept loop speak framed messages over a `Transport`, so
/// anything that can carry bytes in both directions (TCP, TLS over TCP, an
/// in-memory pipe) can sit underneath them.
///
/// # Examples
///
/// ```rust,no_run
/// use apmrpc::transport::{Transport, TcpTransport};
/// use tokio::io::AsyncWriteExt;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut transport = TcpTransport::connect("127.0.0.1:9991").await?;
/// println!("connected via {}", transport.metadata().transport_type);
///
/// transport.write_all(b"ping").await?;
/// Transport::shutdown(&mut transport).await?;
/// # Ok(())
/// # }
/// ```
pub trait Transport: AsyncRead + AsyncWrite + Send + Sync + Unpin + 'static {
    /// Returns metadata about this transport.
    fn metadata(&self) -> &TransportMetadata;

    /// Gracefully shuts down the transport.
    ///
    /// Pending writes are flushed and the write half is closed. The transport
    /// should not be used for further I/O afterwards.
    fn shutdown(&mut self) -> ShutdownFuture<'_>;
}
