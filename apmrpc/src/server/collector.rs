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

//! Collector accept loop.
//!
//! One task per connection. Inside a connection, calls are read, handled and
//! answered strictly in arrival order; connections never wait on each other.

use crate::client::Metadata;
use crate::dispatch::{
    DispatchError, RequestEnvelope, RequestPayload, RequestResponseHandler, ResponseResult,
    ResponseSlot,
};
use crate::error::{panic_message, ApmError};
use crate::observability::{log_error, DispatchMetrics, ErrorMetrics, ErrorObserver, TransportMetrics};
use crate::serialization::framing::{
    read_frame, write_frame, CallFrame, ReplyFrame, FRAME_HEADER_SIZE, MAX_FRAME_SIZE,
};
use crate::serialization::{DeserializationError, SerializationError, Serializer};
use crate::server::{
    LoggingServerListener, REMOTE_ADDR, ServerListener, ServerListenerDelegator, ServerTransport,
    TRANSPORT_TYPE,
};
use crate::transport::{TcpTransport, Transport, TransportError};
use futures_util::FutureExt;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info, warn, warn_span};

#[cfg(feature = "tls")]
use crate::transport::{TlsConfig, TlsTransport};

/// Accepts agent connections and dispatches their calls.
///
/// Cloning is cheap; clones share the same listener, handler and shutdown
/// state.
///
/// # Examples
///
/// ```rust,no_run
/// use apmrpc::dispatch::{DispatchContext, HandlerRouter};
/// use apmrpc::serialization::PostcardSerializer;
/// use apmrpc::server::{CollectorServer, LogIdServerListenerDelegator};
/// use apmrpc::transport::TcpTransport;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let router = HandlerRouter::new(DispatchContext::default());
/// let server = CollectorServer::new(Arc::new(router), PostcardSerializer::new())
///     .with_delegator(&LogIdServerListenerDelegator);
///
/// let listener = TcpTransport::bind("0.0.0.0:9991").await?;
/// let running = server.clone();
/// tokio::spawn(async move { running.serve(listener).await });
///
/// // ... later
/// server.shutdown();
/// # Ok(())
/// # }
/// ```
pub struct CollectorServer<S> {
    inner: Arc<CollectorInner<S>>,
}

struct CollectorInner<S> {
    handler: Arc<dyn RequestResponseHandler>,
    serializer: S,
    listener: Arc<dyn ServerListener>,
    transport_metrics: Arc<TransportMetrics>,
    dispatch_metrics: Arc<DispatchMetrics>,
    errors: Arc<ErrorMetrics>,
    observer: ErrorObserver,
    max_frame_size: usize,
    #[cfg(feature = "tls")]
    tls: Option<TlsConfig>,
    stopped: AtomicBool,
    stop_signal: watch::Sender<bool>,
}

impl<S> Clone for CollectorServer<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: Serializer> CollectorServer<S> {
    /// Creates a server that hands every call to `handler` and decodes
    /// payloads with `serializer`.
    ///
    /// The server starts with a [`LoggingServerListener`] recording into
    /// [`transport_metrics`](Self::transport_metrics).
    pub fn new(handler: Arc<dyn RequestResponseHandler>, serializer: S) -> Self {
        let transport_metrics = Arc::new(TransportMetrics::new());
        let (stop_signal, _) = watch::channel(false);
        Self {
            inner: Arc::new(CollectorInner {
                handler,
                serializer,
                listener: Arc::new(LoggingServerListener::new(transport_metrics.clone())),
                transport_metrics,
                dispatch_metrics: Arc::new(DispatchMetrics::new()),
                errors: Arc::new(ErrorMetrics::new()),
                observer: ErrorObserver::new(),
                max_frame_size: MAX_FRAME_SIZE,
                #[cfg(feature = "tls")]
                tls: None,
                stopped: AtomicBool::new(false),
                stop_signal,
            }),
        }
    }

    fn configure(self, f: impl FnOnce(&mut CollectorInner<S>)) -> Self {
        match Arc::try_unwrap(self.inner) {
            Ok(mut inner) => {
                f(&mut inner);
                Self {
                    inner: Arc::new(inner),
                }
            }
            Err(inner) => {
                warn!("collector already shared, configuration change ignored");
                Self { inner }
            }
        }
    }

    /// Replaces the lifecycle listener.
    pub fn with_listener(self, listener: Arc<dyn ServerListener>) -> Self {
        self.configure(|inner| inner.listener = listener)
    }

    /// Wraps the current lifecycle listener with `delegator`.
    pub fn with_delegator(self, delegator: &dyn ServerListenerDelegator) -> Self {
        self.configure(|inner| {
            inner.listener = delegator.wrap_server_listener(inner.listener.clone());
        })
    }

    /// Shares `metrics` for counting undecodable payloads and handler panics.
    pub fn with_dispatch_metrics(self, metrics: Arc<DispatchMetrics>) -> Self {
        self.configure(|inner| inner.dispatch_metrics = metrics)
    }

    /// Shares `metrics` for counting the errors this server reports.
    pub fn with_error_metrics(self, metrics: Arc<ErrorMetrics>) -> Self {
        self.configure(|inner| inner.errors = metrics)
    }

    /// Notifies `observer` of every error this server reports.
    pub fn with_error_observer(self, observer: ErrorObserver) -> Self {
        self.configure(|inner| inner.observer = observer)
    }

    /// Caps inbound frames at `max_frame_size` bytes.
    pub fn with_max_frame_size(self, max_frame_size: usize) -> Self {
        self.configure(|inner| inner.max_frame_size = max_frame_size.min(MAX_FRAME_SIZE))
    }

    /// Serves TLS on every accepted TCP connection.
    #[cfg(feature = "tls")]
    pub fn with_tls(self, config: TlsConfig) -> Self {
        self.configure(|inner| inner.tls = Some(config))
    }

    /// Connection and frame counters.
    pub fn transport_metrics(&self) -> &Arc<TransportMetrics> {
        &self.inner.transport_metrics
    }

    /// Counters for undecodable payloads and handler panics caught here.
    pub fn dispatch_metrics(&self) -> &Arc<DispatchMetrics> {
        &self.inner.dispatch_metrics
    }

    /// Errors reported by this server, by layer.
    ///
    /// Covers failed accepts and handshakes, connections that end with an
    /// error, undecodable payloads and handler panics.
    pub fn error_metrics(&self) -> &Arc<ErrorMetrics> {
        &self.inner.errors
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) was called.
    pub fn is_shutdown(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }

    /// Accepts connections from `listener` until [`shutdown`](Self::shutdown).
    pub async fn serve(&self, listener: TcpListener) -> Result<(), TransportError> {
        let local_addr = listener.local_addr()?;
        info!(%local_addr, "collector listening");

        let stopped = wait_for_stop(self.inner.stop_signal.subscribe());
        tokio::pin!(stopped);

        loop {
            tokio::select! {
                biased;
                _ = &mut stopped => break,
                accepted = TcpTransport::accept(&listener) => match accepted {
                    Ok((transport, peer_addr)) => self.spawn_connection(transport, peer_addr),
                    Err(error) => {
                        self.inner.transport_metrics.record_connection_error();
                        warn_span!("accept", %local_addr).in_scope(|| self.report(error.into()));
                    }
                },
            }
        }

        info!(%local_addr, "collector stopped accepting");
        Ok(())
    }

    fn spawn_connection(&self, transport: TcpTransport, peer_addr: SocketAddr) {
        if let Err(error) = transport.set_nodelay(true) {
            debug!(%peer_addr, %error, "failed to set nodelay");
        }

        let server = self.clone();
        tokio::spawn(async move {
            if let Err(error) = server.accept_connection(transport).await {
                warn_span!("connection", %peer_addr).in_scope(|| server.report(error.into()));
            }
        });
    }

    #[cfg(feature = "tls")]
    async fn accept_connection(&self, transport: TcpTransport) -> Result<(), TransportError> {
        let Some(config) = self.inner.tls.clone() else {
            return self.serve_transport(transport).await;
        };
        match TlsTransport::accept(transport, config).await {
            Ok(tls) => self.serve_transport(tls).await,
            Err(error) => {
                self.inner.transport_metrics.record_connection_error();
                Err(error)
            }
        }
    }

    #[cfg(not(feature = "tls"))]
    async fn accept_connection(&self, transport: TcpTransport) -> Result<(), TransportError> {
        self.serve_transport(transport).await
    }

    /// Runs the call loop over one already-established transport.
    ///
    /// Returns when the peer closes the stream, the server shuts down, or the
    /// transport fails. The transport's listener sees `transport_terminated`
    /// in every case.
    pub async fn serve_transport<T: Transport>(&self, mut transport: T) -> Result<(), TransportError> {
        let server_transport = ServerTransport::new(transport.metadata().clone());
        let transport_id = server_transport.id();
        let listener = self.inner.listener.transport_created(&server_transport);

        let mut attributes = Metadata::new();
        if let Some(peer_addr) = server_transport.metadata().peer_addr {
            attributes.insert(REMOTE_ADDR, peer_addr.to_string());
        }
        attributes.insert(TRANSPORT_TYPE, server_transport.metadata().transport_type.clone());
        let attributes = listener.transport_ready(attributes);
        debug!(%transport_id, %attributes, "serving transport");

        let stopped = wait_for_stop(self.inner.stop_signal.subscribe());
        tokio::pin!(stopped);

        let result = loop {
            let bytes = tokio::select! {
                biased;
                _ = &mut stopped => break Ok(()),
                frame = read_frame(&mut transport, self.inner.max_frame_size) => match frame {
                    Ok(Some(bytes)) => bytes,
                    Ok(None) => break Ok(()),
                    Err(error) => {
                        self.inner.transport_metrics.record_read_error();
                        break Err(read_failure(error));
                    }
                },
            };
            self.inner
                .transport_metrics
                .record_frame_received((bytes.len() + FRAME_HEADER_SIZE) as u64);

            let call: CallFrame = match postcard::from_bytes(&bytes) {
                Ok(call) => call,
                Err(error) => {
                    break Err(TransportError::ConnectionLost {
                        reason: format!("malformed call frame: {error}"),
                    });
                }
            };

            listener.stream_created(&call.method, &call.headers);
            let call_id = call.call_id;
            let reply = self.handle_call(call).await;

            if let Err(error) = self.write_reply(&mut transport, call_id, reply).await {
                self.inner.transport_metrics.record_write_error();
                break Err(error);
            }
        };

        listener.transport_terminated();
        if let Err(error) = transport.shutdown().await {
            debug!(%transport_id, %error, "transport shutdown failed");
        }
        debug!(%transport_id, ok = result.is_ok(), "transport finished");
        result
    }

    async fn handle_call(&self, call: CallFrame) -> Option<ResponseResult> {
        let payload: RequestPayload = match self.inner.serializer.deserialize(&call.payload) {
            Ok(payload) => payload,
            Err(error) => {
                let error = DispatchError::Decode {
                    reason: error.to_string(),
                };
                self.inner.dispatch_metrics.record_undecodable();
                debug!(call_id = call.call_id, method = %call.method, "undecodable request");
                let result = ResponseResult::failure_from(&error);
                self.report(error.into());
                return Some(result);
            }
        };

        let envelope = RequestEnvelope {
            method: call.method,
            headers: call.headers,
            payload,
        };
        let mut slot = ResponseSlot::new();

        // Handlers that bypass `DispatchContext::respond` may still panic; the
        // connection task must survive to answer the rest of the stream.
        let handled = AssertUnwindSafe(self.inner.handler.handle_request(&envelope, &mut slot))
            .catch_unwind()
            .await;
        match handled {
            Ok(()) => slot.into_result(),
            Err(panic) => {
                let error = DispatchError::Panicked {
                    message: panic_message(panic.as_ref()),
                };
                self.inner.dispatch_metrics.record_failure(&error);
                debug!(
                    handler = self.inner.handler.name(),
                    method = %envelope.method,
                    "handler panicked outside its dispatch context"
                );
                let result = ResponseResult::failure_from(&error);
                self.report(error.into());
                Some(result)
            }
        }
    }

    fn report(&self, error: ApmError) {
        log_error(&error);
        self.inner.errors.record_error(&error);
        self.inner.observer.notify(&error);
    }

    async fn write_reply<T: Transport>(
        &self,
        transport: &mut T,
        call_id: u64,
        result: Option<ResponseResult>,
    ) -> Result<(), TransportError> {
        let payload = result
            .map(|result| self.inner.serializer.serialize(&result))
            .transpose()
            .map_err(write_failure)?;
        let bytes = postcard::to_allocvec(&ReplyFrame { call_id, payload })
            .map_err(|e| write_failure(SerializationError::from(e)))?;

        write_frame(transport, &bytes).await.map_err(write_failure)?;
        self.inner
            .transport_metrics
            .record_frame_sent((bytes.len() + FRAME_HEADER_SIZE) as u64);
        Ok(())
    }

    /// Stops accepting connections and ends every connection loop.
    ///
    /// The listener's `server_shutdown` runs on the first call only.
    pub fn shutdown(&self) {
        if self.inner.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.stop_signal.send_replace(true);
        self.inner.listener.server_shutdown();
        info!("collector shutdown");
    }
}

async fn wait_for_stop(mut signal: watch::Receiver<bool>) {
    while !*signal.borrow_and_update() {
        if signal.changed().await.is_err() {
            return;
        }
    }
}

fn read_failure(error: DeserializationError) -> TransportError {
    TransportError::ConnectionLost {
        reason: error.to_string(),
    }
}

fn write_failure(error: SerializationError) -> TransportError {
    TransportError::ConnectionLost {
        reason: error.to_string(),
    }
}

impl<S> std::fmt::Debug for CollectorServer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorServer")
            .field("listener", &self.inner.listener)
            .field("max_frame_size", &self.inner.max_frame_size)
            .field("stopped", &self.inner.stopped.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
