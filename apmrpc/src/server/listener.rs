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

//! Server lifecycle listeners.

use crate::client::Metadata;
use crate::observability::TransportMetrics;
use crate::transport::{TransportId, TransportMetadata};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Attribute key holding the peer address in [`ServerTransportListener::transport_ready`].
pub const REMOTE_ADDR: &str = "remote-addr";
/// Attribute key holding the transport kind.
pub const TRANSPORT_TYPE: &str = "transport-type";

/// A freshly accepted server-side connection, as shown to listeners.
#[derive(Debug, Clone)]
pub struct ServerTransport {
    metadata: TransportMetadata,
}

impl ServerTransport {
    /// Describes the transport identified by `metadata`.
    pub fn new(metadata: TransportMetadata) -> Self {
        Self { metadata }
    }

    /// The transport's process-unique identity.
    pub fn id(&self) -> TransportId {
        self.metadata.id
    }

    /// Full transport metadata.
    pub fn metadata(&self) -> &TransportMetadata {
        &self.metadata
    }
}

/// Observes the server's transport lifecycle.
pub trait ServerListener: Send + Sync + fmt::Debug {
    /// Called once per accepted transport. The returned listener receives
    /// that transport's later events.
    fn transport_created(&self, transport: &ServerTransport) -> Arc<dyn ServerTransportListener>;

    /// Called once when the server stops accepting.
    fn server_shutdown(&self);
}

/// Observes one transport.
pub trait ServerTransportListener: Send + Sync {
    /// The transport is ready for calls. Returns the attributes to keep,
    /// possibly amended.
    fn transport_ready(&self, attributes: Metadata) -> Metadata;

    /// A call for `method` arrived with `headers`.
    fn stream_created(&self, method: &str, headers: &Metadata);

    /// The transport closed.
    fn transport_terminated(&self);

    /// Identity attached by a decorating listener, if any.
    fn log_id(&self) -> Option<TransportId> {
        None
    }
}

/// Default listener: logs lifecycle events and counts connections.
#[derive(Debug, Clone, Default)]
pub struct LoggingServerListener {
    metrics: Arc<TransportMetrics>,
}

impl LoggingServerListener {
    /// Creates a listener recording into `metrics`.
    pub fn new(metrics: Arc<TransportMetrics>) -> Self {
        Self { metrics }
    }

    /// Connection counters.
    pub fn metrics(&self) -> &Arc<TransportMetrics> {
        &self.metrics
    }
}

impl ServerListener for LoggingServerListener {
    fn transport_created(&self, transport: &ServerTransport) -> Arc<dyn ServerTransportListener> {
        self.metrics.record_connection_opened();
        Arc::new(LoggingTransportListener {
            id: transport.id(),
            metrics: self.metrics.clone(),
        })
    }

    fn server_shutdown(&self) {
        info!(active = self.metrics.active_connections(), "server shutdown");
    }
}

struct LoggingTransportListener {
    id: TransportId,
    metrics: Arc<TransportMetrics>,
}

impl ServerTransportListener for LoggingTransportListener {
    fn transport_ready(&self, attributes: Metadata) -> Metadata {
        debug!(transport = %self.id, %attributes, "transport ready");
        attributes
    }

    fn stream_created(&self, method: &str, _headers: &Metadata) {
        trace!(transport = %self.id, method, "stream created");
    }

    fn transport_terminated(&self) {
        self.metrics.record_connection_closed();
        debug!(transport = %self.id, "transport terminated");
    }
}
