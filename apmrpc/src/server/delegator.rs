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

//! Listener decoration that attaches transport identity to every event.

use crate::client::Metadata;
use crate::server::{ServerListener, ServerTransport, ServerTransportListener};
use crate::transport::TransportId;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Wraps a [`ServerListener`] before the server starts using it.
pub trait ServerListenerDelegator: Send + Sync {
    /// Returns the listener the server should use in place of `listener`.
    fn wrap_server_listener(&self, listener: Arc<dyn ServerListener>) -> Arc<dyn ServerListener>;
}

/// Decorates every per-transport listener with the transport's identity.
///
/// Arguments and return values pass through untouched and failures inside
/// the wrapped listener propagate unchanged. The only addition is the
/// `transport_id` field on the decorator's log events and
/// [`ServerTransportListener::log_id`].
///
/// # Examples
///
/// ```rust
/// use apmrpc::server::{
///     LogIdServerListenerDelegator, LoggingServerListener, ServerListener,
///     ServerListenerDelegator, ServerTransport,
/// };
/// use apmrpc::transport::{TransportId, TransportMetadata};
/// use std::sync::Arc;
///
/// let listener = LogIdServerListenerDelegator.wrap_server_listener(Arc::new(LoggingServerListener::default()));
///
/// let id = TransportId::next();
/// let per_transport = listener.transport_created(&ServerTransport::new(TransportMetadata::new(id, "tcp")));
/// assert_eq!(per_transport.log_id(), Some(id));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LogIdServerListenerDelegator;

impl ServerListenerDelegator for LogIdServerListenerDelegator {
    fn wrap_server_listener(&self, listener: Arc<dyn ServerListener>) -> Arc<dyn ServerListener> {
        info!(server_listener = ?listener, "wrap ServerListener");
        Arc::new(LogIdServerListener { delegate: listener })
    }
}

#[derive(Debug)]
struct LogIdServerListener {
    delegate: Arc<dyn ServerListener>,
}

impl ServerListener for LogIdServerListener {
    fn transport_created(&self, transport: &ServerTransport) -> Arc<dyn ServerTransportListener> {
        let log_id = transport.id();
        debug!(transport_id = %log_id, metadata = ?transport.metadata(), "transport created");

        let listener = self.delegate.transport_created(transport);
        Arc::new(LogIdAttachListener::new(listener, log_id))
    }

    fn server_shutdown(&self) {
        self.delegate.server_shutdown();
    }
}

/// A per-transport listener carrying the transport's identity.
pub struct LogIdAttachListener {
    delegate: Arc<dyn ServerTransportListener>,
    log_id: TransportId,
}

impl LogIdAttachListener {
    /// Attaches `log_id` to `delegate`.
    pub fn new(delegate: Arc<dyn ServerTransportListener>, log_id: TransportId) -> Self {
        Self { delegate, log_id }
    }

    /// The attached identity.
    pub fn log_id(&self) -> TransportId {
        self.log_id
    }

    /// The wrapped listener.
    pub fn delegate(&self) -> &Arc<dyn ServerTransportListener> {
        &self.delegate
    }
}

impl ServerTransportListener for LogIdAttachListener {
    fn transport_ready(&self, attributes: Metadata) -> Metadata {
        trace!(transport_id = %self.log_id, "transport ready");
        self.delegate.transport_ready(attributes)
    }

    fn stream_created(&self, method: &str, headers: &Metadata) {
        trace!(transport_id = %self.log_id, method, "stream created");
        self.delegate.stream_created(method, headers);
    }

    fn transport_terminated(&self) {
        trace!(transport_id = %self.log_id, "transport terminated");
        self.delegate.transport_terminated();
    }

    fn log_id(&self) -> Option<TransportId> {
        Some(self.log_id)
    }
}

impl fmt::Debug for LogIdAttachListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogIdAttachListener")
            .field("log_id", &self.log_id)
            .finish_non_exhaustive()
    }
}
