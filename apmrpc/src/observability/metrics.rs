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

//! Counters for the collector's transports and request dispatch.
//!
//! All counters are atomics, so recording never takes a lock. With the
//! `observability` feature each record is also forwarded to the `metrics`
//! crate facade.

use crate::dispatch::DispatchError;
use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for transport layer operations.
///
/// # Examples
///
/// ```rust
/// use apmrpc::observability::TransportMetrics;
///
/// let metrics = TransportMetrics::new();
/// metrics.record_connection_opened();
/// metrics.record_frame_received(1024);
/// metrics.record_frame_sent(16);
///
/// assert_eq!(metrics.active_connections(), 1);
/// assert_eq!(metrics.total_frames_received(), 1);
/// assert_eq!(metrics.total_bytes_received(), 1024);
/// ```
#[derive(Debug, Default)]
pub struct TransportMetrics {
    /// Total number of connections opened
    connections_opened: AtomicU64,
    /// Total number of connections closed
    connections_closed: AtomicU64,
    /// Frames written across all transports
    frames_sent: AtomicU64,
    /// Frames read across all transports
    frames_received: AtomicU64,
    /// Bytes written, length prefixes included
    bytes_sent: AtomicU64,
    /// Bytes read, length prefixes included
    bytes_received: AtomicU64,
    /// Accept or handshake failures
    connection_errors: AtomicU64,
    /// Read errors
    read_errors: AtomicU64,
    /// Write errors
    write_errors: AtomicU64,
}

impl TransportMetrics {
    /// Creates a new transport metrics tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new connection being opened.
    pub fn record_connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        {
            metrics::counter!("apmrpc.transport.connections.opened").increment(1);
            metrics::gauge!("apmrpc.transport.connections.active").increment(1.0);
        }
    }

    /// Records a connection being closed.
    pub fn record_connection_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        {
            metrics::counter!("apmrpc.transport.connections.closed").increment(1);
            metrics::gauge!("apmrpc.transport.connections.active").decrement(1.0);
        }
    }

    /// Records one frame written, `bytes` long including its length prefix.
    pub fn record_frame_sent(&self, bytes: u64) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        {
            metrics::counter!("apmrpc.transport.frames.sent").increment(1);
            metrics::counter!("apmrpc.transport.bytes.sent").increment(bytes);
        }
    }

    /// Records one frame read, `bytes` long including its length prefix.
    pub fn record_frame_received(&self, bytes: u64) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        {
            metrics::counter!("apmrpc.transport.frames.received").increment(1);
            metrics::counter!("apmrpc.transport.bytes.received").increment(bytes);
        }
    }

    /// Records a failed accept or handshake.
    pub fn record_connection_error(&self) {
        self.connection_errors.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("apmrpc.transport.errors.connection").increment(1);
    }

    /// Records a read error.
    pub fn record_read_error(&self) {
        self.read_errors.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("apmrpc.transport.errors.read").increment(1);
    }

    /// Records a write error.
    pub fn record_write_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("apmrpc.transport.errors.write").increment(1);
    }

    /// Returns the number of currently active connections.
    #[must_use]
    pub fn active_connections(&self) -> u64 {
        let opened = self.connections_opened.load(Ordering::Relaxed);
        let closed = self.connections_closed.load(Ordering::Relaxed);
        opened.saturating_sub(closed)
    }

    /// Returns the total number of connections opened.
    #[must_use]
    pub fn total_connections_opened(&self) -> u64 {
        self.connections_opened.load(Ordering::Relaxed)
    }

    /// Returns the total number of connections closed.
    #[must_use]
    pub fn total_connections_closed(&self) -> u64 {
        self.connections_closed.load(Ordering::Relaxed)
    }

    /// Returns the total frames sent.
    #[must_use]
    pub fn total_frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    /// Returns the total frames received.
    #[must_use]
    pub fn total_frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    /// Returns the total bytes sent.
    #[must_use]
    pub fn total_bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    /// Returns the total bytes received.
    #[must_use]
    pub fn total_bytes_received(&self) -> u64 {
        self.bytes_received.load(Ordering::Relaxed)
    }

    /// Returns the total number of connection errors.
    #[must_use]
    pub fn total_connection_errors(&self) -> u64 {
        self.connection_errors.load(Ordering::Relaxed)
    }

    /// Returns the total number of read errors.
    #[must_use]
    pub fn total_read_errors(&self) -> u64 {
        self.read_errors.load(Ordering::Relaxed)
    }

    /// Returns the total number of write errors.
    #[must_use]
    pub fn total_write_errors(&self) -> u64 {
        self.write_errors.load(Ordering::Relaxed)
    }

    /// Resets all counters to zero.
    pub fn reset(&self) {
        self.connections_opened.store(0, Ordering::Relaxed);
        self.connections_closed.store(0, Ordering::Relaxed);
        self.frames_sent.store(0, Ordering::Relaxed);
        self.frames_received.store(0, Ordering::Relaxed);
        self.bytes_sent.store(0, Ordering::Relaxed);
        self.bytes_received.store(0, Ordering::Relaxed);
        self.connection_errors.store(0, Ordering::Relaxed);
        self.read_errors.store(0, Ordering::Relaxed);
        self.write_errors.store(0, Ordering::Relaxed);
    }
}

/// Metrics for inbound message handling.
///
/// `handled` counts messages that reached a handling routine;
/// `succeeded + failed == handled` once all of them finished. Unrecognized
/// messages never reach a routine and are counted separately, and only
/// when the [`UnrecognizedPolicy`](crate::dispatch::UnrecognizedPolicy) asks for it.
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    handled: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    unrecognized: AtomicU64,
    undecodable: AtomicU64,
}

impl DispatchMetrics {
    /// Creates a new dispatch metrics tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a message entering its handling routine.
    pub fn record_handled(&self) {
        self.handled.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("apmrpc.dispatch.handled").increment(1);
    }

    /// Records a message stored successfully.
    pub fn record_success(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("apmrpc.dispatch.succeeded").increment(1);
    }

    /// Records a message whose handling failed.
    pub fn record_failure(&self, error: &DispatchError) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("apmrpc.dispatch.failed", "kind" => error.kind()).increment(1);
        #[cfg(not(feature = "observability"))]
        let _ = error;
    }

    /// Records a message no handler recognized.
    pub fn record_unrecognized(&self) {
        self.unrecognized.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("apmrpc.dispatch.unrecognized").increment(1);
    }

    /// Records a call whose payload could not be decoded.
    pub fn record_undecodable(&self) {
        self.undecodable.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("apmrpc.dispatch.undecodable").increment(1);
    }

    /// Messages that reached a handling routine.
    #[must_use]
    pub fn handled(&self) -> u64 {
        self.handled.load(Ordering::Relaxed)
    }

    /// Messages stored successfully.
    #[must_use]
    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::Relaxed)
    }

    /// Messages whose handling failed.
    #[must_use]
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Messages of an unrecognized kind, when counted.
    #[must_use]
    pub fn unrecognized(&self) -> u64 {
        self.unrecognized.load(Ordering::Relaxed)
    }

    /// Calls whose payload could not be decoded.
    #[must_use]
    pub fn undecodable(&self) -> u64 {
        self.undecodable.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_connection_lifecycle() {
        let metrics = TransportMetrics::new();
        metrics.record_connection_opened();
        metrics.record_connection_opened();
        metrics.record_connection_closed();

        assert_eq!(metrics.active_connections(), 1);
        assert_eq!(metrics.total_connections_opened(), 2);
        assert_eq!(metrics.total_connections_closed(), 1);
    }

    #[test]
    fn test_transport_frames() {
        let metrics = TransportMetrics::new();
        metrics.record_frame_sent(20);
        metrics.record_frame_sent(12);
        metrics.record_frame_received(100);

        assert_eq!(metrics.total_frames_sent(), 2);
        assert_eq!(metrics.total_bytes_sent(), 32);
        assert_eq!(metrics.total_frames_received(), 1);
        assert_eq!(metrics.total_bytes_received(), 100);

        metrics.reset();
        assert_eq!(metrics.total_bytes_sent(), 0);
    }

    #[test]
    fn test_active_connections_never_underflows() {
        let metrics = TransportMetrics::new();
        metrics.record_connection_closed();
        assert_eq!(metrics.active_connections(), 0);
    }

    #[test]
    fn test_dispatch_counters() {
        let metrics = DispatchMetrics::new();
        metrics.record_handled();
        metrics.record_handled();
        metrics.record_success();
        metrics.record_failure(&DispatchError::Domain("boom".into()));
        metrics.record_unrecognized();
        metrics.record_undecodable();

        assert_eq!(metrics.handled(), 2);
        assert_eq!(metrics.succeeded() + metrics.failed(), 2);
        assert_eq!(metrics.unrecognized(), 1);
        assert_eq!(metrics.undecodable(), 1);
    }
}
