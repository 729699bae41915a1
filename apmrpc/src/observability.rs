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

//! Observability support for apmrpc.
//!
//! Logging goes through `tracing` everywhere in the crate with structured
//! fields (`transport_id`, `factory`, `handler`). This module adds the
//! counters and hooks an operator needs on top of that:
//!
//! - **[`ErrorMetrics`]**: errors by layer and recoverability
//! - **[`TransportMetrics`]**: connection lifecycle and frame traffic
//! - **[`DispatchMetrics`]**: inbound message outcomes
//! - **[`ErrorObserver`]**: custom error callbacks
//! - **[`log_error`]**: one structured logging entry point for [`ApmError`]
//!
//! # Metrics Integration
//!
//! With the `observability` feature (on by default) every counter is also
//! reported to the `metrics` crate facade under the `apmrpc.` prefix, so
//! any installed recorder (Prometheus, StatsD, ...) picks them up.
//!
//! # Error Callbacks
//!
//! ```rust
//! use apmrpc::observability::{ErrorMetrics, ErrorObserver};
//! use apmrpc::ApmError;
//! use apmrpc::transport::TransportError;
//! use std::sync::Arc;
//!
//! let observer = ErrorObserver::new();
//! let metrics = Arc::new(ErrorMetrics::new());
//!
//! let metrics_clone = metrics.clone();
//! observer.on_error(move |error| metrics_clone.record_error(error));
//!
//! observer.notify(&ApmError::Transport(TransportError::Closed));
//! assert_eq!(metrics.transport_errors(), 1);
//! ```

mod metrics;

pub use self::metrics::{DispatchMetrics, TransportMetrics};

use crate::ApmError;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for tracking errors across all layers.
///
/// # Examples
///
/// ```rust
/// use apmrpc::observability::ErrorMetrics;
/// use apmrpc::ApmError;
/// use apmrpc::client::ClientError;
/// use apmrpc::transport::TransportError;
///
/// let metrics = ErrorMetrics::new();
/// metrics.record_error(&ApmError::Transport(TransportError::Closed));
/// metrics.record_error(&ApmError::Client(ClientError::QueueFull { capacity: 8 }));
///
/// assert_eq!(metrics.transport_errors(), 1);
/// assert_eq!(metrics.client_errors(), 1);
/// assert_eq!(metrics.total_errors(), 2);
/// assert_eq!(metrics.recoverable_errors(), 1);
/// ```
#[derive(Debug, Default)]
pub struct ErrorMetrics {
    transport_errors: AtomicU64,
    client_errors: AtomicU64,
    dispatch_errors: AtomicU64,
    instrumentation_faults: AtomicU64,
    recoverable_errors: AtomicU64,
    transport_closures: AtomicU64,
}

impl ErrorMetrics {
    /// Creates a new error metrics tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error and updates the relevant counters.
    pub fn record_error(&self, error: &ApmError) {
        match error {
            ApmError::Transport(_) => {
                self.transport_errors.fetch_add(1, Ordering::Relaxed);
                #[cfg(feature = "observability")]
                ::metrics::counter!("apmrpc.errors.transport").increment(1);
            }
            ApmError::Client(_) => {
                self.client_errors.fetch_add(1, Ordering::Relaxed);
                #[cfg(feature = "observability")]
                ::metrics::counter!("apmrpc.errors.client").increment(1);
            }
            ApmError::Dispatch(_) => {
                self.dispatch_errors.fetch_add(1, Ordering::Relaxed);
                #[cfg(feature = "observability")]
                ::metrics::counter!("apmrpc.errors.dispatch").increment(1);
            }
            ApmError::Instrumentation(_) => {
                self.instrumentation_faults.fetch_add(1, Ordering::Relaxed);
                #[cfg(feature = "observability")]
                ::metrics::counter!("apmrpc.errors.instrumentation").increment(1);
            }
        }

        if error.is_recoverable() {
            self.recoverable_errors.fetch_add(1, Ordering::Relaxed);
            #[cfg(feature = "observability")]
            ::metrics::counter!("apmrpc.errors.recoverable").increment(1);
        }

        if error.should_close_transport() {
            self.transport_closures.fetch_add(1, Ordering::Relaxed);
            #[cfg(feature = "observability")]
            ::metrics::counter!("apmrpc.closures.transport").increment(1);
        }

        #[cfg(feature = "observability")]
        ::metrics::counter!("apmrpc.errors.total").increment(1);
    }

    /// Transport errors recorded.
    #[must_use]
    pub fn transport_errors(&self) -> u64 {
        self.transport_errors.load(Ordering::Relaxed)
    }

    /// Client errors recorded.
    #[must_use]
    pub fn client_errors(&self) -> u64 {
        self.client_errors.load(Ordering::Relaxed)
    }

    /// Dispatch errors recorded.
    #[must_use]
    pub fn dispatch_errors(&self) -> u64 {
        self.dispatch_errors.load(Ordering::Relaxed)
    }

    /// Instrumentation faults recorded.
    #[must_use]
    pub fn instrumentation_faults(&self) -> u64 {
        self.instrumentation_faults.load(Ordering::Relaxed)
    }

    /// All errors recorded.
    #[must_use]
    pub fn total_errors(&self) -> u64 {
        self.transport_errors()
            + self.client_errors()
            + self.dispatch_errors()
            + self.instrumentation_faults()
    }

    /// Errors a retry could get past.
    #[must_use]
    pub fn recoverable_errors(&self) -> u64 {
        self.recoverable_errors.load(Ordering::Relaxed)
    }

    /// Errors that left a connection unusable.
    #[must_use]
    pub fn transport_closures(&self) -> u64 {
        self.transport_closures.load(Ordering::Relaxed)
    }

    /// Resets all counters to zero.
    pub fn reset(&self) {
        self.transport_errors.store(0, Ordering::Relaxed);
        self.client_errors.store(0, Ordering::Relaxed);
        self.dispatch_errors.store(0, Ordering::Relaxed);
        self.instrumentation_faults.store(0, Ordering::Relaxed);
        self.recoverable_errors.store(0, Ordering::Relaxed);
        self.transport_closures.store(0, Ordering::Relaxed);
    }
}

/// Type alias for error callback functions.
pub type ErrorCallback = Box<dyn Fn(&ApmError) + Send + Sync>;

/// Observer for error events.
///
/// Callbacks run synchronously on the notifying task, in registration order.
#[derive(Clone, Default)]
pub struct ErrorObserver {
    callbacks: Arc<Mutex<Vec<Arc<ErrorCallback>>>>,
}

impl ErrorObserver {
    /// Creates an observer with no callbacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback`.
    pub fn on_error<F>(&self, callback: F)
    where
        F: Fn(&ApmError) + Send + Sync + 'static,
    {
        self.callbacks.lock().push(Arc::new(Box::new(callback)));
    }

    /// Invokes every registered callback with `error`.
    pub fn notify(&self, error: &ApmError) {
        // Snapshot so a callback may register further callbacks without deadlocking.
        let callbacks: Vec<_> = self.callbacks.lock().clone();
        for callback in callbacks {
            callback(error);
        }
    }

    /// Removes every callback.
    pub fn clear(&self) {
        self.callbacks.lock().clear();
    }

    /// Number of registered callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.lock().len()
    }

    /// Returns `true` if no callback is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.lock().is_empty()
    }
}

impl std::fmt::Debug for ErrorObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorObserver")
            .field("callback_count", &self.len())
            .finish()
    }
}

/// Logs `error` with structured fields at a level matching its layer.
///
/// Transport errors that close the connection log at error, dispatch errors
/// and instrumentation faults at warn (they are recovered locally), and
/// everything else at warn.
pub fn log_error(error: &ApmError) {
    match error {
        ApmError::Transport(e) if error.should_close_transport() => {
            tracing::error!(
                error = %e,
                recoverable = error.is_recoverable(),
                "transport error, closing connection"
            );
        }
        ApmError::Transport(e) => {
            tracing::warn!(error = %e, recoverable = error.is_recoverable(), "transport error");
        }
        ApmError::Client(e) => {
            tracing::warn!(
                error = %e,
                configuration = e.is_configuration_error(),
                recoverable = error.is_recoverable(),
                "client error"
            );
        }
        ApmError::Dispatch(e) => {
            tracing::warn!(error = %e, kind = e.kind(), "dispatch error");
        }
        ApmError::Instrumentation(e) => {
            tracing::warn!(error = %e, panic = e.is_panic(), "instrumentation fault");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientError;
    use crate::dispatch::DispatchError;
    use crate::interceptor::InstrumentationFault;
    use crate::transport::TransportError;

    #[test]
    fn test_record_each_layer() {
        let metrics = ErrorMetrics::new();
        metrics.record_error(&TransportError::Closed.into());
        metrics.record_error(&ClientError::TlsUnavailable.into());
        metrics.record_error(&DispatchError::Domain("boom".into()).into());
        metrics.record_error(&InstrumentationFault::failed("bad").into());

        assert_eq!(metrics.transport_errors(), 1);
        assert_eq!(metrics.client_errors(), 1);
        assert_eq!(metrics.dispatch_errors(), 1);
        assert_eq!(metrics.instrumentation_faults(), 1);
        assert_eq!(metrics.total_errors(), 4);
        assert_eq!(metrics.recoverable_errors(), 1);
        assert_eq!(metrics.transport_closures(), 1);

        metrics.reset();
        assert_eq!(metrics.total_errors(), 0);
    }

    #[test]
    fn test_observer_callbacks() {
        let observer = ErrorObserver::new();
        let seen = Arc::new(AtomicU64::new(0));

        for _ in 0..2 {
            let seen = seen.clone();
            observer.on_error(move |_| {
                seen.fetch_add(1, Ordering::Relaxed);
            });
        }
        observer.notify(&TransportError::Closed.into());
        assert_eq!(seen.load(Ordering::Relaxed), 2);
        assert_eq!(observer.len(), 2);

        observer.clear();
        observer.notify(&TransportError::Closed.into());
        assert_eq!(seen.load(Ordering::Relaxed), 2);
        assert!(observer.is_empty());
    }

    #[test]
    fn test_log_error_every_layer() {
        log_error(&TransportError::Closed.into());
        log_error(&TransportError::Timeout { duration: std::time::Duration::from_secs(1) }.into());
        log_error(&ClientError::QueueFull { capacity: 1 }.into());
        log_error(&DispatchError::Domain("boom".into()).into());
        log_error(&InstrumentationFault::failed("bad").into());
    }
}
