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

//! Sinks for contained instrumentation faults.

use crate::error::ApmError;
use crate::interceptor::InstrumentationFault;
use crate::observability::{log_error, ErrorMetrics};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::warn_span;

/// Receives every fault a [`FaultIsolatingInterceptor`](crate::interceptor::FaultIsolatingInterceptor)
/// contains.
///
/// `handle` runs on the monitored application's call path. It must not
/// panic and must not block: a handler that cannot keep up drops or samples.
pub trait ExceptionHandler: Send + Sync {
    /// Reports one fault.
    fn handle(&self, fault: InstrumentationFault);
}

impl<H> ExceptionHandler for Arc<H>
where
    H: ExceptionHandler + ?Sized,
{
    fn handle(&self, fault: InstrumentationFault) {
        (**self).handle(fault)
    }
}

/// Logs faults at warn, sampled so a hot failing interceptor cannot flood the log.
///
/// The first `log_first` faults are logged, then one in every `sample_every`.
/// Every fault is counted in the handler's [`ErrorMetrics`], sampled or not.
#[derive(Debug)]
pub struct LoggingExceptionHandler {
    log_first: u64,
    sample_every: u64,
    seen: AtomicU64,
    logged: AtomicU64,
    errors: Arc<ErrorMetrics>,
}

impl LoggingExceptionHandler {
    /// Creates a handler. A `sample_every` of zero is treated as one.
    pub fn new(log_first: u64, sample_every: u64) -> Self {
        Self {
            log_first,
            sample_every: sample_every.max(1),
            seen: AtomicU64::new(0),
            logged: AtomicU64::new(0),
            errors: Arc::new(ErrorMetrics::new()),
        }
    }

    /// Shares `errors` with other reporters.
    pub fn with_error_metrics(mut self, errors: Arc<ErrorMetrics>) -> Self {
        self.errors = errors;
        self
    }

    /// Error counters this handler records into.
    pub fn error_metrics(&self) -> &Arc<ErrorMetrics> {
        &self.errors
    }

    /// Faults received.
    pub fn seen(&self) -> u64 {
        self.seen.load(Ordering::Relaxed)
    }

    /// Faults actually written to the log.
    pub fn logged(&self) -> u64 {
        self.logged.load(Ordering::Relaxed)
    }
}

impl Default for LoggingExceptionHandler {
    fn default() -> Self {
        Self::new(10, 100)
    }
}

impl ExceptionHandler for LoggingExceptionHandler {
    fn handle(&self, fault: InstrumentationFault) {
        let occurrence = self.seen.fetch_add(1, Ordering::Relaxed) + 1;
        let error = ApmError::from(fault);
        self.errors.record_error(&error);

        let sampled = occurrence <= self.log_first
            || (occurrence - self.log_first) % self.sample_every == 0;
        if sampled {
            self.logged.fetch_add(1, Ordering::Relaxed);
            warn_span!("fault", occurrence).in_scope(|| log_error(&error));
        }
    }
}

/// Hands faults to a bounded queue for a background reporter.
///
/// When the queue is full or its receiver is gone the fault is dropped and
/// counted; `handle` never waits.
#[derive(Debug)]
pub struct QueueingExceptionHandler {
    sender: mpsc::Sender<InstrumentationFault>,
    dropped: AtomicU64,
}

impl QueueingExceptionHandler {
    /// Creates a handler and the receiving end of its queue.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<InstrumentationFault>) {
        let (sender, receiver) = mpsc::channel(capacity);
        let handler = Self {
            sender,
            dropped: AtomicU64::new(0),
        };
        (handler, receiver)
    }

    /// Faults dropped because the queue was full or closed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl ExceptionHandler for QueueingExceptionHandler {
    fn handle(&self, fault: InstrumentationFault) {
        if self.sender.try_send(fault).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            #[cfg(feature = "observability")]
            metrics::counter!("apmrpc.instrumentation.faults.dropped").increment(1);
        }
    }
}
