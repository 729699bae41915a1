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

//! Handler trait, shared dispatch context, and the kind router.

use crate::dispatch::{
    DispatchError, PayloadKind, RequestEnvelope, ResponseResult, ServerResponse,
};
use crate::error::panic_message;
use crate::observability::DispatchMetrics;
use async_trait::async_trait;
use futures_util::FutureExt;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, warn};

/// Handles one kind of inbound message.
///
/// Implementations write at most one [`ResponseResult`] to `response`.
/// Writing nothing tells the collector to send no response for the message.
#[async_trait]
pub trait RequestResponseHandler: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Handles `request`, writing the outcome to `response`.
    async fn handle_request(&self, request: &RequestEnvelope, response: &mut dyn ServerResponse);
}

/// What to do with a message whose kind no handler understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnrecognizedPolicy {
    /// Log a warning and continue.
    #[default]
    Ignore,
    /// Log a warning and count it in [`DispatchMetrics::unrecognized`].
    Count,
}

/// Policy and counters shared by the handlers of one collector.
#[derive(Debug, Clone, Default)]
pub struct DispatchContext {
    policy: UnrecognizedPolicy,
    metrics: Arc<DispatchMetrics>,
}

impl DispatchContext {
    /// Creates a context.
    pub fn new(policy: UnrecognizedPolicy, metrics: Arc<DispatchMetrics>) -> Self {
        Self { policy, metrics }
    }

    /// Unrecognized-variant policy.
    pub fn policy(&self) -> UnrecognizedPolicy {
        self.policy
    }

    /// Dispatch counters.
    pub fn metrics(&self) -> &Arc<DispatchMetrics> {
        &self.metrics
    }

    /// Records a message nobody handles. No response is written.
    pub fn unrecognized(&self, handler: &str, kind: PayloadKind) {
        let error = DispatchError::UnrecognizedMessageVariant {
            handler: handler.to_string(),
            kind: kind.as_str(),
        };
        warn!(handler, kind = %kind, %error, "invalid request, no response written");
        if self.policy == UnrecognizedPolicy::Count {
            self.metrics.record_unrecognized();
        }
    }

    /// Runs one message's handling routine and converts its outcome.
    ///
    /// Failures, including panics, become `ResponseResult { success: false }`
    /// carrying the error's message.
    pub async fn respond<F>(&self, handler: &str, kind: PayloadKind, routine: F) -> ResponseResult
    where
        F: Future<Output = Result<(), DispatchError>> + Send,
    {
        self.metrics.record_handled();
        let outcome = match AssertUnwindSafe(routine).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => Err(DispatchError::Panicked {
                message: panic_message(panic.as_ref()),
            }),
        };

        match outcome {
            Ok(()) => {
                self.metrics.record_success();
                ResponseResult::success()
            }
            Err(error) => {
                self.metrics.record_failure(&error);
                warn!(
                    handler,
                    kind = %kind,
                    error_kind = error.kind(),
                    error = ?error,
                    "failed to handle request"
                );
                ResponseResult::failure_from(&error)
            }
        }
    }
}

/// Routes each message to the handler registered for its kind.
///
/// A kind with no registered handler is treated like an unrecognized variant.
#[derive(Default)]
pub struct HandlerRouter {
    handlers: BTreeMap<PayloadKind, Arc<dyn RequestResponseHandler>>,
    context: DispatchContext,
}

impl HandlerRouter {
    /// Creates an empty router.
    pub fn new(context: DispatchContext) -> Self {
        Self {
            handlers: BTreeMap::new(),
            context,
        }
    }

    /// Registers `handler` for `kind`, returning the handler it replaces.
    pub fn register(
        &mut self,
        kind: PayloadKind,
        handler: Arc<dyn RequestResponseHandler>,
    ) -> Option<Arc<dyn RequestResponseHandler>> {
        debug!(kind = %kind, handler = handler.name(), "register handler");
        self.handlers.insert(kind, handler)
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_handler(mut self, kind: PayloadKind, handler: Arc<dyn RequestResponseHandler>) -> Self {
        self.register(kind, handler);
        self
    }

    /// Handler registered for `kind`.
    pub fn handler(&self, kind: PayloadKind) -> Option<&Arc<dyn RequestResponseHandler>> {
        self.handlers.get(&kind)
    }

    /// Shared dispatch context.
    pub fn context(&self) -> &DispatchContext {
        &self.context
    }
}

#[async_trait]
impl RequestResponseHandler for HandlerRouter {
    fn name(&self) -> &str {
        "HandlerRouter"
    }

    async fn handle_request(&self, request: &RequestEnvelope, response: &mut dyn ServerResponse) {
        match self.handlers.get(&request.kind()) {
            Some(handler) => handler.handle_request(request, response).await,
            None => self.context.unrecognized(self.name(), request.kind()),
        }
    }
}

impl fmt::Debug for HandlerRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.handlers.iter().map(|(kind, handler)| (kind, handler.name())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{RequestPayload, ResponseSlot, StringMetaData};

    fn string_request() -> RequestEnvelope {
        RequestEnvelope::new(RequestPayload::StringMetaData(StringMetaData {
            agent_id: "agent-1".to_string(),
            agent_start_time: 1000,
            string_id: 1,
            string_value: "hello".to_string(),
        }))
    }

    async fn explode() -> Result<(), DispatchError> {
        panic!("service exploded");
    }

    #[tokio::test]
    async fn test_respond_converts_panic_into_failure() {
        let context = DispatchContext::default();
        let result = context
            .respond("test", PayloadKind::ApiMetaData, explode())
            .await;

        assert!(!result.success);
        assert_eq!(result.message.as_deref(), Some("handler panicked: service exploded"));
        assert_eq!(context.metrics().failed(), 1);
    }

    #[tokio::test]
    async fn test_unmapped_kind_writes_nothing() {
        let metrics = Arc::new(DispatchMetrics::new());
        let router = HandlerRouter::new(DispatchContext::new(UnrecognizedPolicy::Count, metrics.clone()));

        let mut slot = ResponseSlot::new();
        router.handle_request(&string_request(), &mut slot).await;

        assert!(!slot.is_written());
        assert_eq!(metrics.unrecognized(), 1);
        assert_eq!(metrics.handled(), 0);
    }

    #[tokio::test]
    async fn test_ignore_policy_does_not_count() {
        let router = HandlerRouter::new(DispatchContext::default());
        let mut slot = ResponseSlot::new();
        router.handle_request(&string_request(), &mut slot).await;

        assert!(!slot.is_written());
        assert_eq!(router.context().metrics().unrecognized(), 0);
    }
}
