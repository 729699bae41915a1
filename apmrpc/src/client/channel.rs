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

//! Agent-side channel to a collector.

use crate::client::{
    CallContext, CallOutcome, ClientError, ClientOption, HeaderFactory, InterceptorChain,
};
use crate::serialization::framing::{read_frame, write_frame, CallFrame, ReplyFrame};
use crate::serialization::{DeserializationError, SerializationError, Serializer};
use crate::transport::{Transport, TransportError, TransportId};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, warn};

/// A connected channel that issues request/response calls in order.
///
/// Calls are written and answered one at a time; callers beyond the
/// factory's executor queue size are rejected with
/// [`ClientError::QueueFull`] instead of waiting. Once a call times out,
/// the transport fails, or a call future is dropped while its request is on
/// the wire, the channel is broken and every later call fails with a
/// closed-transport error.
pub struct ClientChannel {
    target: String,
    transport_id: TransportId,
    transport: Mutex<Box<dyn Transport>>,
    header_factory: Arc<dyn HeaderFactory>,
    interceptors: InterceptorChain,
    option: ClientOption,
    queue: Arc<Semaphore>,
    queue_size: usize,
    next_call_id: AtomicU64,
    broken: AtomicBool,
}

impl ClientChannel {
    pub(crate) fn new(
        target: String,
        transport: Box<dyn Transport>,
        header_factory: Arc<dyn HeaderFactory>,
        interceptors: InterceptorChain,
        option: ClientOption,
        queue_size: usize,
    ) -> Self {
        Self {
            target,
            transport_id: transport.metadata().id,
            transport: Mutex::new(transport),
            header_factory,
            interceptors,
            option,
            queue: Arc::new(Semaphore::new(queue_size)),
            queue_size,
            next_call_id: AtomicU64::new(1),
            broken: AtomicBool::new(false),
        }
    }

    /// Target this channel was opened for.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Identity of the underlying transport.
    pub fn transport_id(&self) -> TransportId {
        self.transport_id
    }

    /// Returns `true` once the channel can no longer carry calls.
    pub fn is_broken(&self) -> bool {
        self.broken.load(Ordering::Acquire)
    }

    /// Sends an already-encoded payload and waits for the reply.
    ///
    /// Returns `Ok(None)` when the collector handled the call but wrote no
    /// response.
    pub async fn call(&self, method: &str, payload: Vec<u8>) -> Result<Option<Vec<u8>>, ClientError> {
        let _permit = self
            .queue
            .clone()
            .try_acquire_owned()
            .map_err(|_| ClientError::QueueFull {
                capacity: self.queue_size,
            })?;

        let call = CallContext {
            call_id: self.next_call_id.fetch_add(1, Ordering::Relaxed),
            method: method.to_string(),
            target: self.target.clone(),
        };

        let mut headers = self.header_factory.new_headers();
        let (started, result) = self.interceptors.start(&call, &mut headers);
        if let Err(error) = result {
            debug!(call_id = call.call_id, method, %error, "call rejected by interceptor");
            self.interceptors
                .complete(started, &call, &CallOutcome::Failed(&error));
            return Err(error);
        }

        let frame = CallFrame {
            call_id: call.call_id,
            method: call.method.clone(),
            headers,
            payload,
        };
        let result = self.exchange(&frame).await;

        let outcome = match &result {
            Ok(reply) => CallOutcome::Completed {
                responded: reply.is_some(),
            },
            Err(error) => CallOutcome::Failed(error),
        };
        self.interceptors.complete(started, &call, &outcome);
        result
    }

    /// Encodes `request` with `serializer`, calls `method`, and decodes the reply.
    pub async fn unary<S, Req, Resp>(
        &self,
        serializer: &S,
        method: &str,
        request: &Req,
    ) -> Result<Option<Resp>, ClientError>
    where
        S: Serializer,
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let payload = serializer.serialize(request)?;
        match self.call(method, payload).await? {
            Some(reply) => Ok(Some(serializer.deserialize(&reply)?)),
            None => Ok(None),
        }
    }

    /// Closes the write half of the transport.
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        self.broken.store(true, Ordering::Release);
        let mut transport = self.transport.lock().await;
        transport.shutdown().await?;
        debug!(endpoint = %self.target, transport_id = %self.transport_id, "channel shut down");
        Ok(())
    }

    async fn exchange(&self, frame: &CallFrame) -> Result<Option<Vec<u8>>, ClientError> {
        let mut transport = self.transport.lock().await;
        if self.is_broken() {
            return Err(TransportError::Closed.into());
        }

        let timeout = self.option.request_timeout;
        let result = tokio::time::timeout(timeout, self.round_trip(&mut transport, frame)).await;
        let result = match result {
            Ok(result) => result,
            Err(_) => Err(ClientError::Timeout { duration: timeout }),
        };

        if let Err(error) = &result {
            if breaks_channel(error) {
                self.broken.store(true, Ordering::Release);
                warn!(
                    endpoint = %self.target,
                    transport_id = %self.transport_id,
                    call_id = frame.call_id,
                    %error,
                    "channel broken"
                );
            }
        }
        result
    }

    async fn round_trip(
        &self,
        transport: &mut Box<dyn Transport>,
        frame: &CallFrame,
    ) -> Result<Option<Vec<u8>>, ClientError> {
        let bytes = postcard::to_allocvec(frame).map_err(SerializationError::from)?;
        let in_flight = InFlight::new(self, frame.call_id);
        write_frame(transport, &bytes)
            .await
            .map_err(|e| connection_lost(e.to_string()))?;

        let bytes = match read_frame(transport, self.option.max_inbound_message_size).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Err(connection_lost("collector closed the stream")),
            Err(e) if e.is_io() => return Err(connection_lost(e.to_string())),
            Err(e) => return Err(e.into()),
        };
        in_flight.landed();
        let reply: ReplyFrame = postcard::from_bytes(&bytes).map_err(DeserializationError::from)?;
        if reply.call_id != frame.call_id {
            return Err(ClientError::Protocol {
                reason: format!(
                    "reply for call {} while waiting on call {}",
                    reply.call_id, frame.call_id
                ),
            });
        }
        Ok(reply.payload)
    }
}

/// Marks the channel broken unless the reply for `call_id` was read.
///
/// A call dropped between writing its frame and reading the reply leaves
/// that reply on the stream, where the next call would read it as its own.
struct InFlight<'a> {
    channel: &'a ClientChannel,
    call_id: u64,
    armed: bool,
}

impl<'a> InFlight<'a> {
    fn new(channel: &'a ClientChannel, call_id: u64) -> Self {
        Self {
            channel,
            call_id,
            armed: true,
        }
    }

    fn landed(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed && !self.channel.broken.swap(true, Ordering::AcqRel) {
            debug!(
                endpoint = %self.channel.target,
                transport_id = %self.channel.transport_id,
                call_id = self.call_id,
                "call abandoned in flight, channel broken"
            );
        }
    }
}

fn connection_lost(reason: impl Into<String>) -> ClientError {
    TransportError::ConnectionLost {
        reason: reason.into(),
    }
    .into()
}

fn breaks_channel(error: &ClientError) -> bool {
    matches!(
        error,
        ClientError::Timeout { .. }
            | ClientError::Transport(_)
            | ClientError::Protocol { .. }
            | ClientError::Deserialization(_)
    )
}

impl std::fmt::Debug for ClientChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientChannel")
            .field("target", &self.target)
            .field("transport_id", &self.transport_id)
            .field("broken", &self.is_broken())
            .finish()
    }
}
