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

//! Call interceptors for outbound channels.
//!
//! Interceptors wrap every call like layers of an onion. The first interceptor
//! in the chain is the outermost layer: its [`on_start`] runs first on the
//! way out and its [`on_complete`] runs last on the way back.
//!
//! [`on_start`]: ClientInterceptor::on_start
//! [`on_complete`]: ClientInterceptor::on_complete

use crate::client::{ClientError, Metadata};
use std::fmt;
use std::sync::Arc;

/// What a call is about, as seen by interceptors.
#[derive(Debug, Clone)]
pub struct CallContext {
    /// Channel-local call number
    pub call_id: u64,
    /// Full method name
    pub method: String,
    /// Target the channel was opened for
    pub target: String,
}

/// How a call ended.
#[derive(Debug)]
pub enum CallOutcome<'a> {
    /// The collector replied; `responded` is `false` when it wrote no response.
    Completed {
        /// Whether a response payload came back
        responded: bool,
    },
    /// The call failed on the agent side or on the wire.
    Failed(&'a ClientError),
}

/// Hook applied around every call on a channel.
pub trait ClientInterceptor: Send + Sync {
    /// Name used in logs and diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Runs before the call is sent. May add headers or reject the call.
    fn on_start(&self, call: &CallContext, headers: &mut Metadata) -> Result<(), ClientError> {
        let _ = (call, headers);
        Ok(())
    }

    /// Runs after the call finished, whether or not it succeeded.
    fn on_complete(&self, call: &CallContext, outcome: &CallOutcome<'_>) {
        let _ = (call, outcome);
    }
}

/// Immutable, shareable snapshot of an ordered interceptor sequence.
#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Arc<[Arc<dyn ClientInterceptor>]>,
}

impl InterceptorChain {
    /// Snapshots `interceptors`; later changes to the source do not reach the chain.
    pub fn new<I>(interceptors: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn ClientInterceptor>>,
    {
        Self {
            interceptors: interceptors.into_iter().collect(),
        }
    }

    /// Number of interceptors.
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    /// Returns `true` if the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Interceptors from outermost to innermost.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ClientInterceptor>> {
        self.interceptors.iter()
    }

    /// Interceptor names from outermost to innermost.
    pub fn names(&self) -> Vec<&str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    /// Runs `on_start` outermost first.
    ///
    /// Stops at the first rejection. Returns how many interceptors started,
    /// which is what [`InterceptorChain::complete`] must unwind.
    pub fn start(&self, call: &CallContext, headers: &mut Metadata) -> (usize, Result<(), ClientError>) {
        for (index, interceptor) in self.interceptors.iter().enumerate() {
            if let Err(error) = interceptor.on_start(call, headers) {
                return (index, Err(error));
            }
        }
        (self.interceptors.len(), Ok(()))
    }

    /// Runs `on_complete` for the first `started` interceptors, innermost first.
    pub fn complete(&self, started: usize, call: &CallContext, outcome: &CallOutcome<'_>) {
        for interceptor in self.interceptors[..started.min(self.interceptors.len())]
            .iter()
            .rev()
        {
            interceptor.on_complete(call, outcome);
        }
    }
}

impl fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
