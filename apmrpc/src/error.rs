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

//! Top-level error type for apmrpc.
//!
//! Each layer of the crate has its own error type, and [`ApmError`] composes
//! them:
//!
//! 1. **Transport**: the byte stream failed ([`TransportError`])
//! 2. **Client**: configuring a factory or making a call failed ([`ClientError`])
//! 3. **Dispatch**: one inbound message could not be handled ([`DispatchError`])
//! 4. **Instrumentation**: an interceptor misbehaved ([`InstrumentationFault`])
//!
//! # Error Handling Strategy
//!
//! - **Configuration errors** are fatal and surface at the setter or at `build()`
//! - **Dispatch errors** are recovered per message into a failed `ResponseResult`
//! - **Instrumentation faults** are recovered into the exception handler
//!
//! # Examples
//!
//! ```rust
//! use apmrpc::ApmError;
//! use apmrpc::transport::TransportError;
//!
//! let error: ApmError = TransportError::Closed.into();
//! assert!(error.is_transport_error());
//! assert!(error.should_close_transport());
//! ```

use crate::client::ClientError;
use crate::dispatch::DispatchError;
use crate::interceptor::InstrumentationFault;
use crate::transport::TransportError;
use std::any::Any;
use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for apmrpc operations.
#[derive(Debug)]
pub enum ApmError {
    /// The underlying connection failed.
    Transport(TransportError),

    /// Building a channel factory or making a call failed.
    ///
    /// ```rust
    /// use apmrpc::ApmError;
    /// use apmrpc::client::ClientError;
    ///
    /// let error = ApmError::Client(ClientError::MissingDependency {
    ///     dependency: "header_factory",
    /// });
    /// assert!(error.is_client_error());
    /// assert!(!error.is_recoverable());
    /// ```
    Client(ClientError),

    /// One inbound message could not be handled. The connection carries on.
    Dispatch(DispatchError),

    /// An interceptor failed. The monitored call is unaffected.
    Instrumentation(InstrumentationFault),
}

impl ApmError {
    /// Returns `true` if this is a transport error.
    #[must_use]
    pub const fn is_transport_error(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns `true` if this is a client error.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Client(_))
    }

    /// Returns `true` if this is a dispatch error.
    #[must_use]
    pub const fn is_dispatch_error(&self) -> bool {
        matches!(self, Self::Dispatch(_))
    }

    /// Returns `true` if this is an instrumentation fault.
    #[must_use]
    pub const fn is_instrumentation_fault(&self) -> bool {
        matches!(self, Self::Instrumentation(_))
    }

    /// Returns `true` if retrying the failed operation could succeed.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_recoverable(),
            Self::Client(e) => e.is_recoverable(),
            Self::Dispatch(e) => e.is_recoverable(),
            Self::Instrumentation(_) => false,
        }
    }

    /// Returns `true` if the connection the error happened on is unusable.
    #[must_use]
    pub fn should_close_transport(&self) -> bool {
        match self {
            Self::Transport(e) => e.should_close_transport(),
            Self::Client(ClientError::Transport(e)) => e.should_close_transport(),
            Self::Client(ClientError::Timeout { .. }) => true,
            Self::Client(_) | Self::Dispatch(_) | Self::Instrumentation(_) => false,
        }
    }
}

impl fmt::Display for ApmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport error: {}", e),
            Self::Client(e) => write!(f, "client error: {}", e),
            Self::Dispatch(e) => write!(f, "dispatch error: {}", e),
            Self::Instrumentation(e) => write!(f, "instrumentation fault: {}", e),
        }
    }
}

impl StdError for ApmError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Client(e) => Some(e),
            Self::Dispatch(e) => Some(e),
            Self::Instrumentation(e) => Some(e),
        }
    }
}

impl From<TransportError> for ApmError {
    fn from(error: TransportError) -> Self {
        Self::Transport(error)
    }
}

impl From<ClientError> for ApmError {
    fn from(error: ClientError) -> Self {
        Self::Client(error)
    }
}

impl From<DispatchError> for ApmError {
    fn from(error: DispatchError) -> Self {
        Self::Dispatch(error)
    }
}

impl From<InstrumentationFault> for ApmError {
    fn from(error: InstrumentationFault) -> Self {
        Self::Instrumentation(error)
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
