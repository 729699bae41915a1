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

//! Errors raised on the agent side: building a factory, opening a channel,
//! and making calls.

use crate::serialization::{DeserializationError, SerializationError};
use crate::transport::TransportError;
use std::time::Duration;
use thiserror::Error;

/// Errors produced by the client side of the crate.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A builder setter or option received a value it cannot accept.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// What is wrong with the value
        reason: String,
    },

    /// A required capability was never provided.
    #[error("missing dependency: {dependency}")]
    MissingDependency {
        /// Name of the missing field
        dependency: &'static str,
    },

    /// The name resolver could not resolve the target.
    #[error("failed to resolve {target}: {reason}")]
    Resolve {
        /// Target as given to `new_channel`
        target: String,
        /// Resolver's explanation
        reason: String,
    },

    /// The target resolved to no addresses, or none of them accepted a connection.
    #[error("no reachable endpoint for {target}")]
    NoEndpoints {
        /// Target as given to `new_channel`
        target: String,
    },

    /// TLS was requested but its trust material could not be prepared.
    #[error("tls setup failed: {reason}")]
    Tls {
        /// What went wrong
        reason: String,
    },

    /// TLS was requested but the crate was built without the `tls` feature.
    #[error("tls requested but the tls feature is disabled")]
    TlsUnavailable,

    /// The channel already has the maximum number of calls queued.
    #[error("call queue is full ({capacity} pending)")]
    QueueFull {
        /// Configured executor queue size
        capacity: usize,
    },

    /// The call did not complete within the request timeout.
    #[error("call timed out after {duration:?}")]
    Timeout {
        /// The request timeout that elapsed
        duration: Duration,
    },

    /// The collector answered with something the channel did not expect.
    #[error("protocol violation: {reason}")]
    Protocol {
        /// Description of the violation
        reason: String,
    },

    /// The underlying transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A request could not be encoded.
    #[error(transparent)]
    Serialization(#[from] SerializationError),

    /// A reply could not be decoded.
    #[error(transparent)]
    Deserialization(#[from] DeserializationError),
}

impl ClientError {
    /// Returns `true` for errors raised while configuring, before any I/O.
    #[must_use]
    pub const fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfiguration { .. } | Self::MissingDependency { .. } | Self::TlsUnavailable
        )
    }

    /// Returns `true` if retrying the same operation later could succeed.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::QueueFull { .. } | Self::Timeout { .. } | Self::NoEndpoints { .. } => true,
            Self::Transport(e) => e.is_recoverable(),
            _ => false,
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }
}
