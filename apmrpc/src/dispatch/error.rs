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

//! Per-message dispatch failures.

use std::error::Error;
use thiserror::Error;

/// Error type domain services return from `insert`.
pub type ServiceError = Box<dyn Error + Send + Sync>;

/// Why one inbound message could not be handled.
///
/// None of these stop the connection: the collector converts each into a
/// failed [`ResponseResult`](crate::dispatch::ResponseResult), or for an
/// unrecognized variant into no response at all, and moves on to the next
/// message.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The handler does not know the message kind it was given.
    #[error("{handler} cannot handle {kind} messages")]
    UnrecognizedMessageVariant {
        /// Handler that received the message
        handler: String,
        /// Kind of the message
        kind: &'static str,
    },

    /// An optional field was present but holds a value with no mapping.
    #[error("invalid {field}: {value}")]
    InvalidField {
        /// Wire name of the field
        field: &'static str,
        /// The value as received
        value: String,
    },

    /// The domain service rejected the record.
    #[error("{0}")]
    Domain(#[source] ServiceError),

    /// The domain service panicked while handling the record.
    #[error("handler panicked: {message}")]
    Panicked {
        /// Panic payload, when it was a string
        message: String,
    },

    /// The message body could not be decoded.
    #[error("undecodable request: {reason}")]
    Decode {
        /// Decoder's explanation
        reason: String,
    },
}

impl DispatchError {
    /// Returns `true` if the agent could resend the same message and expect success.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, DispatchError::Domain(_) | DispatchError::Panicked { .. })
    }

    /// Short label for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            DispatchError::UnrecognizedMessageVariant { .. } => "unrecognized",
            DispatchError::InvalidField { .. } => "invalid_field",
            DispatchError::Domain(_) => "domain",
            DispatchError::Panicked { .. } => "panicked",
            DispatchError::Decode { .. } => "decode",
        }
    }
}
