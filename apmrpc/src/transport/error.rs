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

//! Transport layer error types.
//!
//! Transport errors are the lowest layer of the crate's error hierarchy. They
//! describe failures of the byte stream itself: the peer could not be reached,
//! the connection dropped, or a TLS handshake was rejected. Whether an agent
//! retries is decided above this layer; these errors only report what broke.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur in the transport layer.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Failed to establish a connection to the remote endpoint.
    #[error("failed to connect to {address}: {source}")]
    ConnectionFailed {
        /// The address we attempted to connect to
        address: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The connection was lost after being established.
    #[error("connection lost: {reason}")]
    ConnectionLost {
        /// Description of why the connection was lost
        reason: String,
    },

    /// An operation exceeded its time limit.
    #[error("operation timed out after {duration:?}")]
    Timeout {
        /// How long we waited
        duration: Duration,
    },

    /// The TLS layer rejected the configuration or the handshake.
    #[error("tls failure: {reason}")]
    Tls {
        /// Description of the TLS failure
        reason: String,
    },

    /// Invalid transport configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Description of what is invalid
        reason: String,
    },

    /// The transport has been closed.
    #[error("transport is closed")]
    Closed,

    /// Failed to bind a listener to an address.
    #[error("failed to bind to {address}: {source}")]
    BindFailed {
        /// The address we attempted to bind to
        address: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Any other I/O failure on an established transport.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl TransportError {
    /// Returns `true` if a fresh attempt could plausibly succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            TransportError::ConnectionFailed { .. }
            | TransportError::ConnectionLost { .. }
            | TransportError::Timeout { .. } => true,
            TransportError::Io { source } => is_transient(source),
            TransportError::Tls { .. }
            | TransportError::InvalidConfiguration { .. }
            | TransportError::Closed
            | TransportError::BindFailed { .. } => false,
        }
    }

    /// Returns `true` if the transport can no longer be used.
    pub fn should_close_transport(&self) -> bool {
        match self {
            TransportError::ConnectionLost { .. }
            | TransportError::Closed
            | TransportError::Tls { .. }
            | TransportError::Timeout { .. } => true,
            TransportError::ConnectionFailed { .. }
            | TransportError::BindFailed { .. }
            | TransportError::InvalidConfiguration { .. } => false,
            TransportError::Io { source } => !is_transient(source),
        }
    }

    /// Returns `true` if the peer closed the stream cleanly between frames.
    pub fn is_eof(&self) -> bool {
        matches!(
            self,
            TransportError::Io { source } if source.kind() == io::ErrorKind::UnexpectedEof
        )
    }
}

fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

impl From<io::Error> for TransportError {
    fn from(error: io::Error) -> Self {
        TransportError::Io { source: error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_failed_is_recoverable_without_closing() {
        let error = TransportError::ConnectionFailed {
            address: "127.0.0.1:9991".to_string(),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert!(error.is_recoverable());
        assert!(!error.should_close_transport());
        assert!(error.to_string().contains("127.0.0.1:9991"));
    }

    #[test]
    fn test_tls_failure_is_fatal() {
        let error = TransportError::Tls {
            reason: "unknown issuer".to_string(),
        };
        assert!(!error.is_recoverable());
        assert!(error.should_close_transport());
    }

    #[test]
    fn test_transient_io_error() {
        let error = TransportError::from(io::Error::new(io::ErrorKind::Interrupted, "interrupted"));
        assert!(error.is_recoverable());
        assert!(!error.should_close_transport());
    }

    #[test]
    fn test_eof_detection() {
        let eof = TransportError::from(io::Error::new(io::ErrorKind::UnexpectedEof, "eof"));
        assert!(eof.is_eof());
        assert!(!TransportError::Closed.is_eof());
    }
}
