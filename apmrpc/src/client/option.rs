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

//! Connection tuning and TLS options.
//!
//! Both option types can be built in code with `with_*` setters or loaded
//! from a JSON document (`json` feature). Durations are written in
//! milliseconds in configuration documents:
//!
//! ```json
//! {
//!   "connect_timeout_millis": 3000,
//!   "request_timeout_millis": 6000,
//!   "max_inbound_message_size": 4194304,
//!   "tcp_nodelay": true
//! }
//! ```

use crate::client::ClientError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Connection-level tuning applied to every channel a factory opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOption {
    /// How long to wait for a TCP connection (and TLS handshake) to complete
    #[serde(rename = "connect_timeout_millis", with = "duration_millis")]
    pub connect_timeout: Duration,

    /// How long to wait for the reply to one call
    #[serde(rename = "request_timeout_millis", with = "duration_millis")]
    pub request_timeout: Duration,

    /// Largest reply frame the channel accepts
    pub max_inbound_message_size: usize,

    /// Disable Nagle's algorithm on TCP connections
    pub tcp_nodelay: bool,
}

impl Default for ClientOption {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(3000),
            request_timeout: Duration::from_millis(6000),
            max_inbound_message_size: 4 * 1024 * 1024,
            tcp_nodelay: true,
        }
    }
}

impl ClientOption {
    /// Creates options with the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the per-call reply timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the largest accepted reply frame.
    pub fn with_max_inbound_message_size(mut self, size: usize) -> Self {
        self.max_inbound_message_size = size;
        self
    }

    /// Sets `TCP_NODELAY`.
    pub fn with_tcp_nodelay(mut self, nodelay: bool) -> Self {
        self.tcp_nodelay = nodelay;
        self
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.connect_timeout.is_zero() {
            return Err(ClientError::invalid("connect_timeout must be greater than 0"));
        }
        if self.request_timeout.is_zero() {
            return Err(ClientError::invalid("request_timeout must be greater than 0"));
        }
        if self.max_inbound_message_size == 0 {
            return Err(ClientError::invalid(
                "max_inbound_message_size must be greater than 0",
            ));
        }
        if self.max_inbound_message_size > crate::serialization::framing::MAX_FRAME_SIZE {
            return Err(ClientError::invalid(format!(
                "max_inbound_message_size must not exceed {}",
                crate::serialization::framing::MAX_FRAME_SIZE
            )));
        }
        Ok(())
    }

    /// Loads and validates options from a JSON document. Missing keys keep their defaults.
    #[cfg(feature = "json")]
    pub fn from_json(document: &str) -> Result<Self, ClientError> {
        let option: Self = serde_json::from_str(document)
            .map_err(|e| ClientError::invalid(format!("unreadable client option: {e}")))?;
        option.validate()?;
        Ok(option)
    }
}

/// Location of PEM-encoded trust material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    /// A file on disk
    Path(PathBuf),
    /// PEM text held in memory
    Pem(String),
}

impl Resource {
    /// Reads the resource's bytes.
    pub async fn load(&self) -> std::io::Result<Vec<u8>> {
        match self {
            Self::Path(path) => tokio::fs::read(path).await,
            Self::Pem(pem) => Ok(pem.as_bytes().to_vec()),
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(path) => write!(f, "file:{}", path.display()),
            Self::Pem(_) => f.write_str("inline-pem"),
        }
    }
}

/// Provider type used when an enabled `SslOption` does not name one.
pub const DEFAULT_PROVIDER_TYPE: &str = "JDK";

/// TLS settings as configured, before resolution into an
/// [`SslConfig`](crate::client::SslConfig).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SslOption {
    /// Whether TLS is turned on
    pub enable: bool,
    /// TLS provider identifier, e.g. `"JDK"` or `"OPENSSL"`
    pub provider_type: String,
    /// Trust bundle; `None` trusts the platform roots
    pub trust_cert_resource: Option<Resource>,
}

impl Default for SslOption {
    fn default() -> Self {
        Self {
            enable: false,
            provider_type: DEFAULT_PROVIDER_TYPE.to_string(),
            trust_cert_resource: None,
        }
    }
}

impl SslOption {
    /// Creates a disabled option.
    pub fn new() -> Self {
        Self::default()
    }

    /// Turns TLS on or off.
    pub fn with_enable(mut self, enable: bool) -> Self {
        self.enable = enable;
        self
    }

    /// Sets the provider identifier.
    pub fn with_provider_type(mut self, provider_type: impl Into<String>) -> Self {
        self.provider_type = provider_type.into();
        self
    }

    /// Sets the trust bundle.
    pub fn with_trust_cert_resource(mut self, resource: Resource) -> Self {
        self.trust_cert_resource = Some(resource);
        self
    }

    /// Checks the option. A disabled option is always valid.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.enable {
            crate::client::SslProvider::parse(&self.provider_type)?;
        }
        Ok(())
    }

    /// Loads and validates an option from a JSON document.
    #[cfg(feature = "json")]
    pub fn from_json(document: &str) -> Result<Self, ClientError> {
        let option: Self = serde_json::from_str(document)
            .map_err(|e| ClientError::invalid(format!("unreadable ssl option: {e}")))?;
        option.validate()?;
        Ok(option)
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
