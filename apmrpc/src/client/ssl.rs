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

//! Resolved TLS posture of a channel factory.

use crate::client::{ClientError, Resource, SslOption};

/// TLS implementation requested by configuration.
///
/// Every accepted name maps onto rustls; the names exist so configuration
/// written for other agents keeps loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SslProvider {
    /// `"JDK"`
    Jdk,
    /// `"OPENSSL"` or `"OPENSSL_REFCNT"`
    OpenSsl,
    /// `"RUSTLS"`
    Rustls,
}

impl SslProvider {
    /// Parses a provider name, ignoring ASCII case.
    pub fn parse(provider_type: &str) -> Result<Self, ClientError> {
        match provider_type.to_ascii_uppercase().as_str() {
            "JDK" => Ok(Self::Jdk),
            "OPENSSL" | "OPENSSL_REFCNT" => Ok(Self::OpenSsl),
            "RUSTLS" => Ok(Self::Rustls),
            other => Err(ClientError::invalid(format!(
                "unsupported ssl provider type {other:?}"
            ))),
        }
    }
}

/// TLS settings frozen into a [`ChannelFactory`](crate::client::ChannelFactory).
///
/// Either [`SslConfig::DISABLED`] or an enabled config carrying the
/// provider and trust resource from the [`SslOption`] it was resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SslConfig {
    enabled: bool,
    provider_type: String,
    trust_cert_resource: Option<Resource>,
}

impl SslConfig {
    /// The shared "TLS off" configuration.
    pub const DISABLED: SslConfig = SslConfig {
        enabled: false,
        provider_type: String::new(),
        trust_cert_resource: None,
    };

    /// Creates an enabled configuration.
    pub fn enabled(provider_type: impl Into<String>, trust_cert_resource: Option<Resource>) -> Self {
        Self {
            enabled: true,
            provider_type: provider_type.into(),
            trust_cert_resource,
        }
    }

    /// Resolves an optional `SslOption`: absent or disabled gives [`SslConfig::DISABLED`].
    pub fn from_option(option: Option<&SslOption>) -> Self {
        match option {
            Some(option) if option.enable => Self::enabled(
                option.provider_type.clone(),
                option.trust_cert_resource.clone(),
            ),
            _ => Self::DISABLED,
        }
    }

    /// Whether TLS is on.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Provider identifier; empty when disabled.
    #[must_use]
    pub fn provider_type(&self) -> &str {
        &self.provider_type
    }

    /// Trust bundle, if one was configured.
    #[must_use]
    pub fn trust_cert_resource(&self) -> Option<&Resource> {
        self.trust_cert_resource.as_ref()
    }

    /// Builds the rustls client configuration for `server_name`.
    ///
    /// Returns `Ok(None)` when TLS is disabled. The trust resource is read
    /// here, at channel-open time, never while building the factory.
    #[cfg(feature = "tls")]
    pub async fn client_tls_config(
        &self,
        server_name: &str,
    ) -> Result<Option<crate::transport::TlsConfig>, ClientError> {
        use crate::transport::TlsConfig;

        if !self.enabled {
            return Ok(None);
        }
        SslProvider::parse(&self.provider_type)?;

        let config = match &self.trust_cert_resource {
            Some(resource) => {
                let pem = resource.load().await.map_err(|e| ClientError::Tls {
                    reason: format!("cannot read trust resource {resource}: {e}"),
                })?;
                TlsConfig::client_with_trust(&pem, server_name)
            }
            None => TlsConfig::client_native_roots(server_name),
        }
        .map_err(|e| ClientError::Tls {
            reason: e.to_string(),
        })?;

        Ok(Some(config))
    }
}

impl Default for SslConfig {
    fn default() -> Self {
        Self::DISABLED
    }
}
