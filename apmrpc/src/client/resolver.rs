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

//! Endpoint resolution extension point.

use crate::client::ClientError;
use async_trait::async_trait;
use std::net::SocketAddr;

/// Turns a channel target into the addresses to try, in order.
///
/// The default [`StaticResolverProvider`] takes a fixed address list.
/// Deployments that discover collectors dynamically plug in their own
/// provider through
/// [`ChannelFactoryBuilder::set_name_resolver_provider`](crate::client::ChannelFactoryBuilder::set_name_resolver_provider).
#[async_trait]
pub trait NameResolverProvider: Send + Sync {
    /// URI scheme this provider handles, e.g. `"static"`.
    fn scheme(&self) -> &str;

    /// Resolves `target` to socket addresses.
    async fn resolve(&self, target: &str) -> Result<Vec<SocketAddr>, ClientError>;
}

/// Resolves comma-separated `host:port` lists.
///
/// An optional `static:///` prefix is accepted. Each entry is looked up
/// with the system resolver and the results are concatenated in order.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticResolverProvider;

const STATIC_PREFIX: &str = "static:///";

#[async_trait]
impl NameResolverProvider for StaticResolverProvider {
    fn scheme(&self) -> &str {
        "static"
    }

    async fn resolve(&self, target: &str) -> Result<Vec<SocketAddr>, ClientError> {
        let list = target.strip_prefix(STATIC_PREFIX).unwrap_or(target);
        let mut addresses = Vec::new();

        for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let resolved = tokio::net::lookup_host(entry)
                .await
                .map_err(|e| ClientError::Resolve {
                    target: target.to_string(),
                    reason: format!("{entry}: {e}"),
                })?;
            addresses.extend(resolved);
        }

        if addresses.is_empty() {
            return Err(ClientError::NoEndpoints {
                target: target.to_string(),
            });
        }
        Ok(addresses)
    }
}

/// Returns the host part of the first entry in `target`, used as the TLS server name.
#[cfg(feature = "tls")]
pub(crate) fn authority_host(target: &str) -> &str {
    let list = target.strip_prefix(STATIC_PREFIX).unwrap_or(target);
    let first = list.split(',').next().unwrap_or(list).trim();
    if let Some(rest) = first.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    first.rsplit_once(':').map_or(first, |(host, _)| host)
}
