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

//! Per-call metadata headers.

use crate::client::ProxyRequestType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Header name carrying the agent ID.
pub const AGENT_ID: &str = "agentid";
/// Header name carrying the optional human-readable agent name.
pub const AGENT_NAME: &str = "agentname";
/// Header name carrying the application name.
pub const APPLICATION_NAME: &str = "applicationname";
/// Header name carrying the agent start time in epoch millis.
pub const AGENT_START_TIME: &str = "starttime";
/// Header name carrying the agent's service type code.
pub const SERVICE_TYPE: &str = "servicetype";

/// Ordered collection of call headers.
///
/// Keys are unique; inserting an existing key replaces its value in place so
/// the original ordering is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    entries: Vec<(String, String)>,
}

impl Metadata {
    /// Creates an empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a header, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Returns the value of `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Iterates over headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of headers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no headers.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Produces the headers attached to every call on a channel.
///
/// Implementations are shared by every channel a factory opens and are called
/// once per call, so they should be cheap and must not block.
pub trait HeaderFactory: Send + Sync {
    /// Builds a fresh header set for one call.
    fn new_headers(&self) -> Metadata;
}

/// Standard agent identification headers.
///
/// # Examples
///
/// ```rust
/// use apmrpc::client::{AgentHeaderFactory, HeaderFactory, ProxyRequestType};
///
/// let factory = AgentHeaderFactory::new("agent-1", "checkout", 1_700_000_000_000, 1010)
///     .with_proxy_header(ProxyRequestType::Apache, "t=1502861340123456 D=1200");
///
/// let headers = factory.new_headers();
/// assert_eq!(headers.get("agentid"), Some("agent-1"));
/// assert_eq!(headers.get("Pinpoint-ProxyApache"), Some("t=1502861340123456 D=1200"));
/// ```
#[derive(Debug, Clone)]
pub struct AgentHeaderFactory {
    agent_id: String,
    agent_name: Option<String>,
    application_name: String,
    agent_start_time: i64,
    service_type: i32,
    proxy: Option<(ProxyRequestType, String)>,
}

impl AgentHeaderFactory {
    /// Creates a factory for one agent process.
    pub fn new(
        agent_id: impl Into<String>,
        application_name: impl Into<String>,
        agent_start_time: i64,
        service_type: i32,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            agent_name: None,
            application_name: application_name.into(),
            agent_start_time,
            service_type,
            proxy: None,
        }
    }

    /// Adds the optional human-readable agent name.
    pub fn with_agent_name(mut self, agent_name: impl Into<String>) -> Self {
        self.agent_name = Some(agent_name.into());
        self
    }

    /// Forwards a proxy identification header under the proxy type's header name.
    pub fn with_proxy_header(mut self, proxy: ProxyRequestType, value: impl Into<String>) -> Self {
        self.proxy = Some((proxy, value.into()));
        self
    }

    /// Returns the agent ID.
    #[must_use]
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }
}

impl HeaderFactory for AgentHeaderFactory {
    fn new_headers(&self) -> Metadata {
        let mut headers = Metadata::new();
        headers.insert(AGENT_ID, self.agent_id.as_str());
        if let Some(name) = &self.agent_name {
            headers.insert(AGENT_NAME, name.as_str());
        }
        headers.insert(APPLICATION_NAME, self.application_name.as_str());
        headers.insert(AGENT_START_TIME, self.agent_start_time.to_string());
        headers.insert(SERVICE_TYPE, self.service_type.to_string());
        if let Some((proxy, value)) = &self.proxy {
            headers.insert(proxy.header_name(), value.as_str());
        }
        headers
    }
}
