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

//! Inbound message envelopes.

use crate::client::Metadata;
use serde::{Deserialize, Serialize};
use std::fmt;

/// API metadata reported by an agent: one instrumented method signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMetaData {
    /// Reporting agent
    pub agent_id: String,
    /// Agent start time, epoch millis
    pub agent_start_time: i64,
    /// Agent-local API id
    pub api_id: i32,
    /// Source line, when the agent knows it
    pub line: Option<i32>,
    /// Raw method type code, when the agent sent one
    pub method_type: Option<i32>,
    /// Human-readable API description, e.g. `"GET /x"`
    pub api_info: String,
}

/// A string interned by an agent and referenced by id in later spans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringMetaData {
    /// Reporting agent
    pub agent_id: String,
    /// Agent start time, epoch millis
    pub agent_start_time: i64,
    /// Agent-local string id
    pub string_id: i32,
    /// The interned string
    pub string_value: String,
}

/// A normalized SQL statement reported by an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlMetaData {
    /// Reporting agent
    pub agent_id: String,
    /// Agent start time, epoch millis
    pub agent_start_time: i64,
    /// Agent-local SQL id
    pub sql_id: i32,
    /// Normalized statement text
    pub sql: String,
}

/// The closed set of message kinds the collector understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestPayload {
    /// See [`ApiMetaData`]
    ApiMetaData(ApiMetaData),
    /// See [`StringMetaData`]
    StringMetaData(StringMetaData),
    /// See [`SqlMetaData`]
    SqlMetaData(SqlMetaData),
}

impl RequestPayload {
    /// The payload's kind, used for routing and logging.
    pub const fn kind(&self) -> PayloadKind {
        match self {
            RequestPayload::ApiMetaData(_) => PayloadKind::ApiMetaData,
            RequestPayload::StringMetaData(_) => PayloadKind::StringMetaData,
            RequestPayload::SqlMetaData(_) => PayloadKind::SqlMetaData,
        }
    }
}

/// Discriminant of a [`RequestPayload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PayloadKind {
    /// API metadata
    ApiMetaData,
    /// String metadata
    StringMetaData,
    /// SQL metadata
    SqlMetaData,
}

impl PayloadKind {
    /// Stable name of the kind.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PayloadKind::ApiMetaData => "ApiMetaData",
            PayloadKind::StringMetaData => "StringMetaData",
            PayloadKind::SqlMetaData => "SqlMetaData",
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One inbound message together with the call it arrived on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestEnvelope {
    /// Method the agent called
    pub method: String,
    /// Headers the agent attached to the call
    pub headers: Metadata,
    /// The decoded message
    pub payload: RequestPayload,
}

impl RequestEnvelope {
    /// Wraps `payload` with no method name and no headers.
    pub fn new(payload: RequestPayload) -> Self {
        Self {
            method: String::new(),
            headers: Metadata::new(),
            payload,
        }
    }

    /// Sets the method name.
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Sets the call headers.
    pub fn with_headers(mut self, headers: Metadata) -> Self {
        self.headers = headers;
        self
    }

    /// Shorthand for `self.payload.kind()`.
    pub const fn kind(&self) -> PayloadKind {
        self.payload.kind()
    }
}
