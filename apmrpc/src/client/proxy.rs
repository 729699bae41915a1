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

//! Proxy identification.
//!
//! A reverse proxy in front of an instrumented application can stamp each
//! request with a header recording when the proxy received it. The agent
//! forwards that header to the collector so proxy time shows up in the trace.

use std::fmt;
use thiserror::Error;

/// Catalog of proxies whose headers the agent understands.
///
/// New proxies are added as variants here; behavior never varies outside
/// this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyRequestType {
    /// Apache httpd with `mod_headers`.
    Apache,
}

impl ProxyRequestType {
    /// Every known proxy type.
    pub const ALL: [ProxyRequestType; 1] = [ProxyRequestType::Apache];

    /// HTTP header the proxy writes.
    #[must_use]
    pub const fn header_name(&self) -> &'static str {
        match self {
            Self::Apache => "Pinpoint-ProxyApache",
        }
    }

    /// Name shown for the proxy hop; `_name` is ignored by proxies with a fixed label.
    #[must_use]
    pub fn display_name(&self, _name: &str) -> String {
        match self {
            Self::Apache => "PROXY(APACHE)".to_string(),
        }
    }

    /// Numeric code carried on the wire.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::Apache => 3,
        }
    }

    /// Whether the header value carries an application name.
    #[must_use]
    pub const fn uses_application_context(&self) -> bool {
        match self {
            Self::Apache => false,
        }
    }

    /// Looks a proxy type up by wire code.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    /// Looks a proxy type up by header name, ignoring ASCII case.
    pub fn from_header_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.header_name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for ProxyRequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header_name())
    }
}

/// Failure to parse a proxy header value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProxyHeaderError {
    /// The mandatory receive timestamp (`t=`) is missing.
    #[error("proxy header has no received time")]
    MissingReceivedTime,
    /// A field had a value that is not a number.
    #[error("proxy header field {field} has invalid value {value:?}")]
    InvalidField {
        /// Field key, e.g. `"D"`
        field: String,
        /// The offending value
        value: String,
    },
}

/// Parsed proxy header value.
///
/// Apache is configured with
/// `RequestHeader set Pinpoint-ProxyApache "t=%t D=%D i=%i b=%b"`-style
/// fields: `t` is the receive time in epoch microseconds, `D` the time
/// spent in the proxy in microseconds, `i`/`b` the idle and busy worker
/// percentages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyHeader {
    /// Which proxy produced the header
    pub proxy: ProxyRequestType,
    /// Receive time in epoch milliseconds
    pub received_time_millis: i64,
    /// Time spent in the proxy, in microseconds
    pub duration_micros: Option<i32>,
    /// Idle worker percentage
    pub idle_percent: Option<i16>,
    /// Busy worker percentage
    pub busy_percent: Option<i16>,
}

impl ProxyHeader {
    /// Parses a header value written by `proxy`.
    ///
    /// Unknown keys are skipped so newer proxy configurations do not break
    /// older agents.
    ///
    /// ```rust
    /// use apmrpc::client::{ProxyHeader, ProxyRequestType};
    ///
    /// let header = ProxyHeader::parse(ProxyRequestType::Apache, "t=1502861340123456 D=1200").unwrap();
    /// assert_eq!(header.received_time_millis, 1502861340123);
    /// assert_eq!(header.duration_micros, Some(1200));
    /// ```
    pub fn parse(proxy: ProxyRequestType, value: &str) -> Result<Self, ProxyHeaderError> {
        let mut received_micros = None;
        let mut header = Self {
            proxy,
            received_time_millis: 0,
            duration_micros: None,
            idle_percent: None,
            busy_percent: None,
        };

        for token in value.split_whitespace() {
            let Some((key, raw)) = token.split_once('=') else {
                continue;
            };
            match key {
                "t" => received_micros = Some(parse_field::<i64>(key, raw)?),
                "D" => header.duration_micros = Some(parse_field(key, raw)?),
                "i" => header.idle_percent = Some(parse_field(key, raw)?),
                "b" => header.busy_percent = Some(parse_field(key, raw)?),
                _ => {}
            }
        }

        let micros = received_micros.ok_or(ProxyHeaderError::MissingReceivedTime)?;
        header.received_time_millis = micros / 1000;
        Ok(header)
    }
}

fn parse_field<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ProxyHeaderError> {
    raw.parse().map_err(|_| ProxyHeaderError::InvalidField {
        field: key.to_string(),
        value: raw.to_string(),
    })
}
