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

#![doc = include_str!("../../README.md")]
#![allow(clippy::module_inception)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

//! ## Architecture
//!
//! apmrpc is organized into layers, each usable on its own:
//!
//! - **[`transport`]**: byte streams between agent and collector (TCP, TLS, memory)
//! - **[`serialization`]**: length-prefixed frames and payload encodings
//! - **[`client`]**: agent side; [`ChannelFactoryBuilder`](client::ChannelFactoryBuilder)
//!   validates configuration once and yields a [`ChannelFactory`](client::ChannelFactory)
//! - **[`server`]**: collector accept loop and decorated lifecycle listeners
//! - **[`dispatch`]**: per-message handlers that turn every outcome into a response
//! - **[`interceptor`]**: fault isolation for instrumentation hooks
//! - **[`observability`]**: counters, error callbacks and structured error logging
//!
//! ## Error Handling
//!
//! Each layer has its own error type and [`ApmError`] ties them together:
//!
//! - [`TransportError`](transport::TransportError): the byte stream broke
//! - [`ClientError`](client::ClientError): factory configuration or a call failed
//! - [`DispatchError`](dispatch::DispatchError): one inbound message could not be handled
//! - [`InstrumentationFault`](interceptor::InstrumentationFault): an interceptor hook failed
//!
//! Dispatch errors and instrumentation faults never escape their message or
//! hook; they are logged, counted and turned into a response or a handler call.
//!
//! ## Features
//!
//! - **`json`** (default): JSON payload encoding
//! - **`tls`** (default): TLS between agents and the collector via rustls
//! - **`observability`** (default): report counters to the `metrics` facade
//!
//! ## Safety
//!
//! apmrpc is written in 100% safe Rust with `#![deny(unsafe_code)]`.

pub mod client;
pub mod dispatch;
pub mod error;
pub mod interceptor;
pub mod observability;
pub mod serialization;
pub mod server;
pub mod transport;

pub use client::{ChannelFactory, ChannelFactoryBuilder, ClientChannel, ClientError};
pub use dispatch::{DispatchError, RequestResponseHandler};
pub use error::ApmError;
pub use interceptor::{AroundInterceptor, ExceptionHandler, FaultIsolatingInterceptor};
pub use observability::{DispatchMetrics, ErrorMetrics, ErrorObserver, TransportMetrics, log_error};
pub use server::{CollectorServer, ServerListener, ServerListenerDelegator};
pub use transport::{Transport, TransportError};
