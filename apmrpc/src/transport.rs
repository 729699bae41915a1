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

//! Byte-stream transports between agents and the collector.
//!
//! Every connection is a [`Transport`]: an async byte stream carrying
//! [`TransportMetadata`] with a process-unique [`TransportId`]. The collector
//! surfaces that identity to its lifecycle listeners, and the agent side
//! stacks TLS on top of TCP when the resolved
//! [`SslConfig`](crate::client::SslConfig) asks for it.
//!
//! | Transport | Use |
//! |-----------|-----|
//! | [`TcpTransport`] | agent to collector over the network |
//! | [`TlsTransport`] | TLS over any other transport (`tls` feature) |
//! | [`MemoryTransport`] | in-process pairs for tests |

mod error;
mod memory;
mod tcp;
#[cfg(feature = "tls")]
mod tls;
mod traits;
mod types;

pub use self::error::TransportError;
pub use self::memory::MemoryTransport;
pub use self::tcp::TcpTransport;
#[cfg(feature = "tls")]
pub use self::tls::{TlsConfig, TlsTransport};
pub use self::traits::{ShutdownFuture, Transport};
pub use self::types::{TransportId, TransportMetadata};
