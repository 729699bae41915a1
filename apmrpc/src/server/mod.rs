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

//! Collector side: the accept loop and its lifecycle listeners.
//!
//! A [`CollectorServer`] accepts agent connections and hands each decoded
//! request to a [`RequestResponseHandler`](crate::dispatch::RequestResponseHandler).
//! Connection lifecycle events go to a [`ServerListener`], which a
//! [`ServerListenerDelegator`] can decorate before the server starts.
//! [`LogIdServerListenerDelegator`] attaches the transport identity to every
//! per-transport event.

mod collector;
mod delegator;
mod listener;

pub use self::collector::CollectorServer;
pub use self::delegator::{LogIdAttachListener, LogIdServerListenerDelegator, ServerListenerDelegator};
pub use self::listener::{
    LoggingServerListener, REMOTE_ADDR, ServerListener, ServerTransport, ServerTransportListener,
    TRANSPORT_TYPE,
};
