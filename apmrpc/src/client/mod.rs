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

//! Agent-side channel construction.
//!
//! A [`ChannelFactoryBuilder`] collects everything a channel needs (header
//! source, connection options, optional TLS, interceptors) and
//! [`build`](ChannelFactoryBuilder::build)s an immutable [`ChannelFactory`].
//! The factory then opens any number of [`ClientChannel`]s that all share
//! that frozen configuration.
//!
//! # Examples
//!
//! ```rust,no_run
//! use apmrpc::client::{AgentHeaderFactory, ChannelFactoryBuilder, ClientOption};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut builder = ChannelFactoryBuilder::new("MetadataChannel")?;
//! builder.set_header_factory(Arc::new(AgentHeaderFactory::new("agent-1", "shop", 1_700_000_000_000, 1010)));
//! builder.set_client_option(ClientOption::default())?;
//! builder.set_executor_queue_size(512)?;
//!
//! let factory = builder.build()?;
//! let channel = factory.new_channel("127.0.0.1:9991").await?;
//! let reply = channel.call("v1.Metadata/RequestApiMetaData", Vec::new()).await?;
//! # let _ = reply;
//! # Ok(())
//! # }
//! ```

mod builder;
mod channel;
mod error;
mod factory;
mod header;
mod interceptor;
mod option;
mod proxy;
mod resolver;
mod ssl;

pub use self::builder::{ChannelFactoryBuilder, DEFAULT_EXECUTOR_QUEUE_SIZE};
pub use self::channel::ClientChannel;
pub use self::error::ClientError;
pub use self::factory::ChannelFactory;
pub use self::header::{
    AGENT_ID, AGENT_NAME, AGENT_START_TIME, APPLICATION_NAME, AgentHeaderFactory, HeaderFactory,
    Metadata, SERVICE_TYPE,
};
pub use self::interceptor::{CallContext, CallOutcome, ClientInterceptor, InterceptorChain};
pub use self::option::{ClientOption, DEFAULT_PROVIDER_TYPE, Resource, SslOption};
pub use self::proxy::{ProxyHeader, ProxyHeaderError, ProxyRequestType};
pub use self::resolver::{NameResolverProvider, StaticResolverProvider};
pub use self::ssl::{SslConfig, SslProvider};
