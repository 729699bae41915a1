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

//! Immutable channel factory.

#[cfg(feature = "tls")]
use crate::client::resolver::authority_host;
use crate::client::{
    ClientChannel, ClientError, ClientOption, HeaderFactory, InterceptorChain,
    NameResolverProvider, SslConfig, StaticResolverProvider,
};
use crate::transport::{TcpTransport, Transport, TransportError};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Opens channels to collector endpoints with a frozen configuration.
///
/// Produced by [`ChannelFactoryBuilder::build`](crate::client::ChannelFactoryBuilder::build).
/// Nothing in a factory can change after it is built, so clones can be handed
/// to any number of tasks without locking.
#[derive(Clone)]
pub struct ChannelFactory {
    inner: Arc<FactoryInner>,
}

struct FactoryInner {
    name: String,
    executor_queue_size: usize,
    header_factory: Arc<dyn HeaderFactory>,
    name_resolver_provider: Option<Arc<dyn NameResolverProvider>>,
    client_option: ClientOption,
    ssl_config: SslConfig,
    interceptors: InterceptorChain,
}

impl ChannelFactory {
    pub(crate) fn new(
        name: String,
        executor_queue_size: usize,
        header_factory: Arc<dyn HeaderFactory>,
        name_resolver_provider: Option<Arc<dyn NameResolverProvider>>,
        client_option: ClientOption,
        ssl_config: SslConfig,
        interceptors: InterceptorChain,
    ) -> Self {
        Self {
            inner: Arc::new(FactoryInner {
                name,
                executor_queue_size,
                header_factory,
                name_resolver_provider,
                client_option,
                ssl_config,
                interceptors,
            }),
        }
    }

    /// Factory name, used in logs.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Maximum calls queued per channel.
    #[must_use]
    pub fn executor_queue_size(&self) -> usize {
        self.inner.executor_queue_size
    }

    /// Per-call header source.
    #[must_use]
    pub fn header_factory(&self) -> &Arc<dyn HeaderFactory> {
        &self.inner.header_factory
    }

    /// Custom resolver, if one was configured.
    #[must_use]
    pub fn name_resolver_provider(&self) -> Option<&Arc<dyn NameResolverProvider>> {
        self.inner.name_resolver_provider.as_ref()
    }

    /// Connection tuning.
    #[must_use]
    pub fn client_option(&self) -> &ClientOption {
        &self.inner.client_option
    }

    /// Resolved TLS posture.
    #[must_use]
    pub fn ssl_config(&self) -> &SslConfig {
        &self.inner.ssl_config
    }

    /// Interceptor snapshot, outermost first.
    #[must_use]
    pub fn interceptors(&self) -> &InterceptorChain {
        &self.inner.interceptors
    }

    /// Opens a channel to `target`.
    ///
    /// The target is resolved with the configured resolver (a static
    /// `host:port[,host:port...]` list by default) and the addresses are tried
    /// in order until one accepts within the connect timeout. When TLS is
    /// enabled the first target host is the expected server name.
    pub async fn new_channel(&self, target: &str) -> Result<ClientChannel, ClientError> {
        let inner = &self.inner;
        let addresses = match &inner.name_resolver_provider {
            Some(provider) => provider.resolve(target).await?,
            None => StaticResolverProvider.resolve(target).await?,
        };

        let option = &inner.client_option;
        let mut tcp = None;
        for address in addresses {
            match TcpTransport::connect_timeout(address, option.connect_timeout).await {
                Ok(transport) => {
                    tcp = Some(transport);
                    break;
                }
                Err(error) => {
                    warn!(factory = %inner.name, %address, %error, "endpoint unreachable, trying next");
                }
            }
        }
        let tcp = tcp.ok_or_else(|| ClientError::NoEndpoints {
            target: target.to_string(),
        })?;
        tcp.set_nodelay(option.tcp_nodelay)
            .map_err(TransportError::from)?;

        let transport = self.secure(tcp, target).await?;
        info!(
            factory = %inner.name,
            endpoint = target,
            transport_id = %transport.metadata().id,
            transport_type = %transport.metadata().transport_type,
            "channel opened"
        );

        Ok(ClientChannel::new(
            target.to_string(),
            transport,
            inner.header_factory.clone(),
            inner.interceptors.clone(),
            inner.client_option.clone(),
            inner.executor_queue_size,
        ))
    }

    #[cfg(feature = "tls")]
    async fn secure(&self, tcp: TcpTransport, target: &str) -> Result<Box<dyn Transport>, ClientError> {
        use crate::transport::TlsTransport;

        let Some(tls) = self.inner.ssl_config.client_tls_config(authority_host(target)).await? else {
            return Ok(Box::new(tcp));
        };
        let timeout = self.inner.client_option.connect_timeout;
        let transport = tokio::time::timeout(timeout, TlsTransport::connect(tcp, tls))
            .await
            .map_err(|_| TransportError::Timeout { duration: timeout })??;
        Ok(Box::new(transport))
    }

    #[cfg(not(feature = "tls"))]
    async fn secure(&self, tcp: TcpTransport, _target: &str) -> Result<Box<dyn Transport>, ClientError> {
        if self.inner.ssl_config.is_enabled() {
            return Err(ClientError::TlsUnavailable);
        }
        Ok(Box::new(tcp))
    }
}

impl fmt::Debug for ChannelFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = &self.inner;
        f.debug_struct("ChannelFactory")
            .field("name", &inner.name)
            .field("executor_queue_size", &inner.executor_queue_size)
            .field(
                "name_resolver_provider",
                &inner.name_resolver_provider.as_ref().map(|p| p.scheme()),
            )
            .field("client_option", &inner.client_option)
            .field("ssl_config", &inner.ssl_config)
            .field("interceptors", &inner.interceptors)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{AgentHeaderFactory, ChannelFactoryBuilder};
    use async_trait::async_trait;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedResolver {
        addresses: Vec<SocketAddr>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl NameResolverProvider for FixedResolver {
        fn scheme(&self) -> &str {
            "fixed"
        }

        async fn resolve(&self, _target: &str) -> Result<Vec<SocketAddr>, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.addresses.clone())
        }
    }

    fn builder() -> ChannelFactoryBuilder {
        let mut builder = ChannelFactoryBuilder::new("TestChannel").unwrap();
        builder.set_header_factory(Arc::new(AgentHeaderFactory::new("agent-1", "app", 1000, 1010)));
        builder
            .set_client_option(
                ClientOption::default().with_connect_timeout(std::time::Duration::from_millis(500)),
            )
            .unwrap();
        builder
    }

    #[tokio::test]
    async fn test_custom_resolver_is_used_and_dead_endpoints_skipped() {
        let listener = TcpTransport::bind("127.0.0.1:0").await.unwrap();
        let live = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = TcpTransport::accept(&listener).await;
        });

        let resolver = Arc::new(FixedResolver {
            addresses: vec!["127.0.0.1:1".parse().unwrap(), live],
            calls: AtomicUsize::new(0),
        });
        let mut builder = builder();
        builder.set_name_resolver_provider(resolver.clone());
        let factory = builder.build().unwrap();

        let channel = factory.new_channel("fixed:///collector").await.unwrap();
        assert_eq!(channel.target(), "fixed:///collector");
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_reachable_endpoint() {
        let factory = builder().build().unwrap();
        let result = factory.new_channel("127.0.0.1:1").await;
        assert!(matches!(result, Err(ClientError::NoEndpoints { .. })));
    }

    #[cfg(not(feature = "tls"))]
    #[tokio::test]
    async fn test_enabled_ssl_without_tls_support_is_rejected() {
        let listener = TcpTransport::bind("127.0.0.1:0").await.unwrap();
        let live = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = TcpTransport::accept(&listener).await;
        });

        let mut builder = builder();
        builder
            .set_ssl_option(Some(crate::client::SslOption::new().with_enable(true)))
            .unwrap();
        let factory = builder.build().unwrap();

        let result = factory.new_channel(&live.to_string()).await;
        assert!(matches!(result, Err(ClientError::TlsUnavailable)));
    }

    #[test]
    fn test_factory_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ChannelFactory>();
    }

    #[test]
    fn test_debug_output() {
        let factory = builder().build().unwrap();
        let debug = format!("{:?}", factory);
        assert!(debug.contains("TestChannel"));
        assert!(debug.contains("executor_queue_size: 1024"));
    }
}
