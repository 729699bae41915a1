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

//! Builder for [`ChannelFactory`].

use crate::client::{
    ChannelFactory, ClientError, ClientInterceptor, ClientOption, HeaderFactory,
    InterceptorChain, NameResolverProvider, SslConfig, SslOption,
};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Default number of calls a channel lets queue before failing fast.
pub const DEFAULT_EXECUTOR_QUEUE_SIZE: usize = 1024;

/// Accumulates channel configuration and freezes it into a [`ChannelFactory`].
///
/// Setters check their own input immediately. [`build`](Self::build) only
/// checks that the required capabilities were provided, then snapshots
/// everything, so the builder can keep changing without affecting factories
/// it already produced.
///
/// # Examples
///
/// ```rust
/// use apmrpc::client::{AgentHeaderFactory, ChannelFactoryBuilder, ClientOption};
/// use std::sync::Arc;
///
/// # fn example() -> Result<(), apmrpc::client::ClientError> {
/// let mut builder = ChannelFactoryBuilder::new("MetadataChannel")?;
/// builder.set_executor_queue_size(512)?;
/// builder.set_header_factory(Arc::new(AgentHeaderFactory::new("agent-1", "checkout", 1000, 1010)));
/// builder.set_client_option(ClientOption::default())?;
///
/// let factory = builder.build()?;
/// assert_eq!(factory.executor_queue_size(), 512);
/// assert!(!factory.ssl_config().is_enabled());
/// # Ok(())
/// # }
/// ```
pub struct ChannelFactoryBuilder {
    factory_name: String,
    executor_queue_size: usize,
    header_factory: Option<Arc<dyn HeaderFactory>>,
    client_option: Option<ClientOption>,
    ssl_option: Option<SslOption>,
    interceptors: VecDeque<Arc<dyn ClientInterceptor>>,
    name_resolver_provider: Option<Arc<dyn NameResolverProvider>>,
}

impl ChannelFactoryBuilder {
    /// Starts a builder for a factory called `factory_name`, which must not be blank.
    pub fn new(factory_name: impl Into<String>) -> Result<Self, ClientError> {
        let factory_name = factory_name.into();
        if factory_name.trim().is_empty() {
            return Err(ClientError::invalid("factory name must not be empty"));
        }

        Ok(Self {
            factory_name,
            executor_queue_size: DEFAULT_EXECUTOR_QUEUE_SIZE,
            header_factory: None,
            client_option: None,
            ssl_option: None,
            interceptors: VecDeque::new(),
            name_resolver_provider: None,
        })
    }

    /// Sets how many calls may be queued on one channel. Must be `> 0`.
    ///
    /// Takes a signed value because queue sizes usually come straight from
    /// configuration files, where a negative number is a typo to report
    /// rather than wrap.
    pub fn set_executor_queue_size(&mut self, executor_queue_size: i64) -> Result<(), ClientError> {
        if executor_queue_size <= 0 {
            return Err(ClientError::invalid(format!(
                "executor_queue_size must be > 0, got {executor_queue_size}"
            )));
        }
        self.executor_queue_size = usize::try_from(executor_queue_size).map_err(|_| {
            ClientError::invalid(format!(
                "executor_queue_size {executor_queue_size} does not fit this platform"
            ))
        })?;
        Ok(())
    }

    /// Sets the per-call header source. Required.
    pub fn set_header_factory(&mut self, header_factory: Arc<dyn HeaderFactory>) {
        self.header_factory = Some(header_factory);
    }

    /// Sets the connection tuning. Required; validated here.
    pub fn set_client_option(&mut self, client_option: ClientOption) -> Result<(), ClientError> {
        client_option.validate()?;
        self.client_option = Some(client_option);
        Ok(())
    }

    /// Sets or clears the TLS option. An enabled option must name a known provider.
    pub fn set_ssl_option(&mut self, ssl_option: Option<SslOption>) -> Result<(), ClientError> {
        if let Some(option) = &ssl_option {
            option.validate()?;
        }
        self.ssl_option = ssl_option;
        Ok(())
    }

    /// Sets the endpoint resolution strategy. Defaults to a static address list.
    pub fn set_name_resolver_provider(&mut self, provider: Arc<dyn NameResolverProvider>) {
        self.name_resolver_provider = Some(provider);
    }

    /// Inserts an interceptor as the new outermost layer.
    pub fn add_first_interceptor(&mut self, interceptor: Arc<dyn ClientInterceptor>) {
        debug!(factory = %self.factory_name, interceptor = interceptor.name(), "add first interceptor");
        self.interceptors.push_front(interceptor);
    }

    /// Appends an interceptor as the new innermost layer.
    pub fn add_interceptor(&mut self, interceptor: Arc<dyn ClientInterceptor>) {
        debug!(factory = %self.factory_name, interceptor = interceptor.name(), "add interceptor");
        self.interceptors.push_back(interceptor);
    }

    /// Freezes the current configuration into a new factory.
    ///
    /// # Errors
    ///
    /// [`ClientError::MissingDependency`] if no header factory or no client
    /// option was set.
    pub fn build(&self) -> Result<ChannelFactory, ClientError> {
        info!(factory = %self.factory_name, "build ChannelFactory");

        let header_factory = self
            .header_factory
            .clone()
            .ok_or(ClientError::MissingDependency {
                dependency: "header_factory",
            })?;
        let client_option = self
            .client_option
            .clone()
            .ok_or(ClientError::MissingDependency {
                dependency: "client_option",
            })?;
        let ssl_config = SslConfig::from_option(self.ssl_option.as_ref());

        Ok(ChannelFactory::new(
            self.factory_name.clone(),
            self.executor_queue_size,
            header_factory,
            self.name_resolver_provider.clone(),
            client_option,
            ssl_config,
            InterceptorChain::new(self.interceptors.iter().cloned()),
        ))
    }
}

impl fmt::Debug for ChannelFactoryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelFactoryBuilder")
            .field("factory_name", &self.factory_name)
            .field("executor_queue_size", &self.executor_queue_size)
            .field("header_factory", &self.header_factory.is_some())
            .field("client_option", &self.client_option)
            .field("ssl_option", &self.ssl_option)
            .field("interceptors", &self.interceptors.len())
            .field("name_resolver_provider", &self.name_resolver_provider.as_ref().map(|p| p.scheme()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{AgentHeaderFactory, Resource, StaticResolverProvider};

    struct Named(&'static str);

    impl ClientInterceptor for Named {
        fn name(&self) -> &str {
            self.0
        }
    }

    fn ready_builder() -> ChannelFactoryBuilder {
        let mut builder = ChannelFactoryBuilder::new("AgentChannel").unwrap();
        builder.set_header_factory(Arc::new(AgentHeaderFactory::new("agent-1", "app", 1000, 1010)));
        builder.set_client_option(ClientOption::default()).unwrap();
        builder
    }

    #[test]
    fn test_blank_name_is_rejected() {
        assert!(matches!(
            ChannelFactoryBuilder::new("  "),
            Err(ClientError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_non_positive_queue_size_is_rejected() {
        let mut builder = ready_builder();
        for size in [0, -1, i64::MIN] {
            assert!(matches!(
                builder.set_executor_queue_size(size),
                Err(ClientError::InvalidConfiguration { .. })
            ));
        }
        assert_eq!(builder.build().unwrap().executor_queue_size(), DEFAULT_EXECUTOR_QUEUE_SIZE);
    }

    #[test]
    fn test_positive_queue_size_reaches_factory() {
        for size in [1, 7, 1024, 65_536] {
            let mut builder = ready_builder();
            builder.set_executor_queue_size(size).unwrap();
            assert_eq!(builder.build().unwrap().executor_queue_size(), size as usize);
        }
    }

    #[test]
    fn test_missing_header_factory() {
        let mut builder = ChannelFactoryBuilder::new("AgentChannel").unwrap();
        builder.set_client_option(ClientOption::default()).unwrap();
        builder.set_executor_queue_size(8).unwrap();
        builder.add_interceptor(Arc::new(Named("a")));
        builder
            .set_ssl_option(Some(SslOption::new().with_enable(true)))
            .unwrap();
        builder.set_name_resolver_provider(Arc::new(StaticResolverProvider));

        assert!(matches!(
            builder.build(),
            Err(ClientError::MissingDependency {
                dependency: "header_factory"
            })
        ));
    }

    #[test]
    fn test_missing_client_option() {
        let mut builder = ChannelFactoryBuilder::new("AgentChannel").unwrap();
        builder.set_header_factory(Arc::new(AgentHeaderFactory::new("agent-1", "app", 1000, 1010)));

        assert!(matches!(
            builder.build(),
            Err(ClientError::MissingDependency {
                dependency: "client_option"
            })
        ));
    }

    #[test]
    fn test_invalid_client_option_fails_at_setter() {
        let mut builder = ChannelFactoryBuilder::new("AgentChannel").unwrap();
        let option = ClientOption::default().with_request_timeout(std::time::Duration::ZERO);
        assert!(builder.set_client_option(option).is_err());
    }

    #[test]
    fn test_unknown_ssl_provider_fails_at_setter() {
        let mut builder = ready_builder();
        let option = SslOption::new().with_enable(true).with_provider_type("SCHANNEL");
        assert!(builder.set_ssl_option(Some(option)).is_err());
    }

    #[test]
    fn test_ssl_resolution() {
        let mut builder = ready_builder();
        assert_eq!(*builder.build().unwrap().ssl_config(), SslConfig::DISABLED);

        builder
            .set_ssl_option(Some(SslOption::new().with_provider_type("OPENSSL")))
            .unwrap();
        assert_eq!(*builder.build().unwrap().ssl_config(), SslConfig::DISABLED);

        let resource = Resource::Path("/etc/apm/ca.pem".into());
        builder
            .set_ssl_option(Some(
                SslOption::new()
                    .with_enable(true)
                    .with_provider_type("JDK")
                    .with_trust_cert_resource(resource.clone()),
            ))
            .unwrap();
        assert_eq!(
            *builder.build().unwrap().ssl_config(),
            SslConfig::enabled("JDK", Some(resource))
        );

        builder.set_ssl_option(None).unwrap();
        assert_eq!(*builder.build().unwrap().ssl_config(), SslConfig::DISABLED);
    }

    #[test]
    fn test_interceptor_order() {
        let mut builder = ready_builder();
        builder.add_first_interceptor(Arc::new(Named("A")));
        builder.add_interceptor(Arc::new(Named("B")));
        builder.add_first_interceptor(Arc::new(Named("C")));

        let factory = builder.build().unwrap();
        assert_eq!(factory.interceptors().names(), vec!["C", "A", "B"]);
    }

    #[test]
    fn test_factory_is_isolated_from_later_mutation() {
        let mut builder = ready_builder();
        builder.add_interceptor(Arc::new(Named("A")));
        let first = builder.build().unwrap();

        builder.add_interceptor(Arc::new(Named("B")));
        builder.add_first_interceptor(Arc::new(Named("C")));
        builder.set_executor_queue_size(3).unwrap();
        let second = builder.build().unwrap();

        assert_eq!(first.interceptors().names(), vec!["A"]);
        assert_eq!(first.executor_queue_size(), DEFAULT_EXECUTOR_QUEUE_SIZE);
        assert_eq!(second.interceptors().names(), vec!["C", "A", "B"]);
        assert_eq!(second.executor_queue_size(), 3);
    }

    #[test]
    fn test_build_twice_gives_equal_independent_factories() {
        let mut builder = ready_builder();
        builder.add_interceptor(Arc::new(Named("A")));
        let a = builder.build().unwrap();
        let b = builder.build().unwrap();
        assert_eq!(a.name(), b.name());
        assert_eq!(a.interceptors().names(), b.interceptors().names());
    }
}
