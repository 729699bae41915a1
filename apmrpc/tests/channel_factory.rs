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

//! Integration tests for agent-side channel construction.
//!
//! These tests verify:
//! - Builder validation and required capabilities
//! - Factories are frozen snapshots of the builder
//! - Interceptor ordering across a real collector round trip
//! - TLS channels against a TLS collector

mod common;

use apmrpc::client::{
    AgentHeaderFactory, CallContext, CallOutcome, ChannelFactoryBuilder, ClientError,
    ClientInterceptor, ClientOption, Metadata, Resource, SslOption,
};
use apmrpc::dispatch::{
    RequestEnvelope, RequestResponseHandler, ResponseResult, ServerResponse,
};
use apmrpc::serialization::PostcardSerializer;
use apmrpc::server::CollectorServer;
use apmrpc::transport::TcpTransport;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;

/// Answers every message with success.
struct AcceptAll;

#[async_trait]
impl RequestResponseHandler for AcceptAll {
    fn name(&self) -> &str {
        "AcceptAll"
    }

    async fn handle_request(&self, _request: &RequestEnvelope, response: &mut dyn ServerResponse) {
        response.write(ResponseResult::success());
    }
}

struct Tagging {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

impl ClientInterceptor for Tagging {
    fn name(&self) -> &str {
        self.name
    }

    fn on_start(&self, _call: &CallContext, headers: &mut Metadata) -> Result<(), ClientError> {
        self.log.lock().push(format!("start:{}", self.name));
        headers.insert(format!("x-{}", self.name), "1");
        Ok(())
    }

    fn on_complete(&self, _call: &CallContext, outcome: &CallOutcome<'_>) {
        let responded = matches!(outcome, CallOutcome::Completed { responded: true });
        self.log
            .lock()
            .push(format!("complete:{}:{}", self.name, responded));
    }
}

fn builder() -> ChannelFactoryBuilder {
    let mut builder = ChannelFactoryBuilder::new("SpanChannel").unwrap();
    builder.set_header_factory(Arc::new(AgentHeaderFactory::new("agent-7", "billing", 1, 1010)));
    builder.set_client_option(ClientOption::default()).unwrap();
    builder
}

async fn start_collector(
    server: CollectorServer<PostcardSerializer>,
) -> (CollectorServer<PostcardSerializer>, SocketAddr) {
    let tcp = TcpTransport::bind("127.0.0.1:0").await.unwrap();
    let addr = tcp.local_addr().unwrap();
    let running = server.clone();
    tokio::spawn(async move { running.serve(tcp).await });
    (server, addr)
}

#[test]
fn test_builder_rejects_invalid_settings() {
    common::init_tracing();
    assert!(ChannelFactoryBuilder::new("  ").is_err());

    let mut builder = builder();
    assert!(builder.set_executor_queue_size(0).is_err());
    assert!(builder.set_executor_queue_size(-3).is_err());
    assert!(builder
        .set_ssl_option(Some(SslOption::new().with_enable(true).with_provider_type("BORINGSSL")))
        .is_err());

    let missing = ChannelFactoryBuilder::new("SpanChannel").unwrap().build();
    assert!(matches!(
        missing,
        Err(ClientError::MissingDependency { dependency: "header_factory" })
    ));
}

#[test]
fn test_factory_is_frozen_snapshot() {
    common::init_tracing();
    let mut builder = builder();
    builder.set_executor_queue_size(16).unwrap();
    let first = builder.build().unwrap();

    builder.set_executor_queue_size(32).unwrap();
    builder.add_interceptor(Arc::new(Tagging {
        name: "late",
        log: Arc::default(),
    }));
    let second = builder.build().unwrap();

    assert_eq!(first.executor_queue_size(), 16);
    assert!(first.interceptors().is_empty());
    assert_eq!(second.executor_queue_size(), 32);
    assert_eq!(second.interceptors().names(), vec!["late"]);
    assert!(!first.ssl_config().is_enabled());
}

#[tokio::test]
async fn test_interceptors_wrap_calls_outermost_first() {
    common::init_tracing();
    let (server, addr) =
        start_collector(CollectorServer::new(Arc::new(AcceptAll), PostcardSerializer::new())).await;

    let log = Arc::new(Mutex::new(Vec::new()));
    let mut builder = builder();
    builder.add_interceptor(Arc::new(Tagging {
        name: "inner",
        log: log.clone(),
    }));
    builder.add_first_interceptor(Arc::new(Tagging {
        name: "outer",
        log: log.clone(),
    }));
    let factory = builder.build().unwrap();

    let channel = factory.new_channel(&addr.to_string()).await.unwrap();
    let reply = channel.call("v1.Span/SendSpan", vec![1, 2, 3]).await.unwrap();
    assert!(reply.is_some());

    assert_eq!(
        *log.lock(),
        vec![
            "start:outer",
            "start:inner",
            "complete:inner:true",
            "complete:outer:true",
        ]
    );

    server.shutdown();
}

#[tokio::test]
async fn test_unreachable_target() {
    common::init_tracing();
    let listener = TcpTransport::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let factory = builder().build().unwrap();
    let result = factory.new_channel(&addr.to_string()).await;
    assert!(matches!(result, Err(ClientError::NoEndpoints { .. })));
}

#[cfg(feature = "tls")]
#[tokio::test]
async fn test_tls_channel_round_trip() {
    common::init_tracing();
    use apmrpc::transport::TlsConfig;

    let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let cert_pem = cert.serialize_pem().unwrap();
    let key_pem = cert.serialize_private_key_pem();

    let tls = TlsConfig::server_from_pem(cert_pem.as_bytes(), key_pem.as_bytes()).unwrap();
    let server = CollectorServer::new(Arc::new(AcceptAll), PostcardSerializer::new()).with_tls(tls);
    let (server, addr) = start_collector(server).await;

    let mut builder = builder();
    builder
        .set_ssl_option(Some(
            SslOption::new()
                .with_enable(true)
                .with_trust_cert_resource(Resource::Pem(cert_pem)),
        ))
        .unwrap();
    let factory = builder.build().unwrap();
    assert!(factory.ssl_config().is_enabled());

    let target = format!("localhost:{}", addr.port());
    let channel = factory.new_channel(&target).await.unwrap();
    let serializer = PostcardSerializer::new();
    let reply: Option<ResponseResult> = channel
        .unary(&serializer, "v1.Span/SendSpan", &"span")
        .await
        .unwrap();
    assert_eq!(reply, Some(ResponseResult::success()));

    server.shutdown();
}

#[cfg(feature = "tls")]
#[tokio::test]
async fn test_tls_channel_rejects_untrusted_collector() {
    common::init_tracing();
    use apmrpc::transport::TlsConfig;

    let collector_cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let other_cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();

    let tls = TlsConfig::server_from_pem(
        collector_cert.serialize_pem().unwrap().as_bytes(),
        collector_cert.serialize_private_key_pem().as_bytes(),
    )
    .unwrap();
    let server = CollectorServer::new(Arc::new(AcceptAll), PostcardSerializer::new()).with_tls(tls);
    let (server, addr) = start_collector(server).await;

    let mut builder = builder();
    builder
        .set_ssl_option(Some(
            SslOption::new()
                .with_enable(true)
                .with_trust_cert_resource(Resource::Pem(other_cert.serialize_pem().unwrap())),
        ))
        .unwrap();
    let factory = builder.build().unwrap();

    let target = format!("localhost:{}", addr.port());
    let result = factory.new_channel(&target).await;
    assert!(result.is_err());

    server.shutdown();
}
