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

//! End-to-end tests: agent channels talking to a collector over TCP.
//!
//! These tests run the whole stack:
//! - ChannelFactory resolution and connection
//! - Agent identity headers on every call
//! - Collector accept loop and per-connection call loop
//! - Routing by payload kind and per-message failure isolation
//! - Listener decoration and shutdown

mod common;

use apmrpc::client::{
    AGENT_ID, AgentHeaderFactory, ChannelFactory, ChannelFactoryBuilder, ClientOption, Metadata,
    SERVICE_TYPE,
};
use apmrpc::dispatch::{
    ApiMetaData, ApiMetaDataHandler, ApiMetaDataRecord, ApiMetaDataService, DispatchContext,
    HandlerRouter, PayloadKind, RequestPayload, ResponseResult, ServiceError, SqlMetaData,
    StringMetaData, StringMetaDataHandler, StringMetaDataService, UnrecognizedPolicy,
};
use apmrpc::observability::DispatchMetrics;
use apmrpc::serialization::PostcardSerializer;
use apmrpc::server::{
    CollectorServer, LogIdServerListenerDelegator, ServerListener, ServerTransport,
    ServerTransportListener,
};
use apmrpc::transport::TcpTransport;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

const METHOD: &str = "v1.Metadata/RequestMetaData";

#[derive(Debug, Default)]
struct MetadataStore {
    apis: Mutex<Vec<ApiMetaDataRecord>>,
    strings: Mutex<Vec<StringMetaData>>,
}

#[async_trait]
impl ApiMetaDataService for MetadataStore {
    async fn insert(&self, record: ApiMetaDataRecord) -> Result<(), ServiceError> {
        if record.api_info.is_empty() {
            return Err("api_info must not be empty".into());
        }
        self.apis.lock().push(record);
        Ok(())
    }
}

#[async_trait]
impl StringMetaDataService for MetadataStore {
    async fn insert(&self, message: StringMetaData) -> Result<(), ServiceError> {
        self.strings.lock().push(message);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct HeaderRecorder {
    seen: Arc<Mutex<Vec<Metadata>>>,
}

struct HeaderRecorderTransport {
    seen: Arc<Mutex<Vec<Metadata>>>,
}

impl ServerListener for HeaderRecorder {
    fn transport_created(&self, _transport: &ServerTransport) -> Arc<dyn ServerTransportListener> {
        Arc::new(HeaderRecorderTransport {
            seen: self.seen.clone(),
        })
    }

    fn server_shutdown(&self) {}
}

impl ServerTransportListener for HeaderRecorderTransport {
    fn transport_ready(&self, attributes: Metadata) -> Metadata {
        attributes
    }

    fn stream_created(&self, _method: &str, headers: &Metadata) {
        self.seen.lock().push(headers.clone());
    }

    fn transport_terminated(&self) {}
}

fn api(api_id: i32, api_info: &str, method_type: Option<i32>) -> RequestPayload {
    RequestPayload::ApiMetaData(ApiMetaData {
        agent_id: "agent-1".to_string(),
        agent_start_time: 1_700_000_000_000,
        api_id,
        line: Some(42),
        method_type,
        api_info: api_info.to_string(),
    })
}

async fn start_collector(
    store: Arc<MetadataStore>,
    listener: Arc<dyn ServerListener>,
) -> (CollectorServer<PostcardSerializer>, SocketAddr, Arc<DispatchMetrics>) {
    let metrics = Arc::new(DispatchMetrics::new());
    let context = DispatchContext::new(UnrecognizedPolicy::Count, metrics.clone());
    let router = HandlerRouter::new(context.clone())
        .with_handler(
            PayloadKind::ApiMetaData,
            Arc::new(ApiMetaDataHandler::with_context(store.clone(), context.clone())),
        )
        .with_handler(
            PayloadKind::StringMetaData,
            Arc::new(StringMetaDataHandler::with_context(store, context)),
        );

    let server = CollectorServer::new(Arc::new(router), PostcardSerializer::new())
        .with_listener(listener)
        .with_delegator(&LogIdServerListenerDelegator)
        .with_dispatch_metrics(metrics.clone());

    let tcp = TcpTransport::bind("127.0.0.1:0").await.unwrap();
    let addr = tcp.local_addr().unwrap();
    let running = server.clone();
    tokio::spawn(async move { running.serve(tcp).await });

    (server, addr, metrics)
}

fn agent_factory() -> ChannelFactory {
    let mut builder = ChannelFactoryBuilder::new("MetadataChannel").unwrap();
    builder.set_header_factory(Arc::new(AgentHeaderFactory::new(
        "agent-1",
        "shop",
        1_700_000_000_000,
        1010,
    )));
    builder
        .set_client_option(ClientOption::new().with_request_timeout(Duration::from_secs(5)))
        .unwrap();
    builder.build().unwrap()
}

#[tokio::test]
async fn test_metadata_round_trip_with_failure_isolation() {
    common::init_tracing();
    let store = Arc::new(MetadataStore::default());
    let recorder = HeaderRecorder::default();
    let seen = recorder.seen.clone();
    let (server, addr, metrics) = start_collector(store.clone(), Arc::new(recorder)).await;

    let channel = agent_factory().new_channel(&addr.to_string()).await.unwrap();
    let serializer = PostcardSerializer::new();

    let reply: Option<ResponseResult> = channel
        .unary(&serializer, METHOD, &api(1, "GET /cart", Some(100)))
        .await
        .unwrap();
    assert_eq!(reply, Some(ResponseResult::success()));

    // Failing message does not poison the ones after it.
    let reply: Option<ResponseResult> = channel
        .unary(&serializer, METHOD, &api(2, "", None))
        .await
        .unwrap();
    assert_eq!(
        reply,
        Some(ResponseResult::failure("api_info must not be empty"))
    );

    let reply: Option<ResponseResult> = channel
        .unary(&serializer, METHOD, &api(3, "GET /checkout", Some(42)))
        .await
        .unwrap();
    assert_eq!(
        reply,
        Some(ResponseResult::failure("invalid method_type: 42"))
    );

    let string = RequestPayload::StringMetaData(StringMetaData {
        agent_id: "agent-1".to_string(),
        agent_start_time: 1_700_000_000_000,
        string_id: 5,
        string_value: "java.lang.NullPointerException".to_string(),
    });
    let reply: Option<ResponseResult> = channel.unary(&serializer, METHOD, &string).await.unwrap();
    assert_eq!(reply, Some(ResponseResult::success()));

    // No handler for SQL: the collector writes no response.
    let sql = RequestPayload::SqlMetaData(SqlMetaData {
        agent_id: "agent-1".to_string(),
        agent_start_time: 1_700_000_000_000,
        sql_id: 9,
        sql: "select 1".to_string(),
    });
    let reply: Option<ResponseResult> = channel.unary(&serializer, METHOD, &sql).await.unwrap();
    assert_eq!(reply, None);

    let reply: Option<ResponseResult> = channel
        .unary(&serializer, METHOD, &api(4, "GET /home", None))
        .await
        .unwrap();
    assert_eq!(reply, Some(ResponseResult::success()));

    let apis: Vec<(i32, i32)> = store
        .apis
        .lock()
        .iter()
        .map(|r| (r.api_id, r.line_number))
        .collect();
    assert_eq!(apis, vec![(1, 42), (4, 42)]);
    assert_eq!(store.strings.lock().len(), 1);

    assert_eq!(metrics.handled(), 5);
    assert_eq!(metrics.succeeded(), 3);
    assert_eq!(metrics.failed(), 2);
    assert_eq!(metrics.unrecognized(), 1);

    let seen = seen.lock();
    assert_eq!(seen.len(), 6);
    for headers in seen.iter() {
        assert_eq!(headers.get(AGENT_ID), Some("agent-1"));
        assert_eq!(headers.get(SERVICE_TYPE), Some("1010"));
    }
    drop(seen);

    channel.shutdown().await.unwrap();
    server.shutdown();
}

#[tokio::test]
async fn test_connections_are_served_concurrently() {
    common::init_tracing();
    let store = Arc::new(MetadataStore::default());
    let (server, addr, _metrics) =
        start_collector(store.clone(), Arc::new(HeaderRecorder::default())).await;
    let factory = agent_factory();

    let mut tasks = Vec::new();
    for agent in 0..4 {
        let factory = factory.clone();
        let target = addr.to_string();
        tasks.push(tokio::spawn(async move {
            let channel = factory.new_channel(&target).await.unwrap();
            let serializer = PostcardSerializer::new();
            for n in 0..10 {
                let payload = api(agent * 100 + n, "GET /", None);
                let reply: Option<ResponseResult> =
                    channel.unary(&serializer, METHOD, &payload).await.unwrap();
                assert_eq!(reply, Some(ResponseResult::success()));
            }
            channel.transport_id()
        }));
    }

    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await.unwrap());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4);
    assert_eq!(store.apis.lock().len(), 40);

    server.shutdown();
}

#[tokio::test]
async fn test_shutdown_stops_accepting() {
    common::init_tracing();
    let (server, addr, _metrics) = start_collector(
        Arc::new(MetadataStore::default()),
        Arc::new(HeaderRecorder::default()),
    )
    .await;

    let channel = agent_factory().new_channel(&addr.to_string()).await.unwrap();
    server.shutdown();
    assert!(server.is_shutdown());

    let serializer = PostcardSerializer::new();
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        channel.unary::<_, _, ResponseResult>(&serializer, METHOD, &api(1, "GET /", None)),
    )
    .await
    .unwrap();
    assert!(result.is_err());
    assert!(channel.is_broken());
}
