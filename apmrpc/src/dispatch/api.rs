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

//! API metadata handling.

use crate::dispatch::{
    ApiMetaData, DispatchContext, DispatchError, RequestEnvelope, RequestPayload,
    RequestResponseHandler, ServerResponse, ServiceError,
};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Line number stored when the agent did not report one.
pub const NO_LINE_NUMBER: i32 = -1;

/// Kind of instrumented method an API id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MethodType {
    /// Ordinary method.
    #[default]
    Default,
    /// Exception-throwing site.
    Exception,
    /// Annotation-only entry.
    Annotation,
    /// Parameter capture.
    Parameter,
    /// Web request entry point.
    WebRequest,
    /// Async invocation.
    Invocation,
    /// Metadata the agent could not build correctly.
    Corrupted,
}

impl MethodType {
    /// Wire code of the type.
    pub const fn code(&self) -> i32 {
        match self {
            MethodType::Default => 0,
            MethodType::Exception => 1,
            MethodType::Annotation => 2,
            MethodType::Parameter => 3,
            MethodType::WebRequest => 100,
            MethodType::Invocation => 200,
            MethodType::Corrupted => 900,
        }
    }
}

impl TryFrom<i32> for MethodType {
    type Error = DispatchError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(MethodType::Default),
            1 => Ok(MethodType::Exception),
            2 => Ok(MethodType::Annotation),
            3 => Ok(MethodType::Parameter),
            100 => Ok(MethodType::WebRequest),
            200 => Ok(MethodType::Invocation),
            900 => Ok(MethodType::Corrupted),
            other => Err(DispatchError::InvalidField {
                field: "method_type",
                value: other.to_string(),
            }),
        }
    }
}

/// API metadata as stored by the domain service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiMetaDataRecord {
    /// Reporting agent
    pub agent_id: String,
    /// Agent start time, epoch millis
    pub agent_start_time: i64,
    /// Agent-local API id
    pub api_id: i32,
    /// [`NO_LINE_NUMBER`] when the agent did not send a line
    pub line_number: i32,
    /// [`MethodType::Default`] when the agent did not send a type
    pub method_type: MethodType,
    /// Human-readable API description
    pub api_info: String,
}

impl TryFrom<&ApiMetaData> for ApiMetaDataRecord {
    type Error = DispatchError;

    fn try_from(message: &ApiMetaData) -> Result<Self, Self::Error> {
        let method_type = match message.method_type {
            Some(code) => MethodType::try_from(code)?,
            None => MethodType::Default,
        };

        Ok(Self {
            agent_id: message.agent_id.clone(),
            agent_start_time: message.agent_start_time,
            api_id: message.api_id,
            line_number: message.line.unwrap_or(NO_LINE_NUMBER),
            method_type,
            api_info: message.api_info.clone(),
        })
    }
}

/// Stores API metadata.
///
/// Implementations must be safe to call from many connections at once.
#[async_trait]
pub trait ApiMetaDataService: Send + Sync {
    /// Persists `record`.
    async fn insert(&self, record: ApiMetaDataRecord) -> Result<(), ServiceError>;
}

/// Handles [`RequestPayload::ApiMetaData`] messages.
pub struct ApiMetaDataHandler<S: ?Sized> {
    service: Arc<S>,
    context: DispatchContext,
}

impl<S> ApiMetaDataHandler<S>
where
    S: ApiMetaDataService + ?Sized,
{
    /// Creates a handler with a default [`DispatchContext`].
    pub fn new(service: Arc<S>) -> Self {
        Self::with_context(service, DispatchContext::default())
    }

    /// Creates a handler sharing `context`.
    pub fn with_context(service: Arc<S>, context: DispatchContext) -> Self {
        Self { service, context }
    }

    async fn handle_api_meta_data(&self, message: &ApiMetaData) -> Result<(), DispatchError> {
        let record = ApiMetaDataRecord::try_from(message)?;
        self.service.insert(record).await.map_err(DispatchError::Domain)
    }
}

#[async_trait]
impl<S> RequestResponseHandler for ApiMetaDataHandler<S>
where
    S: ApiMetaDataService + ?Sized + 'static,
{
    fn name(&self) -> &str {
        "ApiMetaDataHandler"
    }

    async fn handle_request(&self, request: &RequestEnvelope, response: &mut dyn ServerResponse) {
        debug!(handler = self.name(), method = %request.method, payload = ?request.payload, "handle request");

        match &request.payload {
            RequestPayload::ApiMetaData(message) => {
                let result = self
                    .context
                    .respond(self.name(), request.kind(), self.handle_api_meta_data(message))
                    .await;
                response.write(result);
            }
            other => self.context.unrecognized(self.name(), other.kind()),
        }
    }
}

impl<S: ?Sized> fmt::Debug for ApiMetaDataHandler<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiMetaDataHandler")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{PayloadKind, ResponseResult, ResponseSlot, SqlMetaData, UnrecognizedPolicy};
    use crate::observability::DispatchMetrics;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingService {
        records: Mutex<Vec<ApiMetaDataRecord>>,
        fail_with: Option<&'static str>,
    }

    #[async_trait]
    impl ApiMetaDataService for RecordingService {
        async fn insert(&self, record: ApiMetaDataRecord) -> Result<(), ServiceError> {
            if let Some(message) = self.fail_with {
                return Err(message.into());
            }
            self.records.lock().push(record);
            Ok(())
        }
    }

    fn api_request(line: Option<i32>, method_type: Option<i32>) -> RequestEnvelope {
        RequestEnvelope::new(RequestPayload::ApiMetaData(ApiMetaData {
            agent_id: "agent-1".to_string(),
            agent_start_time: 1000,
            api_id: 7,
            line,
            method_type,
            api_info: "GET /x".to_string(),
        }))
    }

    #[test]
    fn test_method_type_codes() {
        for code in [0, 1, 2, 3, 100, 200, 900] {
            assert_eq!(MethodType::try_from(code).unwrap().code(), code);
        }
        assert!(matches!(
            MethodType::try_from(42),
            Err(DispatchError::InvalidField { field: "method_type", .. })
        ));
    }

    #[tokio::test]
    async fn test_absent_optionals_use_defaults() {
        let service = Arc::new(RecordingService::default());
        let handler = ApiMetaDataHandler::new(service.clone());

        let mut slot = ResponseSlot::new();
        handler.handle_request(&api_request(None, None), &mut slot).await;

        assert_eq!(slot.result(), Some(&ResponseResult::success()));
        let records = service.records.lock();
        assert_eq!(
            records.as_slice(),
            &[ApiMetaDataRecord {
                agent_id: "agent-1".to_string(),
                agent_start_time: 1000,
                api_id: 7,
                line_number: NO_LINE_NUMBER,
                method_type: MethodType::Default,
                api_info: "GET /x".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_present_optionals_are_kept() {
        let service = Arc::new(RecordingService::default());
        let handler = ApiMetaDataHandler::new(service.clone());

        let mut slot = ResponseSlot::new();
        handler.handle_request(&api_request(Some(42), Some(100)), &mut slot).await;

        assert_eq!(slot.result(), Some(&ResponseResult::success()));
        let record = service.records.lock()[0].clone();
        assert_eq!(record.line_number, 42);
        assert_eq!(record.method_type, MethodType::WebRequest);
    }

    #[tokio::test]
    async fn test_domain_failure_becomes_failed_result() {
        let service = Arc::new(RecordingService {
            fail_with: Some("boom"),
            ..Default::default()
        });
        let metrics = Arc::new(DispatchMetrics::new());
        let handler = ApiMetaDataHandler::with_context(
            service,
            DispatchContext::new(UnrecognizedPolicy::Ignore, metrics.clone()),
        );

        let mut slot = ResponseSlot::new();
        handler.handle_request(&api_request(None, None), &mut slot).await;

        assert_eq!(slot.into_result(), Some(ResponseResult::failure("boom")));
        assert_eq!(metrics.failed(), 1);
        assert_eq!(metrics.succeeded(), 0);
    }

    #[tokio::test]
    async fn test_unmappable_method_type_fails_only_that_request() {
        let service = Arc::new(RecordingService::default());
        let handler = ApiMetaDataHandler::new(service.clone());

        let mut slot = ResponseSlot::new();
        handler.handle_request(&api_request(None, Some(42)), &mut slot).await;
        assert_eq!(
            slot.into_result(),
            Some(ResponseResult::failure("invalid method_type: 42"))
        );

        let mut slot = ResponseSlot::new();
        handler.handle_request(&api_request(None, Some(1)), &mut slot).await;
        assert_eq!(slot.into_result(), Some(ResponseResult::success()));
        assert_eq!(service.records.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_other_variant_writes_nothing() {
        let metrics = Arc::new(DispatchMetrics::new());
        let handler = ApiMetaDataHandler::with_context(
            Arc::new(RecordingService::default()),
            DispatchContext::new(UnrecognizedPolicy::Count, metrics.clone()),
        );
        let request = RequestEnvelope::new(RequestPayload::SqlMetaData(SqlMetaData {
            agent_id: "agent-1".to_string(),
            agent_start_time: 1000,
            sql_id: 1,
            sql: "select 1".to_string(),
        }));

        let mut slot = ResponseSlot::new();
        handler.handle_request(&request, &mut slot).await;

        assert!(!slot.is_written());
        assert_eq!(metrics.unrecognized(), 1);
        assert_eq!(request.kind(), PayloadKind::SqlMetaData);
    }

    #[tokio::test]
    async fn test_dyn_service() {
        let service: Arc<dyn ApiMetaDataService> = Arc::new(RecordingService::default());
        let handler = ApiMetaDataHandler::new(service);
        let mut slot = ResponseSlot::new();
        handler.handle_request(&api_request(None, None), &mut slot).await;
        assert!(slot.result().is_some_and(|r| r.success));
    }
}
