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

//! String and SQL metadata handling.

use crate::dispatch::{
    DispatchContext, DispatchError, RequestEnvelope, RequestPayload, RequestResponseHandler,
    ServerResponse, ServiceError, SqlMetaData, StringMetaData,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Stores interned strings.
#[async_trait]
pub trait StringMetaDataService: Send + Sync {
    /// Persists `record`.
    async fn insert(&self, record: StringMetaData) -> Result<(), ServiceError>;
}

/// Stores normalized SQL statements.
#[async_trait]
pub trait SqlMetaDataService: Send + Sync {
    /// Persists `record`.
    async fn insert(&self, record: SqlMetaData) -> Result<(), ServiceError>;
}

/// Handles [`RequestPayload::StringMetaData`] messages.
pub struct StringMetaDataHandler<S: ?Sized> {
    service: Arc<S>,
    context: DispatchContext,
}

impl<S> StringMetaDataHandler<S>
where
    S: StringMetaDataService + ?Sized,
{
    /// Creates a handler with a default [`DispatchContext`].
    pub fn new(service: Arc<S>) -> Self {
        Self::with_context(service, DispatchContext::default())
    }

    /// Creates a handler sharing `context`.
    pub fn with_context(service: Arc<S>, context: DispatchContext) -> Self {
        Self { service, context }
    }
}

#[async_trait]
impl<S> RequestResponseHandler for StringMetaDataHandler<S>
where
    S: StringMetaDataService + ?Sized + 'static,
{
    fn name(&self) -> &str {
        "StringMetaDataHandler"
    }

    async fn handle_request(&self, request: &RequestEnvelope, response: &mut dyn ServerResponse) {
        debug!(handler = self.name(), payload = ?request.payload, "handle request");

        match &request.payload {
            RequestPayload::StringMetaData(message) => {
                let routine = async {
                    self.service
                        .insert(message.clone())
                        .await
                        .map_err(DispatchError::Domain)
                };
                let result = self.context.respond(self.name(), request.kind(), routine).await;
                response.write(result);
            }
            other => self.context.unrecognized(self.name(), other.kind()),
        }
    }
}

/// Handles [`RequestPayload::SqlMetaData`] messages.
pub struct SqlMetaDataHandler<S: ?Sized> {
    service: Arc<S>,
    context: DispatchContext,
}

impl<S> SqlMetaDataHandler<S>
where
    S: SqlMetaDataService + ?Sized,
{
    /// Creates a handler with a default [`DispatchContext`].
    pub fn new(service: Arc<S>) -> Self {
        Self::with_context(service, DispatchContext::default())
    }

    /// Creates a handler sharing `context`.
    pub fn with_context(service: Arc<S>, context: DispatchContext) -> Self {
        Self { service, context }
    }
}

#[async_trait]
impl<S> RequestResponseHandler for SqlMetaDataHandler<S>
where
    S: SqlMetaDataService + ?Sized + 'static,
{
    fn name(&self) -> &str {
        "SqlMetaDataHandler"
    }

    async fn handle_request(&self, request: &RequestEnvelope, response: &mut dyn ServerResponse) {
        debug!(handler = self.name(), payload = ?request.payload, "handle request");

        match &request.payload {
            RequestPayload::SqlMetaData(message) => {
                let routine = async {
                    self.service
                        .insert(message.clone())
                        .await
                        .map_err(DispatchError::Domain)
                };
                let result = self.context.respond(self.name(), request.kind(), routine).await;
                response.write(result);
            }
            other => self.context.unrecognized(self.name(), other.kind()),
        }
    }
}
