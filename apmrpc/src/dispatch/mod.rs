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

//! Collector-side request dispatch.
//!
//! Each inbound message arrives as a [`RequestEnvelope`] whose payload is one
//! of the closed set of [`RequestPayload`] variants. A
//! [`RequestResponseHandler`] handles one kind; the [`HandlerRouter`] picks
//! the handler by kind.
//!
//! Handling is isolated per message. A failure while storing one message
//! (a domain error, a bad optional field, even a panic in the domain service)
//! turns into `ResponseResult { success: false, message }` for that message
//! only. A message of a kind the handler does not understand gets no
//! response at all and a warning in the log.
//!
//! # Examples
//!
//! ```rust
//! use apmrpc::dispatch::{
//!     ApiMetaData, ApiMetaDataHandler, ApiMetaDataRecord, ApiMetaDataService,
//!     RequestEnvelope, RequestPayload, RequestResponseHandler, ResponseResult,
//!     ResponseSlot, ServiceError,
//! };
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct Discard;
//!
//! #[async_trait]
//! impl ApiMetaDataService for Discard {
//!     async fn insert(&self, _record: ApiMetaDataRecord) -> Result<(), ServiceError> {
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() {
//! let handler = ApiMetaDataHandler::new(Arc::new(Discard));
//! let request = RequestEnvelope::new(RequestPayload::ApiMetaData(ApiMetaData {
//!     agent_id: "agent-1".to_string(),
//!     agent_start_time: 1000,
//!     api_id: 7,
//!     line: None,
//!     method_type: None,
//!     api_info: "GET /x".to_string(),
//! }));
//!
//! let mut slot = ResponseSlot::new();
//! handler.handle_request(&request, &mut slot).await;
//! assert_eq!(slot.into_result(), Some(ResponseResult::success()));
//! # }
//! ```

mod api;
mod envelope;
mod error;
mod handler;
mod metadata;
mod response;

pub use self::api::{
    ApiMetaDataHandler, ApiMetaDataRecord, ApiMetaDataService, MethodType, NO_LINE_NUMBER,
};
pub use self::envelope::{
    ApiMetaData, PayloadKind, RequestEnvelope, RequestPayload, SqlMetaData, StringMetaData,
};
pub use self::error::{DispatchError, ServiceError};
pub use self::handler::{DispatchContext, HandlerRouter, RequestResponseHandler, UnrecognizedPolicy};
pub use self::metadata::{
    SqlMetaDataHandler, SqlMetaDataService, StringMetaDataHandler, StringMetaDataService,
};
pub use self::response::{ResponseResult, ResponseSlot, ServerResponse};
