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

//! Per-message results and the response sink handlers write them to.

use crate::dispatch::DispatchError;
use serde::{Deserialize, Serialize};

/// Outcome of handling one message, as sent back to the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseResult {
    /// Whether the message was stored
    pub success: bool,
    /// Failure message, absent on success
    pub message: Option<String>,
}

impl ResponseResult {
    /// A successful result.
    pub const fn success() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    /// A failed result carrying `message`.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }

    /// A failed result whose message is the error's display text.
    pub fn failure_from(error: &DispatchError) -> Self {
        Self::failure(error.to_string())
    }
}

/// Where a handler writes its result.
pub trait ServerResponse: Send {
    /// Writes the result for the current message.
    fn write(&mut self, result: ResponseResult);
}

/// A [`ServerResponse`] that keeps the written result for the caller.
///
/// The collector hands one slot to the handler per message and turns its
/// contents into the reply frame; an empty slot means no response.
#[derive(Debug, Default)]
pub struct ResponseSlot {
    result: Option<ResponseResult>,
}

impl ResponseSlot {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// The written result, if any.
    pub fn result(&self) -> Option<&ResponseResult> {
        self.result.as_ref()
    }

    /// Returns `true` once a result was written.
    pub fn is_written(&self) -> bool {
        self.result.is_some()
    }

    /// Consumes the slot, returning the written result.
    pub fn into_result(self) -> Option<ResponseResult> {
        self.result
    }
}

impl ServerResponse for ResponseSlot {
    fn write(&mut self, result: ResponseResult) {
        self.result = Some(result);
    }
}
