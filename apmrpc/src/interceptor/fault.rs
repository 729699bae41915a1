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

use std::error::Error;
use thiserror::Error;

/// A failure raised by instrumentation code rather than by the monitored call.
#[derive(Debug, Error)]
pub enum InstrumentationFault {
    /// The interceptor returned an error.
    #[error("interceptor failed: {0}")]
    Failed(#[source] Box<dyn Error + Send + Sync>),

    /// The interceptor panicked.
    #[error("interceptor panicked: {message}")]
    Panicked {
        /// Panic payload, when it was a string
        message: String,
    },
}

impl InstrumentationFault {
    /// Wraps any error as [`InstrumentationFault::Failed`].
    pub fn failed(error: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        InstrumentationFault::Failed(error.into())
    }

    /// Returns `true` if the fault was a panic.
    #[must_use]
    pub const fn is_panic(&self) -> bool {
        matches!(self, InstrumentationFault::Panicked { .. })
    }
}
