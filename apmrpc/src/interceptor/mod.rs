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

//! Fault isolation for instrumentation interceptors.
//!
//! Instrumentation runs inside the monitored application's own call path, so
//! a bug in an interceptor must never change what the application sees.
//! [`FaultIsolatingInterceptor`] wraps an [`AroundInterceptor`] and turns
//! every error or panic it raises into an [`InstrumentationFault`] delivered
//! to one [`ExceptionHandler`].

mod around;
mod fault;
mod handler;

pub use self::around::{AroundInterceptor, FaultIsolatingInterceptor};
pub use self::fault::InstrumentationFault;
pub use self::handler::{ExceptionHandler, LoggingExceptionHandler, QueueingExceptionHandler};
