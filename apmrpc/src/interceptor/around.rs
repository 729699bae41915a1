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

//! Before/after interceptors and the wrapper that isolates their faults.

use crate::error::panic_message;
use crate::interceptor::{ExceptionHandler, InstrumentationFault};
use std::any::Any;
use std::error::Error;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Instrumentation run around a monitored method call.
///
/// `target` is the receiver of the monitored call and `args` its arguments,
/// both type-erased. `after` additionally sees the call's return value and,
/// if the call failed, its error.
pub trait AroundInterceptor: Send + Sync {
    /// Runs before the monitored call.
    fn before(&self, target: &dyn Any, args: &[&dyn Any]) -> Result<(), InstrumentationFault>;

    /// Runs after the monitored call.
    fn after(
        &self,
        target: &dyn Any,
        args: &[&dyn Any],
        result: Option<&dyn Any>,
        failure: Option<&(dyn Error + 'static)>,
    ) -> Result<(), InstrumentationFault>;
}

/// Wraps an [`AroundInterceptor`] so that none of its faults reach the
/// monitored call.
///
/// Errors and panics from the delegate are routed to one [`ExceptionHandler`],
/// exactly once per fault. Both hooks of the wrapper always return `Ok(())`.
///
/// # Examples
///
/// ```rust
/// use apmrpc::interceptor::{
///     AroundInterceptor, FaultIsolatingInterceptor, InstrumentationFault, LoggingExceptionHandler,
/// };
/// use std::any::Any;
/// use std::error::Error;
///
/// struct Broken;
///
/// impl AroundInterceptor for Broken {
///     fn before(&self, _: &dyn Any, _: &[&dyn Any]) -> Result<(), InstrumentationFault> {
///         Err(InstrumentationFault::failed("trace context missing"))
///     }
///
///     fn after(
///         &self,
///         _: &dyn Any,
///         _: &[&dyn Any],
///         _: Option<&dyn Any>,
///         _: Option<&(dyn Error + 'static)>,
///     ) -> Result<(), InstrumentationFault> {
///         Ok(())
///     }
/// }
///
/// let interceptor = FaultIsolatingInterceptor::new(Broken, LoggingExceptionHandler::default());
/// assert!(interceptor.before(&(), &[]).is_ok());
/// assert_eq!(interceptor.fault_count(), 1);
/// ```
pub struct FaultIsolatingInterceptor<I, H> {
    delegate: I,
    handler: H,
    faults: AtomicU64,
}

impl<I, H> FaultIsolatingInterceptor<I, H>
where
    I: AroundInterceptor,
    H: ExceptionHandler,
{
    /// Wraps `delegate`, routing its faults to `handler`.
    pub fn new(delegate: I, handler: H) -> Self {
        Self {
            delegate,
            handler,
            faults: AtomicU64::new(0),
        }
    }

    /// The wrapped interceptor.
    pub fn delegate(&self) -> &I {
        &self.delegate
    }

    /// The exception handler faults are routed to.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Number of faults contained so far.
    pub fn fault_count(&self) -> u64 {
        self.faults.load(Ordering::Relaxed)
    }

    fn contain<F>(&self, phase: &'static str, hook: F)
    where
        F: FnOnce() -> Result<(), InstrumentationFault>,
    {
        let fault = match panic::catch_unwind(AssertUnwindSafe(hook)) {
            Ok(Ok(())) => return,
            Ok(Err(fault)) => fault,
            Err(payload) => InstrumentationFault::Panicked {
                message: panic_message(payload.as_ref()),
            },
        };

        self.faults.fetch_add(1, Ordering::Relaxed);
        trace!(phase, panic = fault.is_panic(), "instrumentation fault contained");
        self.handler.handle(fault);
    }
}

impl<I, H> AroundInterceptor for FaultIsolatingInterceptor<I, H>
where
    I: AroundInterceptor,
    H: ExceptionHandler,
{
    fn before(&self, target: &dyn Any, args: &[&dyn Any]) -> Result<(), InstrumentationFault> {
        self.contain("before", || self.delegate.before(target, args));
        Ok(())
    }

    fn after(
        &self,
        target: &dyn Any,
        args: &[&dyn Any],
        result: Option<&dyn Any>,
        failure: Option<&(dyn Error + 'static)>,
    ) -> Result<(), InstrumentationFault> {
        self.contain("after", || self.delegate.after(target, args, result, failure));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct Recorder {
        faults: Mutex<Vec<String>>,
    }

    impl ExceptionHandler for Recorder {
        fn handle(&self, fault: InstrumentationFault) {
            self.faults.lock().push(fault.to_string());
        }
    }

    #[derive(Default)]
    struct Probe {
        fail_before: bool,
        panic_after: bool,
        seen: Mutex<Vec<String>>,
    }

    impl AroundInterceptor for Probe {
        fn before(&self, target: &dyn Any, args: &[&dyn Any]) -> Result<(), InstrumentationFault> {
            let name = target.downcast_ref::<&str>().copied().unwrap_or("?");
            self.seen.lock().push(format!("before {name} argc={}", args.len()));
            if self.fail_before {
                return Err(InstrumentationFault::failed("no active trace"));
            }
            Ok(())
        }

        fn after(
            &self,
            _target: &dyn Any,
            _args: &[&dyn Any],
            result: Option<&dyn Any>,
            failure: Option<&(dyn Error + 'static)>,
        ) -> Result<(), InstrumentationFault> {
            let value = result.and_then(|r| r.downcast_ref::<i32>()).copied();
            self.seen
                .lock()
                .push(format!("after {value:?} failed={}", failure.is_some()));
            if self.panic_after {
                panic!("span already closed");
            }
            Ok(())
        }
    }

    #[test]
    fn test_before_failure_reaches_handler_once() {
        let recorder = Arc::new(Recorder::default());
        let interceptor = FaultIsolatingInterceptor::new(
            Probe {
                fail_before: true,
                ..Default::default()
            },
            recorder.clone(),
        );

        let target = "OrderService";
        let quantity = 3u32;
        assert!(interceptor.before(&target, &[&quantity]).is_ok());

        assert_eq!(
            *recorder.faults.lock(),
            vec!["interceptor failed: no active trace".to_string()]
        );
        assert_eq!(interceptor.fault_count(), 1);
        assert_eq!(
            *interceptor.delegate().seen.lock(),
            vec!["before OrderService argc=1".to_string()]
        );
    }

    #[test]
    fn test_after_panic_is_contained() {
        let recorder = Arc::new(Recorder::default());
        let interceptor = FaultIsolatingInterceptor::new(
            Probe {
                panic_after: true,
                ..Default::default()
            },
            recorder.clone(),
        );

        let failure = std::io::Error::other("timeout");
        let value = 42i32;
        let result = interceptor.after(
            &"OrderService",
            &[],
            Some(&value as &dyn Any),
            Some(&failure as &(dyn Error + 'static)),
        );
        assert!(result.is_ok());

        assert_eq!(
            *recorder.faults.lock(),
            vec!["interceptor panicked: span already closed".to_string()]
        );
        assert_eq!(
            *interceptor.delegate().seen.lock(),
            vec!["after Some(42) failed=true".to_string()]
        );
    }

    #[test]
    fn test_clean_hooks_do_not_touch_handler() {
        let recorder = Arc::new(Recorder::default());
        let interceptor = FaultIsolatingInterceptor::new(Probe::default(), recorder.clone());

        interceptor.before(&"OrderService", &[]).unwrap();
        interceptor.after(&"OrderService", &[], None, None).unwrap();

        assert!(recorder.faults.lock().is_empty());
        assert_eq!(interceptor.fault_count(), 0);
    }

    #[test]
    fn test_concurrent_faults_are_all_routed() {
        let recorder = Arc::new(Recorder::default());
        let interceptor = Arc::new(FaultIsolatingInterceptor::new(
            Probe {
                fail_before: true,
                ..Default::default()
            },
            recorder.clone(),
        ));

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let interceptor = interceptor.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        interceptor.before(&"OrderService", &[]).unwrap();
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        assert_eq!(recorder.faults.lock().len(), 200);
        assert_eq!(interceptor.fault_count(), 200);
    }
}
