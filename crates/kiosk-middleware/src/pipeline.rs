//! Ordered middleware pipeline.
//!
//! A [`Pipeline`] is an immutable list of stages, outermost first. Each
//! request gets a fresh chain of [`Next`] values built back to front, ending
//! in the terminal handler.

use std::sync::Arc;

use kiosk_core::KioskResult;

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response};

/// A type-erased stage.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// An immutable, ordered list of stages.
///
/// # Example
///
/// ```
/// use kiosk_middleware::pipeline::Pipeline;
/// use kiosk_middleware::stages::{AccessLogMiddleware, RequestIdMiddleware};
///
/// let pipeline = Pipeline::builder()
///     .stage(RequestIdMiddleware::new())
///     .stage(AccessLogMiddleware::new())
///     .build();
///
/// assert_eq!(pipeline.stage_names(), vec!["request_id", "access_log"]);
/// ```
#[derive(Clone)]
pub struct Pipeline {
    stages: Vec<BoxedMiddleware>,
}

impl Pipeline {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Runs `request` through every stage and then `handler`.
    ///
    /// Returns `Err` only when no stage rendered the failure; a pipeline
    /// whose outermost stage is the error responder always returns `Ok`.
    pub async fn process<H>(
        &self,
        mut ctx: MiddlewareContext,
        request: Request,
        handler: H,
    ) -> KioskResult<Response>
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, KioskResult<Response>>
            + Send,
    {
        let next = self.build_chain(handler);
        next.run(&mut ctx, request).await
    }

    fn build_chain<'a, H>(&'a self, handler: H) -> Next<'a>
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, KioskResult<Response>>
            + Send
            + 'a,
    {
        let mut next = Next::handler(handler);
        for middleware in self.stages.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }
        next
    }

    /// Returns the stage names, outermost first.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|mw| mw.name()).collect()
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<BoxedMiddleware>,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage inside all previously added ones.
    #[must_use]
    pub fn stage<M: Middleware>(mut self, middleware: M) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Appends a stage only when `enabled`.
    #[must_use]
    pub fn stage_if<M: Middleware>(self, enabled: bool, middleware: M) -> Self {
        if enabled {
            self.stage(middleware)
        } else {
            self
        }
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages,
        }
    }
}

/// The stages of the standard Kiosk pipeline, outermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Stage {
    /// Renders failures as the uniform error body.
    ErrorResponder = 1,
    /// Generates or propagates the request id.
    RequestId = 2,
    /// Emits one log event per request.
    AccessLog = 3,
    /// Resolves the route and validates parameters and body.
    RequestValidation = 4,
    /// Verifies bearer tokens on protected operations.
    AuthGate = 5,
    /// Checks handler output against the contract.
    ResponseValidation = 6,
}

impl Stage {
    /// Returns the stage name, matching [`Middleware::name`].
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ErrorResponder => "error_responder",
            Self::RequestId => "request_id",
            Self::AccessLog => "access_log",
            Self::RequestValidation => "request_validation",
            Self::AuthGate => "auth_gate",
            Self::ResponseValidation => "response_validation",
        }
    }

    /// Returns all stages in order.
    #[must_use]
    pub const fn all() -> [Stage; 6] {
        [
            Self::ErrorResponder,
            Self::RequestId,
            Self::AccessLog,
            Self::RequestValidation,
            Self::AuthGate,
            Self::ResponseValidation,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseExt;
    use bytes::Bytes;
    use http::StatusCode;
    use kiosk_core::KioskError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        name: &'static str,
        counter: Arc<AtomicUsize>,
    }

    impl Middleware for Counting {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut MiddlewareContext,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, KioskResult<Response>> {
            Box::pin(async move {
                self.counter.fetch_add(1, Ordering::SeqCst);
                next.run(ctx, request).await
            })
        }
    }

    struct Reject;

    impl Middleware for Reject {
        fn name(&self) -> &'static str {
            "reject"
        }

        fn process<'a>(
            &'a self,
            _ctx: &'a mut MiddlewareContext,
            _request: Request,
            _next: Next<'a>,
        ) -> BoxFuture<'a, KioskResult<Response>> {
            Box::pin(async { Err(KioskError::no_route()) })
        }
    }

    fn request() -> Request {
        http::Request::builder()
            .uri("/test")
            .body(Bytes::new())
            .unwrap()
    }

    fn ok_handler(
        _ctx: &mut MiddlewareContext,
        _req: Request,
    ) -> BoxFuture<'static, KioskResult<Response>> {
        Box::pin(async { Ok(Response::json(StatusCode::OK, &json!({}))) })
    }

    #[tokio::test]
    async fn test_every_stage_runs_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::builder()
            .stage(Counting {
                name: "a",
                counter: counter.clone(),
            })
            .stage(Counting {
                name: "b",
                counter: counter.clone(),
            })
            .build();

        let response = pipeline
            .process(MiddlewareContext::new(), request(), ok_handler)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_short_circuit_skips_inner_stages_and_handler() {
        let counter = Arc::new(AtomicUsize::new(0));
        let handler_calls = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::builder()
            .stage(Reject)
            .stage(Counting {
                name: "inner",
                counter: counter.clone(),
            })
            .build();

        let calls = handler_calls.clone();
        let result = pipeline
            .process(MiddlewareContext::new(), request(), move |ctx, req| {
                calls.fetch_add(1, Ordering::SeqCst);
                ok_handler(ctx, req)
            })
            .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(handler_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_stage_names_preserve_order() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::builder()
            .stage(Reject)
            .stage_if(
                false,
                Counting {
                    name: "skipped",
                    counter: counter.clone(),
                },
            )
            .stage(Counting {
                name: "last",
                counter,
            })
            .build();

        assert_eq!(pipeline.stage_names(), vec!["reject", "last"]);
        assert_eq!(pipeline.stage_count(), 2);
    }

    #[test]
    fn test_stage_order() {
        let names: Vec<_> = Stage::all().iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec![
                "error_responder",
                "request_id",
                "access_log",
                "request_validation",
                "auth_gate",
                "response_validation"
            ]
        );
        assert!(Stage::RequestValidation < Stage::AuthGate);
    }
}
