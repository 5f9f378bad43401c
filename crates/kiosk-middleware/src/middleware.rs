//! Core middleware trait and types.
//!
//! A stage receives the mutable context, the request and a [`Next`] for the
//! rest of the chain. It continues by awaiting [`Next::run`], or ends the
//! request early by returning `Err(KioskError)`.
//!
//! # Example
//!
//! ```
//! use kiosk_middleware::{BoxFuture, Middleware, MiddlewareContext, Next, Request, Response};
//! use kiosk_core::{KioskError, KioskResult};
//!
//! struct DenyDeletes;
//!
//! impl Middleware for DenyDeletes {
//!     fn name(&self) -> &'static str {
//!         "deny_deletes"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut MiddlewareContext,
//!         request: Request,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, KioskResult<Response>> {
//!         Box::pin(async move {
//!             if request.method() == http::Method::DELETE {
//!                 return Err(KioskError::method_not_allowed());
//!             }
//!             next.run(ctx, request).await
//!         })
//!     }
//! }
//! ```

use std::future::Future;
use std::pin::Pin;

use kiosk_core::KioskResult;

use crate::context::MiddlewareContext;
use crate::types::{Request, Response};

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The terminal handler at the end of a chain.
pub type TerminalHandler<'a> = Box<
    dyn FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, KioskResult<Response>>
        + Send
        + 'a,
>;

/// A pipeline stage.
///
/// # Invariants
///
/// - A stage calls `next.run()` at most once
/// - A stage that short-circuits returns `Err`, never a hand-built error body
pub trait Middleware: Send + Sync + 'static {
    /// Returns the stage name, used in logs and [`Pipeline::stage_names`].
    ///
    /// [`Pipeline::stage_names`]: crate::Pipeline::stage_names
    fn name(&self) -> &'static str;

    /// Processes the request.
    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, KioskResult<Response>>;
}

/// The remainder of the chain.
///
/// Consumed by [`run`](Self::run), so it can only be invoked once.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    Handler(TerminalHandler<'a>),
}

impl<'a> Next<'a> {
    /// Creates a `Next` that invokes `middleware`, then `next`.
    pub fn new(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Creates a terminal `Next` that invokes the handler.
    pub fn handler<F>(f: F) -> Self
    where
        F: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, KioskResult<Response>>
            + Send
            + 'a,
    {
        Self {
            inner: NextInner::Handler(Box::new(f)),
        }
    }

    /// Invokes the next stage or the handler.
    pub async fn run(self, ctx: &mut MiddlewareContext, request: Request) -> KioskResult<Response> {
        match self.inner {
            NextInner::Chain { middleware, next } => middleware.process(ctx, request, *next).await,
            NextInner::Handler(handler) => handler(ctx, request).await,
        }
    }
}

/// A stage built from a function.
///
/// Suits stages that only inspect or rewrite the request before deciding
/// whether to continue.
///
/// ```
/// use kiosk_middleware::{FnMiddleware, Middleware, Request};
/// use kiosk_core::{KioskError, KioskResult};
///
/// let gate = FnMiddleware::new("json_only", |request: Request| -> KioskResult<Request> {
///     match request.headers().get(http::header::ACCEPT) {
///         Some(v) if v != "application/json" => Err(KioskError::validation("JSON only")),
///         _ => Ok(request),
///     }
/// });
/// assert_eq!(gate.name(), "json_only");
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F> {
    /// Creates a function-based stage.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(Request) -> KioskResult<Request> + Send + Sync + 'static,
{
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
            let request = (self.func)(request)?;
            next.run(ctx, request).await
        })
    }
}
