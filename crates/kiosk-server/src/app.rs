//! The assembled application: contract, pipeline, handlers and docs.
//!
//! [`App::handle`] is the single in-process entry point for a fully buffered
//! request. The HTTP server calls it for every request, and tests call it
//! directly without opening a socket.

use std::sync::Arc;

use kiosk_auth::TokenService;
use kiosk_core::{Contract, KioskError, KioskResult, Reply, RequestId};
use kiosk_middleware::stages::error_responder::render;
use kiosk_middleware::stages::{
    AccessLogMiddleware, AuthGateMiddleware, ErrorResponderMiddleware, RequestIdMiddleware,
    RequestValidationMiddleware, ResponseValidationMiddleware,
};
use kiosk_middleware::{BoxFuture, MiddlewareContext, Pipeline, Request, Response, ResponseExt};

use crate::docs::DocsPage;
use crate::handler::HandlerRegistry;

/// A ready-to-serve application.
#[derive(Debug)]
pub struct App {
    contract: Arc<Contract>,
    pipeline: Pipeline,
    handlers: Arc<HandlerRegistry>,
    docs: Option<DocsPage>,
}

impl App {
    /// Starts building an application for `contract`, verifying bearer tokens
    /// with `tokens`.
    #[must_use]
    pub fn builder(contract: Arc<Contract>, tokens: Arc<TokenService>) -> AppBuilder {
        AppBuilder::new(contract, tokens)
    }

    /// Returns the contract.
    #[must_use]
    pub fn contract(&self) -> &Arc<Contract> {
        &self.contract
    }

    /// Returns the pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Processes one request through the pipeline and returns the response.
    ///
    /// Never fails: every error is rendered as the uniform error body.
    pub async fn handle(&self, request: Request) -> Response {
        let handlers = Arc::clone(&self.handlers);
        let docs = self.docs.clone();

        let result = self
            .pipeline
            .process(MiddlewareContext::new(), request, move |ctx, req| {
                dispatch(ctx, &req, handlers, docs)
            })
            .await;

        result.unwrap_or_else(|err| render(&err, RequestId::new()))
    }
}

fn dispatch(
    ctx: &mut MiddlewareContext,
    request: &Request,
    handlers: Arc<HandlerRegistry>,
    docs: Option<DocsPage>,
) -> BoxFuture<'static, KioskResult<Response>> {
    let Some(route) = ctx.route() else {
        // Only exempt requests reach the handler without a resolved route.
        let served = docs.map_or_else(|| Err(KioskError::no_route()), |docs| docs.serve(request));
        return Box::pin(async move { served });
    };

    let operation_id = route.operation().operation_id().to_string();
    let body = route.body.clone();
    let request_ctx = ctx.to_request_context();

    Box::pin(async move {
        let Reply { status, body } = handlers.invoke(&operation_id, request_ctx, body).await?;
        Ok(Response::json(status, &body))
    })
}

/// Builder for [`App`].
#[derive(Debug)]
pub struct AppBuilder {
    contract: Arc<Contract>,
    tokens: Arc<TokenService>,
    handlers: HandlerRegistry,
    docs_prefix: Option<String>,
    validate_responses: bool,
    trust_request_id: bool,
}

impl AppBuilder {
    fn new(contract: Arc<Contract>, tokens: Arc<TokenService>) -> Self {
        Self {
            contract,
            tokens,
            handlers: HandlerRegistry::new(),
            docs_prefix: None,
            validate_responses: true,
            trust_request_id: false,
        }
    }

    /// Sets the handler registry.
    #[must_use]
    pub fn handlers(mut self, handlers: HandlerRegistry) -> Self {
        self.handlers = handlers;
        self
    }

    /// Serves documentation at `prefix` and exempts it from validation.
    #[must_use]
    pub fn docs_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.docs_prefix = Some(prefix.into());
        self
    }

    /// Enables or disables response validation. Enabled by default.
    #[must_use]
    pub fn validate_responses(mut self, enabled: bool) -> Self {
        self.validate_responses = enabled;
        self
    }

    /// Reuses incoming `x-request-id` headers instead of generating ids.
    #[must_use]
    pub fn trust_request_id(mut self, trust: bool) -> Self {
        self.trust_request_id = trust;
        self
    }

    /// Assembles the pipeline and renders the documentation.
    ///
    /// Operations without a registered handler are logged; requests to them
    /// fail with an internal error.
    pub fn build(self) -> KioskResult<App> {
        for operation in self.contract.operations() {
            if !self.handlers.contains(operation.operation_id()) {
                tracing::warn!(
                    operation_id = operation.operation_id(),
                    "no handler registered for operation"
                );
            }
        }

        let mut validation = RequestValidationMiddleware::new(Arc::clone(&self.contract));
        let docs = match &self.docs_prefix {
            Some(prefix) => {
                validation = validation.exempt_prefix(prefix.clone());
                Some(DocsPage::new(prefix.clone(), &self.contract)?)
            }
            None => None,
        };

        let request_id = if self.trust_request_id {
            RequestIdMiddleware::trust_incoming()
        } else {
            RequestIdMiddleware::new()
        };

        let pipeline = Pipeline::builder()
            .stage(ErrorResponderMiddleware::new())
            .stage(request_id)
            .stage(AccessLogMiddleware::new())
            .stage(validation)
            .stage(AuthGateMiddleware::new(self.tokens))
            .stage_if(self.validate_responses, ResponseValidationMiddleware::new())
            .build();

        tracing::debug!(stages = ?pipeline.stage_names(), "pipeline assembled");

        Ok(App {
            contract: self.contract,
            pipeline,
            handlers: Arc::new(self.handlers),
            docs,
        })
    }
}
