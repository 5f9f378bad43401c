//! Contract validation middleware.
//!
//! Two stages share this module:
//!
//! - [`RequestValidationMiddleware`] resolves the request to a contract
//!   operation and checks path parameters, query parameters and the JSON body
//!   against the declared schemas. Every violation is collected before the
//!   request is rejected with a single 400.
//! - [`ResponseValidationMiddleware`] checks the handler's response body
//!   against the schema declared for its status code. A mismatch is a server
//!   defect: the details are logged and the client receives a generic 500.
//!
//! # Pipeline Position
//!
//! ```text
//! ... → AccessLog → [RequestValidation] → AuthGate → [ResponseValidation] → Handler
//! ```
//!
//! The documentation prefix is exempt from both phases. Exempt requests carry
//! no [`RouteMatch`], which is also how the later stages recognise them.

use std::collections::HashMap;
use std::sync::Arc;

use http::header::CONTENT_TYPE;
use kiosk_core::{
    Contract, KioskError, KioskResult, Operation, ParameterLocation, RouteResolution,
    SchemaViolation,
};
use serde_json::Value;

use crate::{
    context::{MiddlewareContext, RouteMatch},
    middleware::{BoxFuture, Middleware, Next},
    types::{Request, Response},
};

/// Request phase of contract validation.
#[derive(Debug, Clone)]
pub struct RequestValidationMiddleware {
    contract: Arc<Contract>,
    exempt_prefix: Option<String>,
}

impl RequestValidationMiddleware {
    /// Creates a request validator for `contract`.
    #[must_use]
    pub fn new(contract: Arc<Contract>) -> Self {
        Self {
            contract,
            exempt_prefix: None,
        }
    }

    /// Exempts `prefix` and everything below it from validation.
    #[must_use]
    pub fn exempt_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.exempt_prefix = Some(prefix.into());
        self
    }

    /// Returns whether `path` lies under the exempt prefix.
    #[must_use]
    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt_prefix.as_deref().is_some_and(|prefix| {
            let prefix = prefix.trim_end_matches('/');
            path == prefix
                || path
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    /// Resolves and validates `request`.
    pub fn validate(&self, request: &Request) -> KioskResult<RouteMatch> {
        let (index, path_params) = match self
            .contract
            .resolve(request.method(), request.uri().path())
        {
            RouteResolution::Matched { index, path_params } => (index, path_params),
            RouteResolution::MethodNotAllowed => return Err(KioskError::method_not_allowed()),
            RouteResolution::NotFound => return Err(KioskError::no_route()),
        };
        let mut route = RouteMatch::new(Arc::clone(&self.contract), index);
        let operation = route.operation();

        let query = parse_query(request.uri().query())?;

        let mut violations = Vec::new();
        check_parameters(operation, &path_params, &query, &mut violations);
        let body = parse_body(operation, request, &mut violations)?;

        if !violations.is_empty() {
            return Err(KioskError::invalid_request(violations));
        }

        route.path_params = path_params;
        route.query = query;
        route.body = body;
        Ok(route)
    }
}

fn parse_query(raw: Option<&str>) -> KioskResult<HashMap<String, String>> {
    let Some(raw) = raw else {
        return Ok(HashMap::new());
    };
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(raw).map_err(|e| {
        KioskError::invalid_request(vec![SchemaViolation::new(
            "query",
            format!("malformed query string: {e}"),
        )])
    })?;
    Ok(pairs.into_iter().collect())
}

fn check_parameters(
    operation: &Operation,
    path_params: &HashMap<String, String>,
    query: &HashMap<String, String>,
    violations: &mut Vec<SchemaViolation>,
) {
    for param in operation.parameters() {
        let raw = match param.location {
            ParameterLocation::Path => path_params.get(&param.name),
            ParameterLocation::Query => query.get(&param.name),
        };
        let field = format!("{}.{}", param.location.as_str(), param.name);

        match raw {
            None if param.required => violations.push(SchemaViolation::new(field, "is required")),
            None => {}
            Some(raw) => {
                let value = param.schema.coerce_param(raw);
                if let Err(errors) = param.schema.validate_at(&value, &field) {
                    violations.extend(errors);
                }
            }
        }
    }

    let mut unknown: Vec<&String> = query
        .keys()
        .filter(|key| {
            !operation
                .parameters_in(ParameterLocation::Query)
                .any(|p| &p.name == *key)
        })
        .collect();
    unknown.sort();
    for key in unknown {
        violations.push(SchemaViolation::new(
            format!("query.{key}"),
            "unknown query parameter",
        ));
    }
}

fn parse_body(
    operation: &Operation,
    request: &Request,
    violations: &mut Vec<SchemaViolation>,
) -> KioskResult<Option<Value>> {
    let Some(schema) = operation.request_schema() else {
        return Ok(None);
    };

    let bytes = request.body();
    if bytes.iter().all(u8::is_ascii_whitespace) {
        if schema.is_required() {
            violations.push(SchemaViolation::new("body", "request body is required"));
        }
        return Ok(None);
    }

    if let Some(content_type) = request.headers().get(CONTENT_TYPE) {
        let content_type = content_type.to_str().unwrap_or_default();
        if !is_json(content_type) {
            return Err(KioskError::unsupported_media_type(content_type));
        }
    }

    let value: Value = serde_json::from_slice(bytes).map_err(KioskError::malformed_body)?;
    if let Err(errors) = schema.validate_at(&value, "body") {
        violations.extend(errors);
    }
    Ok(Some(value))
}

fn is_json(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

impl Middleware for RequestValidationMiddleware {
    fn name(&self) -> &'static str {
        "request_validation"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, KioskResult<Response>> {
        Box::pin(async move {
            if self.is_exempt(request.uri().path()) {
                tracing::debug!(path = %request.uri().path(), "validation skipped for exempt path");
                return next.run(ctx, request).await;
            }

            let route = self.validate(&request).map_err(|err| {
                tracing::debug!(
                    request_id = %ctx.request_id(),
                    method = %request.method(),
                    path = %request.uri().path(),
                    error = %err,
                    "request rejected by contract"
                );
                err
            })?;

            ctx.set_operation_id(route.operation().operation_id());
            ctx.set_extension(route);
            next.run(ctx, request).await
        })
    }
}

/// Response phase of contract validation.
#[derive(Debug, Clone, Default)]
pub struct ResponseValidationMiddleware;

impl ResponseValidationMiddleware {
    /// Creates a response validator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Checks `response` against the schema `operation` declares for its status.
    pub fn check(operation: &Operation, response: &Response) -> Result<(), Vec<SchemaViolation>> {
        let status = response.status().as_u16();
        let Some(schema) = operation.response_schema(status) else {
            return Err(vec![SchemaViolation::new(
                "response",
                format!(
                    "status {status} is not declared for {}",
                    operation.operation_id()
                ),
            )]);
        };

        let body = response.body();
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(body).map_err(|e| {
                vec![SchemaViolation::new(
                    "response",
                    format!("body is not valid JSON: {e}"),
                )]
            })?
        };
        schema.validate_at(&value, "response")
    }
}

impl Middleware for ResponseValidationMiddleware {
    fn name(&self) -> &'static str {
        "response_validation"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, KioskResult<Response>> {
        Box::pin(async move {
            let response = next.run(ctx, request).await?;

            let Some(route) = ctx.route() else {
                return Ok(response);
            };
            let operation = route.operation();

            match Self::check(operation, &response) {
                Ok(()) => Ok(response),
                Err(violations) => {
                    tracing::error!(
                        request_id = %ctx.request_id(),
                        operation_id = operation.operation_id(),
                        status = response.status().as_u16(),
                        ?violations,
                        "response contract violation"
                    );
                    Err(KioskError::response_violation(violations))
                }
            }
        })
    }
}
