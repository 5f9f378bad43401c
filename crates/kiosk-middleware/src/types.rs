//! HTTP types used throughout the pipeline.
//!
//! Bodies are fully buffered: the server collects the request body before the
//! pipeline runs, so stages can parse and validate it without streaming.

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use serde_json::Value;

/// The HTTP request type used in the pipeline.
pub type Request = http::Request<Bytes>;

/// The HTTP response type used in the pipeline.
pub type Response = http::Response<Bytes>;

/// Content type for every JSON response.
pub const APPLICATION_JSON: &str = "application/json";

/// Helpers for building responses.
pub trait ResponseExt {
    /// Creates a JSON response.
    fn json(status: StatusCode, body: &Value) -> Response;

    /// Creates a response with an explicit content type.
    fn with_content_type(status: StatusCode, content_type: &'static str, body: Bytes)
        -> Response;
}

impl ResponseExt for Response {
    fn json(status: StatusCode, body: &Value) -> Response {
        Self::with_content_type(status, APPLICATION_JSON, Bytes::from(body.to_string()))
    }

    fn with_content_type(
        status: StatusCode,
        content_type: &'static str,
        body: Bytes,
    ) -> Response {
        let mut response = http::Response::new(body);
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        response
    }
}
