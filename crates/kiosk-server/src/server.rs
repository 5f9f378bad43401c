//! HTTP/1.1 server.
//!
//! Accepts connections with Hyper, buffers each request body under the
//! request timeout, runs the request through [`App::handle`], and drains open
//! connections on shutdown.
//!
//! Failures outside the pipeline still use the uniform error body:
//!
//! | Condition | Status |
//! |---|---|
//! | body could not be read | 400 |
//! | body not received within the request timeout | 408 |
//! | body larger than the configured limit | 413 |
//! | pipeline did not finish within the request timeout | 504 |

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_LENGTH};
use http::StatusCode;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use kiosk_core::{ErrorBody, RequestId};
use kiosk_middleware::stages::REQUEST_ID_HEADER;
use kiosk_middleware::{Response, ResponseExt};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};

use crate::app::App;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Response type handed to Hyper.
pub type HttpResponse = http::Response<Full<Bytes>>;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Default request body limit (1 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Errors that stop the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen address could not be parsed or bound.
    #[error("failed to bind {addr}: {reason}")]
    Bind {
        /// Address that was requested.
        addr: String,
        /// Why binding failed.
        reason: String,
    },

    /// An I/O error on the listener.
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The Kiosk HTTP server.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use kiosk_auth::TokenService;
/// use kiosk_core::Contract;
/// use kiosk_server::{App, Server};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let contract = Arc::new(Contract::builder("demo").build());
/// let app = App::builder(contract, Arc::new(TokenService::new("secret"))).build()?;
///
/// Server::builder(app)
///     .http_addr("127.0.0.1:3000")
///     .request_timeout(Duration::from_secs(10))
///     .build()
///     .run()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Server {
    app: Arc<App>,
    http_addr: String,
    request_timeout: Duration,
    shutdown_timeout: Duration,
    max_body_bytes: usize,
}

impl Server {
    /// Starts building a server for `app`.
    #[must_use]
    pub fn builder(app: App) -> ServerBuilder {
        ServerBuilder::new(app)
    }

    /// Returns the configured listen address.
    #[must_use]
    pub fn http_addr(&self) -> &str {
        &self.http_addr
    }

    /// Returns the request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Returns the request body limit in bytes.
    #[must_use]
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Binds the listen address and serves until SIGTERM or SIGINT.
    pub async fn run(self) -> Result<(), ServerError> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Binds the listen address and serves until `shutdown` fires.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr: SocketAddr = self.http_addr.parse().map_err(|e| ServerError::Bind {
            addr: self.http_addr.clone(),
            reason: format!("invalid address: {e}"),
        })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: self.http_addr.clone(),
                reason: e.to_string(),
            })?;

        self.serve(listener, shutdown).await
    }

    /// Serves connections from an already bound listener until `shutdown`
    /// fires, then waits up to the shutdown timeout for them to close.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        let local_addr = listener.local_addr()?;
        tracing::info!(
            addr = %local_addr,
            contract = self.app.contract().name(),
            version = self.app.contract().version(),
            "server listening"
        );

        let shutdown_timeout = self.shutdown_timeout;
        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote_addr)) => {
                        let server = Arc::clone(&server);
                        let token = tracker.acquire();
                        let shutdown = shutdown.clone();

                        tokio::spawn(async move {
                            if let Err(e) = server.handle_connection(stream, remote_addr, shutdown).await {
                                tracing::debug!(remote_addr = %remote_addr, error = %e, "connection error");
                            }
                            drop(token);
                        });
                    }
                    Err(e) => tracing::error!(error = %e, "failed to accept connection"),
                },

                () = shutdown.recv() => {
                    tracing::info!("shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }

        tracing::info!(
            active = tracker.active_connections(),
            timeout_secs = shutdown_timeout.as_secs(),
            "waiting for open connections"
        );

        if tokio::time::timeout(shutdown_timeout, tracker.drained())
            .await
            .is_err()
        {
            tracing::warn!(
                active = tracker.active_connections(),
                "shutdown timeout reached with connections still open"
            );
        }

        tracing::info!("server stopped");
        Ok(())
    }

    async fn handle_connection(
        self: &Arc<Self>,
        stream: TcpStream,
        remote_addr: SocketAddr,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let io = TokioIo::new(stream);
        let server = Arc::clone(self);

        let service = service_fn(move |req: http::Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { Ok::<_, Infallible>(server.handle_request(req).await) }
        });

        let conn = http1::Builder::new().serve_connection(io, service);
        tokio::pin!(conn);

        let mut draining = false;
        loop {
            tokio::select! {
                result = conn.as_mut() => return result,
                () = shutdown.recv(), if !draining => {
                    tracing::debug!(remote_addr = %remote_addr, "closing connection for shutdown");
                    conn.as_mut().graceful_shutdown();
                    draining = true;
                }
            }
        }
    }

    async fn handle_request(&self, req: http::Request<Incoming>) -> HttpResponse {
        let (parts, body) = req.into_parts();

        let declared_len = parts
            .headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if declared_len.is_some_and(|len| len > self.max_body_bytes) {
            tracing::warn!(path = parts.uri.path(), limit = self.max_body_bytes, "request body too large");
            return into_http(body_too_large());
        }

        let limited = Limited::new(body, self.max_body_bytes);
        let body = match tokio::time::timeout(self.request_timeout, limited.collect()).await {
            Ok(Ok(collected)) => collected.to_bytes(),
            Ok(Err(e)) if e.downcast_ref::<LengthLimitError>().is_some() => {
                tracing::warn!(path = parts.uri.path(), limit = self.max_body_bytes, "request body too large");
                return into_http(body_too_large());
            }
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "failed to read request body");
                return into_http(transport_error(
                    StatusCode::BAD_REQUEST,
                    "failed to read request body",
                ));
            }
            Err(_) => {
                tracing::warn!(path = parts.uri.path(), "request body timed out");
                return into_http(transport_error(
                    StatusCode::REQUEST_TIMEOUT,
                    "request body not received in time",
                ));
            }
        };

        let method = parts.method.clone();
        let path = parts.uri.path().to_string();
        let request = http::Request::from_parts(parts, body);

        match tokio::time::timeout(self.request_timeout, self.app.handle(request)).await {
            Ok(response) => into_http(response),
            Err(_) => {
                tracing::warn!(method = %method, path = %path, "request timed out");
                into_http(transport_error(
                    StatusCode::GATEWAY_TIMEOUT,
                    "request timed out",
                ))
            }
        }
    }
}

/// Renders a failure that happened outside the pipeline.
fn transport_error(status: StatusCode, message: &str) -> Response {
    let body = serde_json::to_value(ErrorBody::new(message)).unwrap_or_default();
    let mut response = Response::json(status, &body);
    if let Ok(value) = HeaderValue::from_str(&RequestId::new().to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

fn body_too_large() -> Response {
    transport_error(StatusCode::PAYLOAD_TOO_LARGE, "request body too large")
}

fn into_http(response: Response) -> HttpResponse {
    response.map(Full::new)
}

/// Builder for [`Server`].
#[derive(Debug)]
pub struct ServerBuilder {
    app: App,
    http_addr: String,
    request_timeout: Duration,
    shutdown_timeout: Duration,
    max_body_bytes: usize,
}

impl ServerBuilder {
    fn new(app: App) -> Self {
        Self {
            app,
            http_addr: "0.0.0.0:3000".to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Sets the listen address.
    #[must_use]
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.http_addr = addr.into();
        self
    }

    /// Sets the timeout applied to body collection and to the pipeline.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets how long shutdown waits for open connections.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Sets the largest request body accepted, in bytes.
    #[must_use]
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Builds the server.
    #[must_use]
    pub fn build(self) -> Server {
        Server {
            app: Arc::new(self.app),
            http_addr: self.http_addr,
            request_timeout: self.request_timeout,
            shutdown_timeout: self.shutdown_timeout,
            max_body_bytes: self.max_body_bytes,
        }
    }
}
