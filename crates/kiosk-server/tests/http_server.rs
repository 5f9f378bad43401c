//! End-to-end tests over a real TCP socket.

use std::sync::Arc;
use std::time::Duration;

use http::Method;
use kiosk_auth::TokenService;
use kiosk_core::{Contract, Operation, Reply, Schema};
use kiosk_server::{App, HandlerRegistry, Server, ServerBuilder, ShutdownSignal};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

fn app() -> App {
    let message = Schema::object(vec![("message", Schema::string().required())]);
    let contract = Contract::builder("http-test")
        .operation(
            Operation::builder("hello")
                .method(Method::GET)
                .path("/hello")
                .response(200, message.clone())
                .build(),
        )
        .operation(
            Operation::builder("slow")
                .method(Method::GET)
                .path("/slow")
                .response(200, message)
                .build(),
        )
        .build();

    let mut handlers = HandlerRegistry::new();
    handlers.register_no_body("hello", |_ctx| async {
        Ok(Reply::ok(json!({"message": "Hello, world!"})))
    });
    handlers.register_no_body("slow", |_ctx| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(Reply::ok(json!({"message": "too late"})))
    });

    App::builder(Arc::new(contract), Arc::new(TokenService::new("http-test-secret")))
        .handlers(handlers)
        .docs_prefix("/docs")
        .build()
        .unwrap()
}

async fn start(request_timeout: Duration) -> (std::net::SocketAddr, ShutdownSignal) {
    start_with(Server::builder(app()).request_timeout(request_timeout)).await
}

async fn start_with(builder: ServerBuilder) -> (std::net::SocketAddr, ShutdownSignal) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = ShutdownSignal::new();

    let server = builder.shutdown_timeout(Duration::from_secs(1)).build();
    let signal = shutdown.clone();
    tokio::spawn(async move { server.serve(listener, signal).await });

    (addr, shutdown)
}

/// Sends a raw request and returns the status code and the body.
async fn send(addr: std::net::SocketAddr, raw: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.as_bytes()).await.unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    let status = response[9..12].parse().unwrap();
    let body = response
        .split_once("\r\n\r\n")
        .map(|(_, body)| body.to_string())
        .unwrap_or_default();
    (status, body)
}

fn get(path: &str) -> String {
    format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
}

#[tokio::test]
async fn test_serves_operation() {
    let (addr, shutdown) = start(Duration::from_secs(5)).await;

    let (status, body) = send(addr, &get("/hello")).await;
    assert_eq!(status, 200);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["message"], "Hello, world!");

    shutdown.trigger();
}

#[tokio::test]
async fn test_unknown_route_is_uniform_404() {
    let (addr, shutdown) = start(Duration::from_secs(5)).await;

    let (status, body) = send(addr, &get("/nowhere")).await;
    assert_eq!(status, 404);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body, json!({"message": "no matching route"}));

    shutdown.trigger();
}

#[tokio::test]
async fn test_docs_over_http() {
    let (addr, shutdown) = start(Duration::from_secs(5)).await;

    let (status, body) = send(addr, &get("/docs")).await;
    assert_eq!(status, 200);
    assert!(body.contains("<code>/hello</code>"));

    shutdown.trigger();
}

#[tokio::test]
async fn test_slow_handler_times_out() {
    let (addr, shutdown) = start(Duration::from_millis(100)).await;

    let (status, body) = send(addr, &get("/slow")).await;
    assert_eq!(status, 504);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body, json!({"message": "request timed out"}));

    shutdown.trigger();
}

#[tokio::test]
async fn test_slow_body_times_out() {
    let (addr, shutdown) = start(Duration::from_millis(100)).await;

    // Announces a body that never arrives
    let raw = "POST /hello HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\nContent-Type: application/json\r\nContent-Length: 64\r\n\r\n{";
    let (status, body) = send(addr, raw).await;
    assert_eq!(status, 408);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["message"], "request body not received in time");

    shutdown.trigger();
}

#[tokio::test]
async fn test_declared_oversize_body_is_413() {
    let (addr, shutdown) = start_with(Server::builder(app()).max_body_bytes(16)).await;

    let raw = "POST /hello HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\nContent-Type: application/json\r\nContent-Length: 4096\r\n\r\n";
    let (status, body) = send(addr, raw).await;
    assert_eq!(status, 413);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body, json!({"message": "request body too large"}));

    shutdown.trigger();
}

#[tokio::test]
async fn test_chunked_oversize_body_is_413() {
    let (addr, shutdown) = start_with(Server::builder(app()).max_body_bytes(16)).await;

    let chunk = "a".repeat(32);
    let raw = format!(
        "POST /hello HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\nContent-Type: application/json\r\nTransfer-Encoding: chunked\r\n\r\n20\r\n{chunk}\r\n0\r\n\r\n"
    );
    let (status, body) = send(addr, &raw).await;
    assert_eq!(status, 413);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["message"], "request body too large");

    shutdown.trigger();
}

#[tokio::test]
async fn test_body_within_limit_reaches_pipeline() {
    let (addr, shutdown) = start_with(Server::builder(app()).max_body_bytes(16)).await;

    // Under the limit, so the contract decides: GET-only route
    let raw = "POST /hello HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\nContent-Type: application/json\r\nContent-Length: 2\r\n\r\n{}";
    let (status, _) = send(addr, raw).await;
    assert_eq!(status, 405);

    shutdown.trigger();
}

#[tokio::test]
async fn test_shutdown_stops_server() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let shutdown = ShutdownSignal::new();
    let server = Server::builder(app())
        .shutdown_timeout(Duration::from_millis(100))
        .build();

    let handle = tokio::spawn(server.serve(listener, shutdown.clone()));
    shutdown.trigger();

    let result = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("server should stop")
        .expect("task should not panic");
    assert!(result.is_ok());
}
