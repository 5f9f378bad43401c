//! # Kiosk Server
//!
//! HTTP serving for Kiosk:
//!
//! - [`App`] - contract, middleware pipeline, handlers and docs, callable
//!   in-process
//! - [`HandlerRegistry`] - handlers bound to contract operations by id
//! - [`DocsPage`] - HTML and JSON documentation for the contract
//! - [`Server`] - HTTP/1.1 via Hyper with request timeouts and graceful
//!   shutdown
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use http::Method;
//! use kiosk_auth::TokenService;
//! use kiosk_core::{Contract, Operation, Reply, Schema};
//! use kiosk_server::{App, HandlerRegistry};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let contract = Contract::builder("demo")
//!     .operation(
//!         Operation::builder("hello")
//!             .method(Method::GET)
//!             .path("/hello")
//!             .response(200, Schema::object(vec![("message", Schema::string().required())]))
//!             .build(),
//!     )
//!     .build();
//!
//! let mut handlers = HandlerRegistry::new();
//! handlers.register_no_body("hello", |_ctx| async {
//!     Ok(Reply::ok(json!({"message": "Hello, world!"})))
//! });
//!
//! let app = App::builder(Arc::new(contract), Arc::new(TokenService::new("secret")))
//!     .handlers(handlers)
//!     .build()
//!     .unwrap();
//!
//! let request = http::Request::get("/hello").body(bytes::Bytes::new()).unwrap();
//! let response = app.handle(request).await;
//! assert_eq!(response.status(), 200);
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/kiosk-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;
pub mod docs;
pub mod handler;
pub mod server;
pub mod shutdown;

pub use app::{App, AppBuilder};
pub use docs::DocsPage;
pub use handler::{ErasedHandler, HandlerRegistry};
pub use server::{HttpResponse, Server, ServerBuilder, ServerError};
pub use shutdown::{ConnectionTracker, ShutdownSignal};
