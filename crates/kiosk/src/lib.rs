//! # Kiosk
//!
//! A demo REST API over in-memory data: greetings, users and products, with
//! bearer-token login. Every request and response is checked against the
//! [built-in contract](contract::api) by the `kiosk-middleware` pipeline, and
//! `GET /api/v1/hello` requires a token from `POST /auth/login`.
//!
//! ```
//! use kiosk::{build_app, Repositories};
//! use kiosk_config::KioskConfig;
//!
//! let mut config = KioskConfig::default();
//! config.auth.token_secret = "0123456789abcdef0123456789abcdef".to_string();
//!
//! let app = build_app(&config, Repositories::seeded()).unwrap();
//! assert_eq!(app.contract().name(), "Kiosk API");
//! ```

#![doc(html_root_url = "https://docs.rs/kiosk/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod contract;
pub mod handlers;
pub mod models;
pub mod repository;

use std::sync::Arc;

use anyhow::Context;
use kiosk_auth::TokenService;
use kiosk_config::KioskConfig;
use kiosk_core::Contract;
use kiosk_server::App;

pub use repository::Repositories;

/// Loads the contract named by `contract.path`, or the built-in one.
pub fn load_contract(config: &KioskConfig) -> anyhow::Result<Contract> {
    match &config.contract.path {
        Some(path) => {
            tracing::info!(path = %path, "loading contract from file");
            Contract::from_file(path).with_context(|| format!("loading contract {path}"))
        }
        None => Ok(contract::api()),
    }
}

/// Assembles the application for `config` over `repos`.
pub fn build_app(config: &KioskConfig, repos: Repositories) -> anyhow::Result<App> {
    let contract = Arc::new(load_contract(config)?);
    let tokens = Arc::new(TokenService::new(&config.auth.token_secret));
    let handlers = handlers::registry(Arc::clone(&tokens), &repos);

    let app = App::builder(contract, tokens)
        .handlers(handlers)
        .docs_prefix(config.contract.docs_prefix.clone())
        .validate_responses(config.contract.validate_responses)
        .trust_request_id(config.server.trust_request_id)
        .build()?;
    Ok(app)
}
