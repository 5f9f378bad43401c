//! Resource handlers, bound to contract operations by id.
//!
//! Each submodule holds plain async functions over a repository or the token
//! service. [`registry`] wires them to the operation ids in
//! [`crate::contract::ops`].

pub mod auth;
pub mod greeting;
pub mod products;
pub mod users;

use std::sync::Arc;

use kiosk_auth::TokenService;
use kiosk_server::HandlerRegistry;

use crate::contract::ops;
use crate::models::{CreateProduct, CreateUser, Credentials, UpdateProduct, UpdateUser};
use crate::repository::Repositories;

/// Registers a handler for every operation in the built-in contract.
#[must_use]
pub fn registry(tokens: Arc<TokenService>, repos: &Repositories) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();

    registry.register_no_body(ops::HELLO, |_ctx| greeting::hello());
    registry.register_no_body(ops::GOODBYE, |_ctx| greeting::goodbye());
    registry.register_no_body(ops::GREET, greeting::greet);
    registry.register_no_body(ops::HELLO_V1, greeting::hello_user);
    registry.register_no_body(ops::GOODBYE_V1, |_ctx| greeting::goodbye());
    registry.register_no_body(ops::GREET_V1, greeting::greet);

    let user_repo = Arc::clone(&repos.users);
    registry.register_json(ops::LOGIN, move |_ctx, credentials: Credentials| {
        auth::login(Arc::clone(&tokens), Arc::clone(&user_repo), credentials)
    });

    let user_repo = Arc::clone(&repos.users);
    registry.register_json(ops::CREATE_USER, move |_ctx, body: CreateUser| {
        users::create(Arc::clone(&user_repo), body)
    });
    let user_repo = Arc::clone(&repos.users);
    registry.register_no_body(ops::GET_USER, move |ctx| users::get(Arc::clone(&user_repo), ctx));
    let user_repo = Arc::clone(&repos.users);
    registry.register_json(ops::UPDATE_USER, move |ctx, body: UpdateUser| {
        users::update(Arc::clone(&user_repo), ctx, body)
    });

    let product_repo = Arc::clone(&repos.products);
    registry.register_json(ops::CREATE_PRODUCT, move |_ctx, body: CreateProduct| {
        products::create(Arc::clone(&product_repo), body)
    });
    let product_repo = Arc::clone(&repos.products);
    registry.register_no_body(ops::LIST_PRODUCTS, move |_ctx| {
        products::list(Arc::clone(&product_repo))
    });
    let product_repo = Arc::clone(&repos.products);
    registry.register_no_body(ops::GET_PRODUCT, move |ctx| {
        products::get(Arc::clone(&product_repo), ctx)
    });
    let product_repo = Arc::clone(&repos.products);
    registry.register_json(ops::UPDATE_PRODUCT, move |ctx, body: UpdateProduct| {
        products::update(Arc::clone(&product_repo), ctx, body)
    });

    registry
}
