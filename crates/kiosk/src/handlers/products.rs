//! Product endpoints.

use std::sync::Arc;

use http::StatusCode;
use kiosk_core::{KioskError, KioskResult, Reply, RequestContext};
use serde_json::json;

use crate::models::{CreateProduct, UpdateProduct};
use crate::repository::ProductRepository;

fn not_found() -> Reply {
    Reply::new(StatusCode::NOT_FOUND, json!({"error": "Product not found"}))
}

fn check_name(name: &str) -> KioskResult<()> {
    if name.trim().is_empty() {
        return Err(KioskError::validation("product name must not be blank"));
    }
    Ok(())
}

/// `POST /api/v1/products`
pub async fn create(
    products: Arc<dyn ProductRepository>,
    body: CreateProduct,
) -> KioskResult<Reply> {
    check_name(&body.name)?;

    let product = products.create(body).await;
    tracing::info!(product_id = product.id, category = product.category.as_str(), "product created");
    Reply::json(StatusCode::CREATED, &product)
}

/// `GET /api/v1/products`
pub async fn list(products: Arc<dyn ProductRepository>) -> KioskResult<Reply> {
    Reply::json(StatusCode::OK, &products.list().await)
}

/// `GET /api/v1/products/{id}`
pub async fn get(products: Arc<dyn ProductRepository>, ctx: RequestContext) -> KioskResult<Reply> {
    let id: u64 = ctx.path_param_as("id")?;
    match products.get(id).await {
        Some(product) => Reply::json(StatusCode::OK, &product),
        None => Ok(not_found()),
    }
}

/// `PUT /api/v1/products/{id}`
pub async fn update(
    products: Arc<dyn ProductRepository>,
    ctx: RequestContext,
    body: UpdateProduct,
) -> KioskResult<Reply> {
    let id: u64 = ctx.path_param_as("id")?;
    if let Some(name) = &body.name {
        check_name(name)?;
    }

    let Some(mut product) = products.get(id).await else {
        return Ok(not_found());
    };
    body.apply(&mut product);

    match products.update(product).await {
        Some(product) => Reply::json(StatusCode::OK, &product),
        None => Ok(not_found()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use crate::repository::InMemoryProductRepository;

    fn repo() -> Arc<dyn ProductRepository> {
        Arc::new(InMemoryProductRepository::new(Vec::new()))
    }

    fn lamp(name: &str) -> CreateProduct {
        CreateProduct {
            name: name.to_string(),
            price: 19.99,
            category: Category::Home,
            description: None,
            tags: Some(vec!["light".to_string()]),
            ratings: None,
        }
    }

    #[tokio::test]
    async fn test_create_then_list() {
        let products = repo();
        let reply = create(Arc::clone(&products), lamp("Lamp")).await.unwrap();
        assert_eq!(reply.status, StatusCode::CREATED);
        assert_eq!(reply.body["id"], 1);

        let listed = list(products).await.unwrap();
        assert_eq!(listed.body, json!([reply.body]));
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let err = create(repo(), lamp(" ")).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_and_update() {
        let products = repo();
        create(Arc::clone(&products), lamp("Lamp")).await.unwrap();
        let ctx = RequestContext::new().with_path_param("id", "1");

        let body = UpdateProduct {
            category: Some(Category::Electronics),
            ..UpdateProduct::default()
        };
        let reply = update(Arc::clone(&products), ctx.clone(), body).await.unwrap();
        assert_eq!(reply.body["category"], "electronics");
        assert_eq!(reply.body["name"], "Lamp");

        let reply = get(products, ctx).await.unwrap();
        assert_eq!(reply.body["category"], "electronics");
    }

    #[tokio::test]
    async fn test_missing_product_is_404() {
        let ctx = RequestContext::new().with_path_param("id", "5");
        assert_eq!(get(repo(), ctx.clone()).await.unwrap(), not_found());
        assert_eq!(
            update(repo(), ctx, UpdateProduct::default()).await.unwrap(),
            not_found()
        );
    }
}
