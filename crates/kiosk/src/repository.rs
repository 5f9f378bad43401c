//! Storage ports for users and products, with in-memory adapters.
//!
//! Handlers only see the [`UserRepository`] and [`ProductRepository`] traits.
//! The in-memory adapters take their seed data through the constructor and
//! assign ids sequentially after the highest seeded id. Updates are
//! last-write-wins.

use std::sync::Arc;

use async_trait::async_trait;
use kiosk_auth::PasswordHasher;
use parking_lot::RwLock;
use thiserror::Error;

use crate::models::{CreateProduct, Product, User, UserDraft};

/// Errors raised by repository adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// Another user already owns this e-mail address.
    #[error("email '{email}' is already registered")]
    DuplicateEmail {
        /// The conflicting address.
        email: String,
    },
}

/// User storage.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Stores a new user and assigns its id.
    async fn create(&self, draft: UserDraft) -> Result<User, RepositoryError>;

    /// Fetches a user by id.
    async fn get(&self, id: u64) -> Option<User>;

    /// Lists every user, ordered by id.
    async fn list(&self) -> Vec<User>;

    /// Replaces the stored user with the same id. Returns `None` if there is
    /// no such user.
    async fn update(&self, user: User) -> Result<Option<User>, RepositoryError>;

    /// Fetches a user by exact e-mail address.
    async fn find_by_email(&self, email: &str) -> Option<User>;
}

/// Product storage.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Stores a new product and assigns its id.
    async fn create(&self, product: CreateProduct) -> Product;

    /// Fetches a product by id.
    async fn get(&self, id: u64) -> Option<Product>;

    /// Lists every product, ordered by id.
    async fn list(&self) -> Vec<Product>;

    /// Replaces the stored product with the same id. Returns `None` if there
    /// is no such product.
    async fn update(&self, product: Product) -> Option<Product>;
}

/// The repositories a service runs against.
#[derive(Clone)]
pub struct Repositories {
    /// User storage.
    pub users: Arc<dyn UserRepository>,
    /// Product storage.
    pub products: Arc<dyn ProductRepository>,
}

impl Repositories {
    /// In-memory repositories holding the demo seed data.
    #[must_use]
    pub fn seeded() -> Self {
        Self {
            users: Arc::new(InMemoryUserRepository::new(seed_users())),
            products: Arc::new(InMemoryProductRepository::new(Vec::new())),
        }
    }
}

impl std::fmt::Debug for Repositories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repositories").finish_non_exhaustive()
    }
}

/// The demo user every fresh process starts with.
#[must_use]
pub fn seed_users() -> Vec<User> {
    vec![User {
        id: 1,
        name: "Joaquin Tripp".to_string(),
        email: "joaquintripp@example.com".to_string(),
        password_hash: PasswordHasher::hash("123456"),
    }]
}

// =============================================================================
// In-memory adapters
// =============================================================================

#[derive(Debug)]
struct Table<T> {
    rows: Vec<T>,
    next_id: u64,
}

impl<T> Table<T> {
    fn new(rows: Vec<T>, id_of: impl Fn(&T) -> u64) -> Self {
        let next_id = rows.iter().map(id_of).max().unwrap_or(0) + 1;
        Self { rows, next_id }
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// Users held in process memory.
#[derive(Debug)]
pub struct InMemoryUserRepository {
    table: RwLock<Table<User>>,
}

impl InMemoryUserRepository {
    /// Creates a repository holding `seed`.
    #[must_use]
    pub fn new(seed: Vec<User>) -> Self {
        Self {
            table: RwLock::new(Table::new(seed, |user| user.id)),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, draft: UserDraft) -> Result<User, RepositoryError> {
        let mut table = self.table.write();
        if table.rows.iter().any(|user| user.email == draft.email) {
            return Err(RepositoryError::DuplicateEmail { email: draft.email });
        }

        let user = User {
            id: table.allocate_id(),
            name: draft.name,
            email: draft.email,
            password_hash: draft.password_hash,
        };
        table.rows.push(user.clone());
        Ok(user)
    }

    async fn get(&self, id: u64) -> Option<User> {
        self.table.read().rows.iter().find(|user| user.id == id).cloned()
    }

    async fn list(&self) -> Vec<User> {
        let mut users = self.table.read().rows.clone();
        users.sort_by_key(|user| user.id);
        users
    }

    async fn update(&self, user: User) -> Result<Option<User>, RepositoryError> {
        let mut table = self.table.write();
        if table
            .rows
            .iter()
            .any(|other| other.id != user.id && other.email == user.email)
        {
            return Err(RepositoryError::DuplicateEmail { email: user.email });
        }

        let Some(slot) = table.rows.iter_mut().find(|stored| stored.id == user.id) else {
            return Ok(None);
        };
        *slot = user.clone();
        Ok(Some(user))
    }

    async fn find_by_email(&self, email: &str) -> Option<User> {
        self.table
            .read()
            .rows
            .iter()
            .find(|user| user.email == email)
            .cloned()
    }
}

/// Products held in process memory.
#[derive(Debug)]
pub struct InMemoryProductRepository {
    table: RwLock<Table<Product>>,
}

impl InMemoryProductRepository {
    /// Creates a repository holding `seed`.
    #[must_use]
    pub fn new(seed: Vec<Product>) -> Self {
        Self {
            table: RwLock::new(Table::new(seed, |product| product.id)),
        }
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn create(&self, product: CreateProduct) -> Product {
        let mut table = self.table.write();
        let product = product.with_id(table.allocate_id());
        table.rows.push(product.clone());
        product
    }

    async fn get(&self, id: u64) -> Option<Product> {
        self.table
            .read()
            .rows
            .iter()
            .find(|product| product.id == id)
            .cloned()
    }

    async fn list(&self) -> Vec<Product> {
        let mut products = self.table.read().rows.clone();
        products.sort_by_key(|product| product.id);
        products
    }

    async fn update(&self, product: Product) -> Option<Product> {
        let mut table = self.table.write();
        let slot = table.rows.iter_mut().find(|stored| stored.id == product.id)?;
        *slot = product.clone();
        Some(product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    fn draft(email: &str) -> UserDraft {
        UserDraft {
            name: "Ada".to_string(),
            email: email.to_string(),
            password_hash: PasswordHasher::hash("secret"),
        }
    }

    fn lamp() -> CreateProduct {
        CreateProduct {
            name: "Lamp".to_string(),
            price: 19.99,
            category: Category::Home,
            description: None,
            tags: None,
            ratings: None,
        }
    }

    #[tokio::test]
    async fn test_seeded_user() {
        let repos = Repositories::seeded();
        let user = repos.users.get(1).await.unwrap();

        assert_eq!(user.name, "Joaquin Tripp");
        assert!(PasswordHasher::verify("123456", &user.password_hash));
        assert_eq!(
            repos.users.find_by_email("joaquintripp@example.com").await,
            Some(user)
        );
        assert!(repos.products.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_user_ids_follow_seed() {
        let users = InMemoryUserRepository::new(seed_users());
        let created = users.create(draft("ada@example.com")).await.unwrap();

        assert_eq!(created.id, 2);
        assert_eq!(users.list().await.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let users = InMemoryUserRepository::new(seed_users());
        let err = users
            .create(draft("joaquintripp@example.com"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RepositoryError::DuplicateEmail {
                email: "joaquintripp@example.com".to_string()
            }
        );

        let mut ada = users.create(draft("ada@example.com")).await.unwrap();
        ada.email = "joaquintripp@example.com".to_string();
        assert!(users.update(ada).await.is_err());
    }

    #[tokio::test]
    async fn test_user_update_is_last_write_wins() {
        let users = InMemoryUserRepository::new(seed_users());
        let mut user = users.get(1).await.unwrap();
        user.name = "J. Tripp".to_string();

        let updated = users.update(user.clone()).await.unwrap();
        assert_eq!(updated, Some(user));
        assert_eq!(users.get(1).await.unwrap().name, "J. Tripp");

        let mut ghost = users.get(1).await.unwrap();
        ghost.id = 999;
        ghost.email = "ghost@example.com".to_string();
        assert_eq!(users.update(ghost).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_product_crud() {
        let products = InMemoryProductRepository::new(Vec::new());
        let first = products.create(lamp()).await;
        let second = products.create(lamp()).await;
        assert_eq!((first.id, second.id), (1, 2));

        let mut changed = second.clone();
        changed.price = 9.5;
        assert_eq!(products.update(changed.clone()).await, Some(changed));
        assert_eq!(products.get(2).await.unwrap().price, 9.5);

        assert!(products.get(7).await.is_none());
        assert_eq!(products.list().await.len(), 2);

        let mut missing = first;
        missing.id = 42;
        assert!(products.update(missing).await.is_none());
    }
}
