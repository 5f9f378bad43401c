//! Resource records and request bodies.

use serde::{Deserialize, Serialize};

// =============================================================================
// Users
// =============================================================================

/// A stored user. The password hash is never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// Unique id.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// E-mail address, unique across users.
    pub email: String,
    /// Salted password digest.
    #[serde(skip)]
    pub password_hash: String,
}

/// A user that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDraft {
    /// Display name.
    pub name: String,
    /// E-mail address.
    pub email: String,
    /// Salted password digest.
    pub password_hash: String,
}

/// Body of `POST /api/v1/users`.
#[derive(Debug, Deserialize)]
pub struct CreateUser {
    /// Display name.
    pub name: String,
    /// E-mail address.
    pub email: String,
    /// Plaintext password, hashed before storage.
    pub password: String,
}

/// Body of `PUT /api/v1/users/{id}`. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUser {
    /// New display name.
    pub name: Option<String>,
    /// New e-mail address.
    pub email: Option<String>,
    /// New plaintext password.
    pub password: Option<String>,
}

/// Body of `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    /// E-mail address.
    pub email: String,
    /// Plaintext password.
    pub password: String,
}

// =============================================================================
// Products
// =============================================================================

/// The closed set of product categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Electronics.
    Electronics,
    /// Clothing.
    Clothing,
    /// Books.
    Books,
    /// Home goods.
    Home,
}

impl Category {
    /// Every category, in declaration order.
    pub const ALL: [Self; 4] = [Self::Electronics, Self::Clothing, Self::Books, Self::Home];

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Electronics => "electronics",
            Self::Clothing => "clothing",
            Self::Books => "books",
            Self::Home => "home",
        }
    }
}

/// A customer rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    /// Score between 1 and 5.
    pub score: f64,
    /// Short comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// A stored product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    /// Unique id.
    pub id: u64,
    /// Product name.
    pub name: String,
    /// Price in currency units, at most two decimals.
    pub price: f64,
    /// Category.
    pub category: Category,
    /// Free-form description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Ratings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratings: Option<Vec<Rating>>,
}

/// Body of `POST /api/v1/products`, and a product without an id.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreateProduct {
    /// Product name.
    pub name: String,
    /// Price.
    pub price: f64,
    /// Category.
    pub category: Category,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Tags.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// Ratings.
    #[serde(default)]
    pub ratings: Option<Vec<Rating>>,
}

impl CreateProduct {
    /// Attaches an id.
    #[must_use]
    pub fn with_id(self, id: u64) -> Product {
        Product {
            id,
            name: self.name,
            price: self.price,
            category: self.category,
            description: self.description,
            tags: self.tags,
            ratings: self.ratings,
        }
    }
}

/// Body of `PUT /api/v1/products/{id}`. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProduct {
    /// New name.
    pub name: Option<String>,
    /// New price.
    pub price: Option<f64>,
    /// New category.
    pub category: Option<Category>,
    /// New description.
    pub description: Option<String>,
    /// New tags.
    pub tags: Option<Vec<String>>,
    /// New ratings.
    pub ratings: Option<Vec<Rating>>,
}

impl UpdateProduct {
    /// Applies the present fields to `product`.
    pub fn apply(self, product: &mut Product) {
        if let Some(name) = self.name {
            product.name = name;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(category) = self.category {
            product.category = category;
        }
        if self.description.is_some() {
            product.description = self.description;
        }
        if self.tags.is_some() {
            product.tags = self.tags;
        }
        if self.ratings.is_some() {
            product.ratings = self.ratings;
        }
    }
}
