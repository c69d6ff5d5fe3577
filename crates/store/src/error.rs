use common::{CustomerId, OrderId, ProductId};
use thiserror::Error;

/// A write that would break a uniqueness, reference or stock rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Conflict {
    /// Another customer already owns this email.
    #[error("email {email} is already registered")]
    DuplicateEmail { email: String },

    /// The customer is still referenced by orders.
    #[error("customer {customer_id} still has {orders} order(s)")]
    CustomerHasOrders { customer_id: CustomerId, orders: i64 },

    /// The product is still referenced by line items.
    #[error("product {product_id} is referenced by {line_items} line item(s)")]
    ProductReferenced {
        product_id: ProductId,
        line_items: i64,
    },

    /// Stock ran out between cart assembly and commit.
    #[error("product {product_id} has {available} in stock, {requested} requested")]
    StockExhausted {
        product_id: ProductId,
        requested: u32,
        available: i64,
    },
}

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No row exists for the given primary key.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// The write was rejected; nothing was changed.
    #[error("Conflict: {0}")]
    Conflict(#[from] Conflict),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored value could not be mapped back onto a model.
    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

impl StoreError {
    pub fn customer_not_found(id: CustomerId) -> Self {
        StoreError::NotFound {
            entity: "customer",
            id: id.get(),
        }
    }

    pub fn product_not_found(id: ProductId) -> Self {
        StoreError::NotFound {
            entity: "product",
            id: id.get(),
        }
    }

    pub fn order_not_found(id: OrderId) -> Self {
        StoreError::NotFound {
            entity: "order",
            id: id.get(),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
