//! Domain error types.

use common::ProductId;
use store::{Conflict, StoreError};
use thiserror::Error;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No entity exists with the given id.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// The write was rejected by a uniqueness, reference or stock rule.
    #[error("Conflict: {0}")]
    Conflict(Conflict),

    /// The product has no stock left to add to a cart.
    #[error("product {product_id} is out of stock")]
    OutOfStock { product_id: ProductId },

    /// The cart would hold more units than the product has in stock.
    #[error(
        "insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: i64,
    },

    /// An order cannot be committed without line items.
    #[error("order has no line items")]
    EmptyOrder,

    /// Malformed input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Any other persistence failure.
    #[error("Storage error: {0}")]
    Storage(StoreError),
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation(message.into())
    }

    /// Returns true for failures the caller can fix by changing the request.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, DomainError::Storage(_))
    }
}

impl From<StoreError> for DomainError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { entity, id } => DomainError::NotFound { entity, id },
            StoreError::Conflict(conflict) => DomainError::Conflict(conflict),
            other => DomainError::Storage(other),
        }
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_are_classified() {
        let err: DomainError = StoreError::product_not_found(ProductId::new(7)).into();
        assert!(matches!(
            err,
            DomainError::NotFound {
                entity: "product",
                id: 7
            }
        ));

        let err: DomainError = StoreError::from(Conflict::DuplicateEmail {
            email: "a@b.c".to_string(),
        })
        .into();
        assert!(matches!(
            err,
            DomainError::Conflict(Conflict::DuplicateEmail { .. })
        ));

        let err: DomainError = StoreError::InvalidData("bad date".to_string()).into();
        assert!(matches!(err, DomainError::Storage(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn insufficient_stock_message() {
        let err = DomainError::InsufficientStock {
            product_id: ProductId::new(3),
            requested: 8,
            available: 7,
        };
        assert_eq!(
            err.to_string(),
            "insufficient stock for product 3: requested 8, available 7"
        );
    }
}
