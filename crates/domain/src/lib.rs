//! Domain layer for the shop order system.
//!
//! This crate provides the services built on top of the entity store:
//! - `CatalogService` for products and direct stock adjustment
//! - `CustomerDirectory` for customers with unique emails
//! - `OrderLedger` for cart assembly, atomic commit and stock-restoring delete

pub mod catalog;
pub mod directory;
pub mod error;
pub mod order;

pub use catalog::CatalogService;
pub use directory::CustomerDirectory;
pub use error::{DomainError, Result};
pub use order::{Cart, CartLine, LineItem, Order, OrderLedger};

pub use common::{CustomerId, LineItemId, Money, OrderId, OrderStatus, ProductId};
pub use store::{
    Conflict, Customer, NewCustomer, NewProduct, OrderRecord, OrderSummary, Product,
};
