pub mod error;
pub mod memory;
pub mod model;
pub mod sqlite;
pub mod store;

pub use common::{CustomerId, LineItemId, Money, OrderId, OrderStatus, ProductId};
pub use error::{Conflict, Result, StoreError};
pub use memory::InMemoryStore;
pub use model::{
    Customer, LineItemRecord, NewCustomer, NewLineItem, NewOrder, NewProduct, OrderRecord,
    OrderSummary, Product,
};
pub use sqlite::SqliteStore;
pub use store::{Store, StoreExt};
