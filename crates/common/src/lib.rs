//! Value types shared by every layer of the shop workspace.

pub mod money;
pub mod status;
pub mod types;

pub use money::Money;
pub use status::{OrderStatus, ParseStatusError};
pub use types::{CustomerId, LineItemId, OrderId, ProductId};
