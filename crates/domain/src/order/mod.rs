//! Order assembly, commit, retrieval and deletion.

mod cart;
mod ledger;
mod view;

pub use cart::{Cart, CartLine};
use cart::{checked_total, total_out_of_range};
pub use ledger::OrderLedger;
pub use view::{LineItem, Order};
