//! Fully loaded orders, as returned by the ledger.

use common::{Money, OrderId, OrderStatus};
use serde::Serialize;
use store::{Customer, LineItemRecord, OrderRecord, Product};

/// A committed line item with its product attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItem {
    #[serde(flatten)]
    pub record: LineItemRecord,
    pub product: Product,
}

impl LineItem {
    pub fn subtotal(&self) -> Money {
        self.record.subtotal()
    }
}

/// An order header with its customer and line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    #[serde(flatten)]
    pub record: OrderRecord,
    pub customer: Customer,
    pub items: Vec<LineItem>,
}

impl Order {
    pub fn id(&self) -> OrderId {
        self.record.id
    }

    pub fn status(&self) -> OrderStatus {
        self.record.status
    }

    /// Returns the total fixed at commit.
    pub fn total(&self) -> Money {
        self.record.total
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Returns the number of units across all lines.
    pub fn unit_count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.record.quantity)).sum()
    }

    /// Recomputes the total from the line items. Equal to [`Order::total`]
    /// for every committed order.
    pub fn line_total(&self) -> Money {
        self.items.iter().map(LineItem::subtotal).sum()
    }
}
