//! Row models for the four persisted relations.

use chrono::NaiveDate;
use common::{CustomerId, LineItemId, Money, OrderId, OrderStatus, ProductId};
use serde::{Deserialize, Serialize};

/// A customer row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    /// Unique across all customers.
    pub email: String,
    pub phone: String,
    pub address: String,
}

/// Fields of a customer that has not been stored yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

impl NewCustomer {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            ..Default::default()
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = phone.into();
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub(crate) fn into_customer(self, id: CustomerId) -> Customer {
        Customer {
            id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            address: self.address,
        }
    }
}

/// A product row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    /// Current unit price.
    pub price: Money,
    /// Units available.
    pub stock: i64,
}

/// Fields of a product that has not been stored yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    #[serde(default)]
    pub stock: i64,
}

impl NewProduct {
    pub fn new(name: impl Into<String>, price: Money, stock: i64) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            price,
            stock,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub(crate) fn into_product(self, id: ProductId) -> Product {
        Product {
            id,
            name: self.name,
            description: self.description,
            price: self.price,
            stock: self.stock,
        }
    }
}

/// An order header row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub date: NaiveDate,
    pub status: OrderStatus,
    /// Fixed at commit.
    pub total: Money,
}

/// A line item row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemRecord {
    pub id: LineItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    /// Product price at the time the line was added to the cart.
    pub unit_price: Money,
}

impl LineItemRecord {
    /// Returns quantity × unit price.
    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// A line to persist as part of [`NewOrder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLineItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
}

/// Everything the store needs to commit an order in one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub customer_id: CustomerId,
    pub date: NaiveDate,
    pub status: OrderStatus,
    pub total: Money,
    pub lines: Vec<NewLineItem>,
}

/// An order header joined with its customer; line items are not loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order: OrderRecord,
    pub customer: Customer,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_item_subtotal() {
        let item = LineItemRecord {
            id: LineItemId::new(1),
            order_id: OrderId::new(1),
            product_id: ProductId::new(1),
            quantity: 3,
            unit_price: Money::from_cents(500),
        };
        assert_eq!(item.subtotal(), Money::from_cents(1500));
    }

    #[test]
    fn new_customer_defaults_optional_fields() {
        let customer: NewCustomer =
            serde_json::from_str(r#"{"name":"Ana","email":"ana@example.com"}"#).unwrap();
        assert_eq!(customer, NewCustomer::new("Ana", "ana@example.com"));
        assert!(customer.phone.is_empty());
    }

    #[test]
    fn new_product_builder() {
        let product = NewProduct::new("Mouse", Money::from_cents(1999), 4)
            .with_description("Wireless");
        assert_eq!(product.description, "Wireless");
        assert_eq!(product.stock, 4);
    }
}
