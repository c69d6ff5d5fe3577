//! In-memory cart assembled before an order is committed.

use common::{Money, ProductId};
use serde::Serialize;
use store::{Customer, Product};

use crate::error::{DomainError, Result};

/// A product and quantity waiting to be committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    /// The product as it was when first added.
    pub product: Product,
    pub quantity: u32,
    /// Price snapshot taken when the product was first added.
    pub unit_price: Money,
}

impl CartLine {
    pub fn product_id(&self) -> ProductId {
        self.product.id
    }

    /// Returns quantity × unit price.
    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// An order being assembled for one customer.
///
/// Nothing is reserved while the cart is open; stock is checked again at
/// commit. Dropping the cart cancels the order.
#[derive(Debug, Clone, Serialize)]
pub struct Cart {
    customer: Customer,
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new(customer: Customer) -> Self {
        Self {
            customer,
            lines: Vec::new(),
        }
    }

    pub fn customer(&self) -> &Customer {
        &self.customer
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns the sum of all line subtotals.
    pub fn total(&self) -> Money {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    /// Adds `quantity` units of `product`, checked against its current stock.
    ///
    /// A product already in the cart has its quantity increased and keeps the
    /// price captured by the first add.
    pub fn add(&mut self, product: &Product, quantity: u32) -> Result<&CartLine> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be at least 1"));
        }
        if product.stock <= 0 {
            return Err(DomainError::OutOfStock {
                product_id: product.id,
            });
        }

        let position = self.lines.iter().position(|l| l.product.id == product.id);
        let requested = match position {
            Some(i) => self.lines[i].quantity.saturating_add(quantity),
            None => quantity,
        };
        if i64::from(requested) > product.stock {
            return Err(DomainError::InsufficientStock {
                product_id: product.id,
                requested,
                available: product.stock,
            });
        }

        let unit_price = position.map_or(product.price, |i| self.lines[i].unit_price);
        let others = self
            .lines
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != position)
            .map(|(_, l)| (l.unit_price, l.quantity));
        if checked_total(others.chain(std::iter::once((unit_price, requested)))).is_none() {
            return Err(total_out_of_range());
        }

        let index = match position {
            Some(i) => {
                self.lines[i].quantity = requested;
                i
            }
            None => {
                self.lines.push(CartLine {
                    product: product.clone(),
                    quantity,
                    unit_price: product.price,
                });
                self.lines.len() - 1
            }
        };
        Ok(&self.lines[index])
    }

    /// Removes the line at `index`, if there is one.
    pub fn remove(&mut self, index: usize) -> Option<CartLine> {
        (index < self.lines.len()).then(|| self.lines.remove(index))
    }

    /// Splits the cart into its customer and lines.
    pub fn into_parts(self) -> (Customer, Vec<CartLine>) {
        (self.customer, self.lines)
    }
}

/// Sums `price × quantity` over the pairs, or `None` if any step overflows.
pub(crate) fn checked_total(lines: impl IntoIterator<Item = (Money, u32)>) -> Option<Money> {
    lines
        .into_iter()
        .try_fold(Money::zero(), |acc, (price, quantity)| {
            acc.checked_add(price.checked_multiply(quantity)?)
        })
}

pub(crate) fn total_out_of_range() -> DomainError {
    DomainError::validation("order total is out of range")
}
