//! Order ledger: commit, retrieval, status changes and deletion.

use std::time::Instant;

use chrono::Local;
use common::{CustomerId, OrderId, OrderStatus, ProductId};
use store::{NewLineItem, NewOrder, OrderSummary, Store, StoreExt};
use tracing::{error, info, warn};

use super::{Cart, CartLine, LineItem, Order, checked_total, total_out_of_range};
use crate::catalog::CatalogService;
use crate::directory::CustomerDirectory;
use crate::error::{DomainError, Result};

/// Service for assembling, committing and maintaining orders.
///
/// Customer and product lookups go through the directory and catalog, which
/// share the ledger's store.
#[derive(Clone)]
pub struct OrderLedger<S: Store + Clone> {
    store: S,
    catalog: CatalogService<S>,
    directory: CustomerDirectory<S>,
}

impl<S: Store + Clone> OrderLedger<S> {
    /// Creates a new ledger over the given store.
    pub fn new(store: S) -> Self {
        Self {
            catalog: CatalogService::new(store.clone()),
            directory: CustomerDirectory::new(store.clone()),
            store,
        }
    }

    pub fn catalog(&self) -> &CatalogService<S> {
        &self.catalog
    }

    pub fn directory(&self) -> &CustomerDirectory<S> {
        &self.directory
    }

    /// Opens an empty cart for an existing customer.
    #[tracing::instrument(skip(self))]
    pub async fn begin_order(&self, customer_id: CustomerId) -> Result<Cart> {
        let customer = self.directory.find_by_id(customer_id).await?;
        Ok(Cart::new(customer))
    }

    /// Adds a product to the cart, checked against the product's live stock.
    #[tracing::instrument(skip(self, cart), fields(customer_id = %cart.customer().id))]
    pub async fn add_to_cart(
        &self,
        cart: &mut Cart,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<()> {
        let product = self.catalog.find_by_id(product_id).await?;
        cart.add(&product, quantity)?;
        Ok(())
    }

    /// Commits the cart as a new order.
    pub async fn commit(&self, cart: Cart) -> Result<Order> {
        let (customer, lines) = cart.into_parts();
        self.create_order(customer.id, lines).await
    }

    /// Persists a pending order dated today and takes each line's quantity
    /// out of stock, all in one store transaction.
    ///
    /// If any product lacks the stock at this point nothing is written and
    /// the call fails with `Conflict::StockExhausted`.
    #[tracing::instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn create_order(&self, customer_id: CustomerId, lines: Vec<CartLine>) -> Result<Order> {
        if lines.is_empty() {
            return Err(DomainError::EmptyOrder);
        }
        let start = Instant::now();

        let total = checked_total(lines.iter().map(|l| (l.unit_price, l.quantity)))
            .ok_or_else(total_out_of_range)?;
        let units: u64 = lines.iter().map(|l| u64::from(l.quantity)).sum();
        let new_order = NewOrder {
            customer_id,
            date: Local::now().date_naive(),
            status: OrderStatus::Pending,
            total,
            lines: lines
                .iter()
                .map(|l| NewLineItem {
                    product_id: l.product_id(),
                    quantity: l.quantity,
                    unit_price: l.unit_price,
                })
                .collect(),
        };

        let (record, _) = match self.store.insert_order(new_order).await {
            Ok(inserted) => inserted,
            Err(e) => {
                metrics::counter!("order_commit_failures_total").increment(1);
                let err = DomainError::from(e);
                if err.is_recoverable() {
                    warn!(%customer_id, error = %err, "order commit rejected");
                } else {
                    error!(%customer_id, error = %err, "order commit failed");
                }
                return Err(err);
            }
        };

        metrics::counter!("orders_committed_total").increment(1);
        metrics::counter!("stock_units_committed_total").increment(units);
        metrics::histogram!("orders_commit_duration_seconds")
            .record(start.elapsed().as_secs_f64());
        info!(order_id = %record.id, %customer_id, %total, "order committed");

        self.get_by_id(record.id).await
    }

    /// Loads an order with its customer and every line item's product.
    #[tracing::instrument(skip(self))]
    pub async fn get_by_id(&self, id: OrderId) -> Result<Order> {
        let record = self.store.require_order(id).await?;
        let customer = self.directory.find_by_id(record.customer_id).await?;

        let records = self.store.line_items_for_order(id).await?;
        let mut items = Vec::with_capacity(records.len());
        for record in records {
            let product = self.catalog.find_by_id(record.product_id).await?;
            items.push(LineItem { record, product });
        }

        Ok(Order {
            record,
            customer,
            items,
        })
    }

    /// Returns every order, newest first, without line items.
    pub async fn list_all(&self) -> Result<Vec<OrderSummary>> {
        Ok(self.store.list_orders().await?)
    }

    /// Returns a customer's orders, newest first, without line items.
    #[tracing::instrument(skip(self))]
    pub async fn list_by_customer(&self, customer_id: CustomerId) -> Result<Vec<OrderSummary>> {
        self.directory.find_by_id(customer_id).await?;
        Ok(self.store.list_orders_for_customer(customer_id).await?)
    }

    /// Overwrites an order's status. Any status may follow any other.
    #[tracing::instrument(skip(self))]
    pub async fn set_status(&self, id: OrderId, status: OrderStatus) -> Result<OrderSummary> {
        let order = self.store.set_order_status(id, status).await?;
        let customer = self.directory.find_by_id(order.customer_id).await?;
        info!(order_id = %id, %status, "order status changed");
        Ok(OrderSummary { order, customer })
    }

    /// Deletes an order and returns its quantities to stock, atomically.
    #[tracing::instrument(skip(self))]
    pub async fn delete_order(&self, id: OrderId) -> Result<()> {
        let order = self.store.require_order(id).await?;
        if order.status.has_shipped() {
            warn!(
                order_id = %id,
                status = %order.status,
                "deleting an order that already shipped; its stock is restored anyway"
            );
        }

        let removed = match self.store.delete_order(id).await {
            Ok(removed) => removed,
            Err(e) => {
                let err = DomainError::from(e);
                if !err.is_recoverable() {
                    error!(order_id = %id, error = %err, "order deletion failed");
                }
                return Err(err);
            }
        };

        metrics::counter!("orders_deleted_total").increment(1);
        info!(order_id = %id, lines = removed.len(), "order deleted, stock restored");
        Ok(())
    }
}
