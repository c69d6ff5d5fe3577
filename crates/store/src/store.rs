use async_trait::async_trait;

use crate::{
    Customer, CustomerId, LineItemRecord, NewCustomer, NewOrder, NewProduct, OrderId, OrderRecord,
    OrderStatus, OrderSummary, Product, ProductId, Result, StoreError,
};

/// Core trait for entity store implementations.
///
/// A store persists customers, products, orders and line items. Every
/// operation that touches more than one row is atomic: either all of its
/// effects are applied or none are. All implementations must be thread-safe
/// (Send + Sync).
#[async_trait]
pub trait Store: Send + Sync {
    /// Checks that the backing database answers queries.
    async fn ping(&self) -> Result<()>;

    // Customers

    /// Inserts a customer and returns it with its assigned id.
    ///
    /// Fails with `Conflict::DuplicateEmail` if the email is taken.
    async fn insert_customer(&self, customer: NewCustomer) -> Result<Customer>;

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>>;

    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>>;

    /// Returns all customers ordered by name.
    async fn list_customers(&self) -> Result<Vec<Customer>>;

    /// Returns customers whose name, email or phone contains `term`,
    /// ignoring ASCII case, ordered by name.
    async fn search_customers(&self, term: &str) -> Result<Vec<Customer>>;

    /// Overwrites every field of an existing customer except its id.
    ///
    /// Fails with `NotFound` if the customer does not exist and with
    /// `Conflict::DuplicateEmail` if a different customer owns the email.
    async fn update_customer(&self, customer: Customer) -> Result<Customer>;

    /// Deletes a customer.
    ///
    /// Fails with `Conflict::CustomerHasOrders` while any order references it.
    async fn delete_customer(&self, id: CustomerId) -> Result<()>;

    // Products

    async fn insert_product(&self, product: NewProduct) -> Result<Product>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Returns all products ordered by name.
    async fn list_products(&self) -> Result<Vec<Product>>;

    /// Returns products whose name or description contains `term`,
    /// ignoring ASCII case, ordered by name.
    async fn search_products(&self, term: &str) -> Result<Vec<Product>>;

    /// Overwrites the product's name, description and price.
    ///
    /// `product.stock` is ignored; stock only moves through `adjust_stock`
    /// and order commit or deletion. Returns the stored product.
    async fn update_product(&self, product: Product) -> Result<Product>;

    /// Deletes a product.
    ///
    /// Fails with `Conflict::ProductReferenced` while any line item references it.
    async fn delete_product(&self, id: ProductId) -> Result<()>;

    /// Adds `delta` to the product's stock and returns the updated product.
    ///
    /// The result is not checked against zero.
    async fn adjust_stock(&self, id: ProductId, delta: i64) -> Result<Product>;

    // Orders

    /// Commits an order: inserts the header and every line item, and takes
    /// each line's quantity out of the product's stock.
    ///
    /// Runs as one unit. A line whose product lacks the stock fails the whole
    /// commit with `Conflict::StockExhausted`; a missing customer or product
    /// fails it with `NotFound`. On failure nothing is persisted.
    async fn insert_order(&self, order: NewOrder) -> Result<(OrderRecord, Vec<LineItemRecord>)>;

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderRecord>>;

    /// Returns an order's line items in insertion order.
    async fn line_items_for_order(&self, id: OrderId) -> Result<Vec<LineItemRecord>>;

    /// Returns every order with its customer, newest date first.
    async fn list_orders(&self) -> Result<Vec<OrderSummary>>;

    /// Returns a customer's orders, newest date first.
    async fn list_orders_for_customer(&self, customer_id: CustomerId)
    -> Result<Vec<OrderSummary>>;

    async fn set_order_status(&self, id: OrderId, status: OrderStatus) -> Result<OrderRecord>;

    /// Deletes an order and its line items, returning each line's quantity
    /// to stock. Returns the removed line items.
    ///
    /// Runs as one unit; fails with `NotFound` if the order does not exist.
    async fn delete_order(&self, id: OrderId) -> Result<Vec<LineItemRecord>>;
}

/// Extension trait providing convenience methods for stores.
#[async_trait]
pub trait StoreExt: Store {
    /// Loads a customer, treating a miss as `NotFound`.
    async fn require_customer(&self, id: CustomerId) -> Result<Customer> {
        self.get_customer(id)
            .await?
            .ok_or_else(|| StoreError::customer_not_found(id))
    }

    /// Loads a product, treating a miss as `NotFound`.
    async fn require_product(&self, id: ProductId) -> Result<Product> {
        self.get_product(id)
            .await?
            .ok_or_else(|| StoreError::product_not_found(id))
    }

    /// Loads an order header, treating a miss as `NotFound`.
    async fn require_order(&self, id: OrderId) -> Result<OrderRecord> {
        self.get_order(id)
            .await?
            .ok_or_else(|| StoreError::order_not_found(id))
    }
}

// Blanket implementation for all Store implementations
impl<T: Store + ?Sized> StoreExt for T {}

/// Returns true if `haystack` contains `needle`, ignoring ASCII case.
///
/// Matches SQLite's `instr(lower(a), lower(b))` so both backends agree.
pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack
        .to_ascii_lowercase()
        .contains(&needle.to_ascii_lowercase())
}
