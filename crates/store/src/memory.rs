use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use common::LineItemId;
use tokio::sync::RwLock;

use crate::{
    Conflict, Customer, CustomerId, LineItemRecord, NewCustomer, NewOrder, NewProduct, OrderId,
    OrderRecord, OrderStatus, OrderSummary, Product, ProductId, Result, StoreError,
    store::{Store, contains_ignore_case},
};

#[derive(Debug, Default)]
struct InMemoryState {
    customers: BTreeMap<CustomerId, Customer>,
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, OrderRecord>,
    line_items: BTreeMap<LineItemId, LineItemRecord>,
    last_customer_id: i64,
    last_product_id: i64,
    last_order_id: i64,
    last_line_item_id: i64,
}

impl InMemoryState {
    fn email_owner(&self, email: &str) -> Option<CustomerId> {
        self.customers
            .values()
            .find(|c| c.email == email)
            .map(|c| c.id)
    }

    fn summaries<'a>(
        &'a self,
        orders: impl Iterator<Item = &'a OrderRecord>,
    ) -> Result<Vec<OrderSummary>> {
        let mut summaries = orders
            .map(|order| {
                let customer = self
                    .customers
                    .get(&order.customer_id)
                    .cloned()
                    .ok_or_else(|| StoreError::customer_not_found(order.customer_id))?;
                Ok(OrderSummary {
                    order: order.clone(),
                    customer,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        summaries.sort_by(|a, b| {
            b.order
                .date
                .cmp(&a.order.date)
                .then(b.order.id.cmp(&a.order.id))
        });
        Ok(summaries)
    }
}

fn sorted_by_name<T>(mut items: Vec<T>, key: impl Fn(&T) -> (&str, i64)) -> Vec<T> {
    items.sort_by(|a, b| key(a).cmp(&key(b)));
    items
}

/// In-memory store implementation for testing.
///
/// Provides the same interface and atomicity as the SQLite implementation:
/// multi-step operations validate everything under the write lock before
/// changing any state.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<InMemoryState>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Returns the number of stored line items across all orders.
    pub async fn line_item_count(&self) -> usize {
        self.state.read().await.line_items.len()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn insert_customer(&self, customer: NewCustomer) -> Result<Customer> {
        let mut state = self.state.write().await;

        if state.email_owner(&customer.email).is_some() {
            return Err(Conflict::DuplicateEmail {
                email: customer.email,
            }
            .into());
        }

        state.last_customer_id += 1;
        let customer = customer.into_customer(CustomerId::new(state.last_customer_id));
        state.customers.insert(customer.id, customer.clone());
        Ok(customer)
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        Ok(self.state.read().await.customers.get(&id).cloned())
    }

    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>> {
        let state = self.state.read().await;
        Ok(state
            .email_owner(email)
            .and_then(|id| state.customers.get(&id).cloned()))
    }

    async fn list_customers(&self) -> Result<Vec<Customer>> {
        let state = self.state.read().await;
        let customers = state.customers.values().cloned().collect();
        Ok(sorted_by_name(customers, |c| (c.name.as_str(), c.id.get())))
    }

    async fn search_customers(&self, term: &str) -> Result<Vec<Customer>> {
        let state = self.state.read().await;
        let customers = state
            .customers
            .values()
            .filter(|c| {
                contains_ignore_case(&c.name, term)
                    || contains_ignore_case(&c.email, term)
                    || contains_ignore_case(&c.phone, term)
            })
            .cloned()
            .collect();
        Ok(sorted_by_name(customers, |c| (c.name.as_str(), c.id.get())))
    }

    async fn update_customer(&self, customer: Customer) -> Result<Customer> {
        let mut state = self.state.write().await;

        if !state.customers.contains_key(&customer.id) {
            return Err(StoreError::customer_not_found(customer.id));
        }
        if let Some(owner) = state.email_owner(&customer.email)
            && owner != customer.id
        {
            return Err(Conflict::DuplicateEmail {
                email: customer.email,
            }
            .into());
        }

        state.customers.insert(customer.id, customer.clone());
        Ok(customer)
    }

    async fn delete_customer(&self, id: CustomerId) -> Result<()> {
        let mut state = self.state.write().await;

        if !state.customers.contains_key(&id) {
            return Err(StoreError::customer_not_found(id));
        }

        let orders = state
            .orders
            .values()
            .filter(|o| o.customer_id == id)
            .count() as i64;
        if orders > 0 {
            return Err(Conflict::CustomerHasOrders {
                customer_id: id,
                orders,
            }
            .into());
        }

        state.customers.remove(&id);
        Ok(())
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product> {
        let mut state = self.state.write().await;
        state.last_product_id += 1;
        let product = product.into_product(ProductId::new(state.last_product_id));
        state.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let state = self.state.read().await;
        let products = state.products.values().cloned().collect();
        Ok(sorted_by_name(products, |p| (p.name.as_str(), p.id.get())))
    }

    async fn search_products(&self, term: &str) -> Result<Vec<Product>> {
        let state = self.state.read().await;
        let products = state
            .products
            .values()
            .filter(|p| {
                contains_ignore_case(&p.name, term) || contains_ignore_case(&p.description, term)
            })
            .cloned()
            .collect();
        Ok(sorted_by_name(products, |p| (p.name.as_str(), p.id.get())))
    }

    async fn update_product(&self, product: Product) -> Result<Product> {
        let mut state = self.state.write().await;
        let existing = state
            .products
            .get_mut(&product.id)
            .ok_or_else(|| StoreError::product_not_found(product.id))?;
        existing.name = product.name;
        existing.description = product.description;
        existing.price = product.price;
        Ok(existing.clone())
    }

    async fn delete_product(&self, id: ProductId) -> Result<()> {
        let mut state = self.state.write().await;

        if !state.products.contains_key(&id) {
            return Err(StoreError::product_not_found(id));
        }

        let line_items = state
            .line_items
            .values()
            .filter(|item| item.product_id == id)
            .count() as i64;
        if line_items > 0 {
            return Err(Conflict::ProductReferenced {
                product_id: id,
                line_items,
            }
            .into());
        }

        state.products.remove(&id);
        Ok(())
    }

    async fn adjust_stock(&self, id: ProductId, delta: i64) -> Result<Product> {
        let mut state = self.state.write().await;
        let product = state
            .products
            .get_mut(&id)
            .ok_or_else(|| StoreError::product_not_found(id))?;
        product.stock += delta;
        Ok(product.clone())
    }

    async fn insert_order(&self, order: NewOrder) -> Result<(OrderRecord, Vec<LineItemRecord>)> {
        let mut state = self.state.write().await;

        if !state.customers.contains_key(&order.customer_id) {
            return Err(StoreError::customer_not_found(order.customer_id));
        }

        // Validate every line against the stock left by the lines before it.
        let mut remaining: HashMap<ProductId, i64> = HashMap::new();
        for line in &order.lines {
            let stock = match remaining.get(&line.product_id) {
                Some(stock) => *stock,
                None => state
                    .products
                    .get(&line.product_id)
                    .map(|p| p.stock)
                    .ok_or_else(|| StoreError::product_not_found(line.product_id))?,
            };
            let quantity = i64::from(line.quantity);
            if stock < quantity {
                return Err(Conflict::StockExhausted {
                    product_id: line.product_id,
                    requested: line.quantity,
                    available: stock,
                }
                .into());
            }
            remaining.insert(line.product_id, stock - quantity);
        }

        state.last_order_id += 1;
        let record = OrderRecord {
            id: OrderId::new(state.last_order_id),
            customer_id: order.customer_id,
            date: order.date,
            status: order.status,
            total: order.total,
        };
        state.orders.insert(record.id, record.clone());

        let mut items = Vec::with_capacity(order.lines.len());
        for line in order.lines {
            state.last_line_item_id += 1;
            let item = LineItemRecord {
                id: LineItemId::new(state.last_line_item_id),
                order_id: record.id,
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
            };
            state.line_items.insert(item.id, item.clone());
            items.push(item);
        }

        for (product_id, stock) in remaining {
            if let Some(product) = state.products.get_mut(&product_id) {
                product.stock = stock;
            }
        }

        Ok((record, items))
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderRecord>> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn line_items_for_order(&self, id: OrderId) -> Result<Vec<LineItemRecord>> {
        let state = self.state.read().await;
        Ok(state
            .line_items
            .values()
            .filter(|item| item.order_id == id)
            .cloned()
            .collect())
    }

    async fn list_orders(&self) -> Result<Vec<OrderSummary>> {
        let state = self.state.read().await;
        state.summaries(state.orders.values())
    }

    async fn list_orders_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<OrderSummary>> {
        let state = self.state.read().await;
        state.summaries(
            state
                .orders
                .values()
                .filter(|o| o.customer_id == customer_id),
        )
    }

    async fn set_order_status(&self, id: OrderId, status: OrderStatus) -> Result<OrderRecord> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .get_mut(&id)
            .ok_or_else(|| StoreError::order_not_found(id))?;
        order.status = status;
        Ok(order.clone())
    }

    async fn delete_order(&self, id: OrderId) -> Result<Vec<LineItemRecord>> {
        let mut state = self.state.write().await;

        if !state.orders.contains_key(&id) {
            return Err(StoreError::order_not_found(id));
        }

        let items: Vec<LineItemRecord> = state
            .line_items
            .values()
            .filter(|item| item.order_id == id)
            .cloned()
            .collect();

        for item in &items {
            if let Some(product) = state.products.get_mut(&item.product_id) {
                product.stock += i64::from(item.quantity);
            }
            state.line_items.remove(&item.id);
        }
        state.orders.remove(&id);

        Ok(items)
    }
}
