use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqliteConnection, SqlitePool, Transaction};

use crate::{
    Conflict, Customer, CustomerId, LineItemRecord, NewCustomer, NewOrder, NewProduct, OrderId,
    OrderRecord, OrderStatus, OrderSummary, Product, ProductId, Result, StoreError,
    model::NewLineItem, store::Store,
};
use common::{LineItemId, Money};

/// SQLite-backed store implementation.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if missing) the database at `url`.
    ///
    /// In-memory databases live inside a single connection, so the pool is
    /// pinned to one connection that is never recycled.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_options.connect_with(options).await?;
        tracing::info!(%url, in_memory, "database connection established");
        Ok(Self { pool })
    }

    /// Opens a private in-memory database and creates the schema.
    pub async fn in_memory() -> Result<Self> {
        let store = Self::connect("sqlite::memory:", 1).await?;
        store.run_migrations().await?;
        Ok(store)
    }

    /// Starts a transaction holding the write lock from its first statement.
    /// Concurrent writers queue on `busy_timeout` rather than failing with
    /// `SQLITE_BUSY` on a read-to-write upgrade.
    async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Runs the database migrations. Safe to call on an initialized database.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("database migrations applied");
        Ok(())
    }

    fn row_to_customer(row: &SqliteRow) -> Result<Customer> {
        Ok(Customer {
            id: CustomerId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            phone: row
                .try_get::<Option<String>, _>("phone")?
                .unwrap_or_default(),
            address: row
                .try_get::<Option<String>, _>("address")?
                .unwrap_or_default(),
        })
    }

    fn row_to_product(row: &SqliteRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            description: row
                .try_get::<Option<String>, _>("description")?
                .unwrap_or_default(),
            price: Money::from_cents(row.try_get("price")?),
            stock: row.try_get("stock")?,
        })
    }

    fn row_to_order(row: &SqliteRow) -> Result<OrderRecord> {
        let status: String = row.try_get("status")?;
        Ok(OrderRecord {
            id: OrderId::new(row.try_get("id")?),
            customer_id: CustomerId::new(row.try_get("customer_id")?),
            date: row.try_get("date")?,
            status: OrderStatus::from_str(&status)
                .map_err(|e| StoreError::InvalidData(e.to_string()))?,
            total: Money::from_cents(row.try_get("total")?),
        })
    }

    fn row_to_summary(row: &SqliteRow) -> Result<OrderSummary> {
        let order = Self::row_to_order(row)?;
        let customer = Customer {
            id: order.customer_id,
            name: row.try_get("customer_name")?,
            email: row.try_get("customer_email")?,
            phone: row
                .try_get::<Option<String>, _>("customer_phone")?
                .unwrap_or_default(),
            address: row
                .try_get::<Option<String>, _>("customer_address")?
                .unwrap_or_default(),
        };
        Ok(OrderSummary { order, customer })
    }

    fn row_to_line_item(row: &SqliteRow) -> Result<LineItemRecord> {
        let quantity: i64 = row.try_get("quantity")?;
        Ok(LineItemRecord {
            id: LineItemId::new(row.try_get("id")?),
            order_id: OrderId::new(row.try_get("order_id")?),
            product_id: ProductId::new(row.try_get("product_id")?),
            quantity: u32::try_from(quantity).map_err(|_| {
                StoreError::InvalidData(format!("line item quantity out of range: {quantity}"))
            })?,
            unit_price: Money::from_cents(row.try_get("unit_price")?),
        })
    }
}

// Helpers that run on a connection so they can share a caller's transaction.

async fn customer_exists(conn: &mut SqliteConnection, id: CustomerId) -> Result<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM customers WHERE id = ?")
        .bind(id.get())
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

async fn email_owner(conn: &mut SqliteConnection, email: &str) -> Result<Option<CustomerId>> {
    let owner: Option<i64> = sqlx::query_scalar("SELECT id FROM customers WHERE email = ?")
        .bind(email)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(owner.map(CustomerId::new))
}

async fn product_stock(conn: &mut SqliteConnection, id: ProductId) -> Result<Option<i64>> {
    let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?")
        .bind(id.get())
        .fetch_optional(&mut *conn)
        .await?;
    Ok(stock)
}

async fn fetch_product(conn: &mut SqliteConnection, id: ProductId) -> Result<Product> {
    let row = sqlx::query("SELECT id, name, description, price, stock FROM products WHERE id = ?")
        .bind(id.get())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| StoreError::product_not_found(id))?;
    SqliteStore::row_to_product(&row)
}

async fn fetch_order(conn: &mut SqliteConnection, id: OrderId) -> Result<OrderRecord> {
    let row =
        sqlx::query("SELECT id, customer_id, date, status, total FROM orders WHERE id = ?")
            .bind(id.get())
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| StoreError::order_not_found(id))?;
    SqliteStore::row_to_order(&row)
}

/// Takes `line.quantity` out of stock only if that much is available.
async fn take_stock(conn: &mut SqliteConnection, line: &NewLineItem) -> Result<()> {
    let quantity = i64::from(line.quantity);
    let updated = sqlx::query("UPDATE products SET stock = stock - ? WHERE id = ? AND stock >= ?")
        .bind(quantity)
        .bind(line.product_id.get())
        .bind(quantity)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    if updated == 0 {
        return Err(match product_stock(conn, line.product_id).await? {
            None => StoreError::product_not_found(line.product_id),
            Some(available) => Conflict::StockExhausted {
                product_id: line.product_id,
                requested: line.quantity,
                available,
            }
            .into(),
        });
    }
    Ok(())
}

fn email_conflict(err: sqlx::Error, email: &str) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return Conflict::DuplicateEmail {
            email: email.to_string(),
        }
        .into();
    }
    StoreError::Database(err)
}

const SUMMARY_SELECT: &str = r#"
    SELECT o.id, o.customer_id, o.date, o.status, o.total,
           c.name AS customer_name, c.email AS customer_email,
           c.phone AS customer_phone, c.address AS customer_address
    FROM orders o
    JOIN customers c ON c.id = o.customer_id
"#;

#[async_trait]
impl Store for SqliteStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_customer(&self, customer: NewCustomer) -> Result<Customer> {
        let mut tx = self.begin_write().await?;

        if email_owner(&mut tx, &customer.email).await?.is_some() {
            return Err(Conflict::DuplicateEmail {
                email: customer.email,
            }
            .into());
        }

        let id = sqlx::query(
            "INSERT INTO customers (name, email, phone, address) VALUES (?, ?, ?, ?)",
        )
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.address)
        .execute(&mut *tx)
        .await
        .map_err(|e| email_conflict(e, &customer.email))?
        .last_insert_rowid();

        tx.commit().await?;
        Ok(customer.into_customer(CustomerId::new(id)))
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        let row = sqlx::query("SELECT id, name, email, phone, address FROM customers WHERE id = ?")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_customer).transpose()
    }

    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>> {
        let row =
            sqlx::query("SELECT id, name, email, phone, address FROM customers WHERE email = ?")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;

        row.as_ref().map(Self::row_to_customer).transpose()
    }

    async fn list_customers(&self) -> Result<Vec<Customer>> {
        let rows =
            sqlx::query("SELECT id, name, email, phone, address FROM customers ORDER BY name, id")
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(Self::row_to_customer).collect()
    }

    async fn search_customers(&self, term: &str) -> Result<Vec<Customer>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, email, phone, address
            FROM customers
            WHERE instr(lower(name), lower(?1)) > 0
               OR instr(lower(email), lower(?1)) > 0
               OR instr(lower(COALESCE(phone, '')), lower(?1)) > 0
            ORDER BY name, id
            "#,
        )
        .bind(term)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_customer).collect()
    }

    async fn update_customer(&self, customer: Customer) -> Result<Customer> {
        let mut tx = self.begin_write().await?;

        if !customer_exists(&mut tx, customer.id).await? {
            return Err(StoreError::customer_not_found(customer.id));
        }
        if let Some(owner) = email_owner(&mut tx, &customer.email).await?
            && owner != customer.id
        {
            return Err(Conflict::DuplicateEmail {
                email: customer.email,
            }
            .into());
        }

        sqlx::query("UPDATE customers SET name = ?, email = ?, phone = ?, address = ? WHERE id = ?")
            .bind(&customer.name)
            .bind(&customer.email)
            .bind(&customer.phone)
            .bind(&customer.address)
            .bind(customer.id.get())
            .execute(&mut *tx)
            .await
            .map_err(|e| email_conflict(e, &customer.email))?;

        tx.commit().await?;
        Ok(customer)
    }

    async fn delete_customer(&self, id: CustomerId) -> Result<()> {
        let mut tx = self.begin_write().await?;

        if !customer_exists(&mut tx, id).await? {
            return Err(StoreError::customer_not_found(id));
        }

        let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE customer_id = ?")
            .bind(id.get())
            .fetch_one(&mut *tx)
            .await?;
        if orders > 0 {
            return Err(Conflict::CustomerHasOrders {
                customer_id: id,
                orders,
            }
            .into());
        }

        sqlx::query("DELETE FROM customers WHERE id = ?")
            .bind(id.get())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product> {
        let id = sqlx::query(
            "INSERT INTO products (name, description, price, stock) VALUES (?, ?, ?, ?)",
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.cents())
        .bind(product.stock)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(product.into_product(ProductId::new(id)))
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query("SELECT id, name, description, price, stock FROM products WHERE id = ?")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_product).transpose()
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            "SELECT id, name, description, price, stock FROM products ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_product).collect()
    }

    async fn search_products(&self, term: &str) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, description, price, stock
            FROM products
            WHERE instr(lower(name), lower(?1)) > 0
               OR instr(lower(COALESCE(description, '')), lower(?1)) > 0
            ORDER BY name, id
            "#,
        )
        .bind(term)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_product).collect()
    }

    async fn update_product(&self, product: Product) -> Result<Product> {
        let mut tx = self.begin_write().await?;

        let updated =
            sqlx::query("UPDATE products SET name = ?, description = ?, price = ? WHERE id = ?")
                .bind(&product.name)
                .bind(&product.description)
                .bind(product.price.cents())
                .bind(product.id.get())
                .execute(&mut *tx)
                .await?
                .rows_affected();
        if updated == 0 {
            return Err(StoreError::product_not_found(product.id));
        }

        let product = fetch_product(&mut tx, product.id).await?;
        tx.commit().await?;
        Ok(product)
    }

    async fn delete_product(&self, id: ProductId) -> Result<()> {
        let mut tx = self.begin_write().await?;

        if product_stock(&mut tx, id).await?.is_none() {
            return Err(StoreError::product_not_found(id));
        }

        let line_items: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM line_items WHERE product_id = ?")
                .bind(id.get())
                .fetch_one(&mut *tx)
                .await?;
        if line_items > 0 {
            return Err(Conflict::ProductReferenced {
                product_id: id,
                line_items,
            }
            .into());
        }

        sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id.get())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn adjust_stock(&self, id: ProductId, delta: i64) -> Result<Product> {
        let mut tx = self.begin_write().await?;

        let updated = sqlx::query("UPDATE products SET stock = stock + ? WHERE id = ?")
            .bind(delta)
            .bind(id.get())
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if updated == 0 {
            return Err(StoreError::product_not_found(id));
        }

        let product = fetch_product(&mut tx, id).await?;
        tx.commit().await?;
        Ok(product)
    }

    async fn insert_order(&self, order: NewOrder) -> Result<(OrderRecord, Vec<LineItemRecord>)> {
        // Dropping `tx` on any early return rolls back everything below.
        let mut tx = self.begin_write().await?;

        if !customer_exists(&mut tx, order.customer_id).await? {
            return Err(StoreError::customer_not_found(order.customer_id));
        }

        let order_id = sqlx::query(
            "INSERT INTO orders (customer_id, date, status, total) VALUES (?, ?, ?, ?)",
        )
        .bind(order.customer_id.get())
        .bind(order.date)
        .bind(order.status.as_str())
        .bind(order.total.cents())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();
        let order_id = OrderId::new(order_id);

        let mut items = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            take_stock(&mut tx, line).await?;

            let item_id = sqlx::query(
                "INSERT INTO line_items (order_id, product_id, quantity, unit_price) VALUES (?, ?, ?, ?)",
            )
            .bind(order_id.get())
            .bind(line.product_id.get())
            .bind(i64::from(line.quantity))
            .bind(line.unit_price.cents())
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

            items.push(LineItemRecord {
                id: LineItemId::new(item_id),
                order_id,
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
            });
        }

        tx.commit().await?;
        tracing::debug!(%order_id, lines = items.len(), "order committed");

        let record = OrderRecord {
            id: order_id,
            customer_id: order.customer_id,
            date: order.date,
            status: order.status,
            total: order.total,
        };
        Ok((record, items))
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderRecord>> {
        let row =
            sqlx::query("SELECT id, customer_id, date, status, total FROM orders WHERE id = ?")
                .bind(id.get())
                .fetch_optional(&self.pool)
                .await?;

        row.as_ref().map(Self::row_to_order).transpose()
    }

    async fn line_items_for_order(&self, id: OrderId) -> Result<Vec<LineItemRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, product_id, quantity, unit_price
            FROM line_items
            WHERE order_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(id.get())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_line_item).collect()
    }

    async fn list_orders(&self) -> Result<Vec<OrderSummary>> {
        let sql = format!("{SUMMARY_SELECT} ORDER BY o.date DESC, o.id DESC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.iter().map(Self::row_to_summary).collect()
    }

    async fn list_orders_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<OrderSummary>> {
        let sql =
            format!("{SUMMARY_SELECT} WHERE o.customer_id = ? ORDER BY o.date DESC, o.id DESC");
        let rows = sqlx::query(&sql)
            .bind(customer_id.get())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_summary).collect()
    }

    async fn set_order_status(&self, id: OrderId, status: OrderStatus) -> Result<OrderRecord> {
        let mut tx = self.begin_write().await?;

        let updated = sqlx::query("UPDATE orders SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id.get())
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if updated == 0 {
            return Err(StoreError::order_not_found(id));
        }

        let order = fetch_order(&mut tx, id).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn delete_order(&self, id: OrderId) -> Result<Vec<LineItemRecord>> {
        let mut tx = self.begin_write().await?;

        fetch_order(&mut tx, id).await?;

        let rows = sqlx::query(
            r#"
            SELECT id, order_id, product_id, quantity, unit_price
            FROM line_items
            WHERE order_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(id.get())
        .fetch_all(&mut *tx)
        .await?;
        let items = rows
            .iter()
            .map(Self::row_to_line_item)
            .collect::<Result<Vec<_>>>()?;

        for item in &items {
            sqlx::query("UPDATE products SET stock = stock + ? WHERE id = ?")
                .bind(i64::from(item.quantity))
                .bind(item.product_id.get())
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("DELETE FROM line_items WHERE order_id = ?")
            .bind(id.get())
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM orders WHERE id = ?")
            .bind(id.get())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::debug!(order_id = %id, restored_lines = items.len(), "order deleted");
        Ok(items)
    }
}
