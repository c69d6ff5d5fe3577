//! Product catalog.

use common::{Money, ProductId};
use store::{NewProduct, Product, Store, StoreExt};
use tracing::info;

use crate::error::{DomainError, Result};

/// Product lookups, maintenance and direct stock adjustment.
#[derive(Clone)]
pub struct CatalogService<S: Store> {
    store: S,
}

impl<S: Store> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    #[tracing::instrument(skip(self))]
    pub async fn find_by_id(&self, id: ProductId) -> Result<Product> {
        Ok(self.store.require_product(id).await?)
    }

    /// Returns every product, ordered by name.
    pub async fn list(&self) -> Result<Vec<Product>> {
        Ok(self.store.list_products().await?)
    }

    /// Returns products whose name or description contains `term`, ignoring
    /// case. A blank term matches nothing.
    #[tracing::instrument(skip(self))]
    pub async fn search(&self, term: &str) -> Result<Vec<Product>> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.store.search_products(term).await?)
    }

    #[tracing::instrument(skip(self), fields(name = %product.name))]
    pub async fn create(&self, product: NewProduct) -> Result<Product> {
        validate(&product.name, product.price)?;
        if product.stock < 0 {
            return Err(DomainError::validation(format!(
                "stock cannot be negative: {}",
                product.stock
            )));
        }
        let product = self.store.insert_product(product).await?;
        info!(product_id = %product.id, "product created");
        Ok(product)
    }

    /// Replaces the name, description and price. The stock on `product` is
    /// ignored and the stored stock is returned.
    #[tracing::instrument(skip(self), fields(product_id = %product.id))]
    pub async fn update(&self, product: Product) -> Result<Product> {
        validate(&product.name, product.price)?;
        Ok(self.store.update_product(product).await?)
    }

    /// Deletes a product that no line item references.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<()> {
        self.store.delete_product(id).await?;
        info!(product_id = %id, "product deleted");
        Ok(())
    }

    /// Adds `delta` to the product's stock. Negative deltas are allowed and
    /// the result is not clamped at zero.
    #[tracing::instrument(skip(self))]
    pub async fn adjust_stock(&self, id: ProductId, delta: i64) -> Result<Product> {
        let product = self.store.adjust_stock(id, delta).await?;
        info!(product_id = %id, delta, stock = product.stock, "stock adjusted");
        Ok(product)
    }
}

/// Highest unit price the catalog accepts.
pub const MAX_PRICE: Money = Money::from_dollars(1_000_000_000);

fn validate(name: &str, price: Money) -> Result<()> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("product name is required"));
    }
    if price.is_negative() {
        return Err(DomainError::validation(format!(
            "price cannot be negative: {price}"
        )));
    }
    if price > MAX_PRICE {
        return Err(DomainError::validation(format!(
            "price cannot exceed {MAX_PRICE}"
        )));
    }
    Ok(())
}
