//! Customer directory.

use common::CustomerId;
use store::{Conflict, Customer, NewCustomer, Store, StoreExt};
use tracing::info;

use crate::error::{DomainError, Result};

/// Customer lookups and maintenance with email uniqueness.
#[derive(Clone)]
pub struct CustomerDirectory<S: Store> {
    store: S,
}

impl<S: Store> CustomerDirectory<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self))]
    pub async fn find_by_id(&self, id: CustomerId) -> Result<Customer> {
        Ok(self.store.require_customer(id).await?)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Customer>> {
        Ok(self.store.find_customer_by_email(email.trim()).await?)
    }

    /// Returns every customer, ordered by name.
    pub async fn list(&self) -> Result<Vec<Customer>> {
        Ok(self.store.list_customers().await?)
    }

    /// Returns customers whose name, email or phone contains `term`,
    /// ignoring case. A blank term matches nothing.
    #[tracing::instrument(skip(self))]
    pub async fn search(&self, term: &str) -> Result<Vec<Customer>> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.store.search_customers(term).await?)
    }

    #[tracing::instrument(skip(self), fields(email = %customer.email))]
    pub async fn create(&self, mut customer: NewCustomer) -> Result<Customer> {
        customer.email = customer.email.trim().to_string();
        validate(&customer.name, &customer.email)?;
        self.ensure_email_free(&customer.email, None).await?;

        let customer = self.store.insert_customer(customer).await?;
        info!(customer_id = %customer.id, "customer created");
        Ok(customer)
    }

    /// Overwrites a customer. Keeping its current email is allowed.
    #[tracing::instrument(skip(self), fields(customer_id = %customer.id))]
    pub async fn update(&self, mut customer: Customer) -> Result<Customer> {
        customer.email = customer.email.trim().to_string();
        validate(&customer.name, &customer.email)?;
        self.ensure_email_free(&customer.email, Some(customer.id))
            .await?;

        Ok(self.store.update_customer(customer).await?)
    }

    /// Deletes a customer that has no orders.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: CustomerId) -> Result<()> {
        self.store.delete_customer(id).await?;
        info!(customer_id = %id, "customer deleted");
        Ok(())
    }

    async fn ensure_email_free(&self, email: &str, owner: Option<CustomerId>) -> Result<()> {
        if let Some(existing) = self.store.find_customer_by_email(email).await?
            && Some(existing.id) != owner
        {
            return Err(DomainError::Conflict(Conflict::DuplicateEmail {
                email: email.to_string(),
            }));
        }
        Ok(())
    }
}

fn validate(name: &str, email: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("customer name is required"));
    }
    if email.is_empty() {
        return Err(DomainError::validation("customer email is required"));
    }
    Ok(())
}
