pub mod customers;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod products;

use serde::Deserialize;

/// `?search=` query accepted by the list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}
