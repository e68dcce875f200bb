use async_trait::async_trait;
use thiserror::Error;

use tendero_core::domain::order::{OrderNumber, OrderRecord};

pub mod memory;
pub mod order;

pub use memory::InMemoryOrderRepository;
pub use order::SqlOrderRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// A persisted order with its storage identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredOrder {
    pub id: i64,
    pub record: OrderRecord,
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Inserts the order and returns its storage id.
    async fn create(&self, record: &OrderRecord) -> Result<i64, RepositoryError>;
    /// Order numbers are random and not unique; the most recent match wins.
    async fn find_by_number(
        &self,
        order_number: OrderNumber,
    ) -> Result<Option<StoredOrder>, RepositoryError>;
    async fn list_recent(&self, limit: u32) -> Result<Vec<StoredOrder>, RepositoryError>;
}
