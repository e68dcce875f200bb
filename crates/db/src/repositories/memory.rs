use tokio::sync::RwLock;

use tendero_core::domain::order::{OrderNumber, OrderRecord};

use super::{OrderRepository, RepositoryError, StoredOrder};

#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<Vec<StoredOrder>>,
}

impl InMemoryOrderRepository {
    pub async fn all(&self) -> Vec<StoredOrder> {
        self.orders.read().await.clone()
    }
}

#[async_trait::async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create(&self, record: &OrderRecord) -> Result<i64, RepositoryError> {
        let mut orders = self.orders.write().await;
        let id = orders.len() as i64 + 1;
        orders.push(StoredOrder { id, record: record.clone() });
        Ok(id)
    }

    async fn find_by_number(
        &self,
        order_number: OrderNumber,
    ) -> Result<Option<StoredOrder>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders.iter().rev().find(|order| order.record.order_number == order_number).cloned())
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<StoredOrder>, RepositoryError> {
        let orders = self.orders.read().await;
        let mut recent = orders.clone();
        recent.sort_by(|a, b| b.record.created_at.cmp(&a.record.created_at).then(b.id.cmp(&a.id)));
        recent.truncate(limit as usize);
        Ok(recent)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use tendero_core::domain::order::{OrderNumber, OrderRecord, OrderStatus};
    use tendero_core::domain::product::ProductId;

    use crate::repositories::{InMemoryOrderRepository, OrderRepository};

    #[tokio::test]
    async fn in_memory_order_repo_round_trip() {
        let repo = InMemoryOrderRepository::default();
        let order = OrderRecord {
            order_number: OrderNumber(654_321),
            branch_code: None,
            product_id: ProductId(1),
            variation_id: None,
            product_name: "Camisa".to_string(),
            customer_name: "Juan Perez".to_string(),
            email: "juan@x.com".to_string(),
            address: "Cra 1 # 2-3".to_string(),
            city: "Bogota".to_string(),
            phone: "573001234567".to_string(),
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };

        let id = repo.create(&order).await.expect("save order");
        let found = repo.find_by_number(order.order_number).await.expect("find order");

        assert_eq!(found.map(|stored| (stored.id, stored.record)), Some((id, order)));
        assert_eq!(repo.list_recent(10).await.expect("list").len(), 1);
    }
}
