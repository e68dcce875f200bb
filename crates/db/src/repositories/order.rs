use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;

use tendero_core::domain::order::{OrderNumber, OrderRecord, OrderStatus};
use tendero_core::domain::product::{ProductId, VariationId};

use super::{OrderRepository, RepositoryError, StoredOrder};
use crate::DbPool;

const ORDER_COLUMNS: &str = "id, order_number, branch_code, product_id, variation_id, \
     product_name, customer_name, address, city, phone, email, status, created_at";

pub struct SqlOrderRepository {
    pool: DbPool,
}

impl SqlOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode_error(error: sqlx::Error) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

fn row_to_order(row: &sqlx::sqlite::SqliteRow) -> Result<StoredOrder, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(decode_error)?;
    let order_number: i64 = row.try_get("order_number").map_err(decode_error)?;
    let branch_code: Option<String> = row.try_get("branch_code").map_err(decode_error)?;
    let product_id: i64 = row.try_get("product_id").map_err(decode_error)?;
    let variation_id: Option<i64> = row.try_get("variation_id").map_err(decode_error)?;
    let product_name: String = row.try_get("product_name").map_err(decode_error)?;
    let customer_name: String = row.try_get("customer_name").map_err(decode_error)?;
    let address: String = row.try_get("address").map_err(decode_error)?;
    let city: String = row.try_get("city").map_err(decode_error)?;
    let phone: String = row.try_get("phone").map_err(decode_error)?;
    let email: String = row.try_get("email").map_err(decode_error)?;
    let status_str: String = row.try_get("status").map_err(decode_error)?;
    let created_at_str: String = row.try_get("created_at").map_err(decode_error)?;

    let order_number = u32::try_from(order_number)
        .map(OrderNumber)
        .map_err(|_| RepositoryError::Decode(format!("order number {order_number} out of range")))?;
    let status = OrderStatus::parse(&status_str)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown order status `{status_str}`")))?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("created_at `{created_at_str}`: {e}")))?;

    Ok(StoredOrder {
        id,
        record: OrderRecord {
            order_number,
            branch_code,
            product_id: ProductId(product_id),
            variation_id: variation_id.map(VariationId),
            product_name,
            customer_name,
            email,
            address,
            city,
            phone,
            status,
            created_at,
        },
    })
}

#[async_trait::async_trait]
impl OrderRepository for SqlOrderRepository {
    async fn create(&self, record: &OrderRecord) -> Result<i64, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO customer_order (order_number, branch_code, product_id, variation_id,
                                         product_name, customer_name, address, city, phone,
                                         email, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(i64::from(record.order_number.0))
        .bind(&record.branch_code)
        .bind(record.product_id.0)
        .bind(record.variation_id.map(|variation| variation.0))
        .bind(&record.product_name)
        .bind(&record.customer_name)
        .bind(&record.address)
        .bind(&record.city)
        .bind(&record.phone)
        .bind(&record.email)
        .bind(record.status.as_str())
        .bind(record.created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn find_by_number(
        &self,
        order_number: OrderNumber,
    ) -> Result<Option<StoredOrder>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM customer_order
             WHERE order_number = ? ORDER BY created_at DESC, id DESC LIMIT 1"
        ))
        .bind(i64::from(order_number.0))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_order(r)?)),
            None => Ok(None),
        }
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<StoredOrder>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM customer_order
             ORDER BY created_at DESC, id DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_order).collect::<Result<Vec<_>, _>>()
    }
}
