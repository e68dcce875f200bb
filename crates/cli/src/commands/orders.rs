use chrono::{DateTime, Utc};
use serde::Serialize;

use tendero_core::config::{AppConfig, LoadOptions};
use tendero_db::{connect_with_settings, OrderRepository, SqlOrderRepository, StoredOrder};

use crate::commands::{block_on, serialization_failure, CommandResult};

pub const DEFAULT_LIMIT: u32 = 20;

#[derive(Debug, Serialize)]
struct OrderSummary {
    id: i64,
    order_number: u32,
    branch_code: Option<String>,
    product_id: i64,
    variation_id: Option<i64>,
    product_name: String,
    customer_name: String,
    email: String,
    address: String,
    phone: String,
    status: &'static str,
    created_at: DateTime<Utc>,
}

impl From<StoredOrder> for OrderSummary {
    fn from(order: StoredOrder) -> Self {
        let address = order.record.delivery_address();
        let record = order.record;
        Self {
            id: order.id,
            order_number: record.order_number.0,
            branch_code: record.branch_code,
            product_id: record.product_id.0,
            variation_id: record.variation_id.map(|variation| variation.0),
            product_name: record.product_name,
            customer_name: record.customer_name,
            email: record.email,
            address,
            phone: record.phone,
            status: record.status.as_str(),
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct OrdersReport {
    command: &'static str,
    status: &'static str,
    count: usize,
    orders: Vec<OrderSummary>,
}

/// Newest orders first, at most `limit` of them.
pub fn run(limit: u32) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "orders",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let result = block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        let orders = SqlOrderRepository::new(pool.clone())
            .list_recent(limit.max(1))
            .await
            .map_err(|error| ("order_query", error.to_string(), 5u8));
        pool.close().await;
        orders
    });

    let orders = match result {
        Ok(Ok(orders)) => orders,
        Ok(Err((error_class, message, exit_code))) => {
            return CommandResult::failure("orders", error_class, message, exit_code);
        }
        Err(error) => {
            return CommandResult::failure(
                "orders",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let report = OrdersReport {
        command: "orders",
        status: "ok",
        count: orders.len(),
        orders: orders.into_iter().map(OrderSummary::from).collect(),
    };
    let output = serde_json::to_string_pretty(&report)
        .unwrap_or_else(|error| serialization_failure(&error));
    CommandResult { exit_code: 0, output }
}
