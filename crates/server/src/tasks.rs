//! Background maintenance loops started alongside the chat runner.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use tendero_agent::{AgentRuntime, OrderFunnel};
use tendero_chat::UserMailboxes;
use tendero_core::catalog::ProductCatalog;
use tendero_core::domain::user::UserId;

/// Periodically drops pending orders past their TTL, skipping customers with a turn in flight.
pub fn spawn_order_sweeper(
    runtime: Arc<AgentRuntime>,
    mailboxes: UserMailboxes,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
        ticker.tick().await;
        loop {
            ticker.tick().await;
            sweep_once(runtime.funnel(), &mailboxes).await;
        }
    })
}

async fn sweep_once(funnel: &OrderFunnel, mailboxes: &UserMailboxes) -> usize {
    let is_busy = |user_id: &UserId| mailboxes.is_busy(user_id);
    match funnel.sweep(Utc::now(), &is_busy).await {
        Ok(removed) => {
            if !removed.is_empty() {
                info!(
                    event_name = "funnel.sweep_completed",
                    correlation_id = "sweep",
                    removed = removed.len(),
                    "expired pending orders removed"
                );
            }
            removed.len()
        }
        Err(error) => {
            warn!(
                event_name = "funnel.sweep_failed",
                correlation_id = "sweep",
                error = %error,
                "pending order sweep failed"
            );
            0
        }
    }
}

/// Re-fetches the catalog on a fixed period. A zero interval disables refreshing.
pub fn spawn_catalog_refresher(
    catalog: Arc<ProductCatalog>,
    source_key: String,
    interval: Duration,
) -> Option<JoinHandle<()>> {
    if interval.is_zero() {
        return None;
    }

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            refresh_catalog(&catalog, &source_key, "refresh").await;
        }
    }))
}

/// Refreshes once; failures keep the previous snapshot and are only logged.
pub async fn refresh_catalog(catalog: &ProductCatalog, source_key: &str, correlation_id: &str) {
    match catalog.refresh(source_key).await {
        Ok(report) => {
            info!(
                event_name = "catalog.refreshed",
                correlation_id,
                product_count = report.product_count,
                uncategorized = report.uncategorized.len(),
                "catalog refreshed"
            );
            if !report.uncategorized.is_empty() {
                warn!(
                    event_name = "catalog.uncategorized_products",
                    correlation_id,
                    products = ?report.uncategorized,
                    "products without a known category were filed under Otros"
                );
            }
        }
        Err(error) => {
            warn!(
                event_name = "catalog.refresh_failed",
                correlation_id,
                error = %error,
                product_count = catalog.len(),
                "catalog refresh failed; keeping previous snapshot"
            );
        }
    }
}
