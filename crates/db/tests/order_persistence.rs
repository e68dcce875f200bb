use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;

use tendero_core::domain::order::{OrderNumber, PendingOrder};
use tendero_core::domain::product::{Product, ProductId, Variation, VariationId};
use tendero_core::domain::user::UserId;
use tendero_core::flows::{BuyerField, FunnelState};
use tendero_db::{connect_with_settings, migrations, OrderRepository, SqlOrderRepository};

type TestResult<T = ()> = Result<T, String>;

fn zapatos() -> Product {
    Product {
        id: ProductId(77),
        name: "Zapatos".to_owned(),
        description: Some("Cuero".to_owned()),
        additional_info: None,
        price: Decimal::new(120_000, 0),
        quantity: 4,
        category: "Moda".to_owned(),
        variations: vec![Variation {
            id: VariationId(3),
            size: Some("40".to_owned()),
            color: Some("Negro".to_owned()),
            quantity: 2,
        }],
    }
}

fn completed_order() -> PendingOrder {
    let created = Utc.with_ymd_and_hms(2026, 5, 2, 15, 30, 0).single().unwrap_or_else(Utc::now);
    let product = zapatos();
    let variation = product.variation(VariationId(3)).cloned();
    let mut order =
        PendingOrder::new(UserId::normalize("573001234567@c.us"), product, variation, created);
    order.buyer.set(BuyerField::Name, "Ana Gomez".to_owned());
    order.buyer.set(BuyerField::Email, "ana@x.com".to_owned());
    order.buyer.set(BuyerField::Address, "Calle 10 # 5-20".to_owned());
    order.buyer.set(BuyerField::City, "Medellin".to_owned());
    order.state = FunnelState::Completed;
    order.order_number = Some(OrderNumber(482_913));
    order
}

#[tokio::test]
async fn completed_funnel_order_survives_reconnect() -> TestResult {
    let dir = tempfile::TempDir::new().map_err(|e| e.to_string())?;
    let url = format!("sqlite://{}", dir.path().join("tendero.db").display());

    let record = completed_order().to_record(Some("1001")).map_err(|e| e.to_string())?;
    {
        let pool = connect_with_settings(&url, 1, 5).await.map_err(|e| e.to_string())?;
        migrations::run_pending(&pool).await.map_err(|e| e.to_string())?;
        SqlOrderRepository::new(pool.clone()).create(&record).await.map_err(|e| e.to_string())?;
        pool.close().await;
    }

    let pool = connect_with_settings(&url, 1, 5).await.map_err(|e| e.to_string())?;
    migrations::run_pending(&pool).await.map_err(|e| e.to_string())?;
    let repo = SqlOrderRepository::new(pool);
    let stored = repo
        .find_by_number(OrderNumber(482_913))
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| "order should be persisted".to_string())?;

    if stored.record.phone != "573001234567" {
        return Err(format!("phone should be the normalized user id, got {}", stored.record.phone));
    }
    if stored.record.variation_id != Some(VariationId(3)) {
        return Err("variation id should be stored".to_string());
    }
    if stored.record.status.as_str() != "pendiente" {
        return Err("new orders start as pendiente".to_string());
    }
    if stored.record.delivery_address() != "Calle 10 # 5-20, Medellin" {
        return Err("delivery address should join street and city".to_string());
    }
    Ok(())
}
