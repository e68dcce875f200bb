use std::env;
use std::sync::{Mutex, OnceLock};

use chrono::{Duration, TimeZone, Utc};
use serde_json::Value;

use tendero_cli::commands::{doctor, migrate, orders};
use tendero_core::domain::order::{OrderNumber, OrderRecord, OrderStatus};
use tendero_core::domain::product::ProductId;
use tendero_db::{connect_with_settings, OrderRepository, SqlOrderRepository};

const VALID_BASE: [(&str, &str); 2] =
    [("TENDERO_LLM_API_KEY", "gemini-test-key"), ("TENDERO_CATALOG_SOURCE_KEY", "1001")];

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[VALID_BASE[0], VALID_BASE[1], ("TENDERO_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_without_llm_key() {
    with_env(&[("TENDERO_CATALOG_SOURCE_KEY", "1001")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn doctor_passes_with_file_catalog_and_memory_database() {
    let feed = tempfile::NamedTempFile::new().expect("temp catalog");
    let feed_path = feed.path().display().to_string();

    with_env(
        &[
            ("TENDERO_LLM_API_KEY", "gemini-test-key"),
            ("TENDERO_CATALOG_SOURCE", "file"),
            ("TENDERO_CATALOG_PATH", feed_path.as_str()),
            ("TENDERO_DATABASE_URL", "sqlite::memory:"),
        ],
        || {
            let result = doctor::run(true);
            let payload = parse_payload(&result.output);

            assert_eq!(result.exit_code, 0, "{}", result.output);
            assert_eq!(payload["overall_status"], "pass");
            assert_eq!(payload["checks"].as_array().map(Vec::len), Some(4));
        },
    );
}

#[test]
fn doctor_skips_dependent_checks_when_config_fails() {
    with_env(&[], || {
        let result = doctor::run(true);
        let payload = parse_payload(&result.output);

        assert_eq!(result.exit_code, 1);
        assert_eq!(payload["overall_status"], "fail");
        let statuses: Vec<&str> = payload["checks"]
            .as_array()
            .expect("checks array")
            .iter()
            .filter_map(|check| check["status"].as_str())
            .collect();
        assert_eq!(statuses, vec!["fail", "skipped", "skipped", "skipped"]);
    });
}

#[test]
fn orders_lists_persisted_orders_newest_first() {
    let dir = tempfile::tempdir().expect("temp dir");
    let database_url = format!("sqlite://{}", dir.path().join("orders.db").display());

    with_env(
        &[VALID_BASE[0], VALID_BASE[1], ("TENDERO_DATABASE_URL", database_url.as_str())],
        || {
            assert_eq!(migrate::run().exit_code, 0);
            seed_orders(&database_url);

            let result = orders::run(10);
            assert_eq!(result.exit_code, 0, "{}", result.output);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "orders");
            assert_eq!(payload["count"], 2);
            assert_eq!(payload["orders"][0]["order_number"], 222_222);
            assert_eq!(payload["orders"][0]["address"], "Calle 10 # 5-20, Medellin");
            assert_eq!(payload["orders"][0]["status"], "pendiente");
            assert_eq!(payload["orders"][1]["order_number"], 111_111);

            let limited = parse_payload(&orders::run(1).output);
            assert_eq!(limited["count"], 1);
        },
    );
}

#[test]
fn orders_reports_missing_tables_as_query_failure() {
    with_env(&[VALID_BASE[0], VALID_BASE[1], ("TENDERO_DATABASE_URL", "sqlite::memory:")], || {
        let result = orders::run(5);
        assert_eq!(result.exit_code, 5);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "order_query");
    });
}

fn seed_orders(database_url: &str) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime should build");
    runtime.block_on(async {
        let pool = connect_with_settings(database_url, 1, 5).await.expect("pool should connect");
        let repository = SqlOrderRepository::new(pool.clone());
        let created = Utc.with_ymd_and_hms(2026, 5, 2, 15, 30, 0).single().expect("valid time");

        for (number, offset) in [(111_111, 0), (222_222, 10)] {
            repository
                .create(&OrderRecord {
                    order_number: OrderNumber(number),
                    branch_code: Some("1001".to_owned()),
                    product_id: ProductId(7),
                    variation_id: None,
                    product_name: "Camisa".to_owned(),
                    customer_name: "Ana Gomez".to_owned(),
                    email: "ana@x.com".to_owned(),
                    address: "Calle 10 # 5-20".to_owned(),
                    city: "Medellin".to_owned(),
                    phone: "573001234567".to_owned(),
                    status: OrderStatus::Pending,
                    created_at: created + Duration::minutes(offset),
                })
                .await
                .expect("order should persist");
        }
        pool.close().await;
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "TENDERO_DATABASE_URL",
        "TENDERO_DATABASE_MAX_CONNECTIONS",
        "TENDERO_DATABASE_TIMEOUT_SECS",
        "TENDERO_LLM_PROVIDER",
        "TENDERO_LLM_API_KEY",
        "TENDERO_LLM_BASE_URL",
        "TENDERO_LLM_MODEL",
        "TENDERO_CATALOG_SOURCE",
        "TENDERO_CATALOG_BASE_URL",
        "TENDERO_CATALOG_PATH",
        "TENDERO_CATALOG_SOURCE_KEY",
        "TENDERO_TRANSPORT",
        "TENDERO_LOGGING_LEVEL",
        "TENDERO_LOGGING_FORMAT",
        "TENDERO_LOG_LEVEL",
        "TENDERO_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
