use std::sync::Arc;
use std::time::Duration;

use tendero_agent::{
    AgentRuntime, ClassifierSettings, GenerateOptions, IntentClassifier, LlmError, OrderFunnel,
    Persona, TracingAuditSink,
};
use tendero_chat::{ChatRunner, ChatTransport, ConsoleTransport, NoopTransport, ReconnectPolicy};
use tendero_core::catalog::{CatalogFetchError, ProductCatalog};
use tendero_core::config::{AppConfig, ConfigError, LoadOptions, TransportKind};
use tendero_core::context::ConversationContextStore;
use tendero_core::session::InMemorySessionStore;
use tendero_db::{connect_with_settings, migrations, DbPool, SqlOrderRepository};
use thiserror::Error;
use tracing::info;

use crate::handler::RuntimeHandler;
use crate::{catalog_feed, llm, tasks};

/// Purchase detection only needs a product name or `0`.
const INTENT_MAX_OUTPUT_TOKENS: u32 = 64;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub catalog: Arc<ProductCatalog>,
    pub runtime: Arc<AgentRuntime>,
    pub chat_runner: Arc<ChatRunner>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("llm client setup failed: {0}")]
    Llm(#[source] LlmError),
    #[error("catalog source setup failed: {0}")]
    Catalog(#[source] CatalogFetchError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    config.validate()?;

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let source = catalog_feed::from_config(&config.catalog).map_err(BootstrapError::Catalog)?;
    let catalog = Arc::new(ProductCatalog::new(Arc::from(source)));
    tasks::refresh_catalog(&catalog, &config.catalog.source_key, "bootstrap").await;

    let llm_client = llm::from_config(&config.llm).map_err(BootstrapError::Llm)?;
    let classifier = IntentClassifier::new(
        Arc::from(llm_client),
        catalog.clone(),
        Persona {
            store_name: config.store.store_name.clone(),
            seller_name: config.store.seller_name.clone(),
        },
        classifier_settings(&config),
    );

    let funnel = OrderFunnel::new(
        Arc::new(InMemorySessionStore::default()),
        Arc::new(SqlOrderRepository::new(db_pool.clone())),
        Arc::new(TracingAuditSink),
        chrono::Duration::minutes(config.funnel.order_ttl_minutes),
        config.store.branch_code.clone(),
    );
    let context = ConversationContextStore::new(
        Arc::new(InMemorySessionStore::default()),
        Some(config.context.max_transcript_chars),
    );
    let runtime = Arc::new(AgentRuntime::new(classifier, funnel, context));

    let chat_runner = Arc::new(ChatRunner::new(
        transport(config.transport.kind),
        Arc::new(RuntimeHandler::new(runtime.clone())),
        ReconnectPolicy::default(),
    ));

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        llm_provider = ?config.llm.provider,
        transport = ?config.transport.kind,
        product_count = catalog.len(),
        "application wired"
    );

    Ok(Application { config, db_pool, catalog, runtime, chat_runner })
}

fn classifier_settings(config: &AppConfig) -> ClassifierSettings {
    ClassifierSettings {
        timeout: Duration::from_secs(config.llm.timeout_secs),
        general: GenerateOptions::new(
            config.llm.general_temperature,
            config.llm.max_output_tokens,
        ),
        intent: GenerateOptions::new(config.llm.intent_temperature, INTENT_MAX_OUTPUT_TOKENS),
    }
}

fn transport(kind: TransportKind) -> Arc<dyn ChatTransport> {
    match kind {
        TransportKind::Noop => Arc::new(NoopTransport),
        TransportKind::Console => Arc::new(ConsoleTransport::stdio()),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tendero_agent::CustomerMessage;
    use tendero_core::config::{CatalogSourceKind, ConfigOverrides, LoadOptions, LlmProvider};

    use crate::bootstrap::bootstrap;

    #[tokio::test]
    async fn bootstrap_fails_fast_without_an_llm_api_key() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                llm_provider: Some(LlmProvider::Gemini),
                llm_api_key: Some("   ".to_string()),
                catalog_source: Some(CatalogSourceKind::Http),
                catalog_source_key: Some("1001".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let message = result.err().expect("missing key must fail").to_string();
        assert!(message.contains("llm.api_key"), "{message}");
    }

    #[tokio::test]
    async fn bootstrap_wires_file_catalog_and_order_tables() {
        let mut feed = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            feed,
            r#"[{{"id_producto": 1, "nombre_producto": "Camisa", "precio_sugerido": "50000",
                "cantidad": 3, "id_categoria": 1}}]"#
        )
        .expect("write feed");

        let app = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:?cache=shared".to_string()),
                llm_provider: Some(LlmProvider::Gemini),
                llm_api_key: Some("test-key".to_string()),
                catalog_source: Some(CatalogSourceKind::File),
                catalog_path: Some(feed.path().to_path_buf()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await
        .expect("bootstrap should succeed with a file catalog");

        assert_eq!(app.catalog.len(), 1);

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'customer_order'",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("customer_order table should exist after bootstrap");
        assert_eq!(table_count, 1);

        let reply = app
            .runtime
            .handle_message(&CustomerMessage {
                message_id: "msg-1".to_string(),
                sender_id: "573001234567@c.us".to_string(),
                body: "/ayuda".to_string(),
            })
            .await;
        assert!(!reply.text.is_empty());

        app.db_pool.close().await;
    }
}
