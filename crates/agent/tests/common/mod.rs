#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use tendero_agent::{
    AgentRuntime, ClassifierSettings, CustomerMessage, GenerateOptions, IntentClassifier,
    LlmClient, LlmError, OrderFunnel, Persona,
};
use tendero_core::{
    ConversationContextStore, InMemoryAuditSink, InMemorySessionStore, OrderNumber, OrderRecord,
    PendingOrder, Product, ProductCatalog, ProductId, StaticCatalogSource, Variation, VariationId,
};
use tendero_db::{InMemoryOrderRepository, OrderRepository, RepositoryError, StoredOrder};

pub const SENDER: &str = "573001234567@c.us";

#[derive(Default)]
pub struct ScriptedLlm {
    state: Mutex<ScriptedLlmState>,
}

#[derive(Default)]
struct ScriptedLlmState {
    responses: VecDeque<Result<String, LlmError>>,
    prompts: Vec<String>,
}

impl ScriptedLlm {
    pub fn with_script(responses: Vec<Result<String, LlmError>>) -> Self {
        Self {
            state: Mutex::new(ScriptedLlmState {
                responses: responses.into(),
                prompts: Vec::new(),
            }),
        }
    }

    pub async fn push(&self, response: Result<String, LlmError>) {
        self.state.lock().await.responses.push_back(response);
    }

    pub async fn prompts(&self) -> Vec<String> {
        self.state.lock().await.prompts.clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn generate(&self, prompt: &str, _options: &GenerateOptions) -> Result<String, LlmError> {
        let mut state = self.state.lock().await;
        state.prompts.push(prompt.to_owned());
        state
            .responses
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::QuotaExceeded("script exhausted".to_owned())))
    }
}

/// Fails the first `failures` inserts, then stores in memory.
#[derive(Default)]
pub struct FailingOrderRepository {
    failures: Mutex<u32>,
    inner: InMemoryOrderRepository,
}

impl FailingOrderRepository {
    pub fn failing(failures: u32) -> Self {
        Self { failures: Mutex::new(failures), inner: InMemoryOrderRepository::default() }
    }

    pub async fn stored(&self) -> Vec<StoredOrder> {
        self.inner.all().await
    }
}

#[async_trait]
impl OrderRepository for FailingOrderRepository {
    async fn create(&self, record: &OrderRecord) -> Result<i64, RepositoryError> {
        let mut failures = self.failures.lock().await;
        if *failures > 0 {
            *failures -= 1;
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        self.inner.create(record).await
    }

    async fn find_by_number(
        &self,
        order_number: OrderNumber,
    ) -> Result<Option<StoredOrder>, RepositoryError> {
        self.inner.find_by_number(order_number).await
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<StoredOrder>, RepositoryError> {
        self.inner.list_recent(limit).await
    }
}

pub struct Harness {
    pub runtime: AgentRuntime,
    pub llm: Arc<ScriptedLlm>,
    pub orders: Arc<InMemorySessionStore<PendingOrder>>,
    pub repository: Arc<FailingOrderRepository>,
    pub audit: InMemoryAuditSink,
}

impl Harness {
    pub fn new(products: Vec<Product>, script: Vec<Result<String, LlmError>>) -> Self {
        Self::with_repository(products, script, FailingOrderRepository::default())
    }

    pub fn with_repository(
        products: Vec<Product>,
        script: Vec<Result<String, LlmError>>,
        repository: FailingOrderRepository,
    ) -> Self {
        let llm = Arc::new(ScriptedLlm::with_script(script));
        let orders = Arc::new(InMemorySessionStore::<PendingOrder>::default());
        let repository = Arc::new(repository);
        let audit = InMemoryAuditSink::default();
        let catalog = Arc::new(ProductCatalog::with_products(
            Arc::new(StaticCatalogSource::new(Vec::new())),
            products,
        ));

        let classifier = IntentClassifier::new(
            llm.clone(),
            catalog,
            Persona::default(),
            ClassifierSettings::default(),
        );
        let funnel = OrderFunnel::new(
            orders.clone(),
            repository.clone(),
            Arc::new(audit.clone()),
            Duration::minutes(30),
            Some("1001".to_owned()),
        );
        let runtime = AgentRuntime::new(classifier, funnel, ConversationContextStore::default());

        Self { runtime, llm, orders, repository, audit }
    }

    pub async fn say(&self, body: &str) -> tendero_agent::AgentReply {
        self.runtime.handle_message(&message(SENDER, body)).await
    }

    pub async fn pending(&self) -> Option<PendingOrder> {
        self.runtime
            .funnel()
            .pending(&ConversationContextStore::normalize(SENDER))
            .await
            .expect("pending order lookup")
    }

    pub async fn seed_context(&self, line: &str) {
        self.runtime.context().append(SENDER, line).await.expect("seed context");
    }
}

pub fn message(sender: &str, body: &str) -> CustomerMessage {
    CustomerMessage {
        message_id: format!("msg-{}", body.len()),
        sender_id: sender.to_owned(),
        body: body.to_owned(),
    }
}

pub fn product(id: i64, name: &str, price: i64) -> Product {
    Product {
        id: ProductId(id),
        name: name.to_owned(),
        description: Some(format!("{name} de excelente calidad")),
        additional_info: None,
        price: Decimal::new(price, 0),
        quantity: 10,
        category: "Moda".to_owned(),
        variations: Vec::new(),
    }
}

pub fn zapatos_with_sizes() -> Product {
    let mut zapatos = product(2, "Zapatos", 120_000);
    zapatos.variations = vec![
        Variation {
            id: VariationId(1),
            size: Some("38".to_owned()),
            color: Some("Negro".to_owned()),
            quantity: 3,
        },
        Variation {
            id: VariationId(2),
            size: Some("40".to_owned()),
            color: Some("Negro".to_owned()),
            quantity: 1,
        },
    ];
    zapatos
}

pub fn storefront() -> Vec<Product> {
    vec![product(1, "Camisa", 50_000), product(2, "Zapatos", 120_000), product(3, "Gorra", 25_000)]
}
