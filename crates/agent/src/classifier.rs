use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use tendero_core::catalog::ProductCatalog;
use tendero_core::domain::product::{Product, Variation, VariationId};

use crate::heuristics;
use crate::llm::{GenerateOptions, LlmClient, LlmError};
use crate::prompts::{self, Persona, NO_MATCH};
use crate::replies;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("classifier call failed: {0}")]
    Llm(#[from] LlmError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchSource {
    Model,
    Heuristic,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductMatch {
    pub product: Product,
    pub variation: Option<Variation>,
    pub source: MatchSource,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneralReply {
    pub text: String,
    pub source: MatchSource,
}

#[derive(Clone, Debug)]
pub struct ClassifierSettings {
    pub timeout: Duration,
    pub general: GenerateOptions,
    /// Low temperature keeps purchase detection conservative.
    pub intent: GenerateOptions,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            general: GenerateOptions::new(0.7, 1024),
            intent: GenerateOptions::new(0.1, 64),
        }
    }
}

pub struct IntentClassifier {
    llm: Arc<dyn LlmClient>,
    catalog: Arc<ProductCatalog>,
    persona: Persona,
    settings: ClassifierSettings,
}

impl IntentClassifier {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        catalog: Arc<ProductCatalog>,
        persona: Persona,
        settings: ClassifierSettings,
    ) -> Self {
        Self { llm, catalog, persona, settings }
    }

    pub fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    /// Free-text sales reply. Quota and timeout failures fall back to a canned reply that
    /// lists the categories in stock.
    pub async fn general_reply(
        &self,
        message: &str,
        context: &str,
    ) -> Result<GeneralReply, ClassificationError> {
        let products = self.catalog.snapshot();
        let prompt = prompts::general_reply(
            &self.persona,
            &prompts::catalog_json(&products),
            context,
            message,
        );

        match self.call(&prompt, &self.settings.general).await {
            Ok(text) => Ok(GeneralReply { text, source: MatchSource::Model }),
            Err(error) if error.is_fallback_eligible() => {
                warn!(
                    event_name = "classifier.general_reply.fallback",
                    error = %error,
                    "general reply degraded to canned text"
                );
                let text = replies::general_fallback(&self.catalog.categories_present());
                Ok(GeneralReply { text, source: MatchSource::Heuristic })
            }
            Err(error) => Err(error.into()),
        }
    }

    /// "Tell me about X" detection. Falls back to a product named in the message itself.
    ///
    /// Model answers resolve by exact name first, then by containment.
    pub async fn match_product_query(
        &self,
        message: &str,
        context: &str,
    ) -> Result<Option<ProductMatch>, ClassificationError> {
        let products = self.catalog.snapshot();
        if products.is_empty() {
            return Ok(None);
        }
        let prompt =
            prompts::product_query(&prompts::catalog_json(&products), context, message);

        match self.call(&prompt, &self.settings.intent).await {
            Ok(answer) => Ok(parse_answer(&answer).and_then(|(name, _)| {
                self.catalog.find(&name).map(|product| ProductMatch {
                    product,
                    variation: None,
                    source: MatchSource::Model,
                })
            })),
            Err(error) if error.is_fallback_eligible() => {
                warn!(
                    event_name = "classifier.product_query.fallback",
                    error = %error,
                    "product query resolved heuristically"
                );
                Ok(heuristics::mentioned_product(message, &products).map(|product| {
                    ProductMatch {
                        product: product.clone(),
                        variation: None,
                        source: MatchSource::Heuristic,
                    }
                }))
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Purchase detection. On quota or timeout, a purchase keyword in the message resolves to the
    /// product mentioned last in the transcript; a size or color named with it picks the variation.
    pub async fn match_purchase_intent(
        &self,
        message: &str,
        context: &str,
    ) -> Result<Option<ProductMatch>, ClassificationError> {
        let products = self.catalog.snapshot();
        if products.is_empty() {
            return Ok(None);
        }
        let prompt =
            prompts::purchase_intent(&prompts::catalog_json(&products), context, message);

        match self.call(&prompt, &self.settings.intent).await {
            Ok(answer) => Ok(parse_answer(&answer).and_then(|(name, variation_id)| {
                let product = self.catalog.find(&name)?;
                let variation = variation_id
                    .and_then(|id| product.variation(id))
                    .or_else(|| heuristics::mentioned_variation(message, &product))
                    .cloned();
                Some(ProductMatch { product, variation, source: MatchSource::Model })
            })),
            Err(error) if error.is_fallback_eligible() => {
                warn!(
                    event_name = "classifier.purchase_intent.fallback",
                    error = %error,
                    "purchase intent resolved heuristically"
                );
                if !heuristics::detect_purchase_keywords(message) {
                    return Ok(None);
                }
                let Some(product) = heuristics::last_mentioned_product(context, &products) else {
                    return Ok(None);
                };
                let variation = heuristics::mentioned_variation(message, product).cloned();
                Ok(Some(ProductMatch {
                    product: product.clone(),
                    variation,
                    source: MatchSource::Heuristic,
                }))
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn call(&self, prompt: &str, options: &GenerateOptions) -> Result<String, LlmError> {
        match tokio::time::timeout(self.settings.timeout, self.llm.generate(prompt, options)).await
        {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout(self.settings.timeout)),
        }
    }
}

/// Reads `name` or `name | variationId`; the no-match sentinel and empty answers yield `None`.
fn parse_answer(answer: &str) -> Option<(String, Option<VariationId>)> {
    let cleaned = answer.trim().trim_matches(|c: char| matches!(c, '"' | '\'' | '*' | '`' | '.'));
    let (name, variation) = match cleaned.split_once('|') {
        Some((name, variation)) => (name.trim(), variation.trim().parse::<i64>().ok()),
        None => (cleaned.trim(), None),
    };

    let sentinel = name.is_empty()
        || name == NO_MATCH
        || matches!(name.to_lowercase().as_str(), "none" | "ninguno" | "ninguna");
    if sentinel {
        return None;
    }
    Some((name.to_owned(), variation.map(VariationId)))
}
