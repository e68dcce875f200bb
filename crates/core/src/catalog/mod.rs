pub mod categories;
pub mod raw;

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::product::Product;

pub use categories::{category_name, known_category, CATEGORIES, OTHER_CATEGORY_ID};
pub use raw::{RawProductRecord, RawVariation};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CatalogFetchError {
    #[error("catalog feed unreachable: {0}")]
    Network(String),
    #[error("catalog feed answered with HTTP {status}")]
    Status { status: u16 },
    #[error("catalog feed payload could not be decoded: {0}")]
    Decode(String),
    #[error("catalog file unreadable: {0}")]
    Io(String),
}

/// Where raw inventory rows come from, keyed by the store's branch/source key.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch(&self, source_key: &str) -> Result<Vec<RawProductRecord>, CatalogFetchError>;
}

/// Fixed rows, used by tests and offline demos.
#[derive(Clone, Debug, Default)]
pub struct StaticCatalogSource {
    rows: Vec<RawProductRecord>,
}

impl StaticCatalogSource {
    pub fn new(rows: Vec<RawProductRecord>) -> Self {
        Self { rows }
    }
}

#[async_trait]
impl CatalogSource for StaticCatalogSource {
    async fn fetch(&self, _source_key: &str) -> Result<Vec<RawProductRecord>, CatalogFetchError> {
        Ok(self.rows.clone())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub name: String,
    pub product_count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefreshReport {
    pub product_count: usize,
    /// Names of products whose raw category was missing or unknown and fell back to "Otros".
    pub uncategorized: Vec<String>,
}

/// In-memory product list with atomic replacement.
///
/// Readers always observe a complete snapshot: either the list before a refresh or the list
/// after it. A failed fetch leaves the current snapshot in place.
pub struct ProductCatalog {
    source: Arc<dyn CatalogSource>,
    products: RwLock<Arc<Vec<Product>>>,
}

impl ProductCatalog {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self::with_products(source, Vec::new())
    }

    pub fn with_products(source: Arc<dyn CatalogSource>, products: Vec<Product>) -> Self {
        Self { source, products: RwLock::new(Arc::new(products)) }
    }

    pub async fn refresh(&self, source_key: &str) -> Result<RefreshReport, CatalogFetchError> {
        let rows = self.source.fetch(source_key).await?;

        let mut uncategorized = Vec::new();
        let products = rows
            .into_iter()
            .map(|row| {
                if !row.has_known_category() {
                    uncategorized.push(row.name.clone());
                }
                row.into_product()
            })
            .collect::<Vec<_>>();

        let report = RefreshReport { product_count: products.len(), uncategorized };
        self.replace(products);
        Ok(report)
    }

    pub fn replace(&self, products: Vec<Product>) {
        let next = Arc::new(products);
        match self.products.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    pub fn snapshot(&self) -> Arc<Vec<Product>> {
        match self.products.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Case-insensitive exact name match, ignoring surrounding whitespace.
    pub fn find_exact(&self, name: &str) -> Option<Product> {
        let wanted = fold(name);
        if wanted.is_empty() {
            return None;
        }
        self.snapshot().iter().find(|product| fold(&product.name) == wanted).cloned()
    }

    /// Containment in either direction. Only meant as a fallback after `find_exact`.
    pub fn find_partial(&self, text: &str) -> Option<Product> {
        let wanted = fold(text);
        if wanted.is_empty() {
            return None;
        }
        self.snapshot()
            .iter()
            .find(|product| {
                let name = fold(&product.name);
                !name.is_empty() && (wanted.contains(&name) || name.contains(&wanted))
            })
            .cloned()
    }

    pub fn find(&self, name: &str) -> Option<Product> {
        self.find_exact(name).or_else(|| self.find_partial(name))
    }

    pub fn categories_present(&self) -> Vec<CategorySummary> {
        let mut counts = BTreeMap::<String, usize>::new();
        for product in self.snapshot().iter() {
            *counts.entry(product.category.clone()).or_default() += 1;
        }
        counts
            .into_iter()
            .map(|(name, product_count)| CategorySummary { name, product_count })
            .collect()
    }
}

fn fold(text: &str) -> String {
    text.trim().to_lowercase()
}
