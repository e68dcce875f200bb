use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariationId(pub i64);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variation {
    pub id: VariationId,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: u32,
}

impl Variation {
    pub fn label(&self) -> String {
        let parts = [
            self.size.as_deref().map(|size| format!("Talla {size}")),
            self.color.as_deref().map(|color| format!("Color {color}")),
        ];
        let label = parts.into_iter().flatten().collect::<Vec<_>>().join(" / ");
        if label.is_empty() {
            format!("Variación {}", self.id.0)
        } else {
            label
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub additional_info: Option<String>,
    pub price: Decimal,
    pub quantity: u32,
    pub category: String,
    pub variations: Vec<Variation>,
}

impl Product {
    /// Products sold in sizes or colors cannot be ordered until one variation is chosen.
    pub fn requires_variation(&self) -> bool {
        !self.variations.is_empty()
    }

    pub fn variation(&self, id: VariationId) -> Option<&Variation> {
        self.variations.iter().find(|variation| variation.id == id)
    }
}
