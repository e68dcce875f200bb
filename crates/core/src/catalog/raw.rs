use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::catalog::categories::{category_name, known_category};
use crate::domain::product::{Product, ProductId, Variation, VariationId};

/// One inventory row as served by the catalog feed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawProductRecord {
    #[serde(rename = "id_producto", deserialize_with = "lenient_i64")]
    pub id: i64,
    #[serde(rename = "nombre_producto")]
    pub name: String,
    #[serde(rename = "descripcion", default)]
    pub description: Option<String>,
    #[serde(rename = "informacion_adicional", default)]
    pub additional_info: Option<String>,
    #[serde(rename = "precio_sugerido", default)]
    pub price: Option<Decimal>,
    #[serde(rename = "cantidad", default, deserialize_with = "lenient_opt_u32")]
    pub quantity: Option<u32>,
    #[serde(rename = "id_categoria", default, deserialize_with = "lenient_opt_u32")]
    pub category_id: Option<u32>,
    #[serde(rename = "variaciones", default, deserialize_with = "null_as_empty")]
    pub variations: Vec<RawVariation>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawVariation {
    #[serde(deserialize_with = "lenient_i64")]
    pub id: i64,
    #[serde(rename = "talla", default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(rename = "cantidad", default, deserialize_with = "lenient_opt_u32")]
    pub quantity: Option<u32>,
}

impl RawProductRecord {
    pub fn has_known_category(&self) -> bool {
        self.category_id.and_then(known_category).is_some()
    }

    pub fn into_product(self) -> Product {
        Product {
            id: ProductId(self.id),
            category: category_name(self.category_id).to_owned(),
            name: self.name.trim().to_owned(),
            description: non_blank(self.description),
            additional_info: non_blank(self.additional_info),
            price: self.price.unwrap_or(Decimal::ZERO),
            quantity: self.quantity.unwrap_or(0),
            variations: self
                .variations
                .into_iter()
                .map(|variation| Variation {
                    id: VariationId(variation.id),
                    size: non_blank(variation.size),
                    color: non_blank(variation.color),
                    quantity: variation.quantity.unwrap_or(0),
                })
                .collect(),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|text| text.trim().to_owned()).filter(|text| !text.is_empty())
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    as_i64(&value).ok_or_else(|| serde::de::Error::custom(format!("expected integer, got {value}")))
}

fn lenient_opt_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(as_i64(&value).and_then(|number| u32::try_from(number).ok()))
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
