use std::fmt;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::product::{Product, ProductId, Variation, VariationId};
use crate::domain::user::UserId;
use crate::errors::DomainError;
use crate::flows::states::{BuyerField, FunnelState};

pub const PENDING_ORDER_TTL_MINUTES: i64 = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderNumber(pub u32);

impl OrderNumber {
    pub const MIN: u32 = 100_000;
    pub const MAX: u32 = 999_999;

    pub fn generate<R>(rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        Self(rng.gen_range(Self::MIN..=Self::MAX))
    }

    pub fn random() -> Self {
        Self::generate(&mut rand::thread_rng())
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerDetails {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
}

impl BuyerDetails {
    pub fn get(&self, field: BuyerField) -> Option<&str> {
        match field {
            BuyerField::Name => self.name.as_deref(),
            BuyerField::Email => self.email.as_deref(),
            BuyerField::Address => self.address.as_deref(),
            BuyerField::City => self.city.as_deref(),
        }
    }

    pub fn set(&mut self, field: BuyerField, value: String) {
        let slot = match field {
            BuyerField::Name => &mut self.name,
            BuyerField::Email => &mut self.email,
            BuyerField::Address => &mut self.address,
            BuyerField::City => &mut self.city,
        };
        *slot = Some(value);
    }

    pub fn missing(&self, fields: &[BuyerField]) -> Vec<BuyerField> {
        fields.iter().copied().filter(|field| self.get(*field).is_none()).collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOrder {
    pub user_id: UserId,
    pub product: Product,
    pub variation: Option<Variation>,
    pub state: FunnelState,
    pub buyer: BuyerDetails,
    pub created_at: DateTime<Utc>,
    pub order_number: Option<OrderNumber>,
}

impl PendingOrder {
    pub fn new(
        user_id: UserId,
        product: Product,
        variation: Option<Variation>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            product,
            variation,
            state: FunnelState::AwaitingName,
            buyer: BuyerDetails::default(),
            created_at,
            order_number: None,
        }
    }

    /// Strictly older than `ttl`; an order exactly `ttl` old survives one more sweep.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.signed_duration_since(self.created_at) > ttl
    }

    /// Fields the current state claims are collected but which are absent.
    pub fn missing_for_state(&self) -> Vec<BuyerField> {
        self.buyer.missing(self.state.required_fields())
    }

    pub fn to_record(&self, branch_code: Option<&str>) -> Result<OrderRecord, DomainError> {
        let missing = self.buyer.missing(FunnelState::Completed.required_fields());
        if !missing.is_empty() {
            return Err(DomainError::InvariantViolation(format!(
                "order for {} is missing buyer fields {missing:?}",
                self.user_id
            )));
        }
        let Some(order_number) = self.order_number else {
            return Err(DomainError::InvariantViolation(format!(
                "order for {} has no order number",
                self.user_id
            )));
        };

        Ok(OrderRecord {
            order_number,
            branch_code: branch_code.map(str::to_owned),
            product_id: self.product.id,
            variation_id: self.variation.as_ref().map(|variation| variation.id),
            product_name: self.product.name.clone(),
            customer_name: self.buyer.name.clone().unwrap_or_default(),
            email: self.buyer.email.clone().unwrap_or_default(),
            address: self.buyer.address.clone().unwrap_or_default(),
            city: self.buyer.city.clone().unwrap_or_default(),
            phone: self.user_id.0.clone(),
            status: OrderStatus::Pending,
            created_at: self.created_at,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pendiente",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pendiente" => Some(Self::Pending),
            _ => None,
        }
    }
}

/// Completed order as handed to persistence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_number: OrderNumber,
    pub branch_code: Option<String>,
    pub product_id: ProductId,
    pub variation_id: Option<VariationId>,
    pub product_name: String,
    pub customer_name: String,
    pub email: String,
    pub address: String,
    pub city: String,
    pub phone: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl OrderRecord {
    /// Street address and city as a single delivery line.
    pub fn delivery_address(&self) -> String {
        format!("{}, {}", self.address, self.city)
    }
}
