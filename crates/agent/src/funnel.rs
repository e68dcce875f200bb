use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{info, warn};

use tendero_core::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use tendero_core::domain::order::{OrderNumber, PendingOrder};
use tendero_core::domain::product::{Product, Variation};
use tendero_core::domain::user::UserId;
use tendero_core::errors::{ApplicationError, DomainError};
use tendero_core::flows::{
    validate_field, BuyerField, CheckoutFunnel, FunnelAction, FunnelContext, FunnelEngine,
    FunnelEvent, FunnelState, FunnelTransitionError, TransitionOutcome,
};
use tendero_core::session::{SessionStore, SessionStoreError};
use tendero_db::OrderRepository;

use crate::replies;

const ACTOR: &str = "order-funnel";

#[derive(Debug, Error)]
pub enum FunnelError {
    #[error(transparent)]
    Session(#[from] SessionStoreError),
    #[error(transparent)]
    Transition(#[from] FunnelTransitionError),
}

impl From<FunnelError> for ApplicationError {
    fn from(error: FunnelError) -> Self {
        match error {
            FunnelError::Session(error) => Self::SessionStore(error),
            FunnelError::Transition(error) => Self::Domain(DomainError::FunnelTransition(error)),
        }
    }
}

/// Commands honoured in every stored funnel state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GlobalCommand {
    SwitchProduct,
    Cancel,
}

impl GlobalCommand {
    pub fn parse(input: &str) -> Option<Self> {
        let folded = input
            .trim()
            .trim_end_matches(|c: char| matches!(c, '.' | '!' | '?'))
            .trim()
            .to_lowercase();
        match folded.as_str() {
            "1" | "1️⃣" | "cambiar" | "cambiar producto" | "otro producto" => {
                Some(Self::SwitchProduct)
            }
            "2" | "2️⃣" | "cancelar" | "cancelar pedido" | "cancel" => Some(Self::Cancel),
            _ => None,
        }
    }

    fn event(self) -> FunnelEvent {
        match self {
            Self::SwitchProduct => FunnelEvent::SwitchProductRequested,
            Self::Cancel => FunnelEvent::CancelRequested,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FunnelStart {
    Started(String),
    /// The product has variations and none was resolved; no order was created.
    VariationRequired(String),
}

impl FunnelStart {
    pub fn into_text(self) -> String {
        match self {
            Self::Started(text) | Self::VariationRequired(text) => text,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FunnelTurn {
    /// The message was consumed by the funnel.
    Replied(String),
    /// The order was dropped at the customer's request to pick another product.
    ResumeProductSearch,
    /// No live order for this user; the message belongs to the rest of the dispatcher.
    NoPendingOrder,
}

pub struct OrderFunnel {
    orders: Arc<dyn SessionStore<PendingOrder>>,
    repository: Arc<dyn OrderRepository>,
    audit: Arc<dyn AuditSink>,
    engine: FunnelEngine<CheckoutFunnel>,
    ttl: Duration,
    branch_code: Option<String>,
}

impl OrderFunnel {
    pub fn new(
        orders: Arc<dyn SessionStore<PendingOrder>>,
        repository: Arc<dyn OrderRepository>,
        audit: Arc<dyn AuditSink>,
        ttl: Duration,
        branch_code: Option<String>,
    ) -> Self {
        Self { orders, repository, audit, engine: FunnelEngine::default(), ttl, branch_code }
    }

    pub async fn pending(&self, user_id: &UserId) -> Result<Option<PendingOrder>, FunnelError> {
        Ok(self.orders.get(user_id).await?)
    }

    pub async fn start(
        &self,
        user_id: &UserId,
        product: Product,
        variation: Option<Variation>,
        correlation_id: &str,
        now: DateTime<Utc>,
    ) -> Result<FunnelStart, FunnelError> {
        if product.requires_variation() && variation.is_none() {
            info!(
                event_name = "funnel.variation_required",
                correlation_id,
                user_id = %user_id,
                product = %product.name,
                "purchase needs a variation before the funnel starts"
            );
            return Ok(FunnelStart::VariationRequired(replies::variation_required(&product)));
        }

        if let Some(previous) = self.orders.delete(user_id).await? {
            warn!(
                event_name = "funnel.order_replaced",
                correlation_id,
                user_id = %user_id,
                product = %previous.product.name,
                "existing pending order discarded before starting a new one"
            );
        }

        let order = PendingOrder::new(user_id.clone(), product, variation, now);
        debug_assert_eq!(order.state, self.engine.initial_state());
        let text = replies::funnel_intro(&order.product, order.variation.as_ref());
        self.orders.set(user_id, order.clone()).await?;

        self.audit.emit(
            AuditEvent::new(
                Some(user_id.clone()),
                None,
                correlation_id,
                "funnel.order_started",
                AuditCategory::Funnel,
                ACTOR,
                AuditOutcome::Success,
            )
            .with_metadata("product", order.product.name.clone()),
        );
        info!(
            event_name = "funnel.order_started",
            correlation_id,
            user_id = %user_id,
            product = %order.product.name,
            "pending order created"
        );

        Ok(FunnelStart::Started(text))
    }

    /// One customer turn against the pending order, if there is one.
    pub async fn advance(
        &self,
        user_id: &UserId,
        input: &str,
        correlation_id: &str,
        now: DateTime<Utc>,
    ) -> Result<FunnelTurn, FunnelError> {
        let mut order = match self.orders.get(user_id).await {
            Ok(Some(order)) => order,
            Ok(None) => return Ok(FunnelTurn::NoPendingOrder),
            Err(SessionStoreError::Decode { message, .. }) => {
                return self.discard_corrupted(user_id, correlation_id, &message).await;
            }
            Err(error) => return Err(error.into()),
        };
        let audit = AuditContext::new(
            Some(user_id.clone()),
            order.order_number,
            correlation_id,
            ACTOR,
        );

        if order.is_expired(now, self.ttl) {
            self.engine.apply_with_audit(
                &order.state,
                &FunnelEvent::Expired,
                &FunnelContext::default(),
                &*self.audit,
                &audit,
            )?;
            self.orders.delete(user_id).await?;
            info!(
                event_name = "funnel.order_expired",
                correlation_id,
                user_id = %user_id,
                "stale pending order dropped at turn start"
            );
            return Ok(FunnelTurn::NoPendingOrder);
        }

        if order.state.is_terminal() || !order.missing_for_state().is_empty() {
            let detail =
                format!("state {:?} with missing {:?}", order.state, order.missing_for_state());
            return self.discard_corrupted(user_id, correlation_id, &detail).await;
        }

        if let Some(command) = GlobalCommand::parse(input) {
            let outcome = self.engine.apply_with_audit(
                &order.state,
                &command.event(),
                &FunnelContext::default(),
                &*self.audit,
                &audit,
            )?;
            return self.perform(&mut order, outcome, &audit).await;
        }

        let Some(field) = order.state.awaited_field() else {
            // Completed and still stored: the previous persistence attempt failed.
            let outcome = self.engine.apply_with_audit(
                &order.state,
                &FunnelEvent::RetryRequested,
                &FunnelContext { missing_fields: order.missing_for_state() },
                &*self.audit,
                &audit,
            )?;
            return self.perform(&mut order, outcome, &audit).await;
        };

        let value = match validate_field(field, input) {
            Ok(value) => value,
            Err(error) => {
                info!(
                    event_name = "funnel.field_rejected",
                    correlation_id,
                    user_id = %user_id,
                    field = ?field,
                    reason = %error,
                    "buyer input rejected; state unchanged"
                );
                return Ok(FunnelTurn::Replied(replies::field_rejection(&error)));
            }
        };

        order.buyer.set(field, value);
        let context = FunnelContext {
            missing_fields: order.buyer.missing(FunnelState::Completed.required_fields()),
        };
        let outcome = self.engine.apply_with_audit(
            &order.state,
            &collected_event(field),
            &context,
            &*self.audit,
            &audit,
        )?;
        self.perform(&mut order, outcome, &audit).await
    }

    /// Removes every order older than the TTL. Users for which `is_busy` holds are skipped so a
    /// sweep never races an in-flight turn.
    pub async fn sweep(
        &self,
        now: DateTime<Utc>,
        is_busy: &(dyn Fn(&UserId) -> bool + Send + Sync),
    ) -> Result<Vec<UserId>, FunnelError> {
        let ttl = self.ttl;
        let removed = self
            .orders
            .sweep(&|user_id: &UserId, order: &PendingOrder| {
                order.is_expired(now, ttl) && !is_busy(user_id)
            })
            .await?;

        for user_id in &removed {
            self.audit.emit(AuditEvent::new(
                Some(user_id.clone()),
                None,
                "sweep",
                "funnel.order_expired",
                AuditCategory::Funnel,
                ACTOR,
                AuditOutcome::Success,
            ));
        }
        if !removed.is_empty() {
            info!(
                event_name = "funnel.sweep_completed",
                removed = removed.len(),
                "expired orders removed"
            );
        }
        Ok(removed)
    }

    async fn perform(
        &self,
        order: &mut PendingOrder,
        outcome: TransitionOutcome,
        audit: &AuditContext,
    ) -> Result<FunnelTurn, FunnelError> {
        order.state = outcome.to;
        let mut reply = None;

        for action in &outcome.actions {
            match action {
                FunnelAction::PromptForField(field) => {
                    self.orders.set(&order.user_id, order.clone()).await?;
                    reply = Some(replies::field_prompt(*field));
                }
                FunnelAction::AssignOrderNumber => {
                    order.order_number = Some(OrderNumber::random());
                }
                FunnelAction::PersistOrder => return self.persist(order, audit).await,
                FunnelAction::RemovePendingOrder => {
                    self.orders.delete(&order.user_id).await?;
                }
                FunnelAction::ConfirmCancellation => {
                    reply = Some(replies::cancellation_confirmation());
                }
                FunnelAction::ResumeProductSearch => return Ok(FunnelTurn::ResumeProductSearch),
                FunnelAction::SendConfirmation | FunnelAction::NotifyTransientFailure => {}
            }
        }

        Ok(reply.map(FunnelTurn::Replied).unwrap_or(FunnelTurn::NoPendingOrder))
    }

    async fn persist(
        &self,
        order: &mut PendingOrder,
        audit: &AuditContext,
    ) -> Result<FunnelTurn, FunnelError> {
        // Stored as Completed first so a failed insert can be retried on the next message.
        self.orders.set(&order.user_id, order.clone()).await?;
        let audit = AuditContext { order_number: order.order_number, ..audit.clone() };

        let record = match order.to_record(self.branch_code.as_deref()) {
            Ok(record) => record,
            Err(error) => {
                return self
                    .discard_corrupted(&order.user_id, &audit.correlation_id, &error.to_string())
                    .await;
            }
        };

        let (event, persisted_id) = match self.repository.create(&record).await {
            Ok(id) => (FunnelEvent::OrderPersisted, Some(id)),
            Err(error) => {
                warn!(
                    event_name = "funnel.persistence_failed",
                    correlation_id = %audit.correlation_id,
                    user_id = %order.user_id,
                    order_number = %record.order_number,
                    error = %error,
                    "order kept for retry"
                );
                self.audit.emit(
                    AuditEvent::new(
                        Some(order.user_id.clone()),
                        Some(record.order_number),
                        audit.correlation_id.clone(),
                        "persistence.order_create_failed",
                        AuditCategory::Persistence,
                        ACTOR,
                        AuditOutcome::Failed,
                    )
                    .with_metadata("error", error.to_string()),
                );
                (FunnelEvent::PersistenceFailed, None)
            }
        };

        let outcome = self.engine.apply_with_audit(
            &order.state,
            &event,
            &FunnelContext::default(),
            &*self.audit,
            &audit,
        )?;

        let mut reply = replies::transient_failure();
        for action in &outcome.actions {
            match action {
                FunnelAction::RemovePendingOrder => {
                    self.orders.delete(&order.user_id).await?;
                }
                FunnelAction::SendConfirmation => {
                    reply = replies::order_confirmation(order, record.order_number);
                }
                _ => {}
            }
        }

        if let Some(id) = persisted_id {
            info!(
                event_name = "funnel.order_persisted",
                correlation_id = %audit.correlation_id,
                user_id = %order.user_id,
                order_number = %record.order_number,
                order_id = id,
                "order stored"
            );
        }
        Ok(FunnelTurn::Replied(reply))
    }

    async fn discard_corrupted(
        &self,
        user_id: &UserId,
        correlation_id: &str,
        detail: &str,
    ) -> Result<FunnelTurn, FunnelError> {
        warn!(
            event_name = "funnel.order_corrupted",
            correlation_id,
            user_id = %user_id,
            detail,
            "pending order discarded"
        );
        self.orders.delete(user_id).await?;
        self.audit.emit(
            AuditEvent::new(
                Some(user_id.clone()),
                None,
                correlation_id,
                "funnel.order_corrupted",
                AuditCategory::Funnel,
                ACTOR,
                AuditOutcome::Rejected,
            )
            .with_metadata("detail", detail),
        );
        Ok(FunnelTurn::Replied(replies::corrupted_order()))
    }
}

fn collected_event(field: BuyerField) -> FunnelEvent {
    match field {
        BuyerField::Name => FunnelEvent::NameCollected,
        BuyerField::Email => FunnelEvent::EmailCollected,
        BuyerField::Address => FunnelEvent::AddressCollected,
        BuyerField::City => FunnelEvent::CityCollected,
    }
}
