use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::flows::states::{
    BuyerField, FunnelAction, FunnelContext, FunnelEvent, FunnelState, TransitionOutcome,
};

pub trait FunnelDefinition {
    fn initial_state(&self) -> FunnelState;
    fn transition(
        &self,
        current: &FunnelState,
        event: &FunnelEvent,
        context: &FunnelContext,
    ) -> Result<TransitionOutcome, FunnelTransitionError>;
}

/// Name, email, address and city, in that order, then persistence.
#[derive(Clone, Debug, Default)]
pub struct CheckoutFunnel;

impl FunnelDefinition for CheckoutFunnel {
    fn initial_state(&self) -> FunnelState {
        FunnelState::AwaitingName
    }

    fn transition(
        &self,
        current: &FunnelState,
        event: &FunnelEvent,
        context: &FunnelContext,
    ) -> Result<TransitionOutcome, FunnelTransitionError> {
        transition_checkout(current, event, context)
    }
}

pub struct FunnelEngine<F> {
    funnel: F,
}

impl<F> FunnelEngine<F>
where
    F: FunnelDefinition,
{
    pub fn new(funnel: F) -> Self {
        Self { funnel }
    }

    pub fn initial_state(&self) -> FunnelState {
        self.funnel.initial_state()
    }

    pub fn apply(
        &self,
        current: &FunnelState,
        event: &FunnelEvent,
        context: &FunnelContext,
    ) -> Result<TransitionOutcome, FunnelTransitionError> {
        self.funnel.transition(current, event, context)
    }

    pub fn apply_with_audit<S>(
        &self,
        current: &FunnelState,
        event: &FunnelEvent,
        context: &FunnelContext,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, FunnelTransitionError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.apply(current, event, context);
        match &result {
            Ok(outcome) => {
                sink.emit(
                    AuditEvent::new(
                        audit.user_id.clone(),
                        audit.order_number,
                        audit.correlation_id.clone(),
                        "funnel.transition_applied",
                        AuditCategory::Funnel,
                        audit.actor.clone(),
                        AuditOutcome::Success,
                    )
                    .with_metadata("from", format!("{:?}", outcome.from))
                    .with_metadata("to", format!("{:?}", outcome.to))
                    .with_metadata("event", format!("{:?}", outcome.event)),
                );
            }
            Err(error) => {
                sink.emit(
                    AuditEvent::new(
                        audit.user_id.clone(),
                        audit.order_number,
                        audit.correlation_id.clone(),
                        "funnel.transition_rejected",
                        AuditCategory::Funnel,
                        audit.actor.clone(),
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }
}

impl Default for FunnelEngine<CheckoutFunnel> {
    fn default() -> Self {
        Self::new(CheckoutFunnel)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FunnelTransitionError {
    #[error("missing buyer fields before transition from {state:?}: {missing_fields:?}")]
    MissingRequiredFields { state: FunnelState, missing_fields: Vec<BuyerField> },
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: FunnelState, event: FunnelEvent },
}

fn transition_checkout(
    current: &FunnelState,
    event: &FunnelEvent,
    context: &FunnelContext,
) -> Result<TransitionOutcome, FunnelTransitionError> {
    use FunnelAction::{
        AssignOrderNumber, ConfirmCancellation, NotifyTransientFailure, PersistOrder,
        PromptForField, RemovePendingOrder, ResumeProductSearch, SendConfirmation,
    };
    use FunnelEvent::{
        AddressCollected, CancelRequested, CityCollected, EmailCollected, Expired, NameCollected,
        OrderPersisted, PersistenceFailed, RetryRequested, SwitchProductRequested,
    };
    use FunnelState::{
        AwaitingAddress, AwaitingCity, AwaitingEmail, AwaitingName, Cancelled, Completed,
    };

    let (to, actions) = match (current, event) {
        (AwaitingName, NameCollected) => (AwaitingEmail, vec![PromptForField(BuyerField::Email)]),
        (AwaitingEmail, EmailCollected) => {
            (AwaitingAddress, vec![PromptForField(BuyerField::Address)])
        }
        (AwaitingAddress, AddressCollected) => {
            (AwaitingCity, vec![PromptForField(BuyerField::City)])
        }
        (AwaitingCity, CityCollected) | (Completed, RetryRequested) => {
            if !context.missing_fields.is_empty() {
                return Err(FunnelTransitionError::MissingRequiredFields {
                    state: *current,
                    missing_fields: context.missing_fields.clone(),
                });
            }
            if *current == Completed {
                (Completed, vec![PersistOrder])
            } else {
                (Completed, vec![AssignOrderNumber, PersistOrder])
            }
        }
        (Completed, OrderPersisted) => (Completed, vec![RemovePendingOrder, SendConfirmation]),
        (Completed, PersistenceFailed) => (Completed, vec![NotifyTransientFailure]),
        (Cancelled, _) => {
            return Err(FunnelTransitionError::InvalidTransition {
                state: *current,
                event: event.clone(),
            });
        }
        (_, CancelRequested) => (Cancelled, vec![RemovePendingOrder, ConfirmCancellation]),
        (_, SwitchProductRequested) => (Cancelled, vec![RemovePendingOrder, ResumeProductSearch]),
        (_, Expired) => (Cancelled, vec![RemovePendingOrder]),
        _ => {
            return Err(FunnelTransitionError::InvalidTransition {
                state: *current,
                event: event.clone(),
            });
        }
    };

    Ok(TransitionOutcome { from: *current, to, event: event.clone(), actions })
}

#[cfg(test)]
mod tests {
    use crate::audit::{AuditContext, InMemoryAuditSink};
    use crate::domain::user::UserId;
    use crate::flows::engine::{FunnelEngine, FunnelTransitionError};
    use crate::flows::states::{
        BuyerField, FunnelAction, FunnelContext, FunnelEvent, FunnelState,
    };

    #[test]
    fn checkout_happy_path_reaches_completion() {
        let engine = FunnelEngine::default();
        let context = FunnelContext::default();
        let mut state = engine.initial_state();
        assert_eq!(state, FunnelState::AwaitingName);

        for event in [
            FunnelEvent::NameCollected,
            FunnelEvent::EmailCollected,
            FunnelEvent::AddressCollected,
        ] {
            state = engine.apply(&state, &event, &context).expect("collection step").to;
        }
        assert_eq!(state, FunnelState::AwaitingCity);

        let completed =
            engine.apply(&state, &FunnelEvent::CityCollected, &context).expect("city -> completed");
        assert_eq!(completed.to, FunnelState::Completed);
        assert_eq!(
            completed.actions,
            vec![FunnelAction::AssignOrderNumber, FunnelAction::PersistOrder]
        );

        let persisted = engine
            .apply(&completed.to, &FunnelEvent::OrderPersisted, &context)
            .expect("persisted");
        assert!(persisted.removes_order());
        assert!(persisted.actions.contains(&FunnelAction::SendConfirmation));
    }

    #[test]
    fn persistence_failure_keeps_order_for_retry() {
        let engine = FunnelEngine::default();
        let context = FunnelContext::default();

        let failed = engine
            .apply(&FunnelState::Completed, &FunnelEvent::PersistenceFailed, &context)
            .expect("failure is a valid transition");
        assert_eq!(failed.to, FunnelState::Completed);
        assert!(!failed.removes_order());

        let retry = engine
            .apply(&FunnelState::Completed, &FunnelEvent::RetryRequested, &context)
            .expect("retry from completed");
        assert_eq!(retry.actions, vec![FunnelAction::PersistOrder]);
    }

    #[test]
    fn cancel_and_switch_are_valid_from_every_stored_state() {
        let engine = FunnelEngine::default();
        let states = [
            FunnelState::AwaitingName,
            FunnelState::AwaitingEmail,
            FunnelState::AwaitingAddress,
            FunnelState::AwaitingCity,
            FunnelState::Completed,
        ];

        for state in states {
            let cancelled = engine
                .apply(&state, &FunnelEvent::CancelRequested, &FunnelContext::default())
                .expect("cancel is global");
            assert_eq!(cancelled.to, FunnelState::Cancelled);
            assert!(cancelled.actions.contains(&FunnelAction::ConfirmCancellation));
            assert!(cancelled.removes_order());

            let switched = engine
                .apply(&state, &FunnelEvent::SwitchProductRequested, &FunnelContext::default())
                .expect("switch is global");
            assert!(switched.actions.contains(&FunnelAction::ResumeProductSearch));
            assert!(switched.removes_order());
        }
    }

    #[test]
    fn out_of_order_events_are_rejected() {
        let engine = FunnelEngine::default();
        let context = FunnelContext::default();
        let error = engine
            .apply(&FunnelState::AwaitingName, &FunnelEvent::CityCollected, &context)
            .expect_err("city cannot be collected before the name");

        assert!(matches!(
            error,
            FunnelTransitionError::InvalidTransition {
                state: FunnelState::AwaitingName,
                event: FunnelEvent::CityCollected
            }
        ));

        let cancelled = engine
            .apply(&FunnelState::Cancelled, &FunnelEvent::CancelRequested, &context)
            .expect_err("cancelled orders no longer exist");
        assert!(matches!(cancelled, FunnelTransitionError::InvalidTransition { .. }));
    }

    #[test]
    fn completion_requires_every_buyer_field() {
        let engine = FunnelEngine::default();
        let error = engine
            .apply(
                &FunnelState::AwaitingCity,
                &FunnelEvent::CityCollected,
                &FunnelContext { missing_fields: vec![BuyerField::Email] },
            )
            .expect_err("missing email must block completion");

        assert!(matches!(error, FunnelTransitionError::MissingRequiredFields { .. }));
    }

    #[test]
    fn transitions_emit_audit_events() {
        let engine = FunnelEngine::default();
        let sink = InMemoryAuditSink::default();
        let audit = AuditContext::new(
            Some(UserId("573001234567".to_owned())),
            None,
            "msg-42",
            "order-funnel",
        );

        engine
            .apply_with_audit(
                &FunnelState::AwaitingName,
                &FunnelEvent::NameCollected,
                &FunnelContext::default(),
                &sink,
                &audit,
            )
            .expect("transition should succeed");
        let _ = engine.apply_with_audit(
            &FunnelState::AwaitingName,
            &FunnelEvent::OrderPersisted,
            &FunnelContext::default(),
            &sink,
            &audit,
        );

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "funnel.transition_applied");
        assert_eq!(events[0].correlation_id, "msg-42");
        assert_eq!(events[1].event_type, "funnel.transition_rejected");
    }
}
