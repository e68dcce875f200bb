pub mod engine;
pub mod fields;
pub mod states;

pub use engine::{CheckoutFunnel, FunnelDefinition, FunnelEngine, FunnelTransitionError};
pub use fields::{validate_field, FieldValidationError};
pub use states::{
    BuyerField, FunnelAction, FunnelContext, FunnelEvent, FunnelState, TransitionOutcome,
};
