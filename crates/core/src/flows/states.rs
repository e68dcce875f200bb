use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FunnelState {
    AwaitingName,
    AwaitingEmail,
    AwaitingAddress,
    AwaitingCity,
    /// Order data is complete; persistence either is in flight or failed and awaits a retry.
    Completed,
    /// Outcome-only state. A cancelled order is removed, never stored.
    Cancelled,
}

impl FunnelState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Global commands are honoured while an order is still stored.
    pub fn accepts_global_commands(&self) -> bool {
        !self.is_terminal()
    }

    pub fn awaited_field(&self) -> Option<BuyerField> {
        match self {
            Self::AwaitingName => Some(BuyerField::Name),
            Self::AwaitingEmail => Some(BuyerField::Email),
            Self::AwaitingAddress => Some(BuyerField::Address),
            Self::AwaitingCity => Some(BuyerField::City),
            Self::Completed | Self::Cancelled => None,
        }
    }

    /// Fields that must already be collected for an order to legitimately sit in this state.
    pub fn required_fields(&self) -> &'static [BuyerField] {
        match self {
            Self::AwaitingName | Self::Cancelled => &[],
            Self::AwaitingEmail => &[BuyerField::Name],
            Self::AwaitingAddress => &[BuyerField::Name, BuyerField::Email],
            Self::AwaitingCity => &[BuyerField::Name, BuyerField::Email, BuyerField::Address],
            Self::Completed => {
                &[BuyerField::Name, BuyerField::Email, BuyerField::Address, BuyerField::City]
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuyerField {
    Name,
    Email,
    Address,
    City,
}

impl BuyerField {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Name => "nombre completo",
            Self::Email => "correo electrónico",
            Self::Address => "dirección de entrega",
            Self::City => "ciudad",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FunnelEvent {
    NameCollected,
    EmailCollected,
    AddressCollected,
    CityCollected,
    OrderPersisted,
    PersistenceFailed,
    RetryRequested,
    CancelRequested,
    SwitchProductRequested,
    Expired,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FunnelContext {
    pub missing_fields: Vec<BuyerField>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FunnelAction {
    PromptForField(BuyerField),
    AssignOrderNumber,
    PersistOrder,
    SendConfirmation,
    NotifyTransientFailure,
    RemovePendingOrder,
    ConfirmCancellation,
    ResumeProductSearch,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: FunnelState,
    pub to: FunnelState,
    pub event: FunnelEvent,
    pub actions: Vec<FunnelAction>,
}

impl TransitionOutcome {
    pub fn removes_order(&self) -> bool {
        self.actions.contains(&FunnelAction::RemovePendingOrder)
    }
}
