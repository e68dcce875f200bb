pub mod audit;
pub mod catalog;
pub mod config;
pub mod context;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod session;

pub use audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink,
};
pub use catalog::{
    category_name, CatalogFetchError, CatalogSource, CategorySummary, ProductCatalog,
    RawProductRecord, RefreshReport, StaticCatalogSource,
};
pub use context::ConversationContextStore;
pub use domain::order::{
    BuyerDetails, OrderNumber, OrderRecord, OrderStatus, PendingOrder, PENDING_ORDER_TTL_MINUTES,
};
pub use domain::product::{Product, ProductId, Variation, VariationId};
pub use domain::user::UserId;
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::fields::{validate_address, validate_city, validate_email, validate_name};
pub use flows::{
    BuyerField, CheckoutFunnel, FieldValidationError, FunnelAction, FunnelContext, FunnelEngine,
    FunnelEvent, FunnelState, FunnelTransitionError, TransitionOutcome,
};
pub use session::{InMemorySessionStore, SessionStore, SessionStoreError};
