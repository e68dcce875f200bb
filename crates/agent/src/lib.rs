//! Conversation brain for the storefront assistant.
//!
//! [`AgentRuntime`] receives one customer message at a time. An order in progress takes every
//! message through the [`OrderFunnel`]; otherwise the [`IntentClassifier`] looks for a purchase,
//! then a product question, then writes a free-form sales reply. The model only picks catalog
//! products and drafts chat text. Prices, stock and order numbers come from the catalog and the
//! funnel.
//!
//! When the model is out of quota or too slow the classifier falls back to the keyword and
//! last-mentioned-product heuristics in [`heuristics`].

pub mod audit;
pub mod classifier;
pub mod funnel;
pub mod heuristics;
pub mod llm;
pub mod prompts;
pub mod replies;
pub mod runtime;

pub use audit::TracingAuditSink;
pub use classifier::{
    ClassificationError, ClassifierSettings, GeneralReply, IntentClassifier, MatchSource,
    ProductMatch,
};
pub use funnel::{FunnelError, FunnelStart, FunnelTurn, GlobalCommand, OrderFunnel};
pub use llm::{GenerateOptions, LlmClient, LlmError};
pub use prompts::Persona;
pub use runtime::{AgentReply, AgentRuntime, CustomerMessage, ReplyBranch};
