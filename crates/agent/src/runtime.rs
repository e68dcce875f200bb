use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use tendero_core::context::ConversationContextStore;
use tendero_core::domain::user::UserId;
use tendero_core::errors::{ApplicationError, DomainError};

use crate::classifier::{ClassificationError, IntentClassifier, ProductMatch};
use crate::funnel::{FunnelStart, FunnelTurn, OrderFunnel};
use crate::replies;

const HELP_COMMANDS: &[&str] = &["/ayuda", "/help", "/start"];
const INFO_COMMAND: &str = "/info";
const CUSTOMER_PREFIX: &str = "Cliente";
const SELLER_PREFIX: &str = "Vendedor";

/// A customer message that already passed transport filtering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomerMessage {
    pub message_id: String,
    pub sender_id: String,
    pub body: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyBranch {
    Funnel,
    ResumeSearch,
    Help,
    Info,
    PurchaseStarted,
    VariationRequired,
    ProductCard,
    GeneralReply,
    Apology,
}

impl ReplyBranch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Funnel => "funnel",
            Self::ResumeSearch => "resume_search",
            Self::Help => "help",
            Self::Info => "info",
            Self::PurchaseStarted => "purchase_started",
            Self::VariationRequired => "variation_required",
            Self::ProductCard => "product_card",
            Self::GeneralReply => "general_reply",
            Self::Apology => "apology",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentReply {
    pub text: String,
    pub branch: ReplyBranch,
}

impl AgentReply {
    fn new(text: impl Into<String>, branch: ReplyBranch) -> Self {
        Self { text: text.into(), branch }
    }
}

/// Single entry point for customer turns.
///
/// A live pending order captures every message. Otherwise the message is tried as a purchase,
/// then as a product question, then answered free-form. Every turn ends with the inbound text
/// and the reply appended to the customer's transcript.
pub struct AgentRuntime {
    classifier: IntentClassifier,
    funnel: OrderFunnel,
    context: ConversationContextStore,
}

impl AgentRuntime {
    pub fn new(
        classifier: IntentClassifier,
        funnel: OrderFunnel,
        context: ConversationContextStore,
    ) -> Self {
        Self { classifier, funnel, context }
    }

    pub fn funnel(&self) -> &OrderFunnel {
        &self.funnel
    }

    pub fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    pub fn context(&self) -> &ConversationContextStore {
        &self.context
    }

    pub async fn handle_message(&self, message: &CustomerMessage) -> AgentReply {
        self.handle_message_at(message, Utc::now()).await
    }

    /// Same as [`Self::handle_message`] with an explicit clock, for expiry-sensitive callers.
    pub async fn handle_message_at(
        &self,
        message: &CustomerMessage,
        now: DateTime<Utc>,
    ) -> AgentReply {
        let correlation_id = message.message_id.as_str();
        let user_id = ConversationContextStore::normalize(&message.sender_id);

        let reply = match self.dispatch(&user_id, message, now).await {
            Ok(reply) => reply,
            Err(failure) => {
                let interface = failure.into_interface(correlation_id);
                error!(
                    event_name = "dispatcher.turn_failed",
                    correlation_id,
                    user_id = %user_id,
                    error = %interface,
                    "turn degraded to apology"
                );
                AgentReply::new(replies::APOLOGY, ReplyBranch::Apology)
            }
        };

        if !user_id.is_empty() {
            self.record_turn(&user_id, correlation_id, &message.body, &reply.text).await;
        }
        info!(
            event_name = "dispatcher.turn_completed",
            correlation_id,
            user_id = %user_id,
            branch = reply.branch.as_str(),
            "reply ready"
        );
        reply
    }

    async fn dispatch(
        &self,
        user_id: &UserId,
        message: &CustomerMessage,
        now: DateTime<Utc>,
    ) -> Result<AgentReply, ApplicationError> {
        if user_id.is_empty() {
            return Err(DomainError::InvariantViolation(format!(
                "sender `{}` normalizes to an empty user id",
                message.sender_id
            ))
            .into());
        }
        let correlation_id = message.message_id.as_str();
        let body = message.body.trim();
        let context = self.context.get(user_id.as_str()).await?;

        match self.funnel.advance(user_id, body, correlation_id, now).await? {
            FunnelTurn::Replied(text) => return Ok(AgentReply::new(text, ReplyBranch::Funnel)),
            FunnelTurn::ResumeProductSearch => {
                let categories = self.classifier.catalog().categories_present();
                return Ok(AgentReply::new(
                    replies::resume_product_search(&categories),
                    ReplyBranch::ResumeSearch,
                ));
            }
            FunnelTurn::NoPendingOrder => {}
        }

        match fixed_command(body) {
            Some(FixedCommand::Help) => {
                let categories = self.classifier.catalog().categories_present();
                return Ok(AgentReply::new(
                    replies::help(self.classifier.persona(), &categories),
                    ReplyBranch::Help,
                ));
            }
            Some(FixedCommand::Info) => {
                return Ok(AgentReply::new(
                    replies::bot_info(self.classifier.persona()),
                    ReplyBranch::Info,
                ));
            }
            None => {}
        }

        match self.classifier.match_purchase_intent(body, &context).await {
            Ok(Some(matched)) => {
                return self.start_purchase(user_id, matched, correlation_id, now).await;
            }
            Ok(None) => {}
            Err(failure) => {
                return Ok(self.degrade(user_id, correlation_id, body, &context, failure).await);
            }
        }

        match self.classifier.match_product_query(body, &context).await {
            Ok(Some(matched)) => {
                info!(
                    event_name = "dispatcher.product_card",
                    correlation_id,
                    user_id = %user_id,
                    product = %matched.product.name,
                    source = ?matched.source,
                    "product question answered"
                );
                return Ok(AgentReply::new(
                    replies::product_card(&matched.product),
                    ReplyBranch::ProductCard,
                ));
            }
            Ok(None) => {}
            Err(failure) => {
                return Ok(self.degrade(user_id, correlation_id, body, &context, failure).await);
            }
        }

        Ok(self.general(body, &context).await)
    }

    async fn start_purchase(
        &self,
        user_id: &UserId,
        matched: ProductMatch,
        correlation_id: &str,
        now: DateTime<Utc>,
    ) -> Result<AgentReply, ApplicationError> {
        info!(
            event_name = "dispatcher.purchase_intent",
            correlation_id,
            user_id = %user_id,
            product = %matched.product.name,
            source = ?matched.source,
            "purchase intent detected"
        );
        let started = self
            .funnel
            .start(user_id, matched.product, matched.variation, correlation_id, now)
            .await?;
        Ok(match started {
            FunnelStart::Started(text) => AgentReply::new(text, ReplyBranch::PurchaseStarted),
            FunnelStart::VariationRequired(text) => {
                AgentReply::new(text, ReplyBranch::VariationRequired)
            }
        })
    }

    /// A classifier failure that has no heuristic path still gets a sales reply.
    async fn degrade(
        &self,
        user_id: &UserId,
        correlation_id: &str,
        body: &str,
        context: &str,
        failure: ClassificationError,
    ) -> AgentReply {
        warn!(
            event_name = "dispatcher.classification_degraded",
            correlation_id,
            user_id = %user_id,
            error = %failure,
            "falling through to general reply"
        );
        self.general(body, context).await
    }

    async fn general(&self, body: &str, context: &str) -> AgentReply {
        match self.classifier.general_reply(body, context).await {
            Ok(reply) => AgentReply::new(reply.text, ReplyBranch::GeneralReply),
            Err(failure) => {
                warn!(
                    event_name = "dispatcher.general_reply_failed",
                    error = %failure,
                    "general reply replaced by canned text"
                );
                let categories = self.classifier.catalog().categories_present();
                AgentReply::new(replies::general_fallback(&categories), ReplyBranch::GeneralReply)
            }
        }
    }

    async fn record_turn(
        &self,
        user_id: &UserId,
        correlation_id: &str,
        inbound: &str,
        reply: &str,
    ) {
        let lines = [format!("{CUSTOMER_PREFIX}: {inbound}"), format!("{SELLER_PREFIX}: {reply}")];
        for line in lines {
            if let Err(failure) = self.context.append(user_id.as_str(), &line).await {
                warn!(
                    event_name = "dispatcher.context_append_failed",
                    correlation_id,
                    user_id = %user_id,
                    error = %failure,
                    "transcript not updated"
                );
                return;
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FixedCommand {
    Help,
    Info,
}

/// Slash commands answered without classification. Only the first token counts.
fn fixed_command(body: &str) -> Option<FixedCommand> {
    let command = body.split_whitespace().next().unwrap_or_default().to_lowercase();
    if HELP_COMMANDS.contains(&command.as_str()) {
        Some(FixedCommand::Help)
    } else if command == INFO_COMMAND {
        Some(FixedCommand::Info)
    } else {
        None
    }
}
