use std::sync::Arc;

use async_trait::async_trait;

use tendero_agent::{AgentRuntime, CustomerMessage};
use tendero_chat::{InboundMessage, MessageHandler};

/// Bridges chat mailboxes to the conversation runtime.
pub struct RuntimeHandler {
    runtime: Arc<AgentRuntime>,
}

impl RuntimeHandler {
    pub fn new(runtime: Arc<AgentRuntime>) -> Self {
        Self { runtime }
    }
}

#[async_trait]
impl MessageHandler for RuntimeHandler {
    async fn handle(&self, message: &InboundMessage) -> Option<String> {
        let reply = self
            .runtime
            .handle_message(&CustomerMessage {
                message_id: message.message_id.clone(),
                sender_id: message.sender_id.clone(),
                body: message.body.clone(),
            })
            .await;
        Some(reply.text).filter(|text| !text.trim().is_empty())
    }
}
