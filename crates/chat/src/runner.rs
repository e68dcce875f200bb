use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::mailbox::{MessageHandler, UserMailboxes};
use crate::transport::{ChatTransport, TransportError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Pumps transport events into per-customer mailboxes.
pub struct ChatRunner {
    transport: Arc<dyn ChatTransport>,
    mailboxes: UserMailboxes,
    reconnect_policy: ReconnectPolicy,
}

impl ChatRunner {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        handler: Arc<dyn MessageHandler>,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        let mailboxes = UserMailboxes::new(handler, transport.clone());
        Self { transport, mailboxes, reconnect_policy }
    }

    /// Shared with the expiry sweeper so it can skip customers with a turn in flight.
    pub fn mailboxes(&self) -> &UserMailboxes {
        &self.mailboxes
    }

    /// Runs until the transport closes its stream or retries are exhausted. Queued turns are
    /// finished before returning.
    pub async fn start(&self) -> Result<()> {
        for attempt in 0..=self.reconnect_policy.max_retries {
            match self.connect_and_pump(attempt).await {
                Ok(()) => break,
                Err(transport_error) => {
                    warn!(
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %transport_error,
                        "chat transport failed"
                    );

                    if attempt >= self.reconnect_policy.max_retries {
                        warn!(
                            max_retries = self.reconnect_policy.max_retries,
                            "chat transport retries exhausted; continuing process without crash"
                        );
                        break;
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        self.mailboxes.drain().await;
        Ok(())
    }

    async fn connect_and_pump(&self, attempt: u32) -> Result<(), TransportError> {
        info!(attempt, "opening chat transport connection");
        self.transport.connect().await?;
        info!(attempt, "chat transport connected");

        loop {
            let Some(message) = self.transport.next_event().await? else {
                info!(attempt, "chat transport stream closed");
                self.transport.disconnect().await?;
                return Ok(());
            };

            if let Some(reason) = message.skip_reason() {
                debug!(
                    event_name = "ingress.message_skipped",
                    correlation_id = %message.message_id,
                    reason,
                    "message not addressed to the agent"
                );
                continue;
            }

            info!(
                event_name = "ingress.message_received",
                correlation_id = %message.message_id,
                sender_id = %message.sender_id,
                "customer message queued"
            );
            self.mailboxes.enqueue(message);
        }
    }
}
