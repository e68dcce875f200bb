//! Per-customer FIFO queues.
//!
//! Each customer with queued work owns one worker task that drains their messages in arrival
//! order, so a customer's turns never interleave while different customers run concurrently.
//! A worker retires after sitting idle; the next message spawns a fresh one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, info};

use tendero_core::domain::user::UserId;

use crate::transport::{deliver_reply, ChatTransport, InboundMessage};

const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Produces the reply for one customer message. `None` means stay silent.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &InboundMessage) -> Option<String>;
}

struct Mailbox {
    sender: mpsc::UnboundedSender<InboundMessage>,
    /// Queued plus in-flight messages.
    pending: usize,
}

struct Shared {
    handler: Arc<dyn MessageHandler>,
    transport: Arc<dyn ChatTransport>,
    mailboxes: Mutex<HashMap<UserId, Mailbox>>,
    idle: Notify,
    idle_timeout: Duration,
}

impl Shared {
    fn with_mailboxes<T>(&self, f: impl FnOnce(&mut HashMap<UserId, Mailbox>) -> T) -> T {
        match self.mailboxes.lock() {
            Ok(mut mailboxes) => f(&mut mailboxes),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    fn finish_one(&self, user_id: &UserId) {
        self.with_mailboxes(|mailboxes| {
            if let Some(mailbox) = mailboxes.get_mut(user_id) {
                mailbox.pending = mailbox.pending.saturating_sub(1);
            }
        });
        self.idle.notify_waiters();
    }
}

#[derive(Clone)]
pub struct UserMailboxes {
    shared: Arc<Shared>,
}

impl UserMailboxes {
    pub fn new(handler: Arc<dyn MessageHandler>, transport: Arc<dyn ChatTransport>) -> Self {
        Self::with_idle_timeout(handler, transport, DEFAULT_IDLE_TIMEOUT)
    }

    pub fn with_idle_timeout(
        handler: Arc<dyn MessageHandler>,
        transport: Arc<dyn ChatTransport>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                handler,
                transport,
                mailboxes: Mutex::new(HashMap::new()),
                idle: Notify::new(),
                idle_timeout,
            }),
        }
    }

    /// Queues the message behind any earlier ones from the same customer.
    pub fn enqueue(&self, message: InboundMessage) {
        let user_id = UserId::normalize(&message.sender_id);
        let shared = Arc::clone(&self.shared);

        self.shared.with_mailboxes(|mailboxes| {
            if let Some(mailbox) = mailboxes.get_mut(&user_id) {
                match mailbox.sender.send(message) {
                    Ok(()) => {
                        mailbox.pending += 1;
                        return;
                    }
                    // Worker gone without deregistering; replace it below.
                    Err(mpsc::error::SendError(returned)) => {
                        mailboxes.remove(&user_id);
                        spawn_worker(shared, mailboxes, user_id, returned);
                        return;
                    }
                }
            }
            spawn_worker(shared, mailboxes, user_id, message);
        });
    }

    /// True while the customer has a queued or in-flight message.
    pub fn is_busy(&self, user_id: &UserId) -> bool {
        self.shared.with_mailboxes(|mailboxes| {
            mailboxes.get(user_id).is_some_and(|mailbox| mailbox.pending > 0)
        })
    }

    pub fn pending(&self) -> usize {
        self.shared.with_mailboxes(|mailboxes| {
            mailboxes.values().map(|mailbox| mailbox.pending).sum()
        })
    }

    /// Waits until every queued message has been handled.
    pub async fn drain(&self) {
        loop {
            let notified = self.shared.idle.notified();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

fn spawn_worker(
    shared: Arc<Shared>,
    mailboxes: &mut HashMap<UserId, Mailbox>,
    user_id: UserId,
    first: InboundMessage,
) {
    let (sender, receiver) = mpsc::unbounded_channel();
    // The receiver is alive until the task below ends, so this send cannot fail.
    let _ = sender.send(first);
    mailboxes.insert(user_id.clone(), Mailbox { sender, pending: 1 });
    debug!(event_name = "ingress.mailbox_opened", user_id = %user_id, "customer worker started");
    tokio::spawn(run_worker(shared, user_id, receiver));
}

async fn run_worker(
    shared: Arc<Shared>,
    user_id: UserId,
    mut receiver: mpsc::UnboundedReceiver<InboundMessage>,
) {
    loop {
        match tokio::time::timeout(shared.idle_timeout, receiver.recv()).await {
            Ok(Some(message)) => {
                process(&shared, &message).await;
                shared.finish_one(&user_id);
            }
            Ok(None) => return,
            Err(_) => {
                let retired = shared.with_mailboxes(|mailboxes| {
                    if receiver.is_empty() {
                        mailboxes.remove(&user_id);
                        true
                    } else {
                        false
                    }
                });
                if retired {
                    debug!(
                        event_name = "ingress.mailbox_closed",
                        user_id = %user_id,
                        "idle customer worker retired"
                    );
                    return;
                }
            }
        }
    }
}

async fn process(shared: &Shared, message: &InboundMessage) {
    let Some(reply) = shared.handler.handle(message).await else {
        return;
    };
    let delivery = deliver_reply(shared.transport.as_ref(), message, &reply).await;
    info!(
        event_name = "egress.reply_delivered",
        correlation_id = %message.message_id,
        delivery = ?delivery,
        "reply handed to transport"
    );
}
