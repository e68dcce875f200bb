use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

const GROUP_SUFFIX: &str = "@g.us";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport send failed: {0}")]
    Send(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

/// One chat message as delivered by the messaging network.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    pub message_id: String,
    pub sender_id: String,
    pub body: String,
    pub is_group: bool,
    pub is_self_sent: bool,
}

impl InboundMessage {
    /// Direct message from a customer; group membership is read from the sender id.
    pub fn direct(
        message_id: impl Into<String>,
        sender_id: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        let sender_id = sender_id.into();
        Self {
            message_id: message_id.into(),
            is_group: is_group_id(&sender_id),
            sender_id,
            body: body.into(),
            is_self_sent: false,
        }
    }

    /// Group chatter, our own echoes and blank bodies never reach the agent.
    pub fn skip_reason(&self) -> Option<&'static str> {
        if self.is_self_sent {
            Some("self_sent")
        } else if self.is_group {
            Some("group")
        } else if self.body.trim().is_empty() {
            Some("empty_body")
        } else {
            None
        }
    }
}

pub fn is_group_id(sender_id: &str) -> bool {
    sender_id.ends_with(GROUP_SUFFIX)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutboundContent {
    Text(String),
    Media { url: String, caption: Option<String> },
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    /// `None` once the stream is closed.
    async fn next_event(&self) -> Result<Option<InboundMessage>, TransportError>;
    /// Quoted reply to `message` in its conversation.
    async fn reply(&self, message: &InboundMessage, text: &str) -> Result<(), TransportError>;
    async fn send_message(
        &self,
        target_id: &str,
        content: &OutboundContent,
    ) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

#[derive(Default)]
pub struct NoopTransport;

#[async_trait]
impl ChatTransport for NoopTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_event(&self) -> Result<Option<InboundMessage>, TransportError> {
        Ok(None)
    }

    async fn reply(&self, _message: &InboundMessage, _text: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn send_message(
        &self,
        _target_id: &str,
        _content: &OutboundContent,
    ) -> Result<(), TransportError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delivery {
    Replied,
    /// The quoted reply failed and the text went out as a plain message.
    SentDirect,
    Failed(TransportError),
}

/// Quoted reply first, then one plain send to the sender. Failures are logged, never raised.
pub async fn deliver_reply(
    transport: &dyn ChatTransport,
    message: &InboundMessage,
    text: &str,
) -> Delivery {
    let reply_error = match transport.reply(message, text).await {
        Ok(()) => return Delivery::Replied,
        Err(error) => error,
    };
    warn!(
        event_name = "egress.reply_failed",
        correlation_id = %message.message_id,
        error = %reply_error,
        "quoted reply failed; sending plain message"
    );

    match transport.send_message(&message.sender_id, &OutboundContent::Text(text.to_owned())).await
    {
        Ok(()) => Delivery::SentDirect,
        Err(error) => {
            warn!(
                event_name = "egress.send_failed",
                correlation_id = %message.message_id,
                error = %error,
                "reply dropped after secondary send failed"
            );
            Delivery::Failed(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::{
        deliver_reply, ChatTransport, Delivery, InboundMessage, OutboundContent, TransportError,
    };

    struct FlakySender {
        reply_fails: bool,
        send_fails: bool,
        sent: Mutex<Vec<String>>,
    }

    impl FlakySender {
        fn new(reply_fails: bool, send_fails: bool) -> Self {
            Self { reply_fails, send_fails, sent: Mutex::new(Vec::new()) }
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().expect("sent log").clone()
        }
    }

    #[async_trait]
    impl ChatTransport for FlakySender {
        async fn connect(&self) -> Result<(), TransportError> {
            Ok(())
        }

        async fn next_event(&self) -> Result<Option<InboundMessage>, TransportError> {
            Ok(None)
        }

        async fn reply(&self, _message: &InboundMessage, text: &str) -> Result<(), TransportError> {
            if self.reply_fails {
                return Err(TransportError::Send("quoted message gone".to_owned()));
            }
            self.sent.lock().expect("sent log").push(format!("reply:{text}"));
            Ok(())
        }

        async fn send_message(
            &self,
            target_id: &str,
            content: &OutboundContent,
        ) -> Result<(), TransportError> {
            if self.send_fails {
                return Err(TransportError::Send("session closed".to_owned()));
            }
            self.sent.lock().expect("sent log").push(format!("send:{target_id}:{content:?}"));
            Ok(())
        }

        async fn disconnect(&self) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn inbound() -> InboundMessage {
        InboundMessage::direct("m-1", "573001234567@c.us", "hola")
    }

    #[test]
    fn filters_groups_self_messages_and_blank_bodies() {
        assert_eq!(inbound().skip_reason(), None);
        assert_eq!(InboundMessage::direct("m", "120363@g.us", "hola").skip_reason(), Some("group"));
        assert_eq!(
            InboundMessage { is_self_sent: true, ..inbound() }.skip_reason(),
            Some("self_sent")
        );
        assert_eq!(
            InboundMessage { body: "  ".to_owned(), ..inbound() }.skip_reason(),
            Some("empty_body")
        );
    }

    #[tokio::test]
    async fn reply_failure_falls_back_to_one_plain_send() {
        let transport = FlakySender::new(true, false);

        let delivery = deliver_reply(&transport, &inbound(), "hola!").await;

        assert_eq!(delivery, Delivery::SentDirect);
        assert_eq!(transport.sent(), vec!["send:573001234567@c.us:Text(\"hola!\")"]);
    }

    #[tokio::test]
    async fn double_failure_is_reported_not_raised() {
        let transport = FlakySender::new(true, true);

        let delivery = deliver_reply(&transport, &inbound(), "hola!").await;

        assert!(matches!(delivery, Delivery::Failed(TransportError::Send(_))));
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn successful_reply_skips_the_secondary_path() {
        let transport = FlakySender::new(false, true);

        assert_eq!(deliver_reply(&transport, &inbound(), "ok").await, Delivery::Replied);
        assert_eq!(transport.sent(), vec!["reply:ok"]);
    }
}
