//! Messaging-network side of the assistant.
//!
//! A [`ChatTransport`] delivers customer messages and carries replies back. The [`ChatRunner`]
//! drops group and self-sent traffic, then queues each message in the sender's mailbox so
//! a customer's turns run one at a time and in order while different customers proceed
//! concurrently. Replies go out as quoted replies with one plain-message retry.

pub mod console;
pub mod mailbox;
pub mod runner;
pub mod transport;

pub use console::ConsoleTransport;
pub use mailbox::{MessageHandler, UserMailboxes};
pub use runner::{ChatRunner, ReconnectPolicy};
pub use transport::{
    deliver_reply, is_group_id, ChatTransport, Delivery, InboundMessage, NoopTransport,
    OutboundContent, TransportError,
};
