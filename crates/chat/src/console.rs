use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines, Stdin, Stdout,
};
use tokio::sync::Mutex;

use crate::transport::{ChatTransport, InboundMessage, OutboundContent, TransportError};

pub const DEFAULT_CONSOLE_SENDER: &str = "console";

/// Local chat over line-oriented streams. Input lines are `sender: text` (a bare line is sent as
/// [`DEFAULT_CONSOLE_SENDER`]); replies are written as `[to sender] text`.
pub struct ConsoleTransport<R, W> {
    lines: Mutex<Lines<R>>,
    output: Mutex<W>,
    next_id: AtomicU64,
}

impl ConsoleTransport<BufReader<Stdin>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> ConsoleTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(input: R, output: W) -> Self {
        Self {
            lines: Mutex::new(input.lines()),
            output: Mutex::new(output),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn into_output(self) -> W {
        self.output.into_inner()
    }

    async fn write_line(&self, target_id: &str, text: &str) -> Result<(), TransportError> {
        let mut output = self.output.lock().await;
        let line = format!("[to {target_id}] {text}\n");
        let send_error = |error: std::io::Error| TransportError::Send(error.to_string());
        output.write_all(line.as_bytes()).await.map_err(send_error)?;
        output.flush().await.map_err(send_error)
    }
}

fn parse_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    match line.split_once(':') {
        Some((sender, body)) if !sender.trim().is_empty() && !sender.contains(' ') => {
            Some((sender.trim(), body.trim()))
        }
        _ => Some((DEFAULT_CONSOLE_SENDER, line)),
    }
}

#[async_trait]
impl<R, W> ChatTransport for ConsoleTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_event(&self) -> Result<Option<InboundMessage>, TransportError> {
        let mut lines = self.lines.lock().await;
        loop {
            let Some(line) =
                lines.next_line().await.map_err(|error| TransportError::Receive(error.to_string()))?
            else {
                return Ok(None);
            };
            if let Some((sender, body)) = parse_line(&line) {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                return Ok(Some(InboundMessage::direct(format!("console-{id}"), sender, body)));
            }
        }
    }

    async fn reply(&self, message: &InboundMessage, text: &str) -> Result<(), TransportError> {
        self.write_line(&message.sender_id, text).await
    }

    async fn send_message(
        &self,
        target_id: &str,
        content: &OutboundContent,
    ) -> Result<(), TransportError> {
        match content {
            OutboundContent::Text(text) => self.write_line(target_id, text).await,
            OutboundContent::Media { url, caption } => {
                let caption = caption.as_deref().unwrap_or_default();
                self.write_line(target_id, &format!("{caption} <{url}>")).await
            }
        }
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}
