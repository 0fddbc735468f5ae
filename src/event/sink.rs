use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::info;

use crate::types::{EventRecord, ExchangeError, Result};

/// Destination for events of committed operations
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, record: EventRecord) -> Result<()>;
}

/// Forwards events to an mpsc receiver
pub struct ChannelSink {
    sender: mpsc::Sender<EventRecord>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<EventRecord>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn publish(&self, record: EventRecord) -> Result<()> {
        self.sender
            .send(record)
            .await
            .map_err(|e| ExchangeError::Event(format!("receiver dropped, lost event {}", e.0.sequence)))
    }
}

/// Writes each event as a JSON line through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl EventSink for LogSink {
    async fn publish(&self, record: EventRecord) -> Result<()> {
        let json = serde_json::to_string(&record)?;
        info!(sequence = record.sequence, event = record.event.name(), "{}", json);
        Ok(())
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

#[async_trait]
impl EventSink for NullSink {
    async fn publish(&self, _record: EventRecord) -> Result<()> {
        Ok(())
    }
}
