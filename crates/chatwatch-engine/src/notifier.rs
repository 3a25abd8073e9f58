use crate::snapshot::{ConversationSnapshot, TOP_N};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A detected change of the top conversations, handed to the notifier once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub previous: ConversationSnapshot,
    pub current: ConversationSnapshot,
    pub timestamp: DateTime<Utc>,
    /// Best-effort phone hints aligned with `current`.
    #[serde(default)]
    pub phones: [Option<String>; TOP_N],
}

impl NotificationEvent {
    pub fn new(previous: ConversationSnapshot, current: ConversationSnapshot) -> Self {
        Self {
            previous,
            current,
            timestamp: Utc::now(),
            phones: Default::default(),
        }
    }

    pub fn with_phones(mut self, phones: [Option<String>; TOP_N]) -> Self {
        self.phones = phones;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    Message(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Downstream consumer of change events. One call per event; implementations
/// must not retry across events.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &NotificationEvent) -> Result<(), NotifyError>;
}
