//! Structured outcome events for the notification surface.
//!
//! The SDK never renders anything. Connect, disconnect and write outcomes are
//! published as [`OutcomeEvent`]s on a broadcast channel; a UI collaborator
//! subscribes and renders them (toasts, banners, logs).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::network::EVENT_CHANNEL_CAPACITY;

/// Severity of an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    Success,
    Failure,
    Warning,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Warning => "warning",
        }
    }
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single user-facing outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeEvent {
    #[serde(rename = "type")]
    pub kind: OutcomeKind,
    pub title: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Broadcasts outcome events. Cheap to clone; clones share the channel.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<OutcomeEvent>,
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OutcomeEvent> {
        self.tx.subscribe()
    }

    pub fn success(&self, title: &str, message: &str) {
        self.emit(OutcomeKind::Success, title, message);
    }

    pub fn failure(&self, title: &str, message: &str) {
        self.emit(OutcomeKind::Failure, title, message);
    }

    pub fn warning(&self, title: &str, message: &str) {
        self.emit(OutcomeKind::Warning, title, message);
    }

    pub fn emit(&self, kind: OutcomeKind, title: &str, message: &str) {
        tracing::debug!(kind = kind.as_str(), title, message, "Outcome event");
        // No subscribers is not an error: nobody is rendering right now.
        let _ = self.tx.send(OutcomeEvent {
            kind,
            title: title.to_string(),
            message: message.to_string(),
            at: Utc::now(),
        });
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
