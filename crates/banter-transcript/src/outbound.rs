//! Outbound send pipeline.
//!
//! Typed (or retried) text becomes an optimistic local entry immediately;
//! the publish itself is asynchronous and its outcome is reconciled back
//! into the entry status. Callers that must stay responsive spawn the send
//! future and rely on the status transition.

use crate::reconciler::Transcript;
use async_trait::async_trait;
use banter_types::{ChatEntry, ChatRole, Delivery, EntryStatus, WireMessage, TOPIC_CHAT};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the send pipeline. All of them are per-message and
/// recoverable through an explicit user-initiated retry.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("not connected to the room")]
    NotConnected,
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("publish failed: {0}")]
    Publish(String),
    #[error("no failed entry with id {0} to retry")]
    NotRetryable(String),
}

/// Publishing half of the platform data channel.
#[async_trait]
pub trait DataPublisher: Send + Sync {
    /// Whether the underlying session is currently connected.
    fn is_connected(&self) -> bool;

    /// Publishes an encoded payload. `reliable` selects the delivery mode.
    async fn publish(&self, payload: Vec<u8>, reliable: bool) -> Result<(), SendError>;
}

/// Turns typed text into an optimistic transcript entry plus a publish.
pub struct SendPipeline<P> {
    transcript: Arc<Mutex<Transcript>>,
    publisher: Arc<P>,
    local_identity: Option<String>,
}

impl<P: DataPublisher> SendPipeline<P> {
    pub fn new(transcript: Arc<Mutex<Transcript>>, publisher: Arc<P>) -> Self {
        Self {
            transcript,
            publisher,
            local_identity: None,
        }
    }

    /// Sets the identity stamped on locally authored entries.
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.local_identity = Some(identity.into());
        self
    }

    /// Sends `text`, or replays a failed entry when `retry_id` is given.
    ///
    /// The local transcript effect happens before the first await; the
    /// publish outcome lands on the entry status when this future resolves.
    pub async fn send(&self, text: &str, retry_id: Option<&str>) -> Result<(), SendError> {
        let entry_id = self.stage_entry(text, retry_id)?;

        if !self.publisher.is_connected() {
            self.lock().set_status(&entry_id, EntryStatus::Failed);
            return Err(SendError::NotConnected);
        }

        let wire = WireMessage::user_chat(text, now_ms());
        let payload = match wire.encode() {
            Ok(payload) => payload,
            Err(e) => {
                self.lock().set_status(&entry_id, EntryStatus::Failed);
                return Err(e.into());
            }
        };

        match self.publisher.publish(payload, true).await {
            Ok(()) => {
                let mut transcript = self.lock();
                transcript.set_status(&entry_id, EntryStatus::Sent);
                transcript.set_awaiting_reply(true);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(entry_id = %entry_id, error = %e, "publish failed");
                self.lock().set_status(&entry_id, EntryStatus::Failed);
                Err(e)
            }
        }
    }

    /// Replays a failed entry's own text, reusing its id.
    pub async fn send_retry(&self, entry_id: &str) -> Result<(), SendError> {
        let text = {
            let transcript = self.lock();
            match transcript.entry(entry_id) {
                Some(entry) if entry.status == Some(EntryStatus::Failed) => entry.text.clone(),
                _ => return Err(SendError::NotRetryable(entry_id.to_string())),
            }
        };
        self.send(&text, Some(entry_id)).await
    }

    /// Creates the optimistic entry, or flips an existing failed entry back
    /// to `Sending` for a retry.
    fn stage_entry(&self, text: &str, retry_id: Option<&str>) -> Result<String, SendError> {
        let mut transcript = self.lock();
        if let Some(id) = retry_id {
            let retryable = transcript
                .entry(id)
                .is_some_and(|e| e.status == Some(EntryStatus::Failed));
            if !retryable {
                return Err(SendError::NotRetryable(id.to_string()));
            }
            transcript.set_status(id, EntryStatus::Sending);
            return Ok(id.to_string());
        }

        let entry = ChatEntry {
            id: Uuid::new_v4().to_string(),
            role: ChatRole::User,
            text: text.to_string(),
            timestamp: now_ms(),
            sender_id: self.local_identity.clone(),
            topic: TOPIC_CHAT.to_string(),
            status: Some(EntryStatus::Sending),
            delivery: Delivery::Reliable,
        };
        let id = entry.id.clone();
        transcript.push_local(entry);
        Ok(id)
    }

    fn lock(&self) -> MutexGuard<'_, Transcript> {
        // A poisoned lock only means another holder panicked; the snapshot
        // state itself is always coherent (copy-on-write).
        self.transcript
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
