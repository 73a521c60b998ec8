//! Client-side transcript entries.

use crate::wire::WireRole;
use serde::{Deserialize, Serialize};

/// Role of a transcript entry author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

impl From<WireRole> for ChatRole {
    fn from(role: WireRole) -> Self {
        match role {
            WireRole::User => ChatRole::User,
            WireRole::Ai => ChatRole::Assistant,
        }
    }
}

/// Delivery reliability of the channel event that produced an entry.
/// Informational only; it never influences reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    #[default]
    Reliable,
    Lossy,
}

/// Lifecycle status of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Local entry published but not yet acknowledged.
    Sending,
    /// Settled, either acknowledged or finalized.
    Sent,
    /// Provisional; the text may still be replaced in place.
    Streaming,
    /// Publish failed; eligible for an explicit retry.
    Failed,
}

/// One logical line in the rendered conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEntry {
    /// Opaque unique identifier; generated locally, or synthesized on receipt
    /// for inbound entries.
    pub id: String,
    pub role: ChatRole,
    /// Current display text. May be replaced in place while streaming.
    pub text: String,
    /// Milliseconds since the Unix epoch, producer-supplied or receipt time.
    pub timestamp: i64,
    /// Sender identity used for continuation matching.
    pub sender_id: Option<String>,
    /// Routing key. Only `chat` entries form the transcript; `status` entries
    /// render as system notices.
    pub topic: String,
    pub status: Option<EntryStatus>,
    pub delivery: Delivery,
}
