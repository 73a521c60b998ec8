//! Chat-channel wire payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Topic under which ordinary chat lines travel.
pub const TOPIC_CHAT: &str = "chat";

/// Topic for out-of-band status notices.
pub const TOPIC_STATUS: &str = "status";

/// Author role carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireRole {
    User,
    #[default]
    Ai,
}

impl WireRole {
    /// Stable name used when a sender identity must be derived from the role.
    pub fn as_str(self) -> &'static str {
        match self {
            WireRole::User => "user",
            WireRole::Ai => "ai",
        }
    }
}

/// A chat-channel payload, in either direction.
///
/// Producers disagree on the spelling of the finality flags, so decoding
/// accepts `isFinal`/`is_final`/`final` and `interim`/`partial`, first key
/// present wins. Serialization always uses the primary spellings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireMessage {
    pub message: String,
    pub topic: String,
    pub role: WireRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    #[serde(rename = "isFinal", skip_serializing_if = "Option::is_none")]
    pub is_final: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interim: Option<bool>,
}

impl WireMessage {
    /// Builds an outbound chat message authored by the local user.
    pub fn user_chat(message: impl Into<String>, timestamp: i64) -> Self {
        Self {
            message: message.into(),
            topic: TOPIC_CHAT.to_string(),
            role: WireRole::User,
            timestamp: Some(timestamp),
            identity: None,
            is_final: None,
            interim: None,
        }
    }

    /// Builds an agent chat message, one spoken sentence per payload.
    pub fn agent_chat(message: impl Into<String>, timestamp: i64) -> Self {
        Self {
            message: message.into(),
            topic: TOPIC_CHAT.to_string(),
            role: WireRole::Ai,
            timestamp: Some(timestamp),
            identity: None,
            is_final: None,
            interim: None,
        }
    }

    /// Decodes a raw data-channel payload.
    ///
    /// A JSON object carrying a string `message` decodes fully. Valid UTF-8
    /// that does not parse as JSON is kept as a raw agent chat line. Payloads
    /// that are not UTF-8, or that parse as JSON without a usable `message`,
    /// are dropped.
    pub fn decode(raw: &[u8]) -> Option<Self> {
        let text = std::str::from_utf8(raw).ok()?;
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(_) => return Some(Self::raw_text(text)),
        };
        let map = value.as_object()?;
        let message = map.get("message")?.as_str()?.to_string();
        let topic = map
            .get("topic")
            .and_then(Value::as_str)
            .unwrap_or(TOPIC_CHAT)
            .to_string();
        let role = match map.get("role").and_then(Value::as_str) {
            Some("user") => WireRole::User,
            _ => WireRole::Ai,
        };
        Some(Self {
            message,
            topic,
            role,
            timestamp: map.get("timestamp").and_then(Value::as_i64),
            identity: map
                .get("identity")
                .and_then(Value::as_str)
                .map(str::to_string),
            is_final: first_bool(map, &["isFinal", "is_final", "final"]),
            interim: first_bool(map, &["interim", "partial"]),
        })
    }

    fn raw_text(text: &str) -> Self {
        Self {
            message: text.to_string(),
            topic: TOPIC_CHAT.to_string(),
            role: WireRole::Ai,
            timestamp: None,
            identity: None,
            is_final: None,
            interim: None,
        }
    }

    /// Encodes the message for the data channel (JSON, UTF-8).
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// True when the producer explicitly marked this fragment provisional.
    pub fn has_explicit_interim(&self) -> bool {
        self.interim == Some(true) || self.is_final == Some(false)
    }

    /// True when the producer explicitly marked this fragment settled.
    pub fn has_explicit_final(&self) -> bool {
        self.interim == Some(false) || self.is_final == Some(true)
    }

    /// True when the producer said anything at all about finality.
    pub fn has_explicit_flag(&self) -> bool {
        self.has_explicit_interim() || self.has_explicit_final()
    }
}

fn first_bool(map: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<bool> {
    keys.iter().find_map(|key| map.get(*key).and_then(Value::as_bool))
}
