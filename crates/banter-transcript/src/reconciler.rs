//! Inbound transcript reconciliation.
//!
//! Speech transcription naturally arrives as a sequence of growing prefixes
//! before its final form. The reconciler collapses those into one visible
//! line instead of flooding the transcript, while an explicit interim/final
//! flag from the producer always overrides the heuristic.

use banter_types::{
    ChatEntry, ChatRole, Delivery, EntryStatus, WireMessage, TOPIC_CHAT, TOPIC_STATUS,
};
use std::sync::Arc;
use uuid::Uuid;

/// An inbound data-channel event, decoded and paired with transport metadata.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub payload: WireMessage,
    /// Sender identity reported by the transport, when available. Falls back
    /// to the payload identity, then to the payload role.
    pub transport_identity: Option<String>,
    pub delivery: Delivery,
}

impl InboundEvent {
    pub fn new(payload: WireMessage) -> Self {
        Self {
            payload,
            transport_identity: None,
            delivery: Delivery::Reliable,
        }
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.transport_identity = Some(identity.into());
        self
    }

    pub fn with_delivery(mut self, delivery: Delivery) -> Self {
        self.delivery = delivery;
        self
    }
}

/// What a reconciliation pass did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A new entry was appended.
    Appended,
    /// The last entry was replaced with an updated provisional form.
    MergedInterim,
    /// The last entry was settled in place.
    Finalized,
    /// A status notice was appended as a system entry.
    StatusNotice,
    /// The event carried an unknown topic and produced nothing.
    Discarded,
}

/// Ordered transcript state with copy-on-write snapshots.
///
/// Every mutation replaces the whole entry sequence, so a renderer holding a
/// snapshot from [`Transcript::entries`] never observes a torn write. The
/// sequence is append-only except that the last entry may be replaced when a
/// continuation is detected; no earlier entry is ever touched by inbound
/// traffic.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Arc<[ChatEntry]>,
    awaiting_reply: bool,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot of the conversation.
    pub fn entries(&self) -> Arc<[ChatEntry]> {
        Arc::clone(&self.entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a user message has been acknowledged without an assistant
    /// reply landing yet. Drives the "thinking" placeholder.
    pub fn awaiting_reply(&self) -> bool {
        self.awaiting_reply
    }

    pub fn set_awaiting_reply(&mut self, awaiting: bool) {
        self.awaiting_reply = awaiting;
    }

    /// Applies one inbound event, deciding continuation vs. new entry.
    pub fn apply(&mut self, event: InboundEvent) -> ReconcileOutcome {
        let msg = &event.payload;
        match msg.topic.as_str() {
            TOPIC_CHAT => {}
            TOPIC_STATUS => {
                self.push(ChatEntry {
                    id: Uuid::new_v4().to_string(),
                    role: ChatRole::System,
                    text: format!("Status: {}", msg.message),
                    timestamp: msg.timestamp.unwrap_or_else(now_ms),
                    sender_id: None,
                    topic: TOPIC_STATUS.to_string(),
                    status: None,
                    delivery: event.delivery,
                });
                return ReconcileOutcome::StatusNotice;
            }
            other => {
                tracing::trace!(topic = other, "discarding event with unknown topic");
                return ReconcileOutcome::Discarded;
            }
        }

        let explicit_interim = msg.has_explicit_interim();
        let explicit_final = msg.has_explicit_final();
        let explicit_flag = msg.has_explicit_flag();

        let role = ChatRole::from(msg.role);
        let sender_id = event
            .transport_identity
            .clone()
            .or_else(|| msg.identity.clone())
            .unwrap_or_else(|| msg.role.as_str().to_string());

        let candidate = ChatEntry {
            id: Uuid::new_v4().to_string(),
            role,
            text: msg.message.clone(),
            timestamp: msg.timestamp.unwrap_or_else(now_ms),
            sender_id: Some(sender_id),
            topic: msg.topic.clone(),
            status: Some(if explicit_interim {
                EntryStatus::Streaming
            } else {
                EntryStatus::Sent
            }),
            delivery: event.delivery,
        };

        let outcome = match self.entries.last() {
            None => {
                self.push(candidate);
                ReconcileOutcome::Appended
            }
            Some(last) => {
                let same_sender = match (&candidate.sender_id, &last.sender_id) {
                    (Some(a), Some(b)) => a == b,
                    _ => candidate.role == last.role,
                };
                let same_topic = candidate.topic == last.topic;
                let is_text_continuation = !candidate.text.is_empty()
                    && !last.text.is_empty()
                    && (candidate.text.starts_with(&last.text)
                        || last.text.starts_with(&candidate.text));
                let treat_as_interim = explicit_interim
                    || (!explicit_flag
                        && candidate.role == ChatRole::User
                        && same_sender
                        && same_topic
                        && is_text_continuation);

                if same_sender && same_topic {
                    let last_streaming = last.status == Some(EntryStatus::Streaming);
                    // An explicit final settles a streaming line, and a
                    // re-delivered final is absorbed by the already-settled
                    // entry instead of appearing a second time. Without any
                    // flag, identical text only finalizes a streaming line.
                    let finalizes = (explicit_final
                        && (last_streaming || candidate.text == last.text))
                        || (!explicit_flag && last_streaming && candidate.text == last.text);

                    if treat_as_interim {
                        self.replace_last(candidate, EntryStatus::Streaming);
                        ReconcileOutcome::MergedInterim
                    } else if finalizes {
                        self.replace_last(candidate, EntryStatus::Sent);
                        ReconcileOutcome::Finalized
                    } else {
                        self.push(candidate);
                        ReconcileOutcome::Appended
                    }
                } else {
                    self.push(candidate);
                    ReconcileOutcome::Appended
                }
            }
        };

        if role == ChatRole::Assistant {
            self.awaiting_reply = false;
        }
        outcome
    }

    /// Appends a locally authored entry (outbound pipeline).
    pub fn push_local(&mut self, entry: ChatEntry) {
        self.push(entry);
    }

    /// Updates the status of the entry with the given id. Returns false if no
    /// such entry exists.
    pub fn set_status(&mut self, id: &str, status: EntryStatus) -> bool {
        let Some(index) = self.entries.iter().position(|e| e.id == id) else {
            return false;
        };
        let mut entries = self.entries.to_vec();
        entries[index].status = Some(status);
        self.entries = entries.into();
        true
    }

    /// Looks up an entry by id.
    pub fn entry(&self, id: &str) -> Option<&ChatEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    fn push(&mut self, entry: ChatEntry) {
        let mut entries = self.entries.to_vec();
        entries.push(entry);
        self.entries = entries.into();
    }

    /// Replaces the last entry with the candidate's fields, keeping the
    /// original id so the visible line has a stable identity for renderers.
    fn replace_last(&mut self, candidate: ChatEntry, status: EntryStatus) {
        let mut entries = self.entries.to_vec();
        if let Some(last) = entries.last_mut() {
            let id = last.id.clone();
            *last = ChatEntry {
                id,
                status: Some(status),
                ..candidate
            };
        }
        self.entries = entries.into();
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat(text: &str) -> WireMessage {
        WireMessage::decode(format!(r#"{{"message":"{text}","role":"user"}}"#).as_bytes()).unwrap()
    }

    fn interim(text: &str) -> WireMessage {
        WireMessage::decode(
            format!(r#"{{"message":"{text}","role":"user","interim":true}}"#).as_bytes(),
        )
        .unwrap()
    }

    fn finalized(text: &str) -> WireMessage {
        WireMessage::decode(
            format!(r#"{{"message":"{text}","role":"user","isFinal":true}}"#).as_bytes(),
        )
        .unwrap()
    }

    fn apply(t: &mut Transcript, msg: WireMessage, identity: &str) -> ReconcileOutcome {
        t.apply(InboundEvent::new(msg).with_identity(identity))
    }

    #[test]
    fn first_event_appends() {
        let mut t = Transcript::new();
        assert_eq!(
            apply(&mut t, interim("Hel"), "alice"),
            ReconcileOutcome::Appended
        );
        let entries = t.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text, "Hel");
        assert_eq!(entries[0].status, Some(EntryStatus::Streaming));
    }

    #[test]
    fn continuation_merges_into_single_final_entry() {
        let mut t = Transcript::new();
        apply(&mut t, interim("Hel"), "alice");
        assert_eq!(
            apply(&mut t, interim("Hello"), "alice"),
            ReconcileOutcome::MergedInterim
        );
        assert_eq!(
            apply(&mut t, finalized("Hello world"), "alice"),
            ReconcileOutcome::Finalized
        );

        let entries = t.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text, "Hello world");
        assert_eq!(entries[0].status, Some(EntryStatus::Sent));
    }

    #[test]
    fn merge_keeps_stable_entry_id() {
        let mut t = Transcript::new();
        apply(&mut t, interim("Hel"), "alice");
        let id = t.entries()[0].id.clone();
        apply(&mut t, interim("Hello"), "alice");
        apply(&mut t, finalized("Hello there"), "alice");
        assert_eq!(t.entries()[0].id, id);
    }

    #[test]
    fn redelivered_final_is_idempotent() {
        let mut t = Transcript::new();
        apply(&mut t, interim("Hello"), "alice");
        apply(&mut t, finalized("Hello"), "alice");
        assert_eq!(
            apply(&mut t, finalized("Hello"), "alice"),
            ReconcileOutcome::Finalized
        );

        let entries = t.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, Some(EntryStatus::Sent));
    }

    #[test]
    fn unflagged_user_echo_stays_interim() {
        // Equal text satisfies the prefix relation, so for the user role the
        // interim heuristic wins and the line stays provisional until an
        // explicit final arrives.
        let mut t = Transcript::new();
        apply(&mut t, interim("Hello world"), "alice");
        assert_eq!(
            apply(&mut t, chat("Hello world"), "alice"),
            ReconcileOutcome::MergedInterim
        );
        assert_eq!(t.entries()[0].status, Some(EntryStatus::Streaming));
    }

    #[test]
    fn unflagged_agent_echo_finalizes_streaming_entry() {
        // The interim heuristic is user-only; for other roles an identical
        // unflagged echo settles a streaming line.
        let mut t = Transcript::new();
        let partial =
            WireMessage::decode(br#"{"message":"One moment.","role":"ai","interim":true}"#)
                .unwrap();
        let echo = WireMessage::decode(br#"{"message":"One moment.","role":"ai"}"#).unwrap();
        t.apply(InboundEvent::new(partial).with_identity("agent"));
        assert_eq!(
            t.apply(InboundEvent::new(echo).with_identity("agent")),
            ReconcileOutcome::Finalized
        );
        assert_eq!(t.entries()[0].status, Some(EntryStatus::Sent));
    }

    #[test]
    fn unflagged_prefix_growth_is_treated_as_interim() {
        // No flags at all: the user-role prefix heuristic keeps one line.
        let mut t = Transcript::new();
        apply(&mut t, chat("How"), "alice");
        assert_eq!(
            apply(&mut t, chat("How are"), "alice"),
            ReconcileOutcome::MergedInterim
        );
        let entries = t.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text, "How are");
        assert_eq!(entries[0].status, Some(EntryStatus::Streaming));
    }

    #[test]
    fn distinct_senders_never_merge() {
        let mut t = Transcript::new();
        apply(&mut t, interim("Hello"), "alice");
        assert_eq!(
            apply(&mut t, interim("Hello there"), "bob"),
            ReconcileOutcome::Appended
        );
        assert_eq!(t.entries().len(), 2);
    }

    #[test]
    fn distinct_finals_stay_separate() {
        let mut t = Transcript::new();
        apply(&mut t, finalized("Hi."), "alice");
        assert_eq!(
            apply(&mut t, finalized("Bye."), "alice"),
            ReconcileOutcome::Appended
        );
        assert_eq!(t.entries().len(), 2);
    }

    #[test]
    fn agent_sentences_append_as_separate_lines() {
        let mut t = Transcript::new();
        let one = WireMessage::decode(br#"{"message":"Hi there.","role":"ai"}"#).unwrap();
        let two = WireMessage::decode(br#"{"message":"How are you?","role":"ai"}"#).unwrap();
        t.apply(InboundEvent::new(one).with_identity("agent"));
        assert_eq!(
            t.apply(InboundEvent::new(two).with_identity("agent")),
            ReconcileOutcome::Appended
        );
        assert_eq!(t.entries().len(), 2);
    }

    #[test]
    fn assistant_entry_clears_awaiting_reply() {
        let mut t = Transcript::new();
        t.set_awaiting_reply(true);
        let msg = WireMessage::decode(br#"{"message":"Hello!","role":"ai"}"#).unwrap();
        t.apply(InboundEvent::new(msg).with_identity("agent"));
        assert!(!t.awaiting_reply());
    }

    #[test]
    fn status_topic_becomes_system_notice() {
        let mut t = Transcript::new();
        apply(&mut t, finalized("Hi."), "alice");

        let status =
            WireMessage::decode(br#"{"message":"agent busy","topic":"status"}"#).unwrap();
        assert_eq!(
            t.apply(InboundEvent::new(status)),
            ReconcileOutcome::StatusNotice
        );

        let entries = t.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].text, "Hi.");
        assert_eq!(entries[1].role, ChatRole::System);
        assert_eq!(entries[1].text, "Status: agent busy");
        assert_eq!(entries[1].status, None);
    }

    #[test]
    fn unknown_topic_is_discarded() {
        let mut t = Transcript::new();
        let msg = WireMessage::decode(br#"{"message":"x","topic":"telemetry"}"#).unwrap();
        assert_eq!(t.apply(InboundEvent::new(msg)), ReconcileOutcome::Discarded);
        assert!(t.is_empty());
    }

    #[test]
    fn identity_falls_back_to_payload_then_role() {
        let mut t = Transcript::new();
        let msg = WireMessage::decode(br#"{"message":"a","role":"user","identity":"carol"}"#)
            .unwrap();
        t.apply(InboundEvent::new(msg));
        assert_eq!(t.entries()[0].sender_id.as_deref(), Some("carol"));

        let msg = WireMessage::decode(br#"{"message":"b","role":"user"}"#).unwrap();
        t.apply(InboundEvent::new(msg));
        assert_eq!(t.entries()[1].sender_id.as_deref(), Some("user"));
    }

    #[test]
    fn earlier_entries_are_never_mutated() {
        let mut t = Transcript::new();
        apply(&mut t, finalized("First."), "alice");
        apply(&mut t, interim("Sec"), "alice");
        let before = t.entries();
        apply(&mut t, finalized("Second."), "alice");
        let after = t.entries();
        assert_eq!(before[0], after[0]);
        assert_eq!(after[1].text, "Second.");
    }

    #[test]
    fn snapshots_are_isolated_from_later_mutation() {
        let mut t = Transcript::new();
        apply(&mut t, interim("Hel"), "alice");
        let snapshot = t.entries();
        apply(&mut t, interim("Hello"), "alice");
        assert_eq!(snapshot[0].text, "Hel");
        assert_eq!(t.entries()[0].text, "Hello");
    }

    #[test]
    fn payload_timestamp_wins_over_receipt_time() {
        let mut t = Transcript::new();
        let msg = WireMessage::decode(br#"{"message":"a","role":"user","timestamp":12345}"#)
            .unwrap();
        t.apply(InboundEvent::new(msg));
        assert_eq!(t.entries()[0].timestamp, 12345);
    }
}
