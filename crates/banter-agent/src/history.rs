//! Per-room conversation history.

use std::collections::HashMap;
use std::sync::RwLock;

/// Default per-room cap on stored messages.
pub const DEFAULT_HISTORY_CAP: usize = 100;

/// Author of a stored conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryRole {
    User,
    Assistant,
}

/// One stored turn of a room's conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationMessage {
    pub role: HistoryRole,
    pub content: String,
    pub timestamp: i64,
}

#[derive(Debug, Default)]
struct RoomHistory {
    messages: Vec<ConversationMessage>,
    updated_at: i64,
}

/// In-memory bounded message log, keyed by room.
///
/// Rooms are created lazily on first append. When a room exceeds the cap,
/// the oldest half is pruned and the most recent half kept, trading history
/// depth for bounded memory. `clear` is called when the owning voice session
/// ends; nothing else evicts.
///
/// Uses `std::sync::RwLock` intentionally: all lock acquisitions are brief
/// map operations that never span an `.await` point.
#[derive(Debug)]
pub struct ConversationStore {
    max_messages: usize,
    rooms: RwLock<HashMap<String, RoomHistory>>,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAP)
    }
}

impl ConversationStore {
    pub fn new(max_messages: usize) -> Self {
        Self {
            max_messages: max_messages.max(1),
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Appends one turn to a room's log, creating the room if needed.
    pub fn append(&self, room: &str, role: HistoryRole, content: &str) {
        let mut rooms = self.write();
        let history = rooms.entry(room.to_string()).or_default();
        history.messages.push(ConversationMessage {
            role,
            content: content.to_string(),
            timestamp: now_ms(),
        });
        history.updated_at = now_ms();

        if history.messages.len() > self.max_messages {
            let keep = (self.max_messages / 2).max(1);
            let drop = history.messages.len() - keep;
            history.messages.drain(..drop);
            tracing::debug!(room, dropped = drop, kept = keep, "pruned room history");
        }
    }

    /// Ordered history for a room. Empty when the room is unknown.
    pub fn get(&self, room: &str) -> Vec<ConversationMessage> {
        self.read()
            .get(room)
            .map(|h| h.messages.clone())
            .unwrap_or_default()
    }

    /// Number of stored turns for a room.
    pub fn len(&self, room: &str) -> usize {
        self.read().get(room).map_or(0, |h| h.messages.len())
    }

    pub fn is_empty(&self, room: &str) -> bool {
        self.len(room) == 0
    }

    /// Last-modified timestamp for a room, milliseconds since epoch.
    pub fn updated_at(&self, room: &str) -> Option<i64> {
        self.read().get(room).map(|h| h.updated_at)
    }

    /// Drops a room's history entirely.
    pub fn clear(&self, room: &str) {
        self.write().remove(room);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, RoomHistory>> {
        self.rooms.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, RoomHistory>> {
        self.rooms.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_creates_room_lazily() {
        let store = ConversationStore::new(10);
        assert!(store.is_empty("room-a"));
        store.append("room-a", HistoryRole::User, "hi");
        assert_eq!(store.len("room-a"), 1);
        assert!(store.updated_at("room-a").is_some());
    }

    #[test]
    fn history_keeps_insertion_order() {
        let store = ConversationStore::new(10);
        store.append("r", HistoryRole::User, "one");
        store.append("r", HistoryRole::Assistant, "two");
        store.append("r", HistoryRole::User, "three");

        let messages = store.get("r");
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["one", "two", "three"]);
        assert_eq!(messages[1].role, HistoryRole::Assistant);
    }

    #[test]
    fn overflow_keeps_most_recent_half() {
        let store = ConversationStore::new(8);
        for i in 0..9 {
            store.append("r", HistoryRole::User, &format!("m{i}"));
        }

        // Cap exceeded once: the oldest half was dropped.
        assert_eq!(store.len("r"), 4);
        let contents: Vec<String> = store.get("r").into_iter().map(|m| m.content).collect();
        assert_eq!(contents, ["m5", "m6", "m7", "m8"]);
    }

    #[test]
    fn count_never_exceeds_cap() {
        let store = ConversationStore::new(6);
        for i in 0..50 {
            store.append("r", HistoryRole::User, &format!("m{i}"));
            assert!(store.len("r") <= 6);
        }
        // The newest message always survives.
        let messages = store.get("r");
        assert_eq!(messages.last().unwrap().content, "m49");
    }

    #[test]
    fn rooms_are_isolated() {
        let store = ConversationStore::new(10);
        store.append("a", HistoryRole::User, "for a");
        store.append("b", HistoryRole::User, "for b");

        assert_eq!(store.get("a").len(), 1);
        assert_eq!(store.get("b").len(), 1);
        store.clear("a");
        assert!(store.is_empty("a"));
        assert_eq!(store.len("b"), 1);
    }

    #[test]
    fn clear_unknown_room_is_a_no_op() {
        let store = ConversationStore::new(10);
        store.clear("ghost");
        assert!(store.is_empty("ghost"));
    }

    #[test]
    fn tiny_cap_still_retains_latest() {
        let store = ConversationStore::new(1);
        store.append("r", HistoryRole::User, "first");
        store.append("r", HistoryRole::User, "second");
        let messages = store.get("r");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "second");
    }
}
